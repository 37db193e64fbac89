// Mock suppliers for local runs and tests
//
// A `MockSupplier` is both an in-process `SupplierGateway` and, through `router()`, an
// HTTP upstream that `HttpSupplier` can be pointed at.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::model::{RawOffer, SupplierResult};
use crate::supplier::SupplierGateway;

#[derive(Debug, Clone, PartialEq)]
pub enum MockFailure {
    Unavailable,
    InternalError,
}

pub struct MockSupplier {
    name: String,
    offers: Vec<RawOffer>,
    available: AtomicBool,
    delay_ms: AtomicU64,
    fail_next_requests: AtomicUsize,
    request_count: AtomicUsize,
}

impl MockSupplier {
    pub fn new(name: &str, offers: Vec<RawOffer>) -> Self {
        Self {
            name: name.to_string(),
            offers,
            available: AtomicBool::new(true),
            delay_ms: AtomicU64::new(0),
            fail_next_requests: AtomicUsize::new(0),
            request_count: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_next(&self, count: usize) {
        self.fail_next_requests.store(count, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    // Offers in catalogue order; every offer when no city is given
    pub fn offers_for(&self, city: Option<&str>) -> Vec<RawOffer> {
        match city {
            Some(city) => self
                .offers
                .iter()
                .filter(|offer| offer.city.eq_ignore_ascii_case(city))
                .cloned()
                .collect(),
            None => self.offers.clone(),
        }
    }

    async fn respond(&self, city: Option<&str>) -> Result<Vec<RawOffer>, MockFailure> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if !self.is_available() {
            return Err(MockFailure::Unavailable);
        }

        let consumed = self
            .fail_next_requests
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(MockFailure::InternalError);
        }

        Ok(self.offers_for(city))
    }

    fn failure_message(&self, failure: &MockFailure) -> String {
        match failure {
            MockFailure::Unavailable => format!("{} is currently unavailable", self.name),
            MockFailure::InternalError => format!("Internal server error in {}", self.name),
        }
    }

    // HTTP upstream serving `GET /hotels?city=<city>`.
    pub fn router(mock: Arc<Self>) -> Router {
        Router::new()
            .route("/hotels", get(list_hotels))
            .with_state(mock)
    }
}

#[derive(Debug, Deserialize)]
struct CityQuery {
    city: Option<String>,
}

async fn list_hotels(
    State(mock): State<Arc<MockSupplier>>,
    Query(query): Query<CityQuery>,
) -> Response {
    let city = query.city.as_deref().filter(|c| !c.is_empty());

    match mock.respond(city).await {
        Ok(offers) => Json(offers).into_response(),
        Err(failure) => {
            let status = match failure {
                MockFailure::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                MockFailure::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": mock.failure_message(&failure) }))).into_response()
        }
    }
}

#[async_trait]
impl SupplierGateway for MockSupplier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, city: &str) -> SupplierResult {
        match self.respond(Some(city)).await {
            Ok(offers) => SupplierResult::success(&self.name, offers),
            Err(failure) => SupplierResult::failure(&self.name, self.failure_message(&failure)),
        }
    }

    async fn probe(&self, city: &str) -> bool {
        self.respond(Some(city)).await.is_ok()
    }
}

// Path prefixes the demo upstreams are served under, each answering `<prefix>/hotels`
pub const DEMO_PREFIXES: [&str; 2] = ["/supplierA", "/supplierB"];

// The two demo upstreams, paired with their prefix
pub fn demo_upstreams() -> Vec<(&'static str, Arc<MockSupplier>)> {
    vec![
        (DEMO_PREFIXES[0], Arc::new(MockSupplier::new("Supplier A", seed_supplier_a()))),
        (DEMO_PREFIXES[1], Arc::new(MockSupplier::new("Supplier B", seed_supplier_b()))),
    ]
}

pub fn mount(router: Router, upstreams: &[(&str, Arc<MockSupplier>)]) -> Router {
    upstreams.iter().fold(router, |router, (prefix, mock)| {
        router.nest(prefix, MockSupplier::router(Arc::clone(mock)))
    })
}

pub fn seed_supplier_a() -> Vec<RawOffer> {
    vec![
        RawOffer::new("a1", "Holtin", 6000.0, "delhi", 10.0),
        RawOffer::new("a2", "Radison", 5900.0, "delhi", 13.0),
        RawOffer::new("a3", "Taj Palace", 8500.0, "delhi", 15.0),
        RawOffer::new("a4", "ITC Maurya", 7200.0, "delhi", 12.0),
        RawOffer::new("a5", "Oberoi", 9500.0, "delhi", 18.0),
        RawOffer::new("a6", "Hyatt Regency", 6800.0, "mumbai", 14.0),
        RawOffer::new("a7", "Marriott", 7500.0, "mumbai", 16.0),
    ]
}

pub fn seed_supplier_b() -> Vec<RawOffer> {
    vec![
        RawOffer::new("b1", "Holtin", 5340.0, "delhi", 20.0),
        RawOffer::new("b2", "Radison", 6200.0, "delhi", 11.0),
        RawOffer::new("b3", "Taj Palace", 8200.0, "delhi", 17.0),
        RawOffer::new("b4", "Leela Palace", 9800.0, "delhi", 19.0),
        RawOffer::new("b5", "Shangri-La", 8900.0, "delhi", 16.0),
        RawOffer::new("b6", "Hyatt Regency", 6500.0, "mumbai", 15.0),
        RawOffer::new("b7", "Four Seasons", 11000.0, "mumbai", 22.0),
    ]
}
