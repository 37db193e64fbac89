//! HTTP surface: query endpoint, health endpoint, service index.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /` | [`index`] |
//! | `GET /api/hotels?city=&minPrice=&maxPrice=` | [`search_hotels`] |
//! | `GET /health` | [`health`] |

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::cache::{OfferCache, TtlCache};
use crate::comparison::ComparisonEngine;
use crate::config::AppConfig;
use crate::health::HealthAggregator;
use crate::mock;
use crate::model::{HealthReport, HealthSnapshot, ResolvedOffer};
use crate::retry::RetryingSupplier;
use crate::service::{HotelSearchService, SearchRequest, ServiceError, ValidationError};
use crate::supplier::{HttpSupplier, SupplierError, SupplierGateway};

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 404 Not Found
    NotFound(String),
    /// 500 Internal Server Error
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        if status.is_server_error() {
            error!(error = error_type, %message, "API error");
        } else {
            debug!(error = error_type, %message, "API client error");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<HotelSearchService>,
    pub health: Arc<HealthAggregator>,
    /// Prefixes of mock upstreams mounted on this server, listed by the index
    pub mock_prefixes: Vec<&'static str>,
}

impl AppState {
    pub fn new(search: Arc<HotelSearchService>, health: Arc<HealthAggregator>) -> Self {
        Self {
            search,
            health,
            mock_prefixes: Vec::new(),
        }
    }

    pub fn with_mock_prefixes(mut self, prefixes: &[&'static str]) -> Self {
        self.mock_prefixes = prefixes.to_vec();
        self
    }

    /// Wire HTTP suppliers (with retry), engine, aggregator and cache from config.
    ///
    /// The cache is returned separately so the caller owns its lifecycle.
    pub fn from_config(config: &AppConfig) -> Result<(Self, Arc<TtlCache>), SupplierError> {
        let suppliers = config
            .suppliers
            .iter()
            .map(|supplier| {
                let http = HttpSupplier::with_timeouts(
                    &supplier.name,
                    &supplier.resolve_url(&config.base_url),
                    config.fetch_timeout(),
                    config.probe_timeout(),
                )?;
                let gateway: Arc<dyn SupplierGateway> =
                    Arc::new(RetryingSupplier::new(http, config.retry.clone()));
                Ok(gateway)
            })
            .collect::<Result<Vec<_>, SupplierError>>()?;

        let cache = Arc::new(TtlCache::new(config.cache.clone()));
        let engine = Arc::new(ComparisonEngine::with_deadline(
            suppliers.clone(),
            config.fetch_deadline(),
        ));
        let search = Arc::new(HotelSearchService::new(engine, cache.clone()));
        let health = Arc::new(HealthAggregator::with_timeout(
            suppliers,
            &config.probe_city,
            config.probe_timeout(),
        ));

        let mut state = Self::new(search, health);
        if config.mock_suppliers {
            state = state.with_mock_prefixes(&mock::DEMO_PREFIXES);
        }

        Ok((state, cache))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelQuery {
    pub city: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

/// GET /api/hotels
/// Deduplicated, cheapest-first offers for a city, optionally price-filtered
pub async fn search_hotels(
    State(state): State<AppState>,
    query: Result<Query<HotelQuery>, QueryRejection>,
) -> Result<Json<Vec<ResolvedOffer>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let request = SearchRequest::parse(
        query.city.as_deref(),
        query.min_price.as_deref(),
        query.max_price.as_deref(),
    )?;

    let hotels = state.search.search(&request).await?;
    Ok(Json(hotels))
}

/// GET /health
/// 200 when every supplier answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let aggregator = Arc::clone(&state.health);

    let snapshot = match tokio::spawn(async move { aggregator.check().await }).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(error = %e, "Health check failed");
            HealthSnapshot::all_unhealthy(state.health.supplier_names())
        }
    };

    let status = if snapshot.overall {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(snapshot.report()))
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    let mut endpoints = Map::new();
    endpoints.insert(
        "hotels".to_string(),
        json!("/api/hotels?city=<city>&minPrice=<min>&maxPrice=<max>"),
    );
    endpoints.insert("health".to_string(), json!("/health"));
    for prefix in &state.mock_prefixes {
        endpoints.insert(
            prefix.trim_start_matches('/').to_string(),
            json!(format!("{}/hotels", prefix)),
        );
    }

    Json(json!({
        "message": "Hotel Offer Orchestrator API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
    }))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Endpoint not found: {}", uri.path()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/hotels", get(search_hotels))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
}

// CORS and request tracing, applied last so nested upstream routes get them too
pub fn with_layers(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}
