// Supplier gateway: the uniform fetch/probe contract over one upstream offer source

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{RawOffer, SupplierResult};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

// Failure modes of a single upstream call. Never leaves the gateway: it is folded into
// `SupplierResult::error_detail` or a `false` probe.
#[derive(Error, Debug)]
pub enum SupplierError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Client error: {0}")]
    Client(String),
}

// Contract every supplier source implements.
//
// Neither call may fail: `fetch` reports problems through
// `SupplierResult::succeeded`, `probe` through its boolean.
#[async_trait]
pub trait SupplierGateway: Send + Sync + 'static {
    fn name(&self) -> &str;

    // Offers for a city. Failure yields `succeeded = false` and no offers.
    async fn fetch(&self, city: &str) -> SupplierResult;

    // Can the supplier answer right now? Content is discarded.
    async fn probe(&self, city: &str) -> bool;
}

// Gateway over an HTTP upstream answering `GET <url>?city=<city>` with a JSON
// array of offers.
pub struct HttpSupplier {
    name: String,
    url: String,
    client: Client,
    fetch_timeout: Duration,
    probe_timeout: Duration,
}

impl HttpSupplier {
    pub fn new(name: &str, url: &str) -> Result<Self, SupplierError> {
        Self::with_timeouts(name, url, DEFAULT_FETCH_TIMEOUT, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_timeouts(
        name: &str,
        url: &str,
        fetch_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, SupplierError> {
        let client = Client::builder()
            .user_agent(concat!("hotel-offer-orchestrator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SupplierError::Client(e.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            client,
            fetch_timeout,
            probe_timeout,
        })
    }

    async fn send(&self, city: &str) -> Result<reqwest::Response, SupplierError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("city", city)])
            .send()
            .await
            .map_err(|e| SupplierError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SupplierError::Status(response.status().as_u16()));
        }

        Ok(response)
    }

    async fn fetch_offers(&self, city: &str) -> Result<Vec<RawOffer>, SupplierError> {
        // The deadline covers the body read, not just the headers
        let call = async {
            let body = self
                .send(city)
                .await?
                .text()
                .await
                .map_err(|e| SupplierError::Network(e.to_string()))?;

            serde_json::from_str::<Vec<RawOffer>>(&body)
                .map_err(|e| SupplierError::Decode(e.to_string()))
        };

        tokio::time::timeout(self.fetch_timeout, call)
            .await
            .map_err(|_| SupplierError::Timeout(self.fetch_timeout.as_millis() as u64))?
    }
}

// Offers with a non-positive or non-finite price cannot take part in price resolution
fn retain_priced(supplier: &str, offers: Vec<RawOffer>) -> Vec<RawOffer> {
    offers
        .into_iter()
        .filter(|offer| {
            let valid = offer.price.is_finite() && offer.price > 0.0;
            if !valid {
                warn!(supplier, hotel_id = %offer.hotel_id, price = offer.price, "Dropping offer with invalid price");
            }
            valid
        })
        .collect()
}

#[async_trait]
impl SupplierGateway for HttpSupplier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, city: &str) -> SupplierResult {
        match self.fetch_offers(city).await {
            Ok(offers) => {
                let offers = retain_priced(&self.name, offers);
                debug!(supplier = %self.name, city, count = offers.len(), "Supplier fetch succeeded");
                SupplierResult::success(&self.name, offers)
            }
            Err(err) => {
                warn!(supplier = %self.name, city, error = %err, "Supplier fetch failed");
                SupplierResult::failure(&self.name, err.to_string())
            }
        }
    }

    async fn probe(&self, city: &str) -> bool {
        match tokio::time::timeout(self.probe_timeout, self.send(city)).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                debug!(supplier = %self.name, error = %err, "Supplier probe failed");
                false
            }
            Err(_) => {
                debug!(supplier = %self.name, timeout_ms = self.probe_timeout.as_millis() as u64, "Supplier probe timed out");
                false
            }
        }
    }
}
