// Hotel offer orchestrator
//
// Fans a city search out to every configured supplier, keeps the cheapest offer per hotel,
// caches the sorted result per city and serves it (price-filtered) over HTTP.

pub mod api;
pub mod cache;
pub mod comparison;
pub mod config;
pub mod filter;
pub mod health;
pub mod mock;
pub mod model;
pub mod retry;
pub mod service;
pub mod supplier;

// Re-export key types for convenience
pub use api::{ApiError, AppState};
pub use cache::{CacheConfig, CacheStats, OfferCache, TtlCache};
pub use comparison::{resolve_offers, ComparisonEngine};
pub use config::{AppConfig, ConfigError, SupplierConfig};
pub use filter::PriceBounds;
pub use health::HealthAggregator;
pub use mock::MockSupplier;
pub use model::{
    ComparisonResult, HealthReport, HealthSnapshot, HealthStatus, RawOffer, ResolvedOffer,
    SupplierResult,
};
pub use retry::{RetryConfig, RetryingSupplier};
pub use service::{HotelSearchService, SearchRequest, ServiceError, ValidationError};
pub use supplier::{HttpSupplier, SupplierError, SupplierGateway};
