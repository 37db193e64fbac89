// Hotel search pipeline: validate, look up the cache, compare on a miss,
// store, then filter by price.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::cache::OfferCache;
use crate::comparison::ComparisonEngine;
use crate::filter::{self, PriceBounds};
use crate::model::ComparisonResult;

// Caller input rejected before any supplier is contacted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("City parameter is required")]
    MissingCity,

    #[error("Invalid {0} parameter")]
    InvalidNumber(&'static str),

    #[error("{0} cannot be negative")]
    NegativePrice(&'static str),

    #[error("minPrice cannot be greater than maxPrice")]
    MinAboveMax,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub city: String,
    pub bounds: PriceBounds,
}

impl SearchRequest {
    // Build a request from raw query values.
    //
    // Blank price values count as absent. Prices must parse as finite,
    // non-negative numbers and `minPrice` may not exceed `maxPrice`.
    pub fn parse(
        city: Option<&str>,
        min_price: Option<&str>,
        max_price: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let city = city
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ValidationError::MissingCity)?;

        let min_price = parse_price(min_price, "minPrice")?;
        let max_price = parse_price(max_price, "maxPrice")?;

        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(ValidationError::MinAboveMax);
            }
        }

        Ok(Self {
            city: city.to_string(),
            bounds: PriceBounds::new(min_price, max_price),
        })
    }
}

fn parse_price(raw: Option<&str>, param: &'static str) -> Result<Option<f64>, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let value: f64 = raw
        .parse()
        .map_err(|_| ValidationError::InvalidNumber(param))?;

    if !value.is_finite() {
        return Err(ValidationError::InvalidNumber(param));
    }
    if value < 0.0 {
        return Err(ValidationError::NegativePrice(param));
    }

    Ok(Some(value))
}

pub struct HotelSearchService {
    engine: Arc<ComparisonEngine>,
    cache: Arc<dyn OfferCache>,
}

impl HotelSearchService {
    pub fn new(engine: Arc<ComparisonEngine>, cache: Arc<dyn OfferCache>) -> Self {
        Self { engine, cache }
    }

    pub fn engine(&self) -> &Arc<ComparisonEngine> {
        &self.engine
    }

    // Cached result for the city, computing and storing it on a miss
    async fn resolve(&self, city: &str) -> Result<Arc<ComparisonResult>, ServiceError> {
        if let Some(cached) = self.cache.get(city) {
            info!(city, hotels = cached.len(), "Using cached results");
            return Ok(cached);
        }

        info!(city, "No cached results, running comparison");
        let engine = Arc::clone(&self.engine);
        let owned_city = city.to_string();
        let fresh = tokio::spawn(async move { engine.compare(&owned_city).await })
            .await
            .map_err(|e| {
                error!(city, error = %e, "Comparison task failed");
                ServiceError::Internal(format!("comparison for {} failed: {}", city, e))
            })?;

        self.cache.put(city, fresh.clone());
        Ok(Arc::new(fresh))
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<ComparisonResult, ServiceError> {
        let resolved = self.resolve(&request.city).await?;
        let filtered = filter::apply(&resolved, &request.bounds);

        info!(
            city = %request.city,
            min_price = ?request.bounds.min_price,
            max_price = ?request.bounds.max_price,
            total = resolved.len(),
            returned = filtered.len(),
            "Hotel search served"
        );
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, TtlCache};
    use crate::mock::{seed_supplier_a, seed_supplier_b, MockSupplier};
    use std::time::Duration;

    fn service_with(
        cache: Arc<dyn OfferCache>,
    ) -> (HotelSearchService, Arc<MockSupplier>, Arc<MockSupplier>) {
        let a = Arc::new(MockSupplier::new("Supplier A", seed_supplier_a()));
        let b = Arc::new(MockSupplier::new("Supplier B", seed_supplier_b()));
        let engine = Arc::new(ComparisonEngine::new(vec![a.clone(), b.clone()]));
        (HotelSearchService::new(engine, cache), a, b)
    }

    fn service() -> (HotelSearchService, Arc<MockSupplier>, Arc<MockSupplier>) {
        service_with(Arc::new(TtlCache::new(CacheConfig::default())))
    }

    #[test]
    fn test_parse_valid_request() {
        let request = SearchRequest::parse(Some("delhi"), Some("5000"), Some("8000.5")).unwrap();

        assert_eq!(request.city, "delhi");
        assert_eq!(request.bounds, PriceBounds::new(Some(5000.0), Some(8000.5)));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            SearchRequest::parse(None, None, None),
            Err(ValidationError::MissingCity)
        );
        assert_eq!(
            SearchRequest::parse(Some("   "), None, None),
            Err(ValidationError::MissingCity)
        );
        assert_eq!(
            SearchRequest::parse(Some("delhi"), Some("cheap"), None),
            Err(ValidationError::InvalidNumber("minPrice"))
        );
        assert_eq!(
            SearchRequest::parse(Some("delhi"), None, Some("NaN")),
            Err(ValidationError::InvalidNumber("maxPrice"))
        );
        assert_eq!(
            SearchRequest::parse(Some("delhi"), Some("-1"), None),
            Err(ValidationError::NegativePrice("minPrice"))
        );
        assert_eq!(
            SearchRequest::parse(Some("delhi"), Some("500"), Some("100")),
            Err(ValidationError::MinAboveMax)
        );
    }

    #[test]
    fn test_blank_prices_are_absent() {
        let request = SearchRequest::parse(Some("delhi"), Some(""), Some(" ")).unwrap();
        assert!(request.bounds.is_unbounded());
    }

    #[tokio::test]
    async fn test_second_search_is_served_from_cache() {
        let (service, a, b) = service();
        let request = SearchRequest::parse(Some("delhi"), None, None).unwrap();

        let first = service.search(&request).await.unwrap();
        let second = service.search(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(a.request_count(), 1);
        assert_eq!(b.request_count(), 1);
    }

    #[tokio::test]
    async fn test_city_case_shares_cache_entry() {
        let (service, a, _) = service();

        service
            .search(&SearchRequest::parse(Some("Delhi"), None, None).unwrap())
            .await
            .unwrap();
        service
            .search(&SearchRequest::parse(Some("DELHI"), None, None).unwrap())
            .await
            .unwrap();

        assert_eq!(a.request_count(), 1);
    }

    #[tokio::test]
    async fn test_filter_applies_to_cached_result_without_changing_it() {
        let (service, a, _) = service();

        let narrow = service
            .search(&SearchRequest::parse(Some("delhi"), Some("5900"), Some("8200")).unwrap())
            .await
            .unwrap();
        let names: Vec<_> = narrow.iter().map(|o| o.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["Radison", "ITC Maurya", "Taj Palace"]);

        let full = service
            .search(&SearchRequest::parse(Some("delhi"), None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(full.len(), 7);
        assert_eq!(a.request_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_new_comparison() {
        let (service, a, _) = service_with(Arc::new(TtlCache::with_ttl(Duration::from_millis(50))));
        let request = SearchRequest::parse(Some("mumbai"), None, None).unwrap();

        service.search(&request).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        service.search(&request).await.unwrap();

        assert_eq!(a.request_count(), 2);
    }

    #[tokio::test]
    async fn test_total_upstream_failure_is_empty() {
        let (service, a, b) = service();
        a.set_available(false);
        b.set_available(false);

        let result = service
            .search(&SearchRequest::parse(Some("delhi"), None, None).unwrap())
            .await
            .unwrap();

        assert!(result.is_empty());
    }
}
