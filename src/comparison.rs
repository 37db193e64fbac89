// Comparison engine: concurrent supplier fan-out, deduplication and price resolution.
//
// Offers from all succeeding suppliers are folded in supplier configuration order,
// then in each supplier's own offer order. Hotels are matched by exact name,
// ignoring case. A later offer replaces the stored one only when it is strictly
// cheaper, so on equal prices the first supplier in configuration order wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::model::{ComparisonResult, ResolvedOffer, SupplierResult};
use crate::supplier::{SupplierGateway, DEFAULT_FETCH_TIMEOUT};

pub struct ComparisonEngine {
    suppliers: Vec<Arc<dyn SupplierGateway>>,
    // Upper bound on one supplier's whole fetch, retries included
    fetch_deadline: Duration,
}

impl ComparisonEngine {
    pub fn new(suppliers: Vec<Arc<dyn SupplierGateway>>) -> Self {
        Self::with_deadline(suppliers, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_deadline(
        suppliers: Vec<Arc<dyn SupplierGateway>>,
        fetch_deadline: Duration,
    ) -> Self {
        Self {
            suppliers,
            fetch_deadline,
        }
    }

    pub fn supplier_names(&self) -> Vec<&str> {
        self.suppliers.iter().map(|s| s.name()).collect()
    }

    // Fetch from every supplier at once and wait for all of them.
    //
    // Results come back in configuration order. A gateway task that panics or
    // overruns `fetch_deadline` is reported as a failed result for that supplier.
    pub async fn fetch_all(&self, city: &str) -> Vec<SupplierResult> {
        let handles: Vec<_> = self
            .suppliers
            .iter()
            .map(|supplier| {
                let supplier = Arc::clone(supplier);
                let city = city.to_string();
                let deadline = self.fetch_deadline;
                tokio::spawn(async move {
                    match tokio::time::timeout(deadline, supplier.fetch(&city)).await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!(
                                supplier = supplier.name(),
                                deadline_ms = deadline.as_millis() as u64,
                                "Supplier fetch exceeded deadline"
                            );
                            SupplierResult::failure(
                                supplier.name(),
                                format!("Supplier timed out after {}ms", deadline.as_millis()),
                            )
                        }
                    }
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(&self.suppliers)
            .map(|(joined, supplier)| {
                joined.unwrap_or_else(|e| {
                    error!(supplier = supplier.name(), error = %e, "Supplier task aborted");
                    SupplierResult::failure(supplier.name(), format!("Supplier task failed: {}", e))
                })
            })
            .collect()
    }

    pub async fn compare(&self, city: &str) -> ComparisonResult {
        info!(city, suppliers = self.suppliers.len(), "Starting hotel comparison");

        let results = self.fetch_all(city).await;
        for result in &results {
            info!(
                supplier = %result.supplier_name,
                succeeded = result.succeeded,
                offers = result.offers.len(),
                "Supplier responded"
            );
        }

        let resolved = resolve_offers(&results);
        info!(city, hotels = resolved.len(), "Comparison finished");
        resolved
    }
}

// Deduplicate and price-resolve supplier results.
//
// Failed results contribute nothing. The output is sorted ascending by price
// with a stable sort, so equal prices keep first-seen order.
pub fn resolve_offers(results: &[SupplierResult]) -> ComparisonResult {
    let mut resolved: Vec<ResolvedOffer> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    let pairs = results
        .iter()
        .filter(|result| result.succeeded)
        .flat_map(|result| {
            result
                .offers
                .iter()
                .map(move |offer| (offer, result.supplier_name.as_str()))
        });

    for (offer, supplier) in pairs {
        let key = ResolvedOffer::identity_key(&offer.name);

        match index_by_key.get(&key) {
            None => {
                index_by_key.insert(key, resolved.len());
                resolved.push(ResolvedOffer::from_raw(offer, supplier));
            }
            Some(&idx) => {
                let existing = &mut resolved[idx];
                if offer.price < existing.price {
                    debug!(
                        hotel = %offer.name,
                        supplier,
                        price = offer.price,
                        previous_supplier = %existing.won_by_supplier,
                        previous_price = existing.price,
                        "Better price found"
                    );
                    *existing = ResolvedOffer::from_raw(offer, supplier);
                }
            }
        }
    }

    resolved.sort_by(|a, b| a.price.total_cmp(&b.price));
    resolved
}
