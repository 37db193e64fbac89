// Health aggregation: probe every supplier concurrently, AND the answers

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::model::HealthSnapshot;
use crate::supplier::{SupplierGateway, DEFAULT_PROBE_TIMEOUT};

pub const DEFAULT_PROBE_CITY: &str = "delhi";

pub struct HealthAggregator {
    suppliers: Vec<Arc<dyn SupplierGateway>>,
    probe_city: String,
    probe_timeout: Duration,
}

impl HealthAggregator {
    pub fn new(suppliers: Vec<Arc<dyn SupplierGateway>>, probe_city: &str) -> Self {
        Self::with_timeout(suppliers, probe_city, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_timeout(
        suppliers: Vec<Arc<dyn SupplierGateway>>,
        probe_city: &str,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            suppliers,
            probe_city: probe_city.to_string(),
            probe_timeout,
        }
    }

    pub fn supplier_names(&self) -> Vec<&str> {
        self.suppliers.iter().map(|s| s.name()).collect()
    }

    // Probe all suppliers at once. A probe that fails, times out or panics counts as
    // unhealthy, and one unhealthy supplier makes the whole snapshot unhealthy.
    pub async fn check(&self) -> HealthSnapshot {
        let handles: Vec<_> = self
            .suppliers
            .iter()
            .map(|supplier| {
                let supplier = Arc::clone(supplier);
                let city = self.probe_city.clone();
                let timeout = self.probe_timeout;
                tokio::spawn(async move {
                    // Each probe gets its own deadline; running out counts as down
                    tokio::time::timeout(timeout, supplier.probe(&city))
                        .await
                        .unwrap_or(false)
                })
            })
            .collect();

        let probes = join_all(handles)
            .await
            .into_iter()
            .zip(&self.suppliers)
            .map(|(joined, supplier)| {
                let up = joined.unwrap_or_else(|e| {
                    error!(supplier = supplier.name(), error = %e, "Health probe task aborted");
                    false
                });
                if !up {
                    warn!(supplier = supplier.name(), "Supplier unhealthy");
                }
                (supplier.name().to_string(), up)
            });

        let snapshot = HealthSnapshot::from_probes(probes);
        info!(healthy = snapshot.overall, "Health check finished");
        snapshot
    }
}
