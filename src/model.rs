// Core data types shared by the supplier, comparison and health layers

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// A single offer as reported by one supplier. `hotel_id` is only unique within that supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOffer {
    pub hotel_id: String,
    pub name: String,
    pub price: f64,
    pub city: String,
    pub commission_pct: f64,
}

impl RawOffer {
    pub fn new(hotel_id: &str, name: &str, price: f64, city: &str, commission_pct: f64) -> Self {
        Self {
            hotel_id: hotel_id.to_string(),
            name: name.to_string(),
            price,
            city: city.to_string(),
            commission_pct,
        }
    }
}

// Outcome of one fetch against one supplier
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierResult {
    pub supplier_name: String,
    pub offers: Vec<RawOffer>,
    pub succeeded: bool,
    pub error_detail: Option<String>,
}

impl SupplierResult {
    pub fn success(supplier_name: &str, offers: Vec<RawOffer>) -> Self {
        Self {
            supplier_name: supplier_name.to_string(),
            offers,
            succeeded: true,
            error_detail: None,
        }
    }

    pub fn failure(supplier_name: &str, detail: impl Into<String>) -> Self {
        Self {
            supplier_name: supplier_name.to_string(),
            offers: Vec::new(),
            succeeded: false,
            error_detail: Some(detail.into()),
        }
    }
}

// The cheapest observed offer for one hotel after deduplication.
//
// Serialized in the shape returned by the query endpoint:
// `{ "name", "price", "supplier", "commissionPct" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOffer {
    #[serde(rename = "name")]
    pub canonical_name: String,
    pub price: f64,
    #[serde(rename = "supplier")]
    pub won_by_supplier: String,
    #[serde(rename = "commissionPct")]
    pub commission_pct: f64,
}

impl ResolvedOffer {
    pub fn from_raw(offer: &RawOffer, supplier: &str) -> Self {
        Self {
            canonical_name: offer.name.clone(),
            price: offer.price,
            won_by_supplier: supplier.to_string(),
            commission_pct: offer.commission_pct,
        }
    }

    // Dedup identity: exact name match, case-insensitive
    pub fn identity_key(name: &str) -> String {
        name.to_lowercase()
    }
}

// Sorted ascending by price, at most one entry per identity key
pub type ComparisonResult = Vec<ResolvedOffer>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl From<bool> for HealthStatus {
    fn from(up: bool) -> Self {
        if up {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

// Point-in-time reachability of every configured supplier.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    pub per_supplier: BTreeMap<String, bool>,
    pub overall: bool,
    pub observed_at: DateTime<Utc>,
}

impl HealthSnapshot {
    pub fn from_probes<I>(probes: I) -> Self
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        let per_supplier: BTreeMap<String, bool> = probes.into_iter().collect();
        let overall = per_supplier.values().all(|up| *up);

        Self {
            per_supplier,
            overall,
            observed_at: Utc::now(),
        }
    }

    // Reported when the check itself faulted: every supplier is marked down
    pub fn all_unhealthy<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::from_probes(names.into_iter().map(|name| (name.to_string(), false)))
    }

    pub fn status(&self) -> HealthStatus {
        self.overall.into()
    }

    pub fn report(&self) -> HealthReport {
        HealthReport {
            status: self.status(),
            suppliers: self
                .per_supplier
                .iter()
                .map(|(name, up)| (name.clone(), HealthStatus::from(*up)))
                .collect(),
            timestamp: self.observed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

// Wire shape of the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub suppliers: BTreeMap<String, HealthStatus>,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_offer_reads_supplier_json() {
        let json = r#"{"hotelId":"a1","name":"Holtin","price":6000,"city":"delhi","commissionPct":10}"#;
        let offer: RawOffer = serde_json::from_str(json).unwrap();

        assert_eq!(offer, RawOffer::new("a1", "Holtin", 6000.0, "delhi", 10.0));
    }

    #[test]
    fn test_resolved_offer_wire_shape() {
        let offer = RawOffer::new("b1", "Holtin", 5340.0, "delhi", 20.0);
        let value = serde_json::to_value(ResolvedOffer::from_raw(&offer, "Supplier B")).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "name": "Holtin",
                "price": 5340.0,
                "supplier": "Supplier B",
                "commissionPct": 20.0
            })
        );
    }

    #[test]
    fn test_snapshot_is_and_of_probes() {
        let healthy = HealthSnapshot::from_probes(vec![
            ("Supplier A".to_string(), true),
            ("Supplier B".to_string(), true),
        ]);
        assert!(healthy.overall);

        let degraded = HealthSnapshot::from_probes(vec![
            ("Supplier A".to_string(), true),
            ("Supplier B".to_string(), false),
        ]);
        assert!(!degraded.overall);
        assert_eq!(degraded.status(), HealthStatus::Unhealthy);

        let report = degraded.report();
        assert_eq!(report.suppliers["Supplier A"], HealthStatus::Healthy);
        assert_eq!(report.suppliers["Supplier B"], HealthStatus::Unhealthy);
        assert!(report.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_all_unhealthy_snapshot() {
        let snapshot = HealthSnapshot::all_unhealthy(["Supplier A", "Supplier B"]);

        assert!(!snapshot.overall);
        assert!(snapshot.per_supplier.values().all(|up| !up));
        assert_eq!(
            serde_json::to_value(snapshot.report()).unwrap()["status"],
            "unhealthy"
        );
    }
}
