// Price filter applied to a resolved comparison result

use crate::model::{ComparisonResult, ResolvedOffer};

// Inclusive price bounds; `None` leaves that side open
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceBounds {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl PriceBounds {
    pub fn new(min_price: Option<f64>, max_price: Option<f64>) -> Self {
        Self {
            min_price,
            max_price,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min_price.is_none() && self.max_price.is_none()
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min_price.map_or(true, |min| price >= min)
            && self.max_price.map_or(true, |max| price <= max)
    }
}

// Keep the offers whose price lies within `bounds`, in input order.
//
// The input is borrowed and never modified, so a cached result can be
// filtered directly.
pub fn apply(result: &[ResolvedOffer], bounds: &PriceBounds) -> ComparisonResult {
    result
        .iter()
        .filter(|offer| bounds.contains(offer.price))
        .cloned()
        .collect()
}
