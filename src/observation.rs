use serde::Serialize;

use crate::types::{GeographyKey, ProductKey, TimeKey};

/// One emitted fact: what a product sold in a geography in a week, with the
/// derived pricing and distribution figures the downstream schema wants.
/// Built by the allocator/smoother, value/unit/volume fields rescaled in
/// place by the share controller within the same period, immutable once the
/// batch is handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesObservation {
    pub geography_key: GeographyKey,
    pub product_key: ProductKey,
    pub time_key: TimeKey,
    pub value_sales: f64,
    pub unit_sales: f64,
    pub volume_sales: f64,
    /// Value sales net of the promotional uplift.
    pub base_value_sales: f64,
    pub base_unit_sales: f64,
    pub price_per_unit: f64,
    /// Promotional price-cut depth in [0, 0.4]; 0 when no promotion ran.
    pub promo_depth: f64,
    pub store_count: u32,
    pub stores_selling: u32,
}

/// Receives each period's observation batch, in period order. Persistence,
/// schema flattening and storage layout live behind this boundary, outside
/// the engine.
pub trait Sink {
    fn on_period(&mut self, period: TimeKey, batch: &[SalesObservation]);
}

/// Collects all batches in memory — the default sink for analysis and tests.
pub struct MemorySink {
    pub batches: Vec<(TimeKey, Vec<SalesObservation>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink { batches: Vec::new() }
    }

    pub fn observations(&self) -> impl Iterator<Item = &SalesObservation> {
        self.batches.iter().flat_map(|(_, batch)| batch.iter())
    }

    pub fn total_observations(&self) -> usize {
        self.batches.iter().map(|(_, batch)| batch.len()).sum()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for MemorySink {
    fn on_period(&mut self, period: TimeKey, batch: &[SalesObservation]) {
        self.batches.push((period, batch.to_vec()));
    }
}
