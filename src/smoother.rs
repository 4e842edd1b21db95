use std::collections::HashMap;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::catalog::Product;
use crate::story::BrandStoryBook;
use crate::types::{GeographyKey, ProductKey, TimeKey};

/// Per-series memory: the most recently computed smoothed value and the
/// period it belongs to. Owned exclusively by the smoother and touched only
/// through `get`/`update`, so the orchestrator's period loop is the sole
/// thing imposing write order.
pub struct SeriesHistory {
    entries: HashMap<(GeographyKey, ProductKey), (TimeKey, f64)>,
}

impl SeriesHistory {
    pub fn new() -> Self {
        SeriesHistory { entries: HashMap::new() }
    }

    pub fn get(&self, geo: GeographyKey, product: ProductKey) -> Option<(TimeKey, f64)> {
        self.entries.get(&(geo, product)).copied()
    }

    pub fn update(&mut self, geo: GeographyKey, product: ProductKey, period: TimeKey, value: f64) {
        self.entries.insert((geo, product), (period, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SeriesHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Weight on the AR candidate vs the fresh trended draw. The heavy history
/// weighting is what turns independent weekly draws into autocorrelated
/// series.
const HISTORY_BLEND: f64 = 0.85;
const PERSISTENCE_MIN: f64 = 0.97;
const PERSISTENCE_MAX: f64 = 1.03;
/// AR noise std as a fraction of the previous value.
const NOISE_FRACTION: f64 = 0.005;
const FIRST_OBS_JITTER_MIN: f64 = 0.98;
const FIRST_OBS_JITTER_MAX: f64 = 1.02;

/// Applies brand trends and AR(1)-style smoothing to each (geography,
/// product) series. Stateful: feed it periods in strictly increasing order.
pub struct TemporalSmoother {
    history: SeriesHistory,
    stories: BrandStoryBook,
}

impl TemporalSmoother {
    pub fn new(stories: BrandStoryBook) -> Self {
        TemporalSmoother { history: SeriesHistory::new(), stories }
    }

    /// Smooth one series observation. The raw allocation is trended by the
    /// product's brand story, then blended 85/15 against the previous week's
    /// value when the series was observed last week; after a gap (or on first
    /// observation) the series restarts from the trended value with a small
    /// jitter. The result is floored at zero and stored as the new history.
    pub fn smooth(
        &mut self,
        geo: GeographyKey,
        product: &Product,
        period: TimeKey,
        raw_value: f64,
        rng: &mut impl Rng,
    ) -> f64 {
        let trend = self.stories.trend_multiplier(&product.manufacturer, period, rng)
            * self.stories.lifecycle_multiplier(&product.manufacturer, &product.brand, period);
        let trended = raw_value * trend;

        let value = match self.history.get(geo, product.key) {
            Some((last_period, prev)) if last_period == period.prev() => {
                let beta = rng.random_range(PERSISTENCE_MIN..PERSISTENCE_MAX);
                let noise = Normal::new(0.0, prev * NOISE_FRACTION)
                    .expect("invalid AR noise params")
                    .sample(rng);
                let candidate = beta * prev + noise;
                HISTORY_BLEND * candidate + (1.0 - HISTORY_BLEND) * trended
            }
            _ => trended * rng.random_range(FIRST_OBS_JITTER_MIN..FIRST_OBS_JITTER_MAX),
        };

        let value = value.max(0.0);
        self.history.update(geo, product.key, period, value);
        value
    }

    pub fn history(&self) -> &SeriesHistory {
        &self.history
    }
}
