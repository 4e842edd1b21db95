use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::allocator::HierarchicalAllocator;
use crate::catalog::{ConfigError, GeographyTree, ProductCatalog};
use crate::config::{HIERARCHY_RATIO, SimulationConfig};
use crate::observation::{SalesObservation, Sink};
use crate::pricing::PriceElasticityModel;
use crate::seasonal;
use crate::share::{MarketShareController, ShareOutcome};
use crate::smoother::TemporalSmoother;
use crate::story::BrandStoryBook;
use crate::types::{ProductKey, TimeKey};

/// Below this seasonal multiplier a product is deep off-season; most weeks it
/// is omitted entirely (the dataset is sparse by design).
const DEEP_OFF_SEASON: f64 = 0.2;
/// Fraction of deep off-season (product, week) pairs that are still kept.
const OFF_SEASON_KEEP_RATE: f64 = 0.1;
/// Raw allocations below this are dropped rather than emitted.
const MIN_RAW_VALUE: f64 = 0.1;
/// Chance a (geography, product, week) runs a promotional price cut.
const PROMO_RATE: f64 = 0.3;
const PROMO_DEPTH_MAX: f64 = 0.4;

/// Drives the weekly loop: seasonal gating, hierarchical allocation, temporal
/// smoothing, price/unit/volume derivation, then one share-controller pass
/// per period before the batch is handed to the sink. Periods advance in
/// strictly increasing order — the smoother's AR state for week t needs week
/// t−1 — so the loop is sequential by construction.
pub struct Simulation {
    rng: ChaCha20Rng,
    periods: Vec<TimeKey>,
    tree: GeographyTree,
    catalog: ProductCatalog,
    sampled: Vec<ProductKey>,
    allocator: HierarchicalAllocator,
    smoother: TemporalSmoother,
    pricing: PriceElasticityModel,
    controller: MarketShareController,
    /// One entry per processed period, in order.
    pub share_log: Vec<ShareOutcome>,
}

impl Simulation {
    /// Validate the configured world and build the engine. Fails fast on
    /// configuration errors — nothing has been emitted at that point.
    pub fn from_config(config: SimulationConfig) -> Result<Self, ConfigError> {
        if config.n_weeks == 0 {
            return Err(ConfigError::EmptyPeriodSequence);
        }
        let periods = TimeKey::sequence(config.start, config.n_weeks);
        let tree = GeographyTree::new(config.geography)?;
        let catalog = ProductCatalog::new(config.products)?;

        let mut rng = ChaCha20Rng::seed_from_u64(config.seed);

        // Draw the product sample up front (first RNG consumer, so the
        // sample is part of the seeded, reproducible state). The designated
        // brand is always included — the share controller needs it present.
        let all_keys: Vec<ProductKey> = catalog.iter().map(|p| p.key).collect();
        let mut sampled: Vec<ProductKey> = if config.sample_size >= all_keys.len() {
            all_keys
        } else {
            rand::seq::index::sample(&mut rng, all_keys.len(), config.sample_size)
                .iter()
                .map(|i| all_keys[i])
                .collect()
        };
        for key in catalog.keys_matching_brand(&config.designated_brand) {
            if !sampled.contains(&key) {
                sampled.push(key);
            }
        }
        sampled.sort();

        let controller = MarketShareController::new(
            &catalog,
            &config.designated_brand,
            config.share_band,
            config.epoch,
        );

        Ok(Simulation {
            rng,
            periods,
            tree,
            catalog,
            sampled,
            allocator: HierarchicalAllocator::new(HIERARCHY_RATIO),
            smoother: TemporalSmoother::new(BrandStoryBook::canonical(config.epoch)),
            pricing: PriceElasticityModel::new(config.standard_elasticity),
            controller,
            share_log: Vec::new(),
        })
    }

    pub fn periods(&self) -> &[TimeKey] {
        &self.periods
    }

    pub fn sampled_products(&self) -> &[ProductKey] {
        &self.sampled
    }

    pub fn controller(&self) -> &MarketShareController {
        &self.controller
    }

    /// Run every configured period, emitting one batch per period to `sink`.
    pub fn run(&mut self, sink: &mut impl Sink) {
        let sampled = self.sampled.clone();
        for i in 0..self.periods.len() {
            let period = self.periods[i];
            let week = period.week_of_year();
            let mut batch: Vec<SalesObservation> = Vec::new();

            for &product_key in &sampled {
                let Some(product) = self.catalog.get(product_key) else { continue };

                let multiplier = seasonal::multiplier(product.seasonal, week, &mut self.rng);
                if multiplier < DEEP_OFF_SEASON
                    && self.rng.random::<f64>() > OFF_SEASON_KEEP_RATE
                {
                    continue;
                }

                let allocations = self.allocator.allocate(&self.tree, multiplier, &mut self.rng);
                for (geo, raw) in allocations {
                    if raw < MIN_RAW_VALUE {
                        continue;
                    }

                    let value = self.smoother.smooth(geo, product, period, raw, &mut self.rng);
                    let price = self.pricing.shelf_price(product.tier, &mut self.rng);

                    let promo_depth = if self.rng.random::<f64>() < PROMO_RATE {
                        self.rng.random_range(0.0..PROMO_DEPTH_MAX)
                    } else {
                        0.0
                    };
                    let base_units = value / price;
                    let units = if promo_depth > 0.0 {
                        self.pricing.volume_after_price_change(
                            base_units,
                            -(promo_depth * 100.0),
                            product.tier,
                            &mut self.rng,
                        )
                    } else {
                        base_units
                    };
                    let volume = units * self.rng.random_range(0.1..2.0);
                    let store_count = self.rng.random_range(10..500u32);
                    let stores_selling = self.rng.random_range(5..450u32).min(store_count);

                    batch.push(SalesObservation {
                        geography_key: geo,
                        product_key,
                        time_key: period,
                        value_sales: value,
                        unit_sales: units,
                        volume_sales: volume,
                        base_value_sales: value * (1.0 - promo_depth),
                        base_unit_sales: units * (1.0 - promo_depth),
                        price_per_unit: price,
                        promo_depth,
                        store_count,
                        stores_selling,
                    });
                }
            }

            let outcome = self.controller.rebalance(&mut batch, period, &mut self.rng);
            self.share_log.push(outcome);
            sink.on_period(period, &batch);

            if week == TimeKey::WEEKS_PER_YEAR {
                eprintln!("Year {} complete", period.year());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::catalog::{GeographyNode, PriceTier, Product, SeasonalCategory};
    use crate::config::ShareBandConfig;
    use crate::observation::MemorySink;
    use crate::types::GeographyKey;

    fn product(key: u32, brand: &str, seasonal: SeasonalCategory) -> Product {
        Product {
            key: ProductKey(key),
            description: format!("{brand} 100G"),
            category: "CONFECTIONERY".to_string(),
            segment: "BLOCKS & TABLETS".to_string(),
            subsegment: "MILK".to_string(),
            brand: brand.to_string(),
            manufacturer: "TESTCO".to_string(),
            seasonal,
            tier: PriceTier::Standard,
        }
    }

    fn minimal_config(start: TimeKey, n_weeks: usize) -> SimulationConfig {
        SimulationConfig {
            seed: 42,
            start,
            n_weeks,
            epoch: TimeKey(2201),
            sample_size: 100,
            designated_brand: "BIG BITE".to_string(),
            share_band: ShareBandConfig::canonical(),
            standard_elasticity: (-1.2, -0.8),
            geography: vec![
                GeographyNode::new(1, "All Outlets", None, 0),
                GeographyNode::new(10, "Tesco", Some(1), 1),
                GeographyNode::new(11, "Waitrose", Some(1), 1),
                GeographyNode::new(20, "Tesco Online", Some(10), 2),
            ],
            products: vec![
                product(1, "BIG BITE ORIGINAL", SeasonalCategory::None),
                product(2, "GALAXY", SeasonalCategory::None),
                product(3, "KITKAT", SeasonalCategory::None),
            ],
        }
    }

    fn run_sim(config: SimulationConfig) -> (Simulation, MemorySink) {
        let mut sim = Simulation::from_config(config).expect("valid config");
        let mut sink = MemorySink::new();
        sim.run(&mut sink);
        (sim, sink)
    }

    // ── Configuration validation ──────────────────────────────────────────────

    #[test]
    fn empty_period_sequence_is_fatal() {
        let config = minimal_config(TimeKey(2201), 0);
        assert_eq!(
            Simulation::from_config(config).err().unwrap(),
            ConfigError::EmptyPeriodSequence
        );
    }

    #[test]
    fn empty_catalog_is_fatal() {
        let mut config = minimal_config(TimeKey(2201), 4);
        config.products.clear();
        assert_eq!(Simulation::from_config(config).err().unwrap(), ConfigError::EmptyCatalog);
    }

    #[test]
    fn missing_root_geography_is_fatal() {
        let mut config = minimal_config(TimeKey(2201), 4);
        config.geography.retain(|n| n.hierarchy_level != 0);
        assert!(matches!(
            Simulation::from_config(config),
            Err(ConfigError::MissingRootGeography)
        ));
    }

    #[test]
    fn designated_brand_is_always_sampled() {
        let mut config = minimal_config(TimeKey(2201), 4);
        config.sample_size = 1;
        let sim = Simulation::from_config(config).unwrap();
        assert!(
            sim.sampled_products().contains(&ProductKey(1)),
            "the steered brand must be in every sample"
        );
    }

    // ── Period loop ───────────────────────────────────────────────────────────

    #[test]
    fn one_batch_per_period_in_order() {
        let (sim, sink) = run_sim(minimal_config(TimeKey(2249), 8));
        assert_eq!(sink.batches.len(), 8);
        assert_eq!(sim.share_log.len(), 8);
        let periods: Vec<TimeKey> = sink.batches.iter().map(|(p, _)| *p).collect();
        let mut sorted = periods.clone();
        sorted.sort();
        assert_eq!(periods, sorted, "batches must arrive in period order");
        assert_eq!(periods[3], TimeKey(2252));
        assert_eq!(periods[4], TimeKey(2301), "loop must roll into the next year");
    }

    #[test]
    fn observations_carry_the_batch_period() {
        let (_, sink) = run_sim(minimal_config(TimeKey(2201), 3));
        for (period, batch) in &sink.batches {
            assert!(!batch.is_empty(), "plain products should sell every week");
            for obs in batch {
                assert_eq!(obs.time_key, *period);
            }
        }
    }

    #[test]
    fn every_observation_is_well_formed() {
        let (_, sink) = run_sim(minimal_config(TimeKey(2201), 6));
        for obs in sink.observations() {
            assert!(obs.value_sales >= 0.0);
            assert!(obs.unit_sales >= 0.0);
            assert!(obs.volume_sales >= 0.0);
            assert!(obs.price_per_unit > 0.0);
            assert!((0.0..PROMO_DEPTH_MAX).contains(&obs.promo_depth));
            assert!(obs.base_value_sales <= obs.value_sales + 1e-9);
            assert!(obs.stores_selling <= obs.store_count);
        }
    }

    #[test]
    fn promo_rows_discount_the_base_fields() {
        let (_, sink) = run_sim(minimal_config(TimeKey(2201), 10));
        let promo_rows: Vec<_> =
            sink.observations().filter(|o| o.promo_depth > 0.0).collect();
        assert!(!promo_rows.is_empty(), "with a 30 % promo rate some rows must promote");
        for obs in promo_rows {
            let expected = obs.value_sales * (1.0 - obs.promo_depth);
            assert!((obs.base_value_sales - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn same_seed_produces_identical_output() {
        let run = || run_sim(minimal_config(TimeKey(2201), 12)).1;
        let a = run();
        let b = run();
        assert_eq!(a.batches, b.batches, "same seed must produce identical batches");
    }

    #[test]
    fn different_seeds_diverge() {
        let mut config = minimal_config(TimeKey(2201), 4);
        config.seed = 43;
        let (_, a) = run_sim(minimal_config(TimeKey(2201), 4));
        let (_, b) = run_sim(config);
        assert_ne!(a.batches, b.batches);
    }

    // ── Sparsity ──────────────────────────────────────────────────────────────

    #[test]
    fn deep_off_season_product_is_mostly_absent() {
        let mut config = minimal_config(TimeKey(2220), 10);
        config.products.push(product(4, "ADVENT CALENDAR", SeasonalCategory::Christmas));
        let (_, sink) = run_sim(config);

        // Weeks 20–29: the Christmas line is deep off-season (multiplier
        // 0.1 < 0.2), so roughly 90 % of its weeks are skipped entirely.
        let present: usize = sink
            .batches
            .iter()
            .filter(|(_, batch)| batch.iter().any(|o| o.product_key == ProductKey(4)))
            .count();
        assert!(
            present <= 4,
            "deep off-season product appeared in {present}/10 weeks, expected mostly absent"
        );
        // Plain products are unaffected by the skip roll.
        for (_, batch) in &sink.batches {
            assert!(batch.iter().any(|o| o.product_key == ProductKey(2)));
        }
    }

    // ── Share steering ────────────────────────────────────────────────────────

    #[test]
    fn share_controller_runs_once_per_period_and_lands_in_band() {
        let (sim, sink) = run_sim(minimal_config(TimeKey(2201), 16));
        assert_eq!(sim.share_log.len(), sink.batches.len());
        for ((_, batch), outcome) in sink.batches.iter().zip(&sim.share_log) {
            let share = sim.controller().current_share_pct(batch);
            if outcome.rescaled {
                assert!(
                    share >= outcome.band.min_pct - 1e-9 && share <= outcome.band.max_pct + 1e-9,
                    "period share {share:.2} % outside [{:.2}, {:.2}]",
                    outcome.band.min_pct,
                    outcome.band.max_pct
                );
            }
        }
    }

    // ── End-to-end scenario ───────────────────────────────────────────────────

    #[test]
    fn christmas_scenario_populates_window_and_respects_hierarchy() {
        // 1 root + 2 level-1 stores (premium and major) + 1 level-2 child of
        // the premium store; a single Christmas product; weeks 40–52 so the
        // run covers the off-season tail and the full window.
        let config = SimulationConfig {
            seed: 7,
            start: TimeKey(2240),
            n_weeks: 13,
            epoch: TimeKey(2201),
            sample_size: 10,
            designated_brand: "BIG BITE".to_string(),
            share_band: ShareBandConfig::canonical(),
            standard_elasticity: (-1.2, -0.8),
            geography: vec![
                GeographyNode::new(1, "All Outlets", None, 0),
                GeographyNode::new(10, "Waitrose", Some(1), 1),
                GeographyNode::new(11, "Morrisons", Some(1), 1),
                GeographyNode::new(20, "Waitrose Online", Some(10), 2),
            ],
            products: vec![product(1, "ADVENT CALENDAR", SeasonalCategory::Christmas)],
        };
        let (sim, sink) = run_sim(config);

        // Root-level series, week by week.
        let mut root_by_week: HashMap<u32, f64> = HashMap::new();
        for obs in sink.observations() {
            if obs.geography_key == GeographyKey(1) {
                root_by_week.insert(obs.time_key.week_of_year(), obs.value_sales);
            }
        }
        // In-window weeks are never skipped (multiplier ≥ 2.0)...
        for week in 44..=52 {
            assert!(root_by_week.contains_key(&week), "window week {week} missing");
        }
        // ...while the off-season run-in survives the 90 % skip roll rarely.
        let off_season = (40..=43).filter(|w| root_by_week.contains_key(w)).count();
        assert!(
            off_season <= 2,
            "off-season weeks 40–43 appeared {off_season} times, expected mostly absent"
        );

        // Parent dominates child at every level, every period.
        for (_, batch) in &sink.batches {
            let value = |key: u32| {
                batch
                    .iter()
                    .find(|o| o.geography_key == GeographyKey(key))
                    .map(|o| o.value_sales)
            };
            if let (Some(parent), Some(child)) = (value(10), value(20)) {
                assert!(parent > child, "Waitrose {parent:.1} ≤ its online child {child:.1}");
            }
            if let (Some(root), Some(l1)) = (value(1), value(10)) {
                assert!(root > l1, "root {root:.1} ≤ level-1 store {l1:.1}");
            }
        }

        // Every populated series has exactly one history slot, stamped with
        // the final period it was observed in.
        let history = sim.smoother.history();
        assert_eq!(history.len(), 4);
        let (last, _) = history.get(GeographyKey(1), ProductKey(1)).unwrap();
        assert_eq!(last, TimeKey(2252));
    }
}
