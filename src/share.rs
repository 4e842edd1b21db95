use std::collections::HashSet;

use rand::Rng;

use crate::catalog::ProductCatalog;
use crate::config::ShareBandConfig;
use crate::observation::SalesObservation;
use crate::types::{ProductKey, TimeKey};

/// The acceptable share range for one period, in percent of total value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareBand {
    pub min_pct: f64,
    pub max_pct: f64,
}

/// What the controller did to a period batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareOutcome {
    pub band: ShareBand,
    pub share_before_pct: f64,
    pub share_after_pct: f64,
    pub rescaled: bool,
}

/// Steers the designated brand's share of period value into a band that
/// drifts upward over the simulated years. Runs exactly once per period,
/// after all observations exist, and rescales only the brand's own rows —
/// the rest of the market is left untouched, so the period total shifts
/// slightly by design.
pub struct MarketShareController {
    brand_keys: HashSet<ProductKey>,
    band: ShareBandConfig,
    epoch: TimeKey,
}

impl MarketShareController {
    pub fn new(
        catalog: &ProductCatalog,
        designated_brand: &str,
        band: ShareBandConfig,
        epoch: TimeKey,
    ) -> Self {
        MarketShareController {
            brand_keys: catalog.keys_matching_brand(designated_brand),
            band,
            epoch,
        }
    }

    pub fn is_brand_product(&self, key: ProductKey) -> bool {
        self.brand_keys.contains(&key)
    }

    /// The period's target band: both edges grow linearly with elapsed years
    /// and cap at their ceilings.
    pub fn band_for(&self, period: TimeKey) -> ShareBand {
        let years = period.years_since(self.epoch).max(0.0);
        ShareBand {
            min_pct: (self.band.base_min_pct + self.band.min_growth_pct_per_year * years)
                .min(self.band.min_ceiling_pct),
            max_pct: (self.band.base_max_pct + self.band.max_growth_pct_per_year * years)
                .min(self.band.max_ceiling_pct),
        }
    }

    /// Brand share of total value sales in percent. Zero for an empty or
    /// zero-value batch.
    pub fn current_share_pct(&self, observations: &[SalesObservation]) -> f64 {
        let mut total = 0.0;
        let mut brand = 0.0;
        for obs in observations {
            total += obs.value_sales;
            if self.brand_keys.contains(&obs.product_key) {
                brand += obs.value_sales;
            }
        }
        if total > 0.0 { brand / total * 100.0 } else { 0.0 }
    }

    /// Nudge the brand's share into the period band. When the share is out of
    /// band (and the brand sold anything at all), a target share is drawn
    /// uniformly within the band and every brand row's value/unit/volume
    /// fields are scaled by one factor. The factor accounts for the total
    /// itself shifting, so the post-adjustment share equals the target.
    pub fn rebalance(
        &self,
        observations: &mut [SalesObservation],
        period: TimeKey,
        rng: &mut impl Rng,
    ) -> ShareOutcome {
        let band = self.band_for(period);

        let mut total = 0.0;
        let mut brand = 0.0;
        for obs in observations.iter() {
            total += obs.value_sales;
            if self.brand_keys.contains(&obs.product_key) {
                brand += obs.value_sales;
            }
        }
        let share_before = if total > 0.0 { brand / total * 100.0 } else { 0.0 };

        let in_band = (band.min_pct..=band.max_pct).contains(&share_before);
        if in_band || brand <= 0.0 {
            // Zero brand sales: no rescale is possible, the share simply
            // stays at 0 for this period.
            return ShareOutcome {
                band,
                share_before_pct: share_before,
                share_after_pct: share_before,
                rescaled: false,
            };
        }

        let target = rng.random_range(band.min_pct..band.max_pct) / 100.0;
        let other = total - brand;
        let required = target * other / (1.0 - target);
        let factor = required / brand;

        for obs in observations.iter_mut() {
            if self.brand_keys.contains(&obs.product_key) {
                obs.value_sales *= factor;
                obs.unit_sales *= factor;
                obs.volume_sales *= factor;
                obs.base_value_sales *= factor;
                obs.base_unit_sales *= factor;
            }
        }

        ShareOutcome {
            band,
            share_before_pct: share_before,
            share_after_pct: target * 100.0,
            rescaled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::catalog::{PriceTier, Product, SeasonalCategory};
    use crate::types::GeographyKey;

    const EPOCH: TimeKey = TimeKey(2201);

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    fn product(key: u32, brand: &str) -> Product {
        Product {
            key: ProductKey(key),
            description: format!("{brand} MILK 100G"),
            category: "CONFECTIONERY".to_string(),
            segment: "BLOCKS & TABLETS".to_string(),
            subsegment: "MILK".to_string(),
            brand: brand.to_string(),
            manufacturer: "ANY".to_string(),
            seasonal: SeasonalCategory::None,
            tier: PriceTier::Standard,
        }
    }

    fn controller() -> MarketShareController {
        let catalog = ProductCatalog::new(vec![
            product(1, "BIG BITE ORIGINAL"),
            product(2, "BIG BITE DELUXE"),
            product(3, "GALAXY"),
            product(4, "KITKAT"),
        ])
        .unwrap();
        MarketShareController::new(&catalog, "BIG BITE", ShareBandConfig::canonical(), EPOCH)
    }

    fn obs(product: u32, value: f64) -> SalesObservation {
        SalesObservation {
            geography_key: GeographyKey(1),
            product_key: ProductKey(product),
            time_key: EPOCH,
            value_sales: value,
            unit_sales: value / 2.0,
            volume_sales: value / 4.0,
            base_value_sales: value,
            base_unit_sales: value / 2.0,
            price_per_unit: 2.0,
            promo_depth: 0.0,
            store_count: 100,
            stores_selling: 80,
        }
    }

    #[test]
    fn band_grows_with_elapsed_years_and_caps() {
        let ctrl = controller();
        let at_epoch = ctrl.band_for(EPOCH);
        assert!((at_epoch.min_pct - 4.0).abs() < 1e-12);
        assert!((at_epoch.max_pct - 6.0).abs() < 1e-12);

        // Two years in: 4 + 1.5 = 5.5, 6 + 2 = 8.
        let two_years = ctrl.band_for(TimeKey(2401));
        assert!((two_years.min_pct - 5.5).abs() < 1e-12);
        assert!((two_years.max_pct - 8.0).abs() < 1e-12);

        // Far future: capped at 7 and 10.
        let capped = ctrl.band_for(TimeKey(3201));
        assert!((capped.min_pct - 7.0).abs() < 1e-12);
        assert!((capped.max_pct - 10.0).abs() < 1e-12);
    }

    #[test]
    fn in_band_share_is_left_alone() {
        let ctrl = controller();
        // Brand at 5 % of 2000: inside [4, 6].
        let mut batch = vec![obs(1, 100.0), obs(3, 1_000.0), obs(4, 900.0)];
        let before = batch.clone();
        let outcome = ctrl.rebalance(&mut batch, EPOCH, &mut rng());
        assert!(!outcome.rescaled);
        assert_eq!(batch, before, "in-band batch must not be touched");
    }

    #[test]
    fn low_share_is_pulled_up_into_band() {
        let ctrl = controller();
        // Brand at 1 %: far below the 4 % floor.
        let mut batch = vec![obs(1, 10.0), obs(2, 10.0), obs(3, 1_000.0), obs(4, 980.0)];
        let outcome = ctrl.rebalance(&mut batch, EPOCH, &mut rng());
        assert!(outcome.rescaled);
        let share_after = ctrl.current_share_pct(&batch);
        assert!(
            (outcome.band.min_pct..=outcome.band.max_pct).contains(&share_after),
            "share after rebalance {share_after:.2} % outside band"
        );
        assert!((share_after - outcome.share_after_pct).abs() < 1e-9);
    }

    #[test]
    fn high_share_is_pushed_down_into_band() {
        let ctrl = controller();
        // Brand at 50 %.
        let mut batch = vec![obs(1, 500.0), obs(2, 500.0), obs(3, 600.0), obs(4, 400.0)];
        let outcome = ctrl.rebalance(&mut batch, EPOCH, &mut rng());
        assert!(outcome.rescaled);
        let share_after = ctrl.current_share_pct(&batch);
        assert!((outcome.band.min_pct..=outcome.band.max_pct).contains(&share_after));
        assert!(share_after < outcome.share_before_pct);
    }

    #[test]
    fn competitor_rows_are_untouched_by_rescale() {
        let ctrl = controller();
        let mut batch = vec![obs(1, 10.0), obs(3, 1_000.0), obs(4, 980.0)];
        ctrl.rebalance(&mut batch, EPOCH, &mut rng());
        assert_eq!(batch[1].value_sales, 1_000.0);
        assert_eq!(batch[2].value_sales, 980.0);
        assert_ne!(batch[0].value_sales, 10.0, "brand row must have been rescaled");
    }

    #[test]
    fn rescale_applies_one_factor_to_all_sales_fields() {
        let ctrl = controller();
        let mut batch = vec![obs(1, 10.0), obs(3, 1_990.0)];
        ctrl.rebalance(&mut batch, EPOCH, &mut rng());
        let row = &batch[0];
        let factor = row.value_sales / 10.0;
        assert!((row.unit_sales - 5.0 * factor).abs() < 1e-9);
        assert!((row.volume_sales - 2.5 * factor).abs() < 1e-9);
        assert!((row.base_value_sales - 10.0 * factor).abs() < 1e-9);
        assert!((row.base_unit_sales - 5.0 * factor).abs() < 1e-9);
    }

    #[test]
    fn zero_brand_sales_skips_the_adjustment() {
        let ctrl = controller();
        let mut batch = vec![obs(3, 1_000.0), obs(4, 500.0)];
        let before = batch.clone();
        let outcome = ctrl.rebalance(&mut batch, EPOCH, &mut rng());
        assert!(!outcome.rescaled);
        assert_eq!(outcome.share_before_pct, 0.0);
        assert_eq!(batch, before);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let ctrl = controller();
        let mut batch: Vec<SalesObservation> = Vec::new();
        let outcome = ctrl.rebalance(&mut batch, EPOCH, &mut rng());
        assert!(!outcome.rescaled);
        assert_eq!(outcome.share_before_pct, 0.0);
    }
}
