use rand::Rng;

use crate::catalog::PriceTier;

/// Price-volume response and shelf-price draws by tier. Premium buyers barely
/// react to price moves; value buyers chase them.
pub struct PriceElasticityModel {
    standard_range: (f64, f64),
}

const PREMIUM_ELASTICITY: (f64, f64) = (-0.6, -0.4);
const VALUE_ELASTICITY: (f64, f64) = (-1.5, -1.2);

impl PriceElasticityModel {
    pub fn new(standard_range: (f64, f64)) -> Self {
        PriceElasticityModel { standard_range }
    }

    /// Per-call elasticity draw for a tier.
    pub fn elasticity(&self, tier: PriceTier, rng: &mut impl Rng) -> f64 {
        let (lo, hi) = match tier {
            PriceTier::Premium => PREMIUM_ELASTICITY,
            PriceTier::Value => VALUE_ELASTICITY,
            PriceTier::Standard => self.standard_range,
        };
        rng.random_range(lo..hi)
    }

    /// Volume after a price change of `price_change_pct` percent (negative =
    /// price cut). `new = base × (1 + e × pct / 100)`, floored at zero.
    pub fn volume_after_price_change(
        &self,
        base_volume: f64,
        price_change_pct: f64,
        tier: PriceTier,
        rng: &mut impl Rng,
    ) -> f64 {
        let elasticity = self.elasticity(tier, rng);
        (base_volume * (1.0 + elasticity * price_change_pct / 100.0)).max(0.0)
    }

    /// Shelf price per unit for a tier, in currency units.
    pub fn shelf_price(&self, tier: PriceTier, rng: &mut impl Rng) -> f64 {
        match tier {
            PriceTier::Premium => rng.random_range(15.0..50.0),
            PriceTier::Value => rng.random_range(1.0..5.0),
            PriceTier::Standard => rng.random_range(2.0..15.0),
        }
    }
}
