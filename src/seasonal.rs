use rand::Rng;

use crate::catalog::SeasonalCategory;

/// Authored demand window: active weeks, peak week, curve height at the peak,
/// exponential decay per week of distance, in-window floor, and the flat
/// multiplier outside the window.
struct Window {
    start: u32,
    end: u32,
    peak: u32,
    height: f64,
    decay: f64,
    floor: f64,
    off_season: f64,
}

const CHRISTMAS: Window =
    Window { start: 44, end: 52, peak: 51, height: 5.0, decay: 0.1, floor: 2.0, off_season: 0.1 };
const EASTER: Window =
    Window { start: 10, end: 16, peak: 14, height: 4.0, decay: 0.15, floor: 2.0, off_season: 0.05 };
const VALENTINE: Window =
    Window { start: 5, end: 7, peak: 6, height: 2.5, decay: 0.5, floor: 1.5, off_season: 0.1 };

impl Window {
    fn multiplier(&self, week_of_year: u32) -> f64 {
        if (self.start..=self.end).contains(&week_of_year) {
            let distance = week_of_year.abs_diff(self.peak) as f64;
            (self.height * (-self.decay * distance).exp()).max(self.floor)
        } else {
            self.off_season
        }
    }
}

/// Seasonal demand multiplier for a product in a given week of the year.
///
/// Seasonal categories follow a bell curve around their peak week with a
/// floored in-window minimum and near-zero off-season demand. Non-seasonal
/// products get mild randomized boosts around Christmas and Easter and a
/// randomized summer lull.
pub fn multiplier(category: SeasonalCategory, week_of_year: u32, rng: &mut impl Rng) -> f64 {
    match category {
        SeasonalCategory::Christmas => CHRISTMAS.multiplier(week_of_year),
        SeasonalCategory::Easter => EASTER.multiplier(week_of_year),
        SeasonalCategory::Valentine => VALENTINE.multiplier(week_of_year),
        SeasonalCategory::None => match week_of_year {
            48..=52 => rng.random_range(1.1..1.3),
            10..=16 => rng.random_range(1.2..1.4),
            26..=35 => rng.random_range(0.7..0.8),
            _ => 1.0,
        },
    }
}
