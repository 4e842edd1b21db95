use std::collections::HashMap;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::types::TimeKey;

/// Long-run direction of a manufacturer's book. Descriptive label; the
/// `annual_growth` rate carries the sign that drives the maths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendClass {
    Growth,
    Decline,
    Stable,
}

/// A short-lived authored shock: marketing campaign, recall, viral moment.
/// `impact` is the multiplier at the event's center week; it decays with a
/// Gaussian profile over a ±4-week window.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryEvent {
    pub week: TimeKey,
    pub impact: f64,
}

/// Authored record for one manufacturer: trend, discrete events, and the
/// brand lines on explicit lifecycle ramps.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandStory {
    pub trend: TrendClass,
    pub annual_growth: f64,
    pub events: Vec<StoryEvent>,
    pub declining_lines: Vec<String>,
    pub star_lines: Vec<String>,
}

impl BrandStory {
    /// Stable, zero growth, no events. Applied to anything without an
    /// authored story.
    pub fn neutral() -> Self {
        BrandStory {
            trend: TrendClass::Stable,
            annual_growth: 0.0,
            events: Vec::new(),
            declining_lines: Vec::new(),
            star_lines: Vec::new(),
        }
    }
}

const EVENT_WINDOW_WEEKS: i64 = 4;
const TREND_NOISE_STD: f64 = 0.02;
const TREND_MIN: f64 = 0.1;
const TREND_MAX: f64 = 3.0;
const DECLINE_PER_WEEK: f64 = 0.002;
const DECLINE_FLOOR: f64 = 0.3;
const STAR_PER_WEEK: f64 = 0.003;
const STAR_CAP: f64 = 2.5;

/// Immutable lookup of authored brand stories, loaded once at startup.
pub struct BrandStoryBook {
    stories: HashMap<String, BrandStory>,
    default: BrandStory,
    epoch: TimeKey,
}

impl BrandStoryBook {
    pub fn new(stories: HashMap<String, BrandStory>, epoch: TimeKey) -> Self {
        BrandStoryBook { stories, default: BrandStory::neutral(), epoch }
    }

    /// The authored four-year arc: BIG BITE grows hard, MARS cedes share,
    /// private label rides the cost-of-living wave, the rest drift.
    pub fn canonical(epoch: TimeKey) -> Self {
        let mut stories = HashMap::new();
        stories.insert(
            "BIG BITE CHOCOLATES".to_string(),
            BrandStory {
                trend: TrendClass::Growth,
                annual_growth: 0.15,
                events: vec![
                    // Marketing campaign, new-product launch, viral moment.
                    StoryEvent { week: TimeKey(2230), impact: 1.3 },
                    StoryEvent { week: TimeKey(2306), impact: 1.2 },
                    StoryEvent { week: TimeKey(2340), impact: 1.5 },
                ],
                declining_lines: vec!["BIG BITE ORIGINAL".to_string()],
                star_lines: vec!["BIG BITE DELUXE".to_string(), "BIG BITE VELVET".to_string()],
            },
        );
        stories.insert(
            "MONDELEZ".to_string(),
            BrandStory {
                trend: TrendClass::Stable,
                annual_growth: 0.02,
                events: vec![
                    // Product recall, then relaunch.
                    StoryEvent { week: TimeKey(2250), impact: 0.7 },
                    StoryEvent { week: TimeKey(2320), impact: 1.1 },
                ],
                declining_lines: Vec::new(),
                star_lines: Vec::new(),
            },
        );
        stories.insert(
            "MARS".to_string(),
            BrandStory {
                trend: TrendClass::Decline,
                annual_growth: -0.05,
                events: vec![StoryEvent { week: TimeKey(2310), impact: 0.85 }],
                declining_lines: Vec::new(),
                star_lines: Vec::new(),
            },
        );
        stories.insert(
            "PRIVATE LABEL".to_string(),
            BrandStory {
                trend: TrendClass::Growth,
                annual_growth: 0.08,
                events: vec![StoryEvent { week: TimeKey(2334), impact: 1.15 }],
                declining_lines: Vec::new(),
                star_lines: Vec::new(),
            },
        );
        stories.insert(
            "LINDT".to_string(),
            BrandStory {
                trend: TrendClass::Stable,
                annual_growth: 0.03,
                events: vec![StoryEvent { week: TimeKey(2245), impact: 1.1 }],
                declining_lines: Vec::new(),
                star_lines: Vec::new(),
            },
        );
        stories.insert(
            "FERRERO".to_string(),
            BrandStory {
                trend: TrendClass::Growth,
                annual_growth: 0.06,
                events: vec![StoryEvent { week: TimeKey(2329), impact: 1.2 }],
                declining_lines: Vec::new(),
                star_lines: Vec::new(),
            },
        );
        BrandStoryBook::new(stories, epoch)
    }

    fn story_for(&self, manufacturer: &str) -> &BrandStory {
        self.stories.get(manufacturer).unwrap_or(&self.default)
    }

    /// Compounded trend for a manufacturer at `period`: annual growth over
    /// elapsed years, small Gaussian noise, Gaussian-decayed event impacts,
    /// clamped to [0.1, 3.0].
    pub fn trend_multiplier(
        &self,
        manufacturer: &str,
        period: TimeKey,
        rng: &mut impl Rng,
    ) -> f64 {
        let story = self.story_for(manufacturer);
        let years = period.years_since(self.epoch);
        let mut trend = 1.0 + story.annual_growth * years;

        let noise = Normal::new(1.0, TREND_NOISE_STD).expect("invalid trend noise params");
        trend *= noise.sample(rng);

        for event in &story.events {
            let distance = period.weeks_since(event.week).abs();
            if distance <= EVENT_WINDOW_WEEKS {
                let decay = (-0.5 * (distance as f64 / 2.0).powi(2)).exp();
                trend *= 1.0 + (event.impact - 1.0) * decay;
            }
        }

        trend.clamp(TREND_MIN, TREND_MAX)
    }

    /// Linear lifecycle ramp for a brand line: declining lines lose 0.2 %/week
    /// (floored at 0.3×), star lines gain 0.3 %/week (capped at 2.5×).
    pub fn lifecycle_multiplier(&self, manufacturer: &str, brand: &str, period: TimeKey) -> f64 {
        let story = self.story_for(manufacturer);
        let weeks = period.weeks_since(self.epoch) as f64;
        if story.declining_lines.iter().any(|line| line == brand) {
            (1.0 - DECLINE_PER_WEEK * weeks).max(DECLINE_FLOOR)
        } else if story.star_lines.iter().any(|line| line == brand) {
            (1.0 + STAR_PER_WEEK * weeks).min(STAR_CAP)
        } else {
            1.0
        }
    }
}
