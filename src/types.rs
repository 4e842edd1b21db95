use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GeographyKey(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProductKey(pub u32);

/// Weekly period key in `YYWW` form (2201 = year 22, week 1; 2352 = year 23,
/// week 52). The simulation uses a flat 52-week year. Elapsed-time maths go
/// through `week_index` rather than raw key subtraction, so distances stay
/// correct across year boundaries (2301 is one week after 2252, not 49).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeKey(pub u32);

impl TimeKey {
    pub const WEEKS_PER_YEAR: u32 = 52;

    pub fn new(year: u32, week: u32) -> Self {
        debug_assert!((1..=Self::WEEKS_PER_YEAR).contains(&week), "week {week} out of range");
        TimeKey(year * 100 + week)
    }

    /// Two-digit year component (22 for 2022).
    pub fn year(self) -> u32 {
        self.0 / 100
    }

    /// Week-of-year in 1–52, used by seasonal and story logic.
    pub fn week_of_year(self) -> u32 {
        self.0 % 100
    }

    /// Absolute week ordinal on the flat 52-week calendar.
    pub fn week_index(self) -> i64 {
        self.year() as i64 * Self::WEEKS_PER_YEAR as i64 + (self.week_of_year() as i64 - 1)
    }

    /// Whole weeks elapsed since `epoch` (negative before it).
    pub fn weeks_since(self, epoch: TimeKey) -> i64 {
        self.week_index() - epoch.week_index()
    }

    /// Fractional years elapsed since `epoch`.
    pub fn years_since(self, epoch: TimeKey) -> f64 {
        self.weeks_since(epoch) as f64 / Self::WEEKS_PER_YEAR as f64
    }

    pub fn next(self) -> TimeKey {
        if self.week_of_year() == Self::WEEKS_PER_YEAR {
            TimeKey::new(self.year() + 1, 1)
        } else {
            TimeKey(self.0 + 1)
        }
    }

    pub fn prev(self) -> TimeKey {
        if self.week_of_year() == 1 {
            TimeKey::new(self.year() - 1, Self::WEEKS_PER_YEAR)
        } else {
            TimeKey(self.0 - 1)
        }
    }

    /// The strictly increasing period sequence starting at `start`.
    pub fn sequence(start: TimeKey, n_weeks: usize) -> Vec<TimeKey> {
        let mut out = Vec::with_capacity(n_weeks);
        let mut current = start;
        for _ in 0..n_weeks {
            out.push(current);
            current = current.next();
        }
        out
    }
}
