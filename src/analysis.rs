use std::collections::HashMap;

use crate::catalog::{GeographyTree, ProductCatalog, SeasonalCategory};
use crate::config::HIERARCHY_RATIO;
use crate::observation::SalesObservation;
use crate::share::MarketShareController;
use crate::types::{GeographyKey, ProductKey, TimeKey};

/// Tolerance on the root ≈ 2.5 × Σ(level-1) aggregate ratio.
const RATIO_TOLERANCE: f64 = 0.08;
/// Roots below this sit in clamp-floor territory where the fixed store
/// minimums distort the split; they are excluded from the ratio check.
const RATIO_ROOT_CUTOFF: f64 = 500.0;
/// Smoothing slack: independent AR drift on parent and children can nudge a
/// period past strict containment even though raw allocations never do.
const CONTAINMENT_TOLERANCE: f64 = 0.05;
/// Median |week-over-week %change| ceiling for smoothed series.
const SMOOTHNESS_MEDIAN_MAX: f64 = 0.15;
/// Peak-window mean must exceed off-season mean by at least this factor.
const SEASONAL_CONCENTRATION_MIN: f64 = 5.0;

/// Per-period aggregate view of an emitted batch.
#[derive(Debug, Clone)]
pub struct PeriodStats {
    pub period: TimeKey,
    pub records: usize,
    pub total_value: f64,
    pub brand_value: f64,
    pub share_pct: f64,
    pub band_min_pct: f64,
    pub band_max_pct: f64,
}

pub fn period_stats(
    batches: &[(TimeKey, Vec<SalesObservation>)],
    controller: &MarketShareController,
) -> Vec<PeriodStats> {
    batches
        .iter()
        .map(|(period, batch)| {
            let band = controller.band_for(*period);
            let total_value: f64 = batch.iter().map(|o| o.value_sales).sum();
            let brand_value: f64 = batch
                .iter()
                .filter(|o| controller.is_brand_product(o.product_key))
                .map(|o| o.value_sales)
                .sum();
            PeriodStats {
                period: *period,
                records: batch.len(),
                total_value,
                brand_value,
                share_pct: if total_value > 0.0 { brand_value / total_value * 100.0 } else { 0.0 },
                band_min_pct: band.min_pct,
                band_max_pct: band.max_pct,
            }
        })
        .collect()
}

/// A structural invariant violation detected in emitted batches.
#[derive(Debug)]
pub enum StructureViolation {
    /// Aggregate root / (Σ level-1 × ratio) drifted outside tolerance.
    HierarchyRatioDrift { ratio: f64, samples: usize },
    /// A parent's children sum past the parent (beyond smoothing slack).
    ChildrenExceedParent {
        period: TimeKey,
        product: ProductKey,
        parent: GeographyKey,
        parent_value: f64,
        children_sum: f64,
    },
}

impl std::fmt::Display for StructureViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HierarchyRatioDrift { ratio, samples } => {
                write!(
                    f,
                    "HierarchyRatioDrift: root/(Σlevel1×{HIERARCHY_RATIO}) = {ratio:.3} over {samples} samples"
                )
            }
            Self::ChildrenExceedParent { period, product, parent, parent_value, children_sum } => {
                write!(
                    f,
                    "ChildrenExceedParent period={} product={} parent={}: children {children_sum:.1} > parent {parent_value:.1}",
                    period.0, product.0, parent.0
                )
            }
        }
    }
}

/// Check the hierarchy invariants on emitted batches: the aggregate 2.5×
/// ratio between the root and level 1, and parent-dominates-children for
/// every parent node present with its children.
pub fn verify_structure(
    batches: &[(TimeKey, Vec<SalesObservation>)],
    tree: &GeographyTree,
) -> Vec<StructureViolation> {
    let mut violations = Vec::new();

    let root_key = tree.root().key;
    let level1: Vec<GeographyKey> = tree.level(1).map(|n| n.key).collect();

    let mut root_total = 0.0;
    let mut level1_total = 0.0;
    let mut ratio_samples = 0usize;

    for (period, batch) in batches {
        // Group the batch by product; each group is one allocation pass.
        let mut by_product: HashMap<ProductKey, HashMap<GeographyKey, f64>> = HashMap::new();
        for obs in batch {
            by_product
                .entry(obs.product_key)
                .or_default()
                .insert(obs.geography_key, obs.value_sales);
        }

        for (product, values) in &by_product {
            if let Some(&root_value) = values.get(&root_key)
                && root_value >= RATIO_ROOT_CUTOFF
            {
                let sum: f64 = level1.iter().filter_map(|k| values.get(k)).sum();
                if sum > 0.0 {
                    root_total += root_value;
                    level1_total += sum;
                    ratio_samples += 1;
                }
            }

            for parent in tree.iter() {
                // The root's fan-out is governed by the ratio check above.
                if parent.key == root_key {
                    continue;
                }
                let Some(&parent_value) = values.get(&parent.key) else { continue };
                let children = tree.children(parent.key);
                if children.is_empty() {
                    continue;
                }
                let children_sum: f64 =
                    children.iter().filter_map(|k| values.get(k)).sum();
                if children_sum > parent_value * (1.0 + CONTAINMENT_TOLERANCE) {
                    violations.push(StructureViolation::ChildrenExceedParent {
                        period: *period,
                        product: *product,
                        parent: parent.key,
                        parent_value,
                        children_sum,
                    });
                }
            }
        }
    }

    if ratio_samples > 0 {
        let ratio = root_total / (level1_total * HIERARCHY_RATIO);
        if (ratio - 1.0).abs() > RATIO_TOLERANCE {
            violations.push(StructureViolation::HierarchyRatioDrift { ratio, samples: ratio_samples });
        }
    }

    violations
}

/// A temporal/share invariant violation detected in emitted batches.
#[derive(Debug)]
pub enum DynamicsViolation {
    /// Smoothed series jump around too much week over week.
    SeriesTooNoisy { median_abs_change: f64, pairs: usize },
    /// The designated brand's share escaped its band despite non-zero sales.
    ShareOutOfBand { period: TimeKey, share_pct: f64, min_pct: f64, max_pct: f64 },
    /// A seasonal category's peak window fails to dominate its off-season.
    SeasonalConcentrationWeak { category: SeasonalCategory, ratio: f64 },
}

impl std::fmt::Display for DynamicsViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SeriesTooNoisy { median_abs_change, pairs } => {
                write!(
                    f,
                    "SeriesTooNoisy: median |%change| = {:.1}% over {pairs} pairs",
                    median_abs_change * 100.0
                )
            }
            Self::ShareOutOfBand { period, share_pct, min_pct, max_pct } => {
                write!(
                    f,
                    "ShareOutOfBand period={}: {share_pct:.2}% outside [{min_pct:.2}, {max_pct:.2}]",
                    period.0
                )
            }
            Self::SeasonalConcentrationWeak { category, ratio } => {
                write!(f, "SeasonalConcentrationWeak {category:?}: peak/off ratio {ratio:.1}")
            }
        }
    }
}

/// Median |week-over-week %change| across all (geography, product) series
/// with consecutive observations. Returns the pair count alongside.
pub fn smoothness(batches: &[(TimeKey, Vec<SalesObservation>)]) -> (f64, usize) {
    let mut last: HashMap<(GeographyKey, ProductKey), (TimeKey, f64)> = HashMap::new();
    let mut changes: Vec<f64> = Vec::new();

    for (period, batch) in batches {
        for obs in batch {
            let key = (obs.geography_key, obs.product_key);
            if let Some((prev_period, prev_value)) = last.get(&key)
                && *prev_period == period.prev()
                && *prev_value > 0.0
            {
                changes.push(((obs.value_sales - prev_value) / prev_value).abs());
            }
            last.insert(key, (*period, obs.value_sales));
        }
    }

    if changes.is_empty() {
        return (0.0, 0);
    }
    changes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    (changes[changes.len() / 2], changes.len())
}

/// Check smoothing, share steering and seasonal concentration on emitted
/// batches.
pub fn verify_dynamics(
    batches: &[(TimeKey, Vec<SalesObservation>)],
    catalog: &ProductCatalog,
    controller: &MarketShareController,
) -> Vec<DynamicsViolation> {
    let mut violations = Vec::new();

    let (median_abs_change, pairs) = smoothness(batches);
    if pairs > 0 && median_abs_change > SMOOTHNESS_MEDIAN_MAX {
        violations.push(DynamicsViolation::SeriesTooNoisy { median_abs_change, pairs });
    }

    for stats in period_stats(batches, controller) {
        if stats.brand_value > 0.0
            && (stats.share_pct < stats.band_min_pct - 1e-9
                || stats.share_pct > stats.band_max_pct + 1e-9)
        {
            violations.push(DynamicsViolation::ShareOutOfBand {
                period: stats.period,
                share_pct: stats.share_pct,
                min_pct: stats.band_min_pct,
                max_pct: stats.band_max_pct,
            });
        }
    }

    // Peak-vs-off-season concentration, aggregated across every product in
    // the category and every geography (single series are too heavy-tailed
    // to judge alone).
    let windows: [(SeasonalCategory, std::ops::RangeInclusive<u32>, std::ops::RangeInclusive<u32>); 3] = [
        (SeasonalCategory::Christmas, 49..=52, 20..=30),
        (SeasonalCategory::Easter, 12..=16, 30..=40),
        (SeasonalCategory::Valentine, 5..=7, 20..=30),
    ];
    for (category, peak_weeks, off_weeks) in windows {
        let keys: Vec<ProductKey> =
            catalog.iter().filter(|p| p.seasonal == category).map(|p| p.key).collect();
        if keys.is_empty() {
            continue;
        }
        let mean_over = |weeks: &std::ops::RangeInclusive<u32>| -> Option<f64> {
            let mut total = 0.0;
            let mut count = 0usize;
            for (period, batch) in batches {
                if !weeks.contains(&period.week_of_year()) {
                    continue;
                }
                for obs in batch {
                    if keys.contains(&obs.product_key) {
                        total += obs.value_sales;
                        count += 1;
                    }
                }
            }
            (count > 0).then(|| total / count as f64)
        };
        if let (Some(peak), Some(off)) = (mean_over(&peak_weeks), mean_over(&off_weeks))
            && off > 0.0
        {
            let ratio = peak / off;
            if ratio < SEASONAL_CONCENTRATION_MIN {
                violations.push(DynamicsViolation::SeasonalConcentrationWeak { category, ratio });
            }
        }
    }

    violations
}

/// Distribution statistics for a continuous metric across N runs.
#[derive(Debug, Clone)]
pub struct DistStats {
    pub n: usize,
    pub min: f64,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

fn percentile_stats(values: &mut Vec<f64>) -> Option<DistStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();

    let interp = |p: f64| -> f64 {
        let h = p * (n - 1) as f64;
        let lo = h.floor() as usize;
        let hi = (lo + 1).min(n - 1);
        let frac = h - lo as f64;
        values[lo] * (1.0 - frac) + values[hi] * frac
    };

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };

    Some(DistStats {
        n,
        min: values[0],
        p5: interp(0.05),
        p25: interp(0.25),
        p50: interp(0.50),
        p75: interp(0.75),
        p95: interp(0.95),
        max: values[n - 1],
        mean,
        std_dev: variance.sqrt(),
    })
}

/// One run's headline numbers, for multi-seed studies.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub seed: u64,
    pub records: usize,
    pub total_value: f64,
    pub mean_share_pct: f64,
    pub median_abs_change: f64,
}

pub fn summarize(
    seed: u64,
    batches: &[(TimeKey, Vec<SalesObservation>)],
    controller: &MarketShareController,
) -> RunSummary {
    let stats = period_stats(batches, controller);
    let records = stats.iter().map(|s| s.records).sum();
    let total_value = stats.iter().map(|s| s.total_value).sum();
    let with_sales: Vec<&PeriodStats> = stats.iter().filter(|s| s.total_value > 0.0).collect();
    let mean_share_pct = if with_sales.is_empty() {
        0.0
    } else {
        with_sales.iter().map(|s| s.share_pct).sum::<f64>() / with_sales.len() as f64
    };
    let (median_abs_change, _) = smoothness(batches);
    RunSummary { seed, records, total_value, mean_share_pct, median_abs_change }
}

/// Cross-run distributions of the headline metrics.
#[derive(Debug, Clone)]
pub struct RunDist {
    pub records: DistStats,
    pub total_value: DistStats,
    pub mean_share_pct: DistStats,
    pub median_abs_change: DistStats,
}

pub fn analyse_distributions(runs: &[RunSummary]) -> Option<RunDist> {
    if runs.len() < 2 {
        return None;
    }
    let mut records: Vec<f64> = runs.iter().map(|r| r.records as f64).collect();
    let mut totals: Vec<f64> = runs.iter().map(|r| r.total_value).collect();
    let mut shares: Vec<f64> = runs.iter().map(|r| r.mean_share_pct).collect();
    let mut changes: Vec<f64> = runs.iter().map(|r| r.median_abs_change).collect();
    Some(RunDist {
        records: percentile_stats(&mut records)?,
        total_value: percentile_stats(&mut totals)?,
        mean_share_pct: percentile_stats(&mut shares)?,
        median_abs_change: percentile_stats(&mut changes)?,
    })
}
