use crate::catalog::{GeographyNode, PriceTier, Product, SeasonalCategory, StoreType};
use crate::types::{ProductKey, TimeKey};

/// Root aggregate ≈ 2.5 × the sum of level-1 allocations. Chosen to match the
/// fictitious business requirement and validated by the downstream checks —
/// a fixed constant, not a tunable.
pub const HIERARCHY_RATIO: f64 = 2.5;

/// First week of the simulated calendar (year 22, week 1). Brand stories and
/// the share band measure elapsed time from here.
pub const EPOCH: TimeKey = TimeKey(2201);

/// Log-normal sales profile for a store type: ln-space (mean, std) plus the
/// clamp range applied to draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreProfile {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

pub fn store_profile(store_type: StoreType) -> StoreProfile {
    match store_type {
        StoreType::Aggregate => StoreProfile { mean: 6.0, std: 2.5, min: 10.0, max: 100_000.0 },
        StoreType::Premium => StoreProfile { mean: 5.5, std: 2.0, min: 5.0, max: 50_000.0 },
        StoreType::Major => StoreProfile { mean: 5.0, std: 2.2, min: 2.0, max: 40_000.0 },
        StoreType::Discount => StoreProfile { mean: 4.5, std: 2.3, min: 1.0, max: 30_000.0 },
        StoreType::Convenience => StoreProfile { mean: 3.5, std: 1.8, min: 0.5, max: 10_000.0 },
        StoreType::Online => StoreProfile { mean: 4.0, std: 2.0, min: 1.0, max: 20_000.0 },
    }
}

/// Level-1 allocation weight by store type: premium channels over-index on
/// confectionery, discounters under-index.
pub fn allocation_weight(store_type: StoreType) -> f64 {
    match store_type {
        StoreType::Premium => 1.5,
        StoreType::Discount => 0.7,
        _ => 1.0,
    }
}

/// Time-varying target band for the designated brand's market share. The
/// band's floor grows from `base_min_pct` toward `min_ceiling_pct` and its
/// cap from `base_max_pct` toward `max_ceiling_pct`, per elapsed year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareBandConfig {
    pub base_min_pct: f64,
    pub base_max_pct: f64,
    pub min_growth_pct_per_year: f64,
    pub max_growth_pct_per_year: f64,
    pub min_ceiling_pct: f64,
    pub max_ceiling_pct: f64,
}

impl ShareBandConfig {
    /// 4–6 % growing to 7–10 % over roughly four years.
    pub fn canonical() -> Self {
        ShareBandConfig {
            base_min_pct: 4.0,
            base_max_pct: 6.0,
            min_growth_pct_per_year: 0.75,
            max_growth_pct_per_year: 1.0,
            min_ceiling_pct: 7.0,
            max_ceiling_pct: 10.0,
        }
    }
}

#[derive(Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub start: TimeKey,
    pub n_weeks: usize,
    pub epoch: TimeKey,
    /// Products drawn into the run (the designated brand is always included).
    pub sample_size: usize,
    /// Brand-name fragment identifying the steered brand's products.
    pub designated_brand: String,
    pub share_band: ShareBandConfig,
    /// Elasticity range for standard-tier products; premium and value tiers
    /// are fixed by policy.
    pub standard_elasticity: (f64, f64),
    pub geography: Vec<GeographyNode>,
    pub products: Vec<Product>,
}

impl SimulationConfig {
    /// The canonical world: the UK grocery hierarchy and a compact authored
    /// confectionery catalog, four years of weekly periods.
    pub fn canonical() -> Self {
        SimulationConfig {
            seed: 42,
            start: EPOCH,
            n_weeks: 208,
            epoch: EPOCH,
            sample_size: 2_000,
            designated_brand: "BIG BITE".to_string(),
            share_band: ShareBandConfig::canonical(),
            standard_elasticity: (-1.2, -0.8),
            geography: canonical_geography(),
            products: canonical_products(),
        }
    }
}

/// IRI-style measurement hierarchy: one whole-market aggregate, the major UK
/// retailers at level 1, online/format splits at level 2.
pub fn canonical_geography() -> Vec<GeographyNode> {
    let n = GeographyNode::new;
    vec![
        // Level 0
        n(27000001, "IRI All Outlets", None, 0),
        // Level 1 — retailers
        n(27100001, "Tesco", Some(27000001), 1),
        n(27200001, "Sainsburys", Some(27000001), 1),
        n(27300001, "Asda", Some(27000001), 1),
        n(27400001, "Morrisons", Some(27000001), 1),
        n(27500001, "Waitrose", Some(27000001), 1),
        n(27600001, "Co-op", Some(27000001), 1),
        n(27700001, "Aldi", Some(27000001), 1),
        n(27700002, "Lidl", Some(27000001), 1),
        n(27800001, "Convenience", Some(27000001), 1),
        n(27800002, "Spar", Some(27000001), 1),
        n(27800003, "Londis", Some(27000001), 1),
        n(27800004, "Costcutter", Some(27000001), 1),
        n(27800005, "Premier", Some(27000001), 1),
        n(27800006, "Nisa", Some(27000001), 1),
        n(27900001, "Boots", Some(27000001), 1),
        n(27900003, "Superdrug", Some(27000001), 1),
        n(27950001, "Costco", Some(27000001), 1),
        n(27950002, "Booker", Some(27000001), 1),
        n(27990001, "Poundland", Some(27000001), 1),
        n(27990002, "B&M", Some(27000001), 1),
        n(27990003, "Home Bargains", Some(27000001), 1),
        // Level 2 — online and sub-formats
        n(27100002, "Tesco Online", Some(27100001), 2),
        n(27100003, "Tesco Express", Some(27100001), 2),
        n(27100004, "Tesco Metro", Some(27100001), 2),
        n(27100005, "Tesco Extra", Some(27100001), 2),
        n(27200002, "Sainsburys Online", Some(27200001), 2),
        n(27200003, "Sainsburys Local", Some(27200001), 2),
        n(27300002, "Asda Online", Some(27300001), 2),
        n(27400002, "Morrisons Online", Some(27400001), 2),
        n(27500002, "Waitrose Online", Some(27500001), 2),
        n(27600002, "Co-op Online", Some(27600001), 2),
        n(27900002, "Boots Online", Some(27900001), 2),
        n(27900004, "Superdrug Online", Some(27900003), 2),
    ]
}

/// Manufacturer → price tier. Premium chocolate houses price premium,
/// private label and hard discount own-brands price value.
fn tier_for(manufacturer: &str) -> PriceTier {
    match manufacturer {
        "LINDT" | "HOTEL CHOCOLAT" | "GODIVA" | "FERRERO" => PriceTier::Premium,
        "PRIVATE LABEL" | "ALDI" | "LIDL" => PriceTier::Value,
        _ => PriceTier::Standard,
    }
}

fn product(
    key: u32,
    manufacturer: &str,
    brand: &str,
    segment: &str,
    subsegment: &str,
    seasonal: SeasonalCategory,
    size: &str,
) -> Product {
    Product {
        key: ProductKey(key),
        description: format!("{brand} {subsegment} {size}"),
        category: "CONFECTIONERY".to_string(),
        segment: segment.to_string(),
        subsegment: subsegment.to_string(),
        brand: brand.to_string(),
        manufacturer: manufacturer.to_string(),
        seasonal,
        tier: tier_for(manufacturer),
    }
}

/// Authored confectionery catalog. The BIG BITE lines carry the steered
/// brand's growth story (ORIGINAL declining, DELUXE/VELVET stars); the rest
/// spans the major manufacturers across segments, tiers and seasonal windows.
pub fn canonical_products() -> Vec<Product> {
    use SeasonalCategory::{Christmas, Easter, None as Plain, Valentine};
    let p = product;
    vec![
        // ── BIG BITE CHOCOLATES — the designated brand ───────────────────────
        p(10010001, "BIG BITE CHOCOLATES", "BIG BITE ORIGINAL", "BARS / COUNTLINES", "MILK", Plain, "45G"),
        p(10010002, "BIG BITE CHOCOLATES", "BIG BITE DELUXE", "BLOCKS & TABLETS", "HAZELNUT", Plain, "100G"),
        p(10010003, "BIG BITE CHOCOLATES", "BIG BITE VELVET", "BLOCKS & TABLETS", "CARAMEL", Plain, "90G"),
        p(10010004, "BIG BITE CHOCOLATES", "BIG BITE CRUNCH", "BARS / COUNTLINES", "WAFER", Plain, "40G"),
        p(10010005, "BIG BITE CHOCOLATES", "BIG BITE DELUXE", "SEASONAL & GIFTING", "ADVENT CALENDARS", Christmas, "250G"),
        p(10010006, "BIG BITE CHOCOLATES", "BIG BITE ORIGINAL", "SEASONAL & GIFTING", "EASTER EGGS", Easter, "200G"),
        // ── MONDELEZ ─────────────────────────────────────────────────────────
        p(20010001, "MONDELEZ", "CADBURY DAIRY MILK", "BLOCKS & TABLETS", "MILK", Plain, "110G"),
        p(20010002, "MONDELEZ", "CADBURY BUTTONS", "SHARING BAGS & POUCHES", "BUTTONS", Plain, "119G"),
        p(20010003, "MONDELEZ", "CADBURY TWIRL", "BARS / COUNTLINES", "FILLED", Plain, "43G"),
        p(20010004, "MONDELEZ", "CADBURY HEROES", "BOXED & ASSORTMENTS", "EVERYDAY ASSORTMENTS", Plain, "185G"),
        p(20010005, "MONDELEZ", "CADBURY SELECTION BOX", "SEASONAL & GIFTING", "CHRISTMAS NOVELTIES", Christmas, "180G"),
        p(20010006, "MONDELEZ", "CADBURY CREME EGG", "SEASONAL & GIFTING", "EASTER EGGS", Easter, "40G"),
        p(20010007, "MONDELEZ", "MILKA", "BLOCKS & TABLETS", "MILK", Plain, "100G"),
        p(20010008, "MONDELEZ", "GREEN & BLACKS", "BLOCKS & TABLETS", "DARK", Plain, "90G"),
        // ── MARS ─────────────────────────────────────────────────────────────
        p(30010001, "MARS", "MARS BAR", "BARS / COUNTLINES", "FILLED", Plain, "51G"),
        p(30010002, "MARS", "SNICKERS", "BARS / COUNTLINES", "FILLED", Plain, "48G"),
        p(30010003, "MARS", "GALAXY", "BLOCKS & TABLETS", "MILK", Plain, "110G"),
        p(30010004, "MARS", "MALTESERS", "SHARING BAGS & POUCHES", "MINIS", Plain, "102G"),
        p(30010005, "MARS", "CELEBRATIONS", "BOXED & ASSORTMENTS", "EVERYDAY ASSORTMENTS", Christmas, "240G"),
        p(30010006, "MARS", "GALAXY HEARTS", "SEASONAL & GIFTING", "VALENTINE HEARTS", Valentine, "114G"),
        // ── NESTLE ───────────────────────────────────────────────────────────
        p(40010001, "NESTLE", "KITKAT", "BARS / COUNTLINES", "WAFER", Plain, "41G"),
        p(40010002, "NESTLE", "AERO", "BLOCKS & TABLETS", "MILK", Plain, "90G"),
        p(40010003, "NESTLE", "SMARTIES", "SHARING BAGS & POUCHES", "MINIS", Plain, "118G"),
        p(40010004, "NESTLE", "QUALITY STREET", "BOXED & ASSORTMENTS", "EVERYDAY ASSORTMENTS", Christmas, "220G"),
        p(40010005, "NESTLE", "SMARTIES", "SEASONAL & GIFTING", "EASTER EGGS", Easter, "119G"),
        // ── LINDT ────────────────────────────────────────────────────────────
        p(50010001, "LINDT", "LINDT EXCELLENCE", "BLOCKS & TABLETS", "DARK", Plain, "100G"),
        p(50010002, "LINDT", "LINDT LINDOR", "BOXED & ASSORTMENTS", "PREMIUM PRALINES", Plain, "200G"),
        p(50010003, "LINDT", "LINDT GOLD BUNNY", "SEASONAL & GIFTING", "EASTER EGGS", Easter, "100G"),
        p(50010004, "LINDT", "LINDT LINDOR", "SEASONAL & GIFTING", "VALENTINE HEARTS", Valentine, "160G"),
        p(50010005, "LINDT", "LINDT TEDDY", "SEASONAL & GIFTING", "CHRISTMAS NOVELTIES", Christmas, "100G"),
        // ── FERRERO ──────────────────────────────────────────────────────────
        p(60010001, "FERRERO", "FERRERO ROCHER", "BOXED & ASSORTMENTS", "PREMIUM PRALINES", Christmas, "200G"),
        p(60010002, "FERRERO", "KINDER BUENO", "BARS / COUNTLINES", "WAFER", Plain, "43G"),
        p(60010003, "FERRERO", "KINDER SURPRISE", "SEASONAL & GIFTING", "EASTER EGGS", Easter, "100G"),
        p(60010004, "FERRERO", "THORNTONS CONTINENTAL", "BOXED & ASSORTMENTS", "LUXURY GIFT BOXES", Plain, "264G"),
        // ── PRIVATE LABEL ────────────────────────────────────────────────────
        p(70010001, "PRIVATE LABEL", "TESCO FINEST", "BLOCKS & TABLETS", "DARK", Plain, "100G"),
        p(70010002, "PRIVATE LABEL", "SAINSBURYS TASTE THE DIFFERENCE", "BOXED & ASSORTMENTS", "EVERYDAY ASSORTMENTS", Plain, "180G"),
        p(70010003, "PRIVATE LABEL", "ALDI MOSER ROTH", "BLOCKS & TABLETS", "DARK", Plain, "125G"),
        p(70010004, "PRIVATE LABEL", "LIDL FIN CARRE", "BLOCKS & TABLETS", "MILK", Plain, "100G"),
        p(70010005, "PRIVATE LABEL", "MORRISONS THE BEST", "SEASONAL & GIFTING", "ADVENT CALENDARS", Christmas, "240G"),
        p(70010006, "PRIVATE LABEL", "TESCO", "SEASONAL & GIFTING", "EASTER EGGS", Easter, "150G"),
        // ── Long tail ────────────────────────────────────────────────────────
        p(80010001, "HERSHEY", "HERSHEYS", "BLOCKS & TABLETS", "MILK", Plain, "100G"),
        p(80010002, "CLOETTA", "CLOETTA SPRINKLE", "SHARING BAGS & POUCHES", "MIXED BITES", Plain, "140G"),
        p(80010003, "FAZER", "FAZER BLUE", "BLOCKS & TABLETS", "MILK", Plain, "145G"),
        p(80010004, "HOTEL CHOCOLAT", "HOTEL CHOCOLAT SLEEKSTER", "BOXED & ASSORTMENTS", "LUXURY GIFT BOXES", Plain, "310G"),
        p(80010005, "GODIVA", "GODIVA GOLD", "BOXED & ASSORTMENTS", "PREMIUM PRALINES", Valentine, "190G"),
        p(80010006, "TONY CHOCOLONELY", "TONYS MILK", "BLOCKS & TABLETS", "MILK", Plain, "180G"),
    ]
}
