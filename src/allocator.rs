use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::{Distribution, LogNormal};

use crate::catalog::{GeographyTree, StoreType, is_online_channel};
use crate::config::{allocation_weight, store_profile};
use crate::types::GeographyKey;

/// Allocates one period's sales for a single product down the geography
/// hierarchy: a log-normal draw at the root, a fixed-ratio split to level 1
/// weighted by store type, and a partial pass-down to each retailer's
/// sub-formats. All randomness comes from the caller's RNG handle; given the
/// same stream the allocation is fully determined.
pub struct HierarchicalAllocator {
    hierarchy_ratio: f64,
}

impl HierarchicalAllocator {
    pub fn new(hierarchy_ratio: f64) -> Self {
        HierarchicalAllocator { hierarchy_ratio }
    }

    /// Raw per-geography values for one (product, period), scaled by
    /// `base_multiplier` (the seasonal/lifecycle factor). Returned in key
    /// order; the tree's root is always present.
    pub fn allocate(
        &self,
        tree: &GeographyTree,
        base_multiplier: f64,
        rng: &mut impl Rng,
    ) -> BTreeMap<GeographyKey, f64> {
        let mut sales = BTreeMap::new();

        let root = tree.root();
        let profile = store_profile(StoreType::Aggregate);
        let draw = LogNormal::new(profile.mean, profile.std)
            .expect("invalid aggregate profile")
            .sample(rng);
        let root_value = (draw * base_multiplier).clamp(profile.min, profile.max);
        sales.insert(root.key, root_value);

        let level1_target = root_value / self.hierarchy_ratio;

        let level1: Vec<_> = tree.level(1).collect();
        let total_weight: f64 =
            level1.iter().map(|n| allocation_weight(n.store_type)).sum();
        if total_weight <= 0.0 {
            return sales;
        }

        for node in level1 {
            let weight = allocation_weight(node.store_type) / total_weight;
            let jitter = rng.random_range(0.9..1.1);
            let noise = rng.random_range(0.8..1.2);
            let profile = store_profile(node.store_type);
            let value =
                (level1_target * weight * jitter * noise).clamp(profile.min, profile.max);
            sales.insert(node.key, value);

            self.allocate_children(tree, node.key, value, &mut sales, rng);
        }

        sales
    }

    /// Pass a fraction of a retailer's value down to its sub-formats. Online
    /// channels draw 10–30 % of the parent's full value; the remaining
    /// children split a 30–70 % remainder pool by jittered weights, so the
    /// children never sum past the parent.
    fn allocate_children(
        &self,
        tree: &GeographyTree,
        parent: GeographyKey,
        parent_value: f64,
        sales: &mut BTreeMap<GeographyKey, f64>,
        rng: &mut impl Rng,
    ) {
        let children = tree.children(parent);
        if children.is_empty() {
            return;
        }

        let pass_down = rng.random_range(0.3..0.7);
        let pool = parent_value * pass_down;

        let mut weighted: Vec<(GeographyKey, f64)> = Vec::new();
        let mut weight_total = 0.0;
        for &child_key in children {
            let Some(child) = tree.get(child_key) else { continue };
            if is_online_channel(&child.name) {
                sales.insert(child_key, parent_value * rng.random_range(0.1..0.3));
            } else {
                let weight = rng.random_range(0.2..0.5);
                weight_total += weight;
                weighted.push((child_key, weight));
            }
        }
        for (child_key, weight) in weighted {
            sales.insert(child_key, pool * weight / weight_total);
        }
    }
}
