use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::types::{GeographyKey, ProductKey};

/// Fatal setup problems. Surfaced before any output is produced; a run that
/// fails here has emitted nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No level-0 aggregate node in the geography set.
    MissingRootGeography,
    /// More than one parentless node — the structure must be a single tree.
    MultipleRootGeographies { count: usize },
    /// A node references a parent key that is not in the set.
    MissingParent { child: GeographyKey, parent: GeographyKey },
    DuplicateGeographyKey { key: GeographyKey },
    /// Node not reachable from the root (cycle or disconnected subtree).
    UnreachableGeography { key: GeographyKey },
    EmptyCatalog,
    EmptyPeriodSequence,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRootGeography => write!(f, "geography set has no root aggregate node"),
            Self::MultipleRootGeographies { count } => {
                write!(f, "geography set has {count} parentless nodes, expected exactly 1")
            }
            Self::MissingParent { child, parent } => {
                write!(f, "geography {} references missing parent {}", child.0, parent.0)
            }
            Self::DuplicateGeographyKey { key } => {
                write!(f, "duplicate geography key {}", key.0)
            }
            Self::UnreachableGeography { key } => {
                write!(f, "geography {} is not reachable from the root", key.0)
            }
            Self::EmptyCatalog => write!(f, "product catalog is empty"),
            Self::EmptyPeriodSequence => write!(f, "period sequence is empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Retail channel classification for a geography node. Selects the node's
/// log-normal sales profile and its level-1 allocation weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StoreType {
    /// Whole-market aggregate (root only).
    Aggregate,
    Premium,
    Major,
    Discount,
    Convenience,
    Online,
}

impl StoreType {
    /// Classify a node from its display name. The premium check runs before
    /// the online check so "Waitrose Online" keeps the premium profile; the
    /// allocator's online-channel rule matches on the name separately.
    pub fn classify(name: &str, hierarchy_level: u8) -> StoreType {
        if hierarchy_level == 0 {
            return StoreType::Aggregate;
        }
        let lower = name.to_lowercase();
        if lower.contains("waitrose") {
            StoreType::Premium
        } else if lower.contains("aldi")
            || lower.contains("lidl")
            || lower.contains("poundland")
            || lower.contains("home bargains")
            || lower.contains("b&m")
        {
            StoreType::Discount
        } else if lower.contains("online") {
            StoreType::Online
        } else if lower.contains("express")
            || lower.contains("local")
            || lower.contains("metro")
            || lower.contains("convenience")
        {
            StoreType::Convenience
        } else {
            StoreType::Major
        }
    }
}

/// Whether a node name denotes an online channel. Used by the allocator's
/// special pass-down rule, independently of the store-type profile.
pub fn is_online_channel(name: &str) -> bool {
    name.to_lowercase().contains("online")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeographyNode {
    pub key: GeographyKey,
    pub name: String,
    pub parent: Option<GeographyKey>,
    /// 0 = whole-market aggregate, increasing toward leaves.
    pub hierarchy_level: u8,
    pub store_type: StoreType,
}

impl GeographyNode {
    pub fn new(key: u32, name: &str, parent: Option<u32>, hierarchy_level: u8) -> Self {
        GeographyNode {
            key: GeographyKey(key),
            name: name.to_string(),
            parent: parent.map(GeographyKey),
            hierarchy_level,
            store_type: StoreType::classify(name, hierarchy_level),
        }
    }
}

/// Validated geography hierarchy. Construction checks the tree invariants
/// (single root, parents present, no cycles); the structure is immutable
/// afterwards. Nodes and child lists are held in key order so iteration — and
/// therefore RNG consumption during allocation — is deterministic.
pub struct GeographyTree {
    nodes: Vec<GeographyNode>,
    index: HashMap<GeographyKey, usize>,
    children: HashMap<GeographyKey, Vec<GeographyKey>>,
    root: GeographyKey,
}

impl GeographyTree {
    pub fn new(mut nodes: Vec<GeographyNode>) -> Result<Self, ConfigError> {
        nodes.sort_by_key(|n| n.key);

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.key, i).is_some() {
                return Err(ConfigError::DuplicateGeographyKey { key: node.key });
            }
        }

        let roots: Vec<GeographyKey> =
            nodes.iter().filter(|n| n.parent.is_none()).map(|n| n.key).collect();
        let root = match roots.as_slice() {
            [] => return Err(ConfigError::MissingRootGeography),
            [only] => *only,
            many => return Err(ConfigError::MultipleRootGeographies { count: many.len() }),
        };

        let mut children: HashMap<GeographyKey, Vec<GeographyKey>> = HashMap::new();
        for node in &nodes {
            if let Some(parent) = node.parent {
                if !index.contains_key(&parent) {
                    return Err(ConfigError::MissingParent { child: node.key, parent });
                }
                children.entry(parent).or_default().push(node.key);
            }
        }
        for list in children.values_mut() {
            list.sort();
        }

        // Walk down from the root; anything unvisited sits on a cycle or a
        // disconnected fragment.
        let mut visited: HashSet<GeographyKey> = HashSet::with_capacity(nodes.len());
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            if visited.insert(key)
                && let Some(kids) = children.get(&key)
            {
                stack.extend(kids.iter().copied());
            }
        }
        if let Some(stranded) = nodes.iter().find(|n| !visited.contains(&n.key)) {
            return Err(ConfigError::UnreachableGeography { key: stranded.key });
        }

        Ok(GeographyTree { nodes, index, children, root })
    }

    pub fn root(&self) -> &GeographyNode {
        &self.nodes[self.index[&self.root]]
    }

    pub fn get(&self, key: GeographyKey) -> Option<&GeographyNode> {
        self.index.get(&key).map(|&i| &self.nodes[i])
    }

    /// Child keys of `key`, in key order. Empty for leaves.
    pub fn children(&self, key: GeographyKey) -> &[GeographyKey] {
        self.children.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes at a hierarchy level, in key order.
    pub fn level(&self, hierarchy_level: u8) -> impl Iterator<Item = &GeographyNode> {
        self.nodes.iter().filter(move |n| n.hierarchy_level == hierarchy_level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeographyNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Demand-bump window a product participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SeasonalCategory {
    None,
    Christmas,
    Easter,
    Valentine,
}

/// Price positioning, used for elasticity and shelf-price draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PriceTier {
    Premium,
    Standard,
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub key: ProductKey,
    pub description: String,
    pub category: String,
    pub segment: String,
    pub subsegment: String,
    pub brand: String,
    pub manufacturer: String,
    pub seasonal: SeasonalCategory,
    pub tier: PriceTier,
}

/// Immutable product set, keyed and iterated in key order.
pub struct ProductCatalog {
    products: Vec<Product>,
    index: HashMap<ProductKey, usize>,
}

impl ProductCatalog {
    pub fn new(mut products: Vec<Product>) -> Result<Self, ConfigError> {
        if products.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        products.sort_by_key(|p| p.key);
        let index = products.iter().enumerate().map(|(i, p)| (p.key, i)).collect();
        Ok(ProductCatalog { products, index })
    }

    pub fn get(&self, key: ProductKey) -> Option<&Product> {
        self.index.get(&key).map(|&i| &self.products[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Keys of products whose brand contains `fragment` (case-insensitive).
    /// Used to resolve the designated brand's product set.
    pub fn keys_matching_brand(&self, fragment: &str) -> HashSet<ProductKey> {
        let needle = fragment.to_lowercase();
        self.products
            .iter()
            .filter(|p| p.brand.to_lowercase().contains(&needle))
            .map(|p| p.key)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(key: u32, name: &str, parent: Option<u32>, level: u8) -> GeographyNode {
        GeographyNode::new(key, name, parent, level)
    }

    fn small_tree() -> Vec<GeographyNode> {
        vec![
            node(1, "All Outlets", None, 0),
            node(10, "Tesco", Some(1), 1),
            node(11, "Waitrose", Some(1), 1),
            node(20, "Tesco Online", Some(10), 2),
            node(21, "Tesco Express", Some(10), 2),
        ]
    }

    // ── Store classification ──────────────────────────────────────────────────

    #[test]
    fn classify_covers_all_channel_kinds() {
        assert_eq!(StoreType::classify("All Outlets", 0), StoreType::Aggregate);
        assert_eq!(StoreType::classify("Waitrose", 1), StoreType::Premium);
        assert_eq!(StoreType::classify("Aldi", 1), StoreType::Discount);
        assert_eq!(StoreType::classify("Poundland", 1), StoreType::Discount);
        assert_eq!(StoreType::classify("Tesco Online", 2), StoreType::Online);
        assert_eq!(StoreType::classify("Sainsburys Local", 2), StoreType::Convenience);
        assert_eq!(StoreType::classify("Tesco Metro", 2), StoreType::Convenience);
        assert_eq!(StoreType::classify("Morrisons", 1), StoreType::Major);
    }

    #[test]
    fn premium_name_wins_over_online_suffix() {
        assert_eq!(StoreType::classify("Waitrose Online", 2), StoreType::Premium);
        assert!(is_online_channel("Waitrose Online"));
    }

    // ── Tree construction ─────────────────────────────────────────────────────

    #[test]
    fn tree_builds_and_orders_children() {
        let tree = GeographyTree::new(small_tree()).unwrap();
        assert_eq!(tree.root().key, GeographyKey(1));
        assert_eq!(tree.children(GeographyKey(1)), &[GeographyKey(10), GeographyKey(11)]);
        assert_eq!(tree.children(GeographyKey(10)), &[GeographyKey(20), GeographyKey(21)]);
        assert!(tree.children(GeographyKey(11)).is_empty());
        assert_eq!(tree.level(1).count(), 2);
    }

    #[test]
    fn missing_root_is_fatal() {
        // A lone orphan has no parentless node, so the root check fires first.
        let nodes = vec![node(10, "Tesco", Some(1), 1)];
        assert_eq!(GeographyTree::new(nodes).err().unwrap(), ConfigError::MissingRootGeography);
        let no_root: Vec<GeographyNode> = vec![];
        assert_eq!(GeographyTree::new(no_root).err().unwrap(), ConfigError::MissingRootGeography);
    }

    #[test]
    fn missing_parent_is_fatal() {
        let mut nodes = small_tree();
        nodes.push(node(40, "Spar", Some(99), 1));
        assert_eq!(
            GeographyTree::new(nodes).err().unwrap(),
            ConfigError::MissingParent { child: GeographyKey(40), parent: GeographyKey(99) }
        );
    }

    #[test]
    fn two_roots_rejected() {
        let nodes = vec![node(1, "A", None, 0), node(2, "B", None, 0)];
        assert_eq!(
            GeographyTree::new(nodes).err().unwrap(),
            ConfigError::MultipleRootGeographies { count: 2 }
        );
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut nodes = small_tree();
        nodes.push(node(10, "Tesco Again", Some(1), 1));
        assert_eq!(
            GeographyTree::new(nodes).err().unwrap(),
            ConfigError::DuplicateGeographyKey { key: GeographyKey(10) }
        );
    }

    #[test]
    fn cycle_rejected_as_unreachable() {
        // 30 → 31 → 30 with valid parent references but no path from the root.
        let mut nodes = small_tree();
        nodes.push(node(30, "Loop A", Some(31), 2));
        nodes.push(node(31, "Loop B", Some(30), 2));
        assert_eq!(
            GeographyTree::new(nodes).err().unwrap(),
            ConfigError::UnreachableGeography { key: GeographyKey(30) }
        );
    }

    // ── Product catalog ───────────────────────────────────────────────────────

    fn product(key: u32, brand: &str) -> Product {
        Product {
            key: ProductKey(key),
            description: format!("{brand} MILK CHOCOLATE 100G"),
            category: "CONFECTIONERY".to_string(),
            segment: "BLOCKS & TABLETS".to_string(),
            subsegment: "MILK".to_string(),
            brand: brand.to_string(),
            manufacturer: "TESTCO".to_string(),
            seasonal: SeasonalCategory::None,
            tier: PriceTier::Standard,
        }
    }

    #[test]
    fn empty_catalog_is_fatal() {
        assert_eq!(ProductCatalog::new(vec![]).err().unwrap(), ConfigError::EmptyCatalog);
    }

    #[test]
    fn brand_match_is_case_insensitive() {
        let catalog = ProductCatalog::new(vec![
            product(1, "BIG BITE ORIGINAL"),
            product(2, "BIG BITE DELUXE"),
            product(3, "GALAXY"),
        ])
        .unwrap();
        let keys = catalog.keys_matching_brand("big bite");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&ProductKey(1)) && keys.contains(&ProductKey(2)));
    }

    #[test]
    fn catalog_iterates_in_key_order() {
        let catalog =
            ProductCatalog::new(vec![product(5, "B"), product(1, "A"), product(3, "C")]).unwrap();
        let keys: Vec<u32> = catalog.iter().map(|p| p.key.0).collect();
        assert_eq!(keys, vec![1, 3, 5]);
    }
}
