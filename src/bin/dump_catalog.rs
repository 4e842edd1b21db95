use std::collections::HashMap;

use shelfsim::catalog::{GeographyTree, ProductCatalog};
use shelfsim::config::SimulationConfig;

fn main() {
    let config = SimulationConfig::canonical();

    let tree = GeographyTree::new(config.geography).expect("canonical geography must be valid");
    let catalog = ProductCatalog::new(config.products).expect("canonical catalog must be valid");

    // Write NDJSON to stdout: geography first, then products.
    for node in tree.iter() {
        println!("{}", serde_json::to_string(node).expect("serialisation failed"));
    }
    for product in catalog.iter() {
        println!("{}", serde_json::to_string(product).expect("serialisation failed"));
    }

    // Summaries to stderr.
    let mut level_counts: HashMap<u8, usize> = HashMap::new();
    for node in tree.iter() {
        *level_counts.entry(node.hierarchy_level).or_insert(0) += 1;
    }
    let mut levels: Vec<_> = level_counts.into_iter().collect();
    levels.sort();
    eprintln!("Geography: {} nodes", tree.len());
    for (level, count) in levels {
        eprintln!("  level {level}: {count}");
    }

    let mut manufacturer_counts: HashMap<&str, usize> = HashMap::new();
    let mut seasonal_counts: HashMap<String, usize> = HashMap::new();
    for product in catalog.iter() {
        *manufacturer_counts.entry(product.manufacturer.as_str()).or_insert(0) += 1;
        *seasonal_counts.entry(format!("{:?}", product.seasonal)).or_insert(0) += 1;
    }
    let mut manufacturers: Vec<_> = manufacturer_counts.into_iter().collect();
    manufacturers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    eprintln!("Products: {}", catalog.len());
    for (manufacturer, count) in manufacturers {
        eprintln!("  {manufacturer}: {count}");
    }
    let mut seasons: Vec<_> = seasonal_counts.into_iter().collect();
    seasons.sort();
    for (season, count) in seasons {
        eprintln!("  seasonal {season}: {count}");
    }
}
