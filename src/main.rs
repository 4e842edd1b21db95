use std::fs::File;
use std::io::{BufWriter, Write};

use shelfsim::analysis::{self, RunSummary};
use shelfsim::catalog::{GeographyTree, ProductCatalog};
use shelfsim::config::SimulationConfig;
use shelfsim::observation::MemorySink;
use shelfsim::simulation::Simulation;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut seed_override: Option<u64> = None;
    let mut weeks_override: Option<usize> = None;
    let mut sample_override: Option<usize> = None;
    let mut output_path = "observations.ndjson".to_string();
    let mut quiet = false;
    let mut runs: Option<u64> = None;
    let mut output_dir_opt: Option<String> = None;
    let mut csv_path_opt: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                seed_override = Some(args[i].parse().expect("--seed requires a u64"));
            }
            "--weeks" => {
                i += 1;
                weeks_override = Some(args[i].parse().expect("--weeks requires a positive integer"));
            }
            "--products" => {
                i += 1;
                sample_override =
                    Some(args[i].parse().expect("--products requires a positive integer"));
            }
            "--output" => {
                i += 1;
                output_path = args[i].clone();
            }
            "--quiet" => quiet = true,
            "--runs" => {
                i += 1;
                runs = Some(args[i].parse().expect("--runs requires a positive integer"));
            }
            "--output-dir" => {
                i += 1;
                output_dir_opt = Some(args[i].clone());
            }
            "--csv" => {
                i += 1;
                csv_path_opt = Some(args[i].clone());
            }
            _ => {}
        }
        i += 1;
    }

    let mut base_config = SimulationConfig::canonical();
    let start_seed = seed_override.unwrap_or(base_config.seed);
    if let Some(w) = weeks_override {
        base_config.n_weeks = w;
    }
    if let Some(n) = sample_override {
        base_config.sample_size = n;
    }

    if let Some(n) = runs {
        use rayon::prelude::*;

        if let Some(ref dir) = output_dir_opt {
            std::fs::create_dir_all(dir).expect("failed to create output directory");
        }

        let summaries: Vec<RunSummary> = (0u64..n)
            .into_par_iter()
            .map(|i| {
                let seed = start_seed + i;
                let mut config = base_config.clone();
                config.seed = seed;
                let mut sim = build_simulation(config);
                let mut sink = MemorySink::new();
                sim.run(&mut sink);

                if let Some(ref dir) = output_dir_opt {
                    let path = format!("{dir}/observations_seed_{seed}.ndjson");
                    write_ndjson(&sink, &path);
                    if !quiet {
                        println!("Seed {seed}: {} observations → {path}", sink.total_observations());
                    }
                }

                analysis::summarize(seed, &sink.batches, sim.controller())
            })
            .collect();

        if let Some(ref csv_path) = csv_path_opt {
            write_runs_csv(&summaries, csv_path);
        }

        if !quiet {
            print_run_summaries(&summaries);
            match analysis::analyse_distributions(&summaries) {
                Some(dist) => print_distributions(&dist, n),
                None => eprintln!("Warning: Distribution requires >= 2 runs"),
            }
        }
    } else {
        let mut config = base_config;
        config.seed = start_seed;

        // Analysis needs its own view of the world the engine was built from.
        let tree = GeographyTree::new(config.geography.clone())
            .expect("canonical geography must be valid");
        let catalog = ProductCatalog::new(config.products.clone())
            .expect("canonical catalog must be valid");

        let mut sim = build_simulation(config);
        let mut sink = MemorySink::new();
        sim.run(&mut sink);

        write_ndjson(&sink, &output_path);

        if !quiet {
            println!("Observations emitted: {}", sink.total_observations());
            print_analysis(&sink, &sim, &tree, &catalog);
        }
    }
}

fn build_simulation(config: SimulationConfig) -> Simulation {
    match Simulation::from_config(config) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    }
}

fn write_ndjson(sink: &MemorySink, path: &str) {
    let file = File::create(path).unwrap_or_else(|e| panic!("failed to create {path}: {e}"));
    let mut writer = BufWriter::new(file);
    for obs in sink.observations() {
        serde_json::to_writer(&mut writer, obs).expect("failed to serialize observation");
        writeln!(writer).expect("failed to write newline");
    }
}

fn print_analysis(
    sink: &MemorySink,
    sim: &Simulation,
    tree: &GeographyTree,
    catalog: &ProductCatalog,
) {
    // ── Structure invariants ──────────────────────────────────────────────────
    let structure = analysis::verify_structure(&sink.batches, tree);

    use shelfsim::analysis::StructureViolation;
    let sinv = |variant: fn(&StructureViolation) -> bool| {
        if structure.iter().any(variant) { "FAIL" } else { "PASS" }
    };

    println!("\n=== Structure invariants ===");
    println!("  [1] Root ≈ 2.5 × Σ(level-1):     {}", sinv(|v| matches!(v, StructureViolation::HierarchyRatioDrift { .. })));
    println!("  [2] Parent > Σ(children):        {}", sinv(|v| matches!(v, StructureViolation::ChildrenExceedParent { .. })));

    if !structure.is_empty() {
        println!("\n  {} violation(s):", structure.len());
        for v in structure.iter().take(10) {
            println!("    {v}");
        }
    }

    // ── Dynamics invariants ───────────────────────────────────────────────────
    let dynamics = analysis::verify_dynamics(&sink.batches, catalog, sim.controller());

    use shelfsim::analysis::DynamicsViolation;
    let dinv = |variant: fn(&DynamicsViolation) -> bool| {
        if dynamics.iter().any(variant) { "FAIL" } else { "PASS" }
    };

    println!("\n=== Dynamics invariants ===");
    println!("  [3] Series smoothness:           {}", dinv(|v| matches!(v, DynamicsViolation::SeriesTooNoisy { .. })));
    println!("  [4] Brand share within band:     {}", dinv(|v| matches!(v, DynamicsViolation::ShareOutOfBand { .. })));
    println!("  [5] Seasonal peak concentration: {}", dinv(|v| matches!(v, DynamicsViolation::SeasonalConcentrationWeak { .. })));

    if !dynamics.is_empty() {
        println!("\n  {} violation(s):", dynamics.len());
        for v in dynamics.iter().take(10) {
            println!("    {v}");
        }
    }

    let (median_change, pairs) = analysis::smoothness(&sink.batches);
    println!(
        "\n  Median |week-over-week %change|: {:.1}% over {pairs} consecutive pairs",
        median_change * 100.0
    );

    // ── Period character table (quarterly sample) ─────────────────────────────
    let stats = analysis::period_stats(&sink.batches, sim.controller());
    if stats.is_empty() {
        return;
    }

    println!("\n=== Period character table (quarterly sample) ===");
    println!(
        "{:>6} | {:>8} | {:>14} | {:>12} | {:>7} | {:>13}",
        "Period", "Records", "Value", "Brand value", "Share%", "Band"
    );
    println!("{}", "-".repeat(6 + 3 + 8 + 3 + 14 + 3 + 12 + 3 + 7 + 3 + 13));
    for s in stats.iter().step_by(13) {
        println!(
            "{:>6} | {:>8} | {:>14.1} | {:>12.1} | {:>6.2}% | [{:>4.2}, {:>5.2}]",
            s.period.0, s.records, s.total_value, s.brand_value, s.share_pct, s.band_min_pct, s.band_max_pct
        );
    }
}

fn write_runs_csv(summaries: &[RunSummary], path: &str) {
    let file = File::create(path).unwrap_or_else(|e| panic!("failed to create {path}: {e}"));
    let mut w = BufWriter::new(file);
    writeln!(w, "seed,records,total_value,mean_share_pct,median_abs_change").expect("write");
    for s in summaries {
        writeln!(
            w,
            "{},{},{:.2},{:.4},{:.6}",
            s.seed, s.records, s.total_value, s.mean_share_pct, s.median_abs_change
        )
        .expect("write");
    }
}

fn print_run_summaries(summaries: &[RunSummary]) {
    println!("\n=== Per-Run Summary ===");
    println!(
        "{:>6} | {:>9} | {:>14} | {:>7} | {:>9}",
        "Seed", "Records", "Value", "Share%", "MedChg%"
    );
    println!("{}", "-".repeat(60));
    for s in summaries {
        println!(
            "{:>6} | {:>9} | {:>14.1} | {:>6.2}% | {:>8.2}%",
            s.seed,
            s.records,
            s.total_value,
            s.mean_share_pct,
            s.median_abs_change * 100.0
        );
    }
}

fn print_dist_row(label: &str, ds: &analysis::DistStats, scale: f64) {
    println!(
        "{label:>10} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1} | {:>8.1}",
        ds.min * scale,
        ds.p5 * scale,
        ds.p25 * scale,
        ds.p50 * scale,
        ds.p75 * scale,
        ds.p95 * scale,
        ds.max * scale,
        ds.mean * scale,
        ds.std_dev * scale,
    );
}

fn print_distributions(dist: &analysis::RunDist, n_runs: u64) {
    println!("\n=== Multi-Run Distribution (N={n_runs} runs) ===");
    println!(
        "{:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>8}",
        "Metric", "min", "p5", "p25", "p50", "p75", "p95", "max", "mean", "stddev"
    );
    print_dist_row("Records", &dist.records, 1.0);
    print_dist_row("Value", &dist.total_value, 1.0);
    print_dist_row("Share%", &dist.mean_share_pct, 1.0);
    print_dist_row("MedChg%", &dist.median_abs_change, 100.0);
}
