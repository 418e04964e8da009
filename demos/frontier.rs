//! MAD Efficient Frontier Example
//!
//! Sweeps the full frontier of a small four-asset universe, prints every
//! breakpoint, compares the end points with the benchmark portfolios and
//! writes the frontier table as CSV to stdout.
//!
//! Pass a CSV file path (header row of asset labels, optional `Year-Month`
//! column) to sweep your own data instead.

use std::error::Error;
use std::fs::File;

use madfrontier::benchmarks::{equal_weight, max_return, min_risk, single_assets};
use madfrontier::prelude::*;

const SAMPLE: &str = "\
Year-Month,SPY,TLT,GLD,QQQ
2023-01,1.031,1.012,0.994,1.045
2023-02,0.978,1.021,1.013,0.962
2023-03,1.024,0.991,1.007,1.038
2023-04,1.006,1.004,0.982,1.011
2023-05,0.957,1.030,1.026,0.941
2023-06,1.042,0.987,0.998,1.057
";

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();

    let table = match std::env::args().nth(1) {
        Some(path) => {
            ReturnsTable::from_csv_reader(File::open(&path)?, Some("Year-Month"))?
        }
        None => ReturnsTable::from_csv_reader(SAMPLE.as_bytes(), Some("Year-Month"))?,
    };

    println!("=== MAD Efficient Frontier ===\n");
    for s in summarize(&table) {
        println!(
            "{:>6}: mean {:.6}  std {:.6}  min {:.4}  max {:.4}",
            s.asset, s.mean, s.std_dev, s.min, s.max
        );
    }

    let problem = MadProblem::formulate(&table)?;
    let frontier = Sweep::new(&problem, SweepSettings::default()).run()?;

    println!("\n{} breakpoints, {} pivots:", frontier.len(), frontier.pivots());
    for bp in frontier.breakpoints() {
        let weights: Vec<String> = frontier
            .weights_by_asset(bp)
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(asset, w)| format!("{}={:.4}", asset, w))
            .collect();
        println!(
            "  mu in ({:.6}, {:.6}]: reward {:.6}  risk {:.6}  [{}]",
            bp.mu_low,
            bp.mu_high,
            bp.reward,
            bp.risk,
            weights.join(", ")
        );
    }
    for d in frontier.diagnostics() {
        println!("  note: {:?}", d);
    }

    println!("\nBenchmarks:");
    let mut benchmarks = vec![equal_weight(&problem), max_return(&problem)];
    benchmarks.extend(min_risk(&frontier));
    benchmarks.extend(single_assets(&problem));
    for b in &benchmarks {
        println!(
            "  {:>20}: reward {:.6}  risk {:.6}  ratio {:.4}",
            b.name,
            b.reward,
            b.risk,
            b.sharpe(1.0)
        );
    }

    println!("\nFrontier table:");
    frontier.write_csv(std::io::stdout())?;
    Ok(())
}
