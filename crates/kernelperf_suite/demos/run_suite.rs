//! Runs the kernel suite and prints the summary table.
//!
//! ## Usage
//!
//! ```bash
//! # defaults, every kernel and variant
//! cargo run --release -p kernelperf_suite --example run_suite
//!
//! # small problem, two variants, JSON report and event log
//! KERNELPERF_SIZE=100000 KERNELPERF_VARIANTS=Base_Seq,Base_OpenMP \
//! KERNELPERF_REPORT=target/report.json KERNELPERF_LOG=target/run.jsonl \
//!     cargo run --release -p kernelperf_suite --example run_suite
//!
//! # parameters from a file
//! KERNELPERF_PARAMS=params.json cargo run --release -p kernelperf_suite --example run_suite
//! ```

use anyhow::{Context, Result};
use kernelperf::prelude::*;
use kernelperf_suite::Executor;

fn main() -> Result<()> {
    let mut trace = kernelperf_tracing::subscriber();
    if let Ok(path) = std::env::var("KERNELPERF_LOG") {
        trace = trace.log_file(path);
    }
    let session = trace.init()?;

    let params = match std::env::var("KERNELPERF_PARAMS") {
        Ok(path) => RunParams::from_file(&path)
            .with_context(|| format!("loading run parameters from {path}"))?
            .with_overrides(|key| std::env::var(key).ok())?,
        Err(_) => RunParams::from_env()?,
    };
    tracing::info!(target: "kernelperf::suite", ?params, "starting");

    let mut executor = Executor::new(params)?;
    let report = executor.run();
    report.print_summary();

    if let Some(path) = &executor.params().report_path {
        report
            .save(path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    session.stop();
    let failures = report.failures().count();
    if failures > 0 {
        anyhow::bail!("{failures} variants disagree with their reference checksum");
    }
    Ok(())
}
