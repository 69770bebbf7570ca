//! Run report
//!
//! Combines each kernel's constant metrics (bytes, flops per repetition)
//! with the measured variant timings to derive throughput, and compares
//! every variant's checksum against the kernel's reference variant.

use std::path::Path;

use colored::Colorize;
use kernelperf::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of a variant's checksum comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumStatus {
    /// The variant other variants are compared against
    Reference,
    Passed,
    Failed,
    /// Supported but produced no checksum
    NotRun,
}

impl ChecksumStatus {
    fn label(&self) -> String {
        match self {
            ChecksumStatus::Reference => "ref".cyan().to_string(),
            ChecksumStatus::Passed => "PASSED".green().to_string(),
            ChecksumStatus::Failed => "FAILED".red().bold().to_string(),
            ChecksumStatus::NotRun => "-".dimmed().to_string(),
        }
    }
}

/// Result of one variant of one kernel, averaged over passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantResult {
    pub variant: VariantId,
    pub passes: u32,
    /// Average time of one timed region in microseconds
    pub time_us: f64,
    pub min_time_us: f64,
    pub max_time_us: f64,
    /// Throughput in GB/s
    pub throughput_gbps: f64,
    pub gflops: f64,
    pub checksum: Option<f64>,
    /// Relative difference to the reference checksum
    pub checksum_diff: Option<f64>,
    pub status: ChecksumStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelResult {
    pub name: String,
    pub group: String,
    pub problem_size: usize,
    pub reps: usize,
    pub metrics: KernelMetrics,
    pub features: Vec<Feature>,
    pub reference: Option<VariantId>,
    pub variants: Vec<VariantResult>,
}

impl KernelResult {
    pub fn from_kernel(kernel: &dyn Kernel, variants: &[VariantId], tolerance: f64) -> Self {
        let base = kernel.base();
        let checksums = base.checksums();
        let supported = variants
            .iter()
            .copied()
            .filter(|v| base.supports(*v))
            .collect::<Vec<_>>();
        let reference = supported.iter().copied().find(|v| checksums.contains(*v));
        let reference_sum = reference.and_then(|v| checksums.get(v));
        let reps = base.run_reps();
        let metrics = *base.metrics();

        let results = supported
            .into_iter()
            .map(|vid| {
                let timing = base.timing(vid).copied().unwrap_or_default();
                let time_us = timing.average().as_secs_f64() * 1e6;
                let checksum = checksums.get(vid);
                let checksum_diff = checksum
                    .zip(reference_sum)
                    .map(|(sum, reference)| relative_difference(reference, sum));
                let status = match (checksum_diff, Some(vid) == reference) {
                    (_, true) => ChecksumStatus::Reference,
                    (Some(diff), false) if diff <= tolerance => ChecksumStatus::Passed,
                    (Some(_), false) => ChecksumStatus::Failed,
                    (None, false) => ChecksumStatus::NotRun,
                };
                VariantResult {
                    variant: vid,
                    passes: timing.passes,
                    time_us,
                    min_time_us: timing.min.as_secs_f64() * 1e6,
                    max_time_us: timing.max.as_secs_f64() * 1e6,
                    throughput_gbps: per_us(metrics.bytes_per_rep * reps as u64, time_us) / 1000.0,
                    gflops: per_us(metrics.flops_per_rep * reps as u64, time_us) / 1000.0,
                    checksum,
                    checksum_diff,
                    status,
                }
            })
            .collect();

        Self {
            name: base.name().to_string(),
            group: base.group().to_string(),
            problem_size: base.actual_size(),
            reps,
            metrics,
            features: base.features(),
            reference,
            variants: results,
        }
    }
}

/// `count / time_us`, zero for an empty timing
fn per_us(count: u64, time_us: f64) -> f64 {
    if time_us <= 0.0 {
        return 0.0;
    }
    count as f64 / time_us
}

/// Full run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub timestamp: String,
    pub params: RunParams,
    pub kernels: Vec<KernelResult>,
}

impl SuiteReport {
    pub fn from_kernels(params: &RunParams, kernels: &[Box<dyn Kernel>], variants: &[VariantId]) -> Self {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            timestamp,
            params: params.clone(),
            kernels: kernels
                .iter()
                .map(|k| KernelResult::from_kernel(k.as_ref(), variants, params.checksum_tolerance))
                .collect(),
        }
    }

    pub fn kernel(&self, name: &str) -> Option<&KernelResult> {
        self.kernels.iter().find(|k| k.name == name)
    }

    /// `(kernel, variant)` pairs whose checksum disagrees with the reference
    pub fn failures(&self) -> impl Iterator<Item = (&str, VariantId)> + '_ {
        self.kernels.iter().flat_map(|k| {
            k.variants
                .iter()
                .filter(|v| v.status == ChecksumStatus::Failed)
                .map(move |v| (k.name.as_str(), v.variant))
        })
    }

    pub fn to_json(&self) -> Result<String, KernelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save to JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KernelError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Print summary table to terminal
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(100));
        println!("{} - {}", "KERNEL RESULTS".bold(), self.timestamp);
        println!("{}", "=".repeat(100));
        println!(
            "{:<20} {:<20} {:>12} {:>10} {:>10} {:>14} {:>8}",
            "Kernel", "Variant", "Time(μs)", "GB/s", "GFLOP/s", "Rel. diff", "Check"
        );
        println!("{}", "-".repeat(100));
        for k in &self.kernels {
            for v in &k.variants {
                println!(
                    "{:<20} {:<20} {:>12.2} {:>10.2} {:>10.3} {:>14} {:>8}",
                    k.name,
                    v.variant.name(),
                    v.time_us,
                    v.throughput_gbps,
                    v.gflops,
                    v.checksum_diff
                        .map(|d| format!("{d:.3e}"))
                        .unwrap_or_else(|| "-".into()),
                    v.status.label()
                );
            }
        }
        println!("{}", "=".repeat(100));
        let failed = self.failures().count();
        if failed > 0 {
            println!("{}", format!("{failed} checksum mismatches").red().bold());
        }
    }
}
