use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use kernelperf::prelude::*;
use tracing::{info, warn};

use crate::{kernels::selected_kernels, report::SuiteReport};

/// Runs every selected (kernel, variant) pair and collects the results.
pub struct Executor {
    params: RunParams,
    kernels: Vec<Box<dyn Kernel>>,
    variants: Vec<VariantId>,
    generator: DataGenerator,
    progress: bool,
}

impl Executor {
    pub fn new(params: RunParams) -> Result<Self, KernelError> {
        params.validate()?;
        let kernels = selected_kernels(&params);
        if kernels.is_empty() {
            return Err(KernelError::InvalidParams(format!(
                "no kernel matches {:?}",
                params.kernels
            )));
        }
        let variants = ALL_VARIANTS
            .into_iter()
            .filter(|v| params.wants_variant(*v))
            .collect();
        Ok(Self {
            params,
            kernels,
            variants,
            generator: DataGenerator::new(),
            progress: true,
        })
    }

    /// Show or hide the progress bar
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn params(&self) -> &RunParams {
        &self.params
    }

    pub fn kernels(&self) -> &[Box<dyn Kernel>] {
        &self.kernels
    }

    pub fn variants(&self) -> &[VariantId] {
        &self.variants
    }

    /// Number of (kernel, variant) executions a full run performs
    pub fn planned_runs(&self) -> usize {
        let pairs = self
            .kernels
            .iter()
            .map(|k| self.variants.iter().filter(|v| k.base().supports(**v)).count())
            .sum::<usize>();
        pairs * self.params.npasses
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(self.planned_runs() as u64).with_style(style)
    }

    /// Runs all passes and returns the report. Variants a kernel does not
    /// support are skipped.
    pub fn run(&mut self) -> SuiteReport {
        let start = Instant::now();
        let bar = self.progress_bar();
        self.generator.reset();
        for pass in 0..self.params.npasses {
            for kernel in self.kernels.iter_mut() {
                for &vid in &self.variants {
                    if !kernel.base().supports(vid) {
                        continue;
                    }
                    bar.set_message(format!("{} {vid}", kernel.name()));
                    match kernelperf::dispatch::execute(
                        kernel.as_mut(),
                        vid,
                        &self.params,
                        &mut self.generator,
                    ) {
                        Ok(elapsed) => info!(
                            target: "kernelperf::suite",
                            pass,
                            kernel = kernel.name(),
                            variant = %vid,
                            elapsed_us = elapsed.as_micros() as u64,
                            "variant finished"
                        ),
                        Err(e) => warn!(target: "kernelperf::suite", pass, error = %e, "variant skipped"),
                    }
                    bar.inc(1);
                }
            }
        }
        bar.finish_and_clear();
        info!(
            target: "kernelperf::suite",
            kernels = self.kernels.len(),
            variants = self.variants.len(),
            passes = self.params.npasses,
            duration_ms = start.elapsed().as_millis() as u64,
            "suite completed"
        );
        SuiteReport::from_kernels(&self.params, &self.kernels, &self.variants)
    }
}
