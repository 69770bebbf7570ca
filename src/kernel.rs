//! Kernel descriptor: declarative metadata plus the per-variant lifecycle.

use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    checksum::ChecksumMap,
    config::RunParams,
    data::{DataGenerator, Real},
    exec::ExecPolicy,
    timer::Timer,
    variant::{VariantId, ALL_VARIANTS},
};

/// Work performed by one repetition, used to derive throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelMetrics {
    pub its_per_rep: u64,
    pub kernels_per_rep: u64,
    pub bytes_per_rep: u64,
    pub flops_per_rep: u64,
}

/// Programming-model features a kernel exercises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    Forall,
    Kernel,
    Reduction,
    Sort,
    Workgroup,
}

/// Where a kernel instance is in its per-variant lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelPhase {
    Constructed,
    SetUp(VariantId),
    Ran(VariantId),
    ChecksumUpdated(VariantId),
    TornDown(VariantId),
}

/// Min/max/total over the timed passes of one variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantTiming {
    pub passes: u32,
    pub min: Duration,
    pub max: Duration,
    pub total: Duration,
}

impl VariantTiming {
    pub fn record(&mut self, elapsed: Duration) {
        if self.passes == 0 {
            self.min = elapsed;
            self.max = elapsed;
        } else {
            self.min = self.min.min(elapsed);
            self.max = self.max.max(elapsed);
        }
        self.total += elapsed;
        self.passes += 1;
    }

    pub fn average(&self) -> Duration {
        if self.passes == 0 {
            Duration::ZERO
        } else {
            self.total / self.passes
        }
    }
}

/// State shared by every kernel: identity, sizing, supported variants,
/// checksums and timings.
#[derive(Debug, Clone)]
pub struct KernelBase {
    name: String,
    group: String,
    default_size: usize,
    default_reps: usize,
    run_size: usize,
    run_reps: usize,
    actual_size: usize,
    metrics: KernelMetrics,
    variants: FxHashSet<VariantId>,
    features: FxHashSet<Feature>,
    checksums: ChecksumMap,
    checksum_scale_factor: Real,
    timer: Timer,
    timings: FxHashMap<VariantId, VariantTiming>,
    unknown_variants: Vec<VariantId>,
    not_ready: Vec<VariantId>,
    phase: KernelPhase,
}

impl KernelBase {
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        default_size: usize,
        default_reps: usize,
        params: &RunParams,
    ) -> Self {
        let run_size = params.run_size(default_size);
        Self {
            name: name.into(),
            group: group.into(),
            default_size,
            default_reps,
            run_size,
            run_reps: params.run_reps(default_reps),
            actual_size: run_size,
            metrics: KernelMetrics::default(),
            variants: FxHashSet::default(),
            features: FxHashSet::default(),
            checksums: ChecksumMap::new(),
            checksum_scale_factor: 1.0,
            timer: Timer::new(),
            timings: FxHashMap::default(),
            unknown_variants: vec![],
            not_ready: vec![],
            phase: KernelPhase::Constructed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn default_size(&self) -> usize {
        self.default_size
    }

    pub fn default_reps(&self) -> usize {
        self.default_reps
    }

    /// Size requested by the run parameters
    pub fn run_size(&self) -> usize {
        self.run_size
    }

    pub fn run_reps(&self) -> usize {
        self.run_reps
    }

    /// Size the kernel actually runs at after shape adjustment
    pub fn actual_size(&self) -> usize {
        self.actual_size
    }

    pub fn set_actual_size(&mut self, size: usize) {
        self.actual_size = size;
    }

    pub fn metrics(&self) -> &KernelMetrics {
        &self.metrics
    }

    pub fn set_metrics(&mut self, metrics: KernelMetrics) {
        self.metrics = metrics;
    }

    pub fn add_variants(&mut self, variants: impl IntoIterator<Item = VariantId>) {
        self.variants.extend(variants);
    }

    pub fn supports(&self, vid: VariantId) -> bool {
        self.variants.contains(&vid)
    }

    /// Supported variants in reporting order
    pub fn variants(&self) -> Vec<VariantId> {
        ALL_VARIANTS.into_iter().filter(|v| self.supports(*v)).collect()
    }

    pub fn add_feature(&mut self, feature: Feature) {
        self.features.insert(feature);
    }

    /// Features in declaration order of [`Feature`]
    pub fn features(&self) -> Vec<Feature> {
        let mut features = self.features.iter().copied().collect::<Vec<_>>();
        features.sort();
        features
    }

    pub fn checksum_scale_factor(&self) -> Real {
        self.checksum_scale_factor
    }

    pub fn set_checksum_scale_factor(&mut self, factor: Real) {
        self.checksum_scale_factor = factor;
    }

    pub fn checksums(&self) -> &ChecksumMap {
        &self.checksums
    }

    /// Folds `value` into the checksum of `vid`.
    pub fn add_checksum(&mut self, vid: VariantId, value: f64) {
        self.checksums.add(vid, value);
    }

    pub fn phase(&self) -> KernelPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: KernelPhase) {
        self.phase = phase;
    }

    /// Whether `run(vid)` may proceed: supported and set up for `vid`.
    pub fn ready_to_run(&self, vid: VariantId) -> bool {
        self.supports(vid) && self.phase == KernelPhase::SetUp(vid)
    }

    /// Opens a timed interval. Intervals accumulate until [`Self::record_pass`].
    pub fn start_timer(&mut self) {
        self.timer.start();
    }

    pub fn stop_timer(&mut self) {
        self.timer.stop();
    }

    /// Records the last timed region as one pass of `vid`.
    pub fn record_pass(&mut self, vid: VariantId) -> Duration {
        let elapsed = self.timer.elapsed();
        self.timings.entry(vid).or_default().record(elapsed);
        self.timer.reset();
        elapsed
    }

    pub fn timing(&self, vid: VariantId) -> Option<&VariantTiming> {
        self.timings.get(&vid)
    }

    pub fn report_unknown_variant(&mut self, vid: VariantId) {
        warn!(target: "kernelperf::kernel", kernel = %self.name, variant = %vid, "unknown variant id");
        self.unknown_variants.push(vid);
    }

    pub fn unknown_variants(&self) -> &[VariantId] {
        &self.unknown_variants
    }

    /// A supported variant was asked to run or checksum out of lifecycle order.
    pub fn report_not_ready(&mut self, vid: VariantId) {
        warn!(
            target: "kernelperf::kernel",
            kernel = %self.name,
            variant = %vid,
            phase = ?self.phase,
            "variant used out of lifecycle order"
        );
        self.not_ready.push(vid);
    }

    pub fn not_ready_variants(&self) -> &[VariantId] {
        &self.not_ready
    }
}

/// A benchmark kernel that can run as any of its supported variants.
pub trait Kernel: Send {
    fn base(&self) -> &KernelBase;
    fn base_mut(&mut self) -> &mut KernelBase;

    /// Allocates and initializes working data for `vid`.
    fn set_up(&mut self, vid: VariantId, generator: &mut DataGenerator);

    /// Kernel body: the timed repetitions of `vid` with `policy`. Must bracket
    /// them with [`KernelBase::start_timer`] and [`KernelBase::stop_timer`],
    /// usually through [`timed_reps`].
    fn run_kernel(&mut self, vid: VariantId, policy: &ExecPolicy);

    /// Checksum of the current outputs, `None` when nothing is allocated.
    fn output_checksum(&self) -> Option<f64>;

    /// Releases the working data of `vid`.
    fn tear_down(&mut self, vid: VariantId);

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Runs `vid` if it is supported and set up. Otherwise the variant is
    /// reported, nothing is timed and no buffer is touched.
    fn run(&mut self, vid: VariantId, policy: &ExecPolicy) {
        let base = self.base_mut();
        if !base.supports(vid) {
            base.report_unknown_variant(vid);
            return;
        }
        if base.phase() != KernelPhase::SetUp(vid) {
            base.report_not_ready(vid);
            return;
        }
        self.run_kernel(vid, policy);
        self.base_mut().set_phase(KernelPhase::Ran(vid));
    }

    /// Folds the outputs of `vid` into its checksum. Only a supported variant
    /// that has just run gets a checksum entry.
    fn update_checksum(&mut self, vid: VariantId) {
        if !self.base().supports(vid) {
            self.base_mut().report_unknown_variant(vid);
            return;
        }
        if self.base().phase() != KernelPhase::Ran(vid) {
            self.base_mut().report_not_ready(vid);
            return;
        }
        let Some(sum) = self.output_checksum() else {
            self.base_mut().report_not_ready(vid);
            return;
        };
        let base = self.base_mut();
        base.add_checksum(vid, sum);
        base.set_phase(KernelPhase::ChecksumUpdated(vid));
    }
}

/// Runs `reps` repetitions of `body` inside the kernel's timed region.
/// Device policies synchronize before the timer stops.
pub fn timed_reps(base: &mut KernelBase, policy: &ExecPolicy, mut body: impl FnMut(usize)) {
    let reps = base.run_reps();
    base.start_timer();
    for rep in 0..reps {
        body(rep);
    }
    policy.synchronize();
    base.stop_timer();
    debug!(target: "kernelperf::kernel", kernel = %base.name, reps, "timed region done");
}
