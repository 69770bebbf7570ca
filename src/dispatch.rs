//! Routes a (kernel, variant) pairing to the matching execution strategy.

use std::time::Duration;

use tracing::{debug, info_span};

use crate::{
    config::RunParams,
    data::DataGenerator,
    error::KernelError,
    exec::ExecPolicy,
    kernel::{Kernel, KernelPhase},
    variant::VariantId,
};

fn unsupported(kernel: &mut dyn Kernel, vid: VariantId) -> KernelError {
    kernel.base_mut().report_unknown_variant(vid);
    KernelError::UnsupportedVariant {
        kernel: kernel.name().to_string(),
        variant: vid,
    }
}

/// Runs the timed repetitions of an already set up variant and returns the
/// time of this pass.
pub fn run_variant(
    kernel: &mut dyn Kernel,
    vid: VariantId,
    params: &RunParams,
) -> Result<Duration, KernelError> {
    if !kernel.base().supports(vid) {
        return Err(unsupported(kernel, vid));
    }
    if !kernel.base().ready_to_run(vid) {
        return Err(KernelError::NotSetUp {
            kernel: kernel.name().to_string(),
            variant: vid,
        });
    }
    let policy = ExecPolicy::for_variant(vid, params.gpu_block_size);
    kernel.run(vid, &policy);
    let base = kernel.base_mut();
    let elapsed = base.record_pass(vid);
    debug!(
        target: "kernelperf::dispatch",
        kernel = base.name(),
        variant = %vid,
        ?policy,
        elapsed_us = elapsed.as_micros() as u64,
        "ran"
    );
    Ok(elapsed)
}

/// One full pass of `vid`: set up, run, update checksum, tear down.
///
/// The generator is reset first so every variant of a kernel sees the same
/// inputs. Unsupported variants are reported and rejected before any data is
/// allocated.
pub fn execute(
    kernel: &mut dyn Kernel,
    vid: VariantId,
    params: &RunParams,
    generator: &mut DataGenerator,
) -> Result<Duration, KernelError> {
    if !kernel.base().supports(vid) {
        return Err(unsupported(kernel, vid));
    }
    let span = info_span!(target: "kernelperf::dispatch", "execute", kernel = kernel.name(), variant = %vid);
    let _enter = span.enter();

    generator.reset();
    kernel.set_up(vid, generator);
    kernel.base_mut().set_phase(KernelPhase::SetUp(vid));

    let elapsed = run_variant(kernel, vid, params);
    if elapsed.is_ok() {
        kernel.update_checksum(vid);
    }

    kernel.tear_down(vid);
    kernel.base_mut().set_phase(KernelPhase::TornDown(vid));
    elapsed
}
