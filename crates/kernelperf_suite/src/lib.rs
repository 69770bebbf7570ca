//! # kernelperf suite
//!
//! Concrete benchmark kernels and the run orchestration around the
//! `kernelperf` harness.
//!
//! ## Architecture
//!
//! - **kernels**: one module per kernel group (`basic`, `lcals`, `polybench`,
//!   `apps`, `algorithm`), each kernel written once against `ExecPolicy`
//! - **Executor**: runs every selected (kernel, variant) pair for the
//!   configured number of passes
//! - **SuiteReport**: timings, throughput and checksum verdicts, as JSON or a
//!   terminal table

mod executor;
pub mod kernels;
mod report;

pub use executor::*;
pub use kernels::{all_kernels, selected_kernels};
pub use report::*;
