pub mod checksum;
pub mod config;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod kernel;
pub mod memory;
pub mod reduce;
pub mod timer;
pub mod variant;

pub use error::KernelError;

pub mod prelude {
    pub use crate::checksum::{calc_checksum, checksums_agree, relative_difference, ChecksumMap};
    pub use crate::config::RunParams;
    pub use crate::data::{Complex, DataGenerator, Int, Real};
    pub use crate::dispatch::{execute, run_variant};
    pub use crate::error::KernelError;
    pub use crate::exec::{ExecPolicy, SharedSlice};
    pub use crate::kernel::{
        timed_reps, Feature, Kernel, KernelBase, KernelMetrics, KernelPhase, VariantTiming,
    };
    pub use crate::memory::*;
    pub use crate::reduce::*;
    pub use crate::timer::Timer;
    pub use crate::variant::{Backend, Flavor, VariantId, ALL_VARIANTS};
    pub use rayon;
    pub use rustc_hash::{FxHashMap, FxHashSet};
    pub use tracing;
}
