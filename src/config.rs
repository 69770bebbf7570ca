use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{error::KernelError, variant::VariantId};

/// Parameters shared by every kernel of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Multiplier applied to each kernel's default problem size
    pub size_factor: f64,
    /// Problem size override for every kernel
    pub size: Option<usize>,
    /// Multiplier applied to each kernel's default repetition count
    pub reps_factor: f64,
    /// Repetition count override for every kernel
    pub reps: Option<usize>,
    /// Number of timed passes over each (kernel, variant) pair
    pub npasses: usize,
    /// Threads per block for device variants
    pub gpu_block_size: usize,
    /// Variants to run; empty means all
    pub variants: Vec<VariantId>,
    /// Kernel names to run; empty means all
    pub kernels: Vec<String>,
    /// Relative tolerance used when comparing variant checksums
    pub checksum_tolerance: f64,
    pub report_path: Option<PathBuf>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            size_factor: 1.0,
            size: None,
            reps_factor: 1.0,
            reps: None,
            npasses: 1,
            gpu_block_size: 256,
            variants: vec![],
            kernels: vec![],
            checksum_tolerance: 1e-10,
            report_path: None,
        }
    }
}

impl RunParams {
    /// Loads params from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let json = std::fs::read_to_string(path)?;
        let params: RunParams = serde_json::from_str(&json)?;
        params.validate()?;
        Ok(params)
    }

    /// Defaults overridden by `KERNELPERF_*` environment variables.
    pub fn from_env() -> Result<Self, KernelError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup` (keyed like the environment).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, KernelError> {
        if let Some(v) = lookup("KERNELPERF_SIZE") {
            self.size = Some(parse("KERNELPERF_SIZE", &v)?);
        }
        if let Some(v) = lookup("KERNELPERF_SIZE_FACTOR") {
            self.size_factor = parse("KERNELPERF_SIZE_FACTOR", &v)?;
        }
        if let Some(v) = lookup("KERNELPERF_REPS") {
            self.reps = Some(parse("KERNELPERF_REPS", &v)?);
        }
        if let Some(v) = lookup("KERNELPERF_REPS_FACTOR") {
            self.reps_factor = parse("KERNELPERF_REPS_FACTOR", &v)?;
        }
        if let Some(v) = lookup("KERNELPERF_NPASSES") {
            self.npasses = parse("KERNELPERF_NPASSES", &v)?;
        }
        if let Some(v) = lookup("KERNELPERF_BLOCK_SIZE") {
            self.gpu_block_size = parse("KERNELPERF_BLOCK_SIZE", &v)?;
        }
        if let Some(v) = lookup("KERNELPERF_TOLERANCE") {
            self.checksum_tolerance = parse("KERNELPERF_TOLERANCE", &v)?;
        }
        if let Some(v) = lookup("KERNELPERF_VARIANTS") {
            self.variants = split_list(&v).map(str::parse).try_collect()?;
        }
        if let Some(v) = lookup("KERNELPERF_KERNELS") {
            self.kernels = split_list(&v).map(str::to_uppercase).collect();
        }
        if let Some(v) = lookup("KERNELPERF_REPORT") {
            self.report_path = Some(PathBuf::from(v));
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), KernelError> {
        if !(self.size_factor.is_finite() && self.size_factor >= 0.0) {
            return Err(KernelError::InvalidParams(format!(
                "size factor must be a non-negative number, got {}",
                self.size_factor
            )));
        }
        if !(self.reps_factor.is_finite() && self.reps_factor >= 0.0) {
            return Err(KernelError::InvalidParams(format!(
                "reps factor must be a non-negative number, got {}",
                self.reps_factor
            )));
        }
        if self.npasses == 0 {
            return Err(KernelError::InvalidParams("npasses must be at least 1".into()));
        }
        let block = self.gpu_block_size;
        if block == 0 || (block > crate::exec::TILE_WIDTH && block % crate::exec::TILE_WIDTH != 0) {
            return Err(KernelError::InvalidParams(format!(
                "gpu block size {block} must be positive and a multiple of {} above it",
                crate::exec::TILE_WIDTH
            )));
        }
        if !(self.checksum_tolerance >= 0.0) {
            return Err(KernelError::InvalidParams("checksum tolerance must be >= 0".into()));
        }
        Ok(())
    }

    /// Problem size a kernel with `default_size` should run at
    pub fn run_size(&self, default_size: usize) -> usize {
        self.size
            .unwrap_or_else(|| (default_size as f64 * self.size_factor).round() as usize)
    }

    /// Repetitions a kernel with `default_reps` should run, at least 1
    pub fn run_reps(&self, default_reps: usize) -> usize {
        self.reps
            .unwrap_or_else(|| (default_reps as f64 * self.reps_factor).round() as usize)
            .max(1)
    }

    pub fn wants_variant(&self, vid: VariantId) -> bool {
        self.variants.is_empty() || self.variants.contains(&vid)
    }

    pub fn wants_kernel(&self, name: &str) -> bool {
        self.kernels.is_empty() || self.kernels.iter().any(|k| k.eq_ignore_ascii_case(name))
    }
}

fn split_list(v: &str) -> impl Iterator<Item = &str> {
    v.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, KernelError> {
    value
        .trim()
        .parse()
        .map_err(|_| KernelError::InvalidParams(format!("cannot parse {key}={value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>();
        move |key| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn size_and_reps_derivation() {
        let params = RunParams {
            size_factor: 0.5,
            reps_factor: 0.01,
            ..Default::default()
        };
        assert_eq!(params.run_size(1_000_000), 500_000);
        assert_eq!(params.run_reps(50), 1);
        let params = RunParams {
            size: Some(1000),
            reps: Some(5),
            ..Default::default()
        };
        assert_eq!(params.run_size(1_000_000), 1000);
        assert_eq!(params.run_reps(50), 5);
        let params = RunParams {
            reps: Some(0),
            ..Default::default()
        };
        assert_eq!(params.run_reps(50), 1);
    }

    #[test]
    fn env_overrides() {
        let params = RunParams::default()
            .with_overrides(env(&[
                ("KERNELPERF_SIZE", "1000"),
                ("KERNELPERF_VARIANTS", "Base_Seq, Base_OpenMP"),
                ("KERNELPERF_KERNELS", "init3,first_min"),
                ("KERNELPERF_BLOCK_SIZE", "128"),
            ]))
            .unwrap();
        assert_eq!(params.size, Some(1000));
        assert_eq!(params.variants, vec![VariantId::BaseSeq, VariantId::BaseOpenMp]);
        assert!(params.wants_kernel("INIT3"));
        assert!(!params.wants_kernel("HYDRO_1D"));
        assert!(params.wants_variant(VariantId::BaseOpenMp));
        assert!(!params.wants_variant(VariantId::BaseCuda));
        assert_eq!(params.gpu_block_size, 128);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        assert!(RunParams::default()
            .with_overrides(env(&[("KERNELPERF_SIZE", "lots")]))
            .is_err());
        assert!(RunParams::default()
            .with_overrides(env(&[("KERNELPERF_VARIANTS", "Base_Fortran")]))
            .is_err());
        assert!(RunParams::default()
            .with_overrides(env(&[("KERNELPERF_BLOCK_SIZE", "48")]))
            .is_err());
        assert!(RunParams::default()
            .with_overrides(env(&[("KERNELPERF_NPASSES", "0")]))
            .is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let params: RunParams =
            serde_json::from_str(r#"{ "size": 64, "variants": ["Base_Seq", "Portable_CUDA"] }"#).unwrap();
        assert_eq!(params.size, Some(64));
        assert_eq!(params.variants, vec![VariantId::BaseSeq, VariantId::PortableCuda]);
        assert_eq!(params.gpu_block_size, 256);
        params.validate().unwrap();
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("kernelperf-params-{}.json", std::process::id()));
        let params = RunParams {
            npasses: 3,
            kernels: vec!["INIT3".into()],
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string(&params).unwrap()).unwrap();
        let loaded = RunParams::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, params);
    }
}
