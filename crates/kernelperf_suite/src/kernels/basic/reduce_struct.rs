use kernelperf::prelude::*;
use serde::{Deserialize, Serialize};

const X_MIN: Real = 0.0;
const X_MAX: Real = 100.0;
const Y_MIN: Real = 0.0;
const Y_MAX: Real = 50.0;

/// Centre and bounding box of a point set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsSummary {
    pub x_center: Real,
    pub x_min: Real,
    pub x_max: Real,
    pub y_center: Real,
    pub y_min: Real,
    pub y_max: Real,
}

impl PointsSummary {
    fn checksum(&self) -> Real {
        self.x_center + self.x_min + self.x_max + self.y_center + self.y_min + self.y_max
    }
}

/// Partial sums and extents carried through the reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Extents {
    x_sum: Real,
    x_min: Real,
    x_max: Real,
    y_sum: Real,
    y_min: Real,
    y_max: Real,
}

impl Extents {
    const EMPTY: Extents = Extents {
        x_sum: 0.0,
        x_min: Real::MAX,
        x_max: Real::MIN,
        y_sum: 0.0,
        y_min: Real::MAX,
        y_max: Real::MIN,
    };

    fn point(x: Real, y: Real) -> Self {
        Self {
            x_sum: x,
            x_min: x,
            x_max: x,
            y_sum: y,
            y_min: y,
            y_max: y,
        }
    }

    fn merge(a: Extents, b: Extents) -> Extents {
        Extents {
            x_sum: a.x_sum + b.x_sum,
            x_min: a.x_min.min(b.x_min),
            x_max: a.x_max.max(b.x_max),
            y_sum: a.y_sum + b.y_sum,
            y_min: a.y_min.min(b.y_min),
            y_max: a.y_max.max(b.y_max),
        }
    }

    fn summarize(&self, n: usize) -> PointsSummary {
        let count = n.max(1) as Real;
        PointsSummary {
            x_center: self.x_sum / count,
            x_min: self.x_min,
            x_max: self.x_max,
            y_center: self.y_sum / count,
            y_min: self.y_min,
            y_max: self.y_max,
        }
    }
}

/// Centre, minimum and maximum of both coordinates of a point set, reduced
/// as one struct-valued reduction.
pub struct ReduceStruct {
    base: KernelBase,
    points: Option<(Buffer<Real>, Buffer<Real>)>,
    result: PointsSummary,
}

impl ReduceStruct {
    pub fn new(params: &RunParams) -> Self {
        let mut base = KernelBase::new("REDUCE_STRUCT", "basic", 1_000_000, 50, params);
        let n = base.actual_size() as u64;
        base.set_metrics(KernelMetrics {
            its_per_rep: n,
            kernels_per_rep: 1,
            bytes_per_rep: 2 * std::mem::size_of::<Real>() as u64 * n
                + 6 * std::mem::size_of::<Real>() as u64,
            flops_per_rep: 2 * n + 2,
        });
        base.add_variants(VariantId::without_device_lambdas());
        base.add_feature(Feature::Forall);
        base.add_feature(Feature::Reduction);
        Self {
            base,
            points: None,
            result: PointsSummary::default(),
        }
    }

    /// Summary written by the last repetition
    pub fn result(&self) -> PointsSummary {
        self.result
    }
}

impl Kernel for ReduceStruct {
    fn base(&self) -> &KernelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut KernelBase {
        &mut self.base
    }

    fn set_up(&mut self, vid: VariantId, generator: &mut DataGenerator) {
        let n = self.base.actual_size();
        let mut x = alloc_and_init_real_const(n, 0.0, vid, generator);
        let mut y = alloc_and_init_real_const(n, 0.0, vid, generator);
        let dx = (X_MAX - X_MIN) / n.max(1) as Real;
        let dy = (Y_MAX - Y_MIN) / n.max(1) as Real;
        for i in 0..n {
            x[i] = X_MIN + i as Real * dx;
            y[i] = Y_MIN + i as Real * dy;
        }
        self.points = Some((x, y));
        self.result = PointsSummary::default();
    }

    fn run_kernel(&mut self, vid: VariantId, policy: &ExecPolicy) {
        let Some((x, y)) = self.points.as_ref() else {
            self.base.report_not_ready(vid);
            return;
        };
        let n = self.base.actual_size();
        let result = &mut self.result;
        if vid == VariantId::BaseSeq {
            timed_reps(&mut self.base, policy, |_| {
                let mut acc = Extents::EMPTY;
                for i in 0..n {
                    acc = Extents::merge(acc, Extents::point(x[i], y[i]));
                }
                *result = acc.summarize(n);
            });
            return;
        }
        let op = Combine::new(Extents::EMPTY, Extents::merge);
        timed_reps(&mut self.base, policy, |_| {
            let acc = policy.reduce(n, &op, |i| Extents::point(x[i], y[i]));
            *result = acc.summarize(n);
        });
    }

    fn output_checksum(&self) -> Option<f64> {
        self.points.as_ref()?;
        Some(self.result.checksum() * self.base.checksum_scale_factor())
    }

    fn tear_down(&mut self, _vid: VariantId) {
        dealloc_data(&mut self.points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::testing::{assert_variants_agree, small_params};

    #[test]
    fn summary_matches_point_layout() {
        let params = small_params(1000, 2);
        for vid in [VariantId::BaseSeq, VariantId::PortableOpenMp, VariantId::BaseCuda] {
            let mut kernel = ReduceStruct::new(&params);
            execute(&mut kernel, vid, &params, &mut DataGenerator::new()).unwrap();
            let r = kernel.result();
            assert_eq!(r.x_min, 0.0);
            assert_eq!(r.y_min, 0.0);
            assert!((r.x_max - 99.9).abs() < 1e-9, "{vid}: {r:?}");
            assert!((r.y_max - 49.95).abs() < 1e-9, "{vid}: {r:?}");
            assert!((r.x_center - 49.95).abs() < 1e-9, "{vid}: {r:?}");
            assert!((r.y_center - 24.975).abs() < 1e-9, "{vid}: {r:?}");
        }
    }

    #[test]
    fn device_lambda_is_not_supported() {
        let params = small_params(100, 1);
        let mut kernel = ReduceStruct::new(&params);
        let err = execute(&mut kernel, VariantId::LambdaCuda, &params, &mut DataGenerator::new());
        assert!(err.is_err());
        assert!(!kernel.base().checksums().contains(VariantId::LambdaCuda));
    }

    #[test]
    fn direct_run_of_device_lambda_changes_nothing() {
        let params = small_params(100, 1);
        let mut kernel = ReduceStruct::new(&params);
        kernel.set_up(VariantId::BaseSeq, &mut DataGenerator::new());
        kernel.base_mut().set_phase(KernelPhase::SetUp(VariantId::BaseSeq));
        let before = kernel.result();

        kernel.run(VariantId::LambdaCuda, &ExecPolicy::for_variant(VariantId::LambdaCuda, 64));
        kernel.update_checksum(VariantId::LambdaCuda);

        assert_eq!(kernel.result(), before);
        assert!(kernel.base().checksums().get(VariantId::LambdaCuda).is_none());
        assert!(kernel.base().timing(VariantId::LambdaCuda).is_none());
        assert_eq!(
            kernel.base().unknown_variants(),
            &[VariantId::LambdaCuda, VariantId::LambdaCuda]
        );
    }

    #[test]
    fn all_variants_agree() {
        let params = small_params(5000, 2);
        assert_variants_agree(&mut ReduceStruct::new(&params), &params, 12);
    }
}
