use kernelperf::prelude::*;

/// Elements read past the end of the index space.
const PAD: usize = 12;

/// Hydro fragment: `x[i] = q + y[i] * (r * z[i + 10] + t * z[i + 11])`
pub struct Hydro1d {
    base: KernelBase,
    data: Option<Hydro1dData>,
}

struct Hydro1dData {
    x: Buffer<Real>,
    y: Buffer<Real>,
    z: Buffer<Real>,
    q: Real,
    r: Real,
    t: Real,
}

impl Hydro1d {
    pub fn new(params: &RunParams) -> Self {
        let mut base = KernelBase::new("HYDRO_1D", "lcals", 1_000_000, 1000, params);
        let n = base.actual_size() as u64;
        let real = std::mem::size_of::<Real>() as u64;
        base.set_metrics(KernelMetrics {
            its_per_rep: n,
            kernels_per_rep: 1,
            bytes_per_rep: real * n + real * (2 * n + 1),
            flops_per_rep: 5 * n,
        });
        base.set_checksum_scale_factor(0.001);
        base.add_variants(ALL_VARIANTS);
        base.add_feature(Feature::Forall);
        Self { base, data: None }
    }
}

impl Kernel for Hydro1d {
    fn base(&self) -> &KernelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut KernelBase {
        &mut self.base
    }

    fn set_up(&mut self, vid: VariantId, generator: &mut DataGenerator) {
        let len = self.base.actual_size() + PAD;
        self.data = Some(Hydro1dData {
            x: alloc_and_init_real_const(len, 0.0, vid, generator),
            y: alloc_and_init_real(len, vid, generator),
            z: alloc_and_init_real(len, vid, generator),
            q: generator.init_scalar(),
            r: generator.init_scalar(),
            t: generator.init_scalar(),
        });
    }

    fn run_kernel(&mut self, vid: VariantId, policy: &ExecPolicy) {
        let Some(Hydro1dData { x, y, z, q, r, t }) = self.data.as_mut() else {
            self.base.report_not_ready(vid);
            return;
        };
        let n = self.base.actual_size();
        let (q, r, t) = (*q, *r, *t);
        if vid == VariantId::BaseSeq {
            timed_reps(&mut self.base, policy, |_| {
                for i in 0..n {
                    x[i] = q + y[i] * (r * z[i + 10] + t * z[i + 11]);
                }
            });
            return;
        }
        let (y, z) = (&*y, &*z);
        let x = SharedSlice::new(x);
        timed_reps(&mut self.base, policy, |_| {
            // SAFETY: each i writes only x[i]
            policy.forall(n, |i| unsafe {
                x.write(i, q + y[i] * (r * z[i + 10] + t * z[i + 11]))
            })
        });
    }

    fn output_checksum(&self) -> Option<f64> {
        let d = self.data.as_ref()?;
        let n = self.base.actual_size();
        Some(calc_checksum(&d.x[..n], self.base.checksum_scale_factor()))
    }

    fn tear_down(&mut self, _vid: VariantId) {
        dealloc_data(&mut self.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::testing::{assert_variants_agree, small_params};

    #[test]
    fn padding_is_untouched() {
        let params = small_params(100, 1);
        let mut kernel = Hydro1d::new(&params);
        let mut generator = DataGenerator::new();
        kernel.set_up(VariantId::BaseHip, &mut generator);
        kernel.base_mut().set_phase(KernelPhase::SetUp(VariantId::BaseHip));
        run_variant(&mut kernel, VariantId::BaseHip, &params).unwrap();
        let d = kernel.data.as_ref().unwrap();
        assert_eq!(d.x.len(), 100 + PAD);
        assert!(d.x[..100].iter().all(|v| *v > 0.0));
        assert!(d.x[100..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn all_variants_agree() {
        let params = small_params(2000, 4);
        assert_variants_agree(&mut Hydro1d::new(&params), &params, ALL_VARIANTS.len());
    }
}
