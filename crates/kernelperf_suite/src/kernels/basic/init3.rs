use kernelperf::prelude::*;

/// `out1[i] = out2[i] = out3[i] = -in1[i] - in2[i]`
pub struct Init3 {
    base: KernelBase,
    data: Option<Init3Data>,
}

struct Init3Data {
    out1: Buffer<Real>,
    out2: Buffer<Real>,
    out3: Buffer<Real>,
    in1: Buffer<Real>,
    in2: Buffer<Real>,
}

impl Init3 {
    pub fn new(params: &RunParams) -> Self {
        let mut base = KernelBase::new("INIT3", "basic", 1_000_000, 500, params);
        let n = base.actual_size() as u64;
        base.set_metrics(KernelMetrics {
            its_per_rep: n,
            kernels_per_rep: 1,
            bytes_per_rep: (3 + 2) * std::mem::size_of::<Real>() as u64 * n,
            flops_per_rep: n,
        });
        base.add_variants(ALL_VARIANTS);
        base.add_feature(Feature::Forall);
        Self { base, data: None }
    }
}

impl Kernel for Init3 {
    fn base(&self) -> &KernelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut KernelBase {
        &mut self.base
    }

    fn set_up(&mut self, vid: VariantId, generator: &mut DataGenerator) {
        let n = self.base.actual_size();
        self.data = Some(Init3Data {
            out1: alloc_and_init_real_const(n, 0.0, vid, generator),
            out2: alloc_and_init_real_const(n, 0.0, vid, generator),
            out3: alloc_and_init_real_const(n, 0.0, vid, generator),
            in1: alloc_and_init_real(n, vid, generator),
            in2: alloc_and_init_real(n, vid, generator),
        });
    }

    fn run_kernel(&mut self, vid: VariantId, policy: &ExecPolicy) {
        let Some(Init3Data { out1, out2, out3, in1, in2 }) = self.data.as_mut() else {
            self.base.report_not_ready(vid);
            return;
        };
        let n = self.base.actual_size();
        if vid == VariantId::BaseSeq {
            timed_reps(&mut self.base, policy, |_| {
                for i in 0..n {
                    let v = -in1[i] - in2[i];
                    out1[i] = v;
                    out2[i] = v;
                    out3[i] = v;
                }
            });
            return;
        }
        let (in1, in2) = (&*in1, &*in2);
        let (out1, out2, out3) = (
            SharedSlice::new(out1),
            SharedSlice::new(out2),
            SharedSlice::new(out3),
        );
        timed_reps(&mut self.base, policy, |_| {
            policy.forall(n, |i| {
                let v = -in1[i] - in2[i];
                // SAFETY: iteration i is the only writer of index i
                unsafe {
                    out1.write(i, v);
                    out2.write(i, v);
                    out3.write(i, v);
                }
            })
        });
    }

    fn output_checksum(&self) -> Option<f64> {
        let d = self.data.as_ref()?;
        let scale = self.base.checksum_scale_factor();
        Some(calc_checksum(&d.out1, scale) + calc_checksum(&d.out2, scale) + calc_checksum(&d.out3, scale))
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
    fn outputs_are_negated_sum() {
        let params = small_params(64, 1);
        let mut kernel = Init3::new(&params);
        let mut generator = DataGenerator::new();
        kernel.set_up(VariantId::PortableOpenMp, &mut generator);
        kernel.base_mut().set_phase(KernelPhase::SetUp(VariantId::PortableOpenMp));
        run_variant(&mut kernel, VariantId::PortableOpenMp, &params).unwrap();
        let d = kernel.data.as_ref().unwrap();
        for i in 0..64 {
            assert_eq!(d.out1[i], -d.in1[i] - d.in2[i]);
            assert_eq!(d.out2[i], d.out1[i]);
            assert_eq!(d.out3[i], d.out1[i]);
            assert!(d.out1[i] < 0.0);
        }
    }

    #[test]
    fn all_variants_agree() {
        let params = small_params(1000, 3);
        assert_variants_agree(&mut Init3::new(&params), &params, ALL_VARIANTS.len());
    }
}
