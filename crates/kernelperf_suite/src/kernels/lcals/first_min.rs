use kernelperf::prelude::*;

const PLANTED_MIN: Real = -1.0e10;

/// Value and index of the first minimum of `x`.
pub struct FirstMin {
    base: KernelBase,
    x: Option<Buffer<Real>>,
    min_loc: i64,
}

impl FirstMin {
    pub fn new(params: &RunParams) -> Self {
        let mut base = KernelBase::new("FIRST_MIN", "lcals", 1_000_000, 100, params);
        let n = base.actual_size() as u64;
        base.set_metrics(KernelMetrics {
            its_per_rep: n,
            kernels_per_rep: 1,
            bytes_per_rep: std::mem::size_of::<Real>() as u64 * n
                + std::mem::size_of::<ValLoc<Real>>() as u64,
            flops_per_rep: 0,
        });
        base.add_variants(ALL_VARIANTS);
        base.add_feature(Feature::Forall);
        base.add_feature(Feature::Reduction);
        Self {
            base,
            x: None,
            min_loc: -1,
        }
    }

    /// Location found by the last repetition, -1 before any run
    pub fn min_loc(&self) -> i64 {
        self.min_loc
    }
}

fn to_loc(found: ValLoc<Real>) -> i64 {
    if found.loc == usize::MAX {
        -1
    } else {
        found.loc as i64
    }
}

impl Kernel for FirstMin {
    fn base(&self) -> &KernelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut KernelBase {
        &mut self.base
    }

    fn set_up(&mut self, vid: VariantId, generator: &mut DataGenerator) {
        let n = self.base.actual_size();
        let mut x = alloc_and_init_real_const(n, 0.0, vid, generator);
        if n > 0 {
            x[n / 2] = PLANTED_MIN;
        }
        self.x = Some(x);
        self.min_loc = -1;
    }

    fn run_kernel(&mut self, vid: VariantId, policy: &ExecPolicy) {
        let Some(x) = self.x.as_ref() else {
            self.base.report_not_ready(vid);
            return;
        };
        let n = self.base.actual_size();
        let min_loc = &mut self.min_loc;
        if vid == VariantId::BaseSeq {
            timed_reps(&mut self.base, policy, |_| {
                let mut best: ValLoc<Real> = MinLoc.identity();
                for (i, v) in x.iter().enumerate() {
                    if *v < best.val {
                        best = ValLoc::new(*v, i);
                    }
                }
                *min_loc = to_loc(best);
            });
            return;
        }
        timed_reps(&mut self.base, policy, |_| {
            *min_loc = to_loc(policy.reduce(n, &MinLoc, |i| ValLoc::new(x[i], i)));
        });
    }

    fn output_checksum(&self) -> Option<f64> {
        self.x.as_ref()?;
        Some(self.min_loc as Real * self.base.checksum_scale_factor())
    }

    fn tear_down(&mut self, _vid: VariantId) {
        dealloc_data(&mut self.x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::testing::{assert_variants_agree, small_params};

    #[test]
    fn finds_planted_minimum() {
        let params = small_params(1001, 2);
        for vid in [VariantId::BaseSeq, VariantId::LambdaOpenMp, VariantId::PortableHip] {
            let mut kernel = FirstMin::new(&params);
            execute(&mut kernel, vid, &params, &mut DataGenerator::new()).unwrap();
            assert_eq!(kernel.min_loc(), 500, "{vid}");
        }
    }

    #[test]
    fn ties_resolve_to_first_index() {
        let params = small_params(300, 1);
        let mut kernel = FirstMin::new(&params);
        let mut generator = DataGenerator::new();
        kernel.set_up(VariantId::BaseCuda, &mut generator);
        if let Some(x) = kernel.x.as_mut() {
            x[20] = PLANTED_MIN;
            x[250] = PLANTED_MIN;
        }
        kernel.base_mut().set_phase(KernelPhase::SetUp(VariantId::BaseCuda));
        run_variant(&mut kernel, VariantId::BaseCuda, &params).unwrap();
        assert_eq!(kernel.min_loc(), 20);
    }

    #[test]
    fn empty_input_has_no_location() {
        let params = small_params(0, 1);
        let mut kernel = FirstMin::new(&params);
        execute(&mut kernel, VariantId::PortableOpenMp, &params, &mut DataGenerator::new()).unwrap();
        assert_eq!(kernel.min_loc(), -1);
    }

    #[test]
    fn all_variants_agree() {
        let params = small_params(4096, 3);
        assert_variants_agree(&mut FirstMin::new(&params), &params, ALL_VARIANTS.len());
    }
}
