use kernelperf::prelude::*;

use crate::kernels::isqrt;

const ALPHA: Real = 0.62;
const BETA: Real = 1.002;

/// Scalar, vector and matrix multiplication: `y = alpha * A x + beta * B x`
/// with `N x N` row-major matrices.
pub struct Gesummv {
    base: KernelBase,
    n: usize,
    data: Option<GesummvData>,
}

struct GesummvData {
    x: Buffer<Real>,
    y: Buffer<Real>,
    a: Buffer<Real>,
    b: Buffer<Real>,
}

impl Gesummv {
    pub fn new(params: &RunParams) -> Self {
        let mut base = KernelBase::new("POLYBENCH_GESUMMV", "polybench", 1_000_000, 120, params);
        let n = isqrt(base.run_size());
        base.set_actual_size(n * n);
        let (rows, elems) = (n as u64, (n * n) as u64);
        let real = std::mem::size_of::<Real>() as u64;
        base.set_metrics(KernelMetrics {
            its_per_rep: rows,
            kernels_per_rep: 1,
            bytes_per_rep: real * (rows + rows) + real * 2 * elems,
            flops_per_rep: 4 * elems + 3 * rows,
        });
        base.add_variants(ALL_VARIANTS);
        base.add_feature(Feature::Kernel);
        Self {
            base,
            n,
            data: None,
        }
    }

    /// Matrix order
    pub fn order(&self) -> usize {
        self.n
    }
}

#[inline]
fn row(a: &[Real], b: &[Real], x: &[Real], n: usize, i: usize) -> Real {
    let (mut tmp_a, mut tmp_b) = (0.0, 0.0);
    for j in 0..n {
        tmp_a += a[i * n + j] * x[j];
        tmp_b += b[i * n + j] * x[j];
    }
    ALPHA * tmp_a + BETA * tmp_b
}

impl Kernel for Gesummv {
    fn base(&self) -> &KernelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut KernelBase {
        &mut self.base
    }

    fn set_up(&mut self, vid: VariantId, generator: &mut DataGenerator) {
        let n = self.n;
        self.data = Some(GesummvData {
            x: alloc_and_init_real(n, vid, generator),
            y: alloc_and_init_real_const(n, 0.0, vid, generator),
            a: alloc_and_init_real(n * n, vid, generator),
            b: alloc_and_init_real(n * n, vid, generator),
        });
    }

    fn run_kernel(&mut self, vid: VariantId, policy: &ExecPolicy) {
        let Some(GesummvData { x, y, a, b }) = self.data.as_mut() else {
            self.base.report_not_ready(vid);
            return;
        };
        let n = self.n;
        let (x, a, b) = (&x[..], &a[..], &b[..]);
        if vid == VariantId::BaseSeq {
            timed_reps(&mut self.base, policy, |_| {
                for i in 0..n {
                    y[i] = row(a, b, x, n, i);
                }
            });
            return;
        }
        let y = SharedSlice::new(y);
        timed_reps(&mut self.base, policy, |_| {
            // SAFETY: row i writes only y[i]
            policy.forall(n, |i| unsafe { y.write(i, row(a, b, x, n, i)) })
        });
    }

    fn output_checksum(&self) -> Option<f64> {
        let d = self.data.as_ref()?;
        Some(calc_checksum(&d.y, self.base.checksum_scale_factor()))
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
    fn matches_dense_reference() {
        let params = small_params(12 * 12, 1);
        let mut kernel = Gesummv::new(&params);
        assert_eq!(kernel.order(), 12);
        let mut generator = DataGenerator::new();
        kernel.set_up(VariantId::LambdaOpenMp, &mut generator);
        kernel.base_mut().set_phase(KernelPhase::SetUp(VariantId::LambdaOpenMp));
        run_variant(&mut kernel, VariantId::LambdaOpenMp, &params).unwrap();
        let d = kernel.data.as_ref().unwrap();
        for i in 0..12 {
            let expected = (0..12)
                .map(|j| ALPHA * d.a[i * 12 + j] * d.x[j] + BETA * d.b[i * 12 + j] * d.x[j])
                .sum::<Real>();
            assert!((d.y[i] - expected).abs() < 1e-12 * expected.abs().max(1.0));
        }
    }

    #[test]
    fn all_variants_agree() {
        let params = small_params(64 * 64, 2);
        assert_variants_agree(&mut Gesummv::new(&params), &params, ALL_VARIANTS.len());
    }
}
