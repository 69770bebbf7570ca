use kernelperf::prelude::*;

use crate::kernels::isqrt;

const S: Real = 0.0041;
const T: Real = 0.0037;

/// 2D explicit hydrodynamics fragment on a `kn x jn` grid, three launches
/// per repetition over the interior points.
pub struct Hydro2d {
    base: KernelBase,
    kn: usize,
    jn: usize,
    data: Option<Hydro2dData>,
}

struct Hydro2dData {
    za: Buffer<Real>,
    zb: Buffer<Real>,
    zm: Buffer<Real>,
    zp: Buffer<Real>,
    zq: Buffer<Real>,
    zr: Buffer<Real>,
    zu: Buffer<Real>,
    zv: Buffer<Real>,
    zz: Buffer<Real>,
    zrout: Buffer<Real>,
    zzout: Buffer<Real>,
}

impl Hydro2d {
    pub fn new(params: &RunParams) -> Self {
        let mut base = KernelBase::new("HYDRO_2D", "lcals", 1_000_000, 100, params);
        let side = isqrt(base.run_size());
        let (kn, jn) = (side, side);
        base.set_actual_size(kn * jn);
        let interior = (kn.saturating_sub(2) * jn.saturating_sub(2)) as u64;
        let real = std::mem::size_of::<Real>() as u64;
        base.set_metrics(KernelMetrics {
            its_per_rep: 3 * interior,
            kernels_per_rep: 3,
            bytes_per_rep: real * interior * (6 + 8 + 6),
            flops_per_rep: (14 + 26 + 4) * interior,
        });
        base.set_checksum_scale_factor(0.001);
        base.add_variants(ALL_VARIANTS);
        base.add_feature(Feature::Kernel);
        Self {
            base,
            kn,
            jn,
            data: None,
        }
    }

    /// Grid extents `(kn, jn)`
    pub fn shape(&self) -> (usize, usize) {
        (self.kn, self.jn)
    }
}

impl Kernel for Hydro2d {
    fn base(&self) -> &KernelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut KernelBase {
        &mut self.base
    }

    fn set_up(&mut self, vid: VariantId, generator: &mut DataGenerator) {
        let len = self.kn * self.jn;
        self.data = Some(Hydro2dData {
            za: alloc_and_init_real_const(len, 0.0, vid, generator),
            zb: alloc_and_init_real_const(len, 0.0, vid, generator),
            zm: alloc_and_init_real(len, vid, generator),
            zp: alloc_and_init_real(len, vid, generator),
            zq: alloc_and_init_real(len, vid, generator),
            zr: alloc_and_init_real(len, vid, generator),
            zu: alloc_and_init_real(len, vid, generator),
            zv: alloc_and_init_real(len, vid, generator),
            zz: alloc_and_init_real(len, vid, generator),
            zrout: alloc_and_init_real_const(len, 0.0, vid, generator),
            zzout: alloc_and_init_real_const(len, 0.0, vid, generator),
        });
    }

    fn run_kernel(&mut self, vid: VariantId, policy: &ExecPolicy) {
        let Some(d) = self.data.as_mut() else {
            self.base.report_not_ready(vid);
            return;
        };
        let (kn, jn) = (self.kn, self.jn);
        let (ks, js) = (1..kn.saturating_sub(1), 1..jn.saturating_sub(1));
        let at = move |k: usize, j: usize| k * jn + j;

        let (zm, zp, zq, zr, zz) = (&*d.zm, &*d.zp, &*d.zq, &*d.zr, &*d.zz);
        let za = SharedSlice::new(&mut d.za);
        let zb = SharedSlice::new(&mut d.zb);
        let zu = SharedSlice::new(&mut d.zu);
        let zv = SharedSlice::new(&mut d.zv);
        let zrout = SharedSlice::new(&mut d.zrout);
        let zzout = SharedSlice::new(&mut d.zzout);

        // SAFETY (all three launches): iteration (k, j) writes only index
        // at(k, j) of its outputs, and reads other indices only of arrays the
        // launch does not write.
        timed_reps(&mut self.base, policy, |_| {
            policy.forall_2d(ks.clone(), js.clone(), |k, j| unsafe {
                za.write(
                    at(k, j),
                    (zp[at(k + 1, j - 1)] + zq[at(k + 1, j - 1)] - zp[at(k, j - 1)] - zq[at(k, j - 1)])
                        * (zr[at(k, j)] + zr[at(k, j - 1)])
                        / (zm[at(k, j - 1)] + zm[at(k + 1, j - 1)]),
                );
                zb.write(
                    at(k, j),
                    (zp[at(k, j - 1)] + zq[at(k, j - 1)] - zp[at(k, j)] - zq[at(k, j)])
                        * (zr[at(k, j)] + zr[at(k - 1, j)])
                        / (zm[at(k, j)] + zm[at(k, j - 1)]),
                );
            });

            policy.forall_2d(ks.clone(), js.clone(), |k, j| unsafe {
                let (a, a_w, b, b_n) = (
                    za.read(at(k, j)),
                    za.read(at(k, j - 1)),
                    zb.read(at(k, j)),
                    zb.read(at(k + 1, j)),
                );
                let du = a * (zz[at(k, j)] - zz[at(k, j + 1)])
                    - a_w * (zz[at(k, j)] - zz[at(k, j - 1)])
                    - b * (zz[at(k, j)] - zz[at(k - 1, j)])
                    + b_n * (zz[at(k, j)] - zz[at(k + 1, j)]);
                let dv = a * (zr[at(k, j)] - zr[at(k, j + 1)])
                    - a_w * (zr[at(k, j)] - zr[at(k, j - 1)])
                    - b * (zr[at(k, j)] - zr[at(k - 1, j)])
                    + b_n * (zr[at(k, j)] - zr[at(k + 1, j)]);
                zu.write(at(k, j), zu.read(at(k, j)) + S * du);
                zv.write(at(k, j), zv.read(at(k, j)) + S * dv);
            });

            policy.forall_2d(ks.clone(), js.clone(), |k, j| unsafe {
                zrout.write(at(k, j), zr[at(k, j)] + T * zu.read(at(k, j)));
                zzout.write(at(k, j), zz[at(k, j)] + T * zv.read(at(k, j)));
            });
        });
    }

    fn output_checksum(&self) -> Option<f64> {
        let d = self.data.as_ref()?;
        let scale = self.base.checksum_scale_factor();
        Some(calc_checksum(&d.zzout, scale) + calc_checksum(&d.zrout, scale))
    }

    fn tear_down(&mut self, _vid: VariantId) {
        dealloc_data(&mut self.data);
    }
}
