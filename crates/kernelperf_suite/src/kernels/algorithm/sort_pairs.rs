use std::cmp::Ordering;

use kernelperf::prelude::*;

/// Sorts `(key, value)` pairs by key. Every repetition sorts its own slice of
/// `size` pairs, so the data holds `size * reps` pairs.
pub struct SortPairs {
    base: KernelBase,
    data: Option<SortPairsData>,
}

struct SortPairsData {
    keys: Buffer<Real>,
    values: Buffer<Real>,
    scratch: Buffer<(Real, Real)>,
}

fn by_key(a: &(Real, Real), b: &(Real, Real)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1))
}

impl SortPairs {
    pub fn new(params: &RunParams) -> Self {
        let mut base = KernelBase::new("SORTPAIRS", "algorithm", 1_000_000, 20, params);
        let n = base.actual_size() as u64;
        base.set_metrics(KernelMetrics {
            its_per_rep: n,
            kernels_per_rep: 1,
            bytes_per_rep: 4 * std::mem::size_of::<Real>() as u64 * n,
            flops_per_rep: 0,
        });
        base.add_variants([
            VariantId::BaseSeq,
            VariantId::PortableSeq,
            VariantId::PortableOpenMp,
            VariantId::PortableCuda,
            VariantId::PortableHip,
        ]);
        base.add_feature(Feature::Sort);
        Self { base, data: None }
    }

    fn total_len(&self) -> usize {
        self.base.actual_size() * self.base.run_reps()
    }
}

impl Kernel for SortPairs {
    fn base(&self) -> &KernelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut KernelBase {
        &mut self.base
    }

    fn set_up(&mut self, vid: VariantId, generator: &mut DataGenerator) {
        let len = self.total_len();
        self.data = Some(SortPairsData {
            keys: alloc_and_init_real_rand_value(len, vid, generator),
            values: alloc_and_init_real_rand_value(len, vid, generator),
            scratch: Buffer::alloc(self.base.actual_size(), MemorySpace::for_variant(vid)),
        });
    }

    fn run_kernel(&mut self, vid: VariantId, policy: &ExecPolicy) {
        let Some(SortPairsData {
            keys,
            values,
            scratch,
        }) = self.data.as_mut()
        else {
            self.base.report_not_ready(vid);
            return;
        };
        let n = self.base.actual_size();
        timed_reps(&mut self.base, policy, |rep| {
            let range = rep * n..(rep + 1) * n;
            let (keys, values) = (&mut keys[range.clone()], &mut values[range]);
            for (pair, (k, v)) in scratch.iter_mut().zip(keys.iter().zip(values.iter())) {
                *pair = (*k, *v);
            }
            match vid {
                VariantId::BaseSeq => scratch.sort_unstable_by(by_key),
                _ => policy.sort_by(scratch, by_key),
            }
            for (pair, (k, v)) in scratch.iter().zip(keys.iter_mut().zip(values.iter_mut())) {
                (*k, *v) = *pair;
            }
        });
    }

    fn output_checksum(&self) -> Option<f64> {
        let d = self.data.as_ref()?;
        let scale = self.base.checksum_scale_factor();
        Some(calc_checksum(&d.keys, scale) + calc_checksum(&d.values, scale))
    }

    fn tear_down(&mut self, _vid: VariantId) {
        dealloc_data(&mut self.data);
    }
}
