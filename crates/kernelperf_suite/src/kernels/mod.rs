pub mod algorithm;
pub mod apps;
pub mod basic;
pub mod lcals;
pub mod polybench;

use kernelperf::prelude::*;

/// Every kernel in the suite, in run order.
pub fn all_kernels(params: &RunParams) -> Vec<Box<dyn Kernel>> {
    vec![
        Box::new(basic::Init3::new(params)) as Box<dyn Kernel>,
        Box::new(basic::ReduceStruct::new(params)),
        Box::new(lcals::FirstMin::new(params)),
        Box::new(lcals::Hydro1d::new(params)),
        Box::new(lcals::Hydro2d::new(params)),
        Box::new(polybench::Gesummv::new(params)),
        Box::new(apps::HaloExchange::new(params)),
        Box::new(algorithm::SortPairs::new(params)),
    ]
}

/// Kernels selected by `params.kernels`.
pub fn selected_kernels(params: &RunParams) -> Vec<Box<dyn Kernel>> {
    all_kernels(params)
        .into_iter()
        .filter(|k| params.wants_kernel(k.name()))
        .collect()
}

/// Integer square root, rounded down.
pub(crate) fn isqrt(n: usize) -> usize {
    let mut r = (n as f64).sqrt() as usize;
    while r * r > n {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r
}

/// Integer cube root, rounded to nearest.
pub(crate) fn icbrt(n: usize) -> usize {
    (n as f64).cbrt().round() as usize
}

#[cfg(test)]
pub(crate) mod testing {
    use kernelperf::prelude::*;

    pub fn small_params(size: usize, reps: usize) -> RunParams {
        RunParams {
            size: Some(size),
            reps: Some(reps),
            gpu_block_size: 64,
            ..Default::default()
        }
    }

    /// Runs every supported variant once and checks each checksum against
    /// the first one.
    pub fn assert_variants_agree(kernel: &mut dyn Kernel, params: &RunParams, expected: usize) {
        let mut generator = DataGenerator::new();
        for vid in kernel.base().variants() {
            execute(kernel, vid, params, &mut generator).unwrap();
        }
        let checksums = kernel.base().checksums();
        assert_eq!(checksums.len(), expected);
        let (_, reference) = checksums.iter().next().unwrap();
        for (vid, sum) in checksums.iter() {
            assert!(
                checksums_agree(reference, sum, 1e-10),
                "{} {vid}: {sum} vs {reference}",
                kernel.name()
            );
        }
    }
}
