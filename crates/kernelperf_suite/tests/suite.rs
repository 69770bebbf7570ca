use std::time::Duration;

use kernelperf::prelude::*;
use kernelperf_suite::{kernels::basic::Init3, kernels::algorithm::SortPairs, ChecksumStatus, Executor};

fn params(size: usize, reps: usize) -> RunParams {
    RunParams {
        size: Some(size),
        reps: Some(reps),
        gpu_block_size: 128,
        ..Default::default()
    }
}

#[test]
fn sequential_and_parallel_init3_agree() {
    let params = params(1000, 5);
    let mut kernel = Init3::new(&params);
    let mut generator = DataGenerator::new();
    execute(&mut kernel, VariantId::BaseSeq, &params, &mut generator).unwrap();
    let elapsed = execute(&mut kernel, VariantId::BaseOpenMp, &params, &mut generator).unwrap();

    let checksums = kernel.base().checksums();
    let seq = checksums.get(VariantId::BaseSeq).unwrap();
    let omp = checksums.get(VariantId::BaseOpenMp).unwrap();
    assert!(checksums_agree(seq, omp, 1e-10), "{seq} vs {omp}");
    assert!(elapsed > Duration::ZERO);
    assert!(elapsed < Duration::from_secs(10));
    assert_eq!(kernel.base().timing(VariantId::BaseOpenMp).unwrap().passes, 1);
}

#[test]
fn unsupported_variant_leaves_no_checksum() {
    let params = params(100, 1);
    let mut kernel = SortPairs::new(&params);
    let mut generator = DataGenerator::new();
    let err = execute(&mut kernel, VariantId::LambdaOpenMp, &params, &mut generator).unwrap_err();
    assert!(matches!(err, KernelError::UnsupportedVariant { .. }));
    assert!(!kernel.base().checksums().contains(VariantId::LambdaOpenMp));
    assert!(kernel.base().checksums().is_empty());
    assert_eq!(kernel.base().unknown_variants(), &[VariantId::LambdaOpenMp]);
}

#[test]
fn repeated_passes_accumulate_checksums() {
    let params = params(256, 2);
    let mut kernel = Init3::new(&params);
    let mut generator = DataGenerator::new();
    execute(&mut kernel, VariantId::PortableSeq, &params, &mut generator).unwrap();
    let once = kernel.base().checksums().get(VariantId::PortableSeq).unwrap();
    execute(&mut kernel, VariantId::PortableSeq, &params, &mut generator).unwrap();
    let twice = kernel.base().checksums().get(VariantId::PortableSeq).unwrap();
    assert!(checksums_agree(2.0 * once, twice, 1e-14));
}

#[test]
fn every_kernel_variant_agrees() {
    let mut executor = Executor::new(RunParams {
        npasses: 2,
        ..params(4096, 2)
    })
    .unwrap()
    .with_progress(false);
    assert_eq!(executor.kernels().len(), 8);
    let planned = executor.planned_runs();
    let report = executor.run();

    let failures = report.failures().collect::<Vec<_>>();
    assert!(failures.is_empty(), "{failures:?}");
    let mut runs = 0;
    for kernel in &report.kernels {
        assert_eq!(kernel.reference, Some(VariantId::BaseSeq), "{}", kernel.name);
        for v in &kernel.variants {
            assert_ne!(v.status, ChecksumStatus::NotRun, "{} {}", kernel.name, v.variant);
            assert_eq!(v.passes, 2);
            runs += v.passes as usize;
        }
    }
    assert_eq!(runs, planned);
}

#[test]
fn variant_and_kernel_filters() {
    let mut executor = Executor::new(RunParams {
        variants: vec![VariantId::BaseSeq, VariantId::LambdaHip],
        kernels: vec!["REDUCE_STRUCT".into(), "FIRST_MIN".into()],
        ..params(512, 1)
    })
    .unwrap()
    .with_progress(false);
    let report = executor.run();
    assert_eq!(report.kernels.len(), 2);

    let reduce = report.kernel("REDUCE_STRUCT").unwrap();
    let variants = reduce.variants.iter().map(|v| v.variant).collect::<Vec<_>>();
    assert_eq!(variants, vec![VariantId::BaseSeq]);

    let first_min = report.kernel("FIRST_MIN").unwrap();
    assert_eq!(first_min.variants.len(), 2);
    assert_eq!(first_min.variants[1].status, ChecksumStatus::Passed);
}

#[test]
fn unknown_kernel_filter_is_rejected() {
    let result = Executor::new(RunParams {
        kernels: vec!["DAXPY_ATOMIC".into()],
        ..Default::default()
    });
    assert!(matches!(result, Err(KernelError::InvalidParams(_))));
}

#[test]
fn generator_is_reset_between_variants() {
    let params = params(64, 1);
    let mut generator = DataGenerator::new();
    let mut a = Init3::new(&params);
    let mut b = Init3::new(&params);
    execute(&mut a, VariantId::BaseSeq, &params, &mut generator).unwrap();
    // unrelated initializations between runs must not change the inputs
    generator.init_scalar();
    generator.init_scalar();
    execute(&mut b, VariantId::BaseSeq, &params, &mut generator).unwrap();
    assert_eq!(
        a.base().checksums().get(VariantId::BaseSeq),
        b.base().checksums().get(VariantId::BaseSeq)
    );
}
