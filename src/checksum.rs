//! Position-weighted checksums used to compare kernel variants.
//!
//! Each element is weighted by `index + 1` before summation, so the checksum
//! changes when two differing elements trade places. The sum is accumulated
//! in `f64` with Neumaier compensation in place of a wider accumulator type.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Complex, Int, Real},
    variant::VariantId,
};

/// Element types that can be folded into a checksum.
pub trait ChecksumElement: Copy {
    fn checksum_value(self) -> f64;
}

impl ChecksumElement for Real {
    #[inline]
    fn checksum_value(self) -> f64 {
        self
    }
}

impl ChecksumElement for f32 {
    #[inline]
    fn checksum_value(self) -> f64 {
        self as f64
    }
}

impl ChecksumElement for Int {
    #[inline]
    fn checksum_value(self) -> f64 {
        self as f64
    }
}

impl ChecksumElement for Complex {
    #[inline]
    fn checksum_value(self) -> f64 {
        self.re + self.im
    }
}

/// Compensated running sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Weighted checksum of `data`, multiplied by `scale_factor`.
///
/// The accumulator is an `f64`, no wider than a `Real` element. Neumaier
/// compensation ([`CompensatedSum`]) stands in for a wider type and keeps the
/// rounding error of the sum independent of the element count.
///
/// Callers must use the same length and scale factor for every variant of a
/// kernel, otherwise the results are not comparable.
pub fn calc_checksum<T: ChecksumElement>(data: &[T], scale_factor: Real) -> f64 {
    let mut acc = CompensatedSum::new();
    for (j, v) in data.iter().enumerate() {
        acc.add((j + 1) as f64 * v.checksum_value());
    }
    acc.value() * scale_factor
}

/// Accumulated checksum per variant. Entries only ever grow by addition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecksumMap {
    values: FxHashMap<VariantId, f64>,
}

impl ChecksumMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, vid: VariantId, value: f64) {
        *self.values.entry(vid).or_insert(0.0) += value;
    }

    pub fn get(&self, vid: VariantId) -> Option<f64> {
        self.values.get(&vid).copied()
    }

    pub fn contains(&self, vid: VariantId) -> bool {
        self.values.contains_key(&vid)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries sorted by variant
    pub fn iter(&self) -> impl Iterator<Item = (VariantId, f64)> + '_ {
        let mut entries = self.values.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>();
        entries.sort_by_key(|(k, _)| *k);
        entries.into_iter()
    }
}

/// `|a - b| / max(|a|, |b|)`, zero when both are zero.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

pub fn checksums_agree(a: f64, b: f64, rel_tol: f64) -> bool {
    relative_difference(a, b) <= rel_tol
}
