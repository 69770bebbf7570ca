//! Deterministic data generation for kernel inputs.
//!
//! All generators are driven by a [`DataGenerator`], which counts how many
//! initializations it has performed. The count perturbs the produced values,
//! so the same call sequence always reproduces the same data while
//! consecutive buffers still differ.

use std::ops::{Add, Mul, Neg};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub type Int = i32;
pub type Real = f64;

/// Marker written into integer data below the ±1 fill.
pub const INT_LOW_MARKER: Int = -58;
/// Marker written into integer data above the ±1 fill.
pub const INT_HIGH_MARKER: Int = 19;

const RNG_SEED: u64 = 4793;

/// Interleaved complex value used by complex-valued buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Complex {
    pub re: Real,
    pub im: Real,
}

impl Complex {
    #[inline]
    pub const fn new(re: Real, im: Real) -> Self {
        Self { re, im }
    }
}

impl Add for Complex {
    type Output = Complex;
    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Mul for Complex {
    type Output = Complex;
    fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl Neg for Complex {
    type Output = Complex;
    fn neg(self) -> Complex {
        Complex::new(-self.re, -self.im)
    }
}

/// Generator state threaded through every `set_up`.
#[derive(Debug, Default, Clone)]
pub struct DataGenerator {
    init_count: u64,
}

impl DataGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of initializations performed since the last reset
    pub fn init_count(&self) -> u64 {
        self.init_count
    }

    pub fn reset(&mut self) {
        self.init_count = 0;
    }

    fn finish(&mut self, what: &'static str, len: usize) {
        trace!(target: "kernelperf::data", what, len, count = self.init_count, "initialized");
        self.init_count += 1;
    }

    fn factor(&self) -> Real {
        if self.init_count % 2 == 1 {
            0.1
        } else {
            0.2
        }
    }

    fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(RNG_SEED.wrapping_add(self.init_count))
    }

    /// Fills with ±1 and plants one value below -1 and one above 1 at
    /// two distinct positions.
    pub fn init_int(&mut self, data: &mut [Int]) {
        let mut rng = self.rng();
        for v in data.iter_mut() {
            *v = if rng.random::<f64>() < 0.5 { -1 } else { 1 };
        }
        let len = data.len();
        if len > 0 {
            let ilo = rng.random_range(0..len);
            data[ilo] = INT_LOW_MARKER;
            if len > 1 {
                // draw from the remaining positions so the markers never collide
                let mut ihi = rng.random_range(0..len - 1);
                if ihi >= ilo {
                    ihi += 1;
                }
                data[ihi] = INT_HIGH_MARKER;
            }
        }
        self.finish("int", len);
    }

    /// Positive values in (0, 1), smooth in the index.
    pub fn init_real(&mut self, data: &mut [Real]) {
        let factor = self.factor();
        for (i, v) in data.iter_mut().enumerate() {
            *v = smooth(factor, i, 1.1, 1.12345);
        }
        self.finish("real", data.len());
    }

    /// Same magnitudes as [`Self::init_real`] with a pseudo-random sign.
    pub fn init_real_rand_sign(&mut self, data: &mut [Real]) {
        let factor = self.factor();
        let mut rng = self.rng();
        for (i, v) in data.iter_mut().enumerate() {
            let sign = if rng.random::<f64>() < 0.5 { -1.0 } else { 1.0 };
            *v = sign * smooth(factor, i, 1.1, 1.12345);
        }
        self.finish("real_rand_sign", data.len());
    }

    /// Uniform pseudo-random values in [0, 1).
    pub fn init_real_rand_value(&mut self, data: &mut [Real]) {
        let mut rng = self.rng();
        for v in data.iter_mut() {
            *v = rng.random::<f64>();
        }
        self.finish("real_rand_value", data.len());
    }

    pub fn init_real_const(&mut self, data: &mut [Real], value: Real) {
        data.fill(value);
        self.finish("real_const", data.len());
    }

    pub fn init_complex(&mut self, data: &mut [Complex]) {
        let factor = self.factor();
        for (i, v) in data.iter_mut().enumerate() {
            *v = Complex::new(
                smooth(factor, i, 1.1, 1.12345),
                smooth(factor, i, 2.1, 1.23456),
            );
        }
        self.finish("complex", data.len());
    }

    /// A single value drawn the way element 0 of [`Self::init_real`] is.
    pub fn init_scalar(&mut self) -> Real {
        let value = smooth(self.factor(), 0, 1.1, 1.12345);
        self.finish("scalar", 1);
        value
    }
}

#[inline]
fn smooth(factor: Real, i: usize, num: Real, den: Real) -> Real {
    let i = i as Real;
    factor * (i + num) / (i + den)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn int_init_has_two_markers(len in 2usize..2000, skip in 0usize..5) {
            let mut generator = DataGenerator::new();
            let mut scratch = vec![0.0; 4];
            for _ in 0..skip {
                generator.init_real(&mut scratch);
            }
            let mut data = vec![0; len];
            generator.init_int(&mut data);
            let above = data.iter().filter(|v| **v > 1).count();
            let below = data.iter().filter(|v| **v < -1).count();
            prop_assert_eq!(above, 1);
            prop_assert_eq!(below, 1);
            prop_assert!(data.iter().all(|v| v.abs() >= 1));
            prop_assert_eq!(data.iter().filter(|v| v.abs() == 1).count(), len - 2);
        }

        #[test]
        fn real_init_in_unit_interval(len in 1usize..5000) {
            let mut generator = DataGenerator::new();
            let mut data = vec![0.0; len];
            generator.init_real(&mut data);
            prop_assert!(data.iter().all(|v| *v > 0.0 && *v < 1.0));
            generator.init_real(&mut data);
            prop_assert!(data.iter().all(|v| *v > 0.0 && *v < 1.0));
        }
    }

    #[test]
    fn every_call_advances_the_count() {
        let mut generator = DataGenerator::new();
        let mut reals = vec![0.0; 8];
        let mut ints = vec![0; 8];
        let mut complex = vec![Complex::default(); 8];
        generator.init_real(&mut reals);
        generator.init_real_const(&mut reals, 3.0);
        generator.init_real_rand_sign(&mut reals);
        generator.init_real_rand_value(&mut reals);
        generator.init_int(&mut ints);
        generator.init_complex(&mut complex);
        let _ = generator.init_scalar();
        generator.init_real(&mut []);
        assert_eq!(generator.init_count(), 8);
        generator.reset();
        assert_eq!(generator.init_count(), 0);
    }

    #[test]
    fn same_call_order_reproduces_data() {
        let run = || {
            let mut generator = DataGenerator::new();
            let mut a = vec![0.0; 100];
            let mut b = vec![0.0; 100];
            let mut c = vec![0; 100];
            generator.init_real(&mut a);
            generator.init_real_rand_sign(&mut b);
            generator.init_int(&mut c);
            (a, b, c)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn consecutive_real_inits_differ() {
        let mut generator = DataGenerator::new();
        let mut a = vec![0.0; 16];
        let mut b = vec![0.0; 16];
        generator.init_real(&mut a);
        generator.init_real(&mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn const_init_fills_value() {
        let mut generator = DataGenerator::new();
        let mut data = vec![1.0; 10];
        generator.init_real_const(&mut data, -2.5);
        assert!(data.iter().all(|v| *v == -2.5));
    }

    #[test]
    fn rand_sign_keeps_magnitudes() {
        let mut plain = DataGenerator::new();
        let mut signed = DataGenerator::new();
        let mut a = vec![0.0; 256];
        let mut b = vec![0.0; 256];
        plain.init_real(&mut a);
        signed.init_real_rand_sign(&mut b);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.abs(), y.abs());
        }
        assert!(b.iter().any(|v| *v < 0.0));
        assert!(b.iter().any(|v| *v > 0.0));
    }

    #[test]
    fn short_int_buffers() {
        let mut generator = DataGenerator::new();
        let mut one = vec![0; 1];
        generator.init_int(&mut one);
        assert_eq!(one, vec![INT_LOW_MARKER]);
        let mut empty: Vec<Int> = vec![];
        generator.init_int(&mut empty);
        assert_eq!(generator.init_count(), 2);
    }

    #[test]
    fn complex_parts_follow_real_scheme() {
        let mut generator = DataGenerator::new();
        let mut data = vec![Complex::default(); 4];
        generator.init_complex(&mut data);
        assert!((data[0].re - 0.2 * 1.1 / 1.12345).abs() < 1e-15);
        assert!((data[0].im - 0.2 * 2.1 / 1.23456).abs() < 1e-15);
    }
}
