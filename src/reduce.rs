//! Reduction operators requested by kernels and implemented by each
//! execution strategy.

use std::ops::Add;

use num_traits::{Bounded, Zero};

/// An associative operator with an identity element.
pub trait ReduceOp<T>: Sync {
    fn identity(&self) -> T;
    fn combine(&self, a: T, b: T) -> T;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl<T: Zero + Add<Output = T> + Copy> ReduceOp<T> for Sum {
    fn identity(&self) -> T {
        T::zero()
    }
    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        a + b
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

impl<T: Bounded + PartialOrd + Copy> ReduceOp<T> for Min {
    fn identity(&self) -> T {
        T::max_value()
    }
    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        if b < a {
            b
        } else {
            a
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl<T: Bounded + PartialOrd + Copy> ReduceOp<T> for Max {
    fn identity(&self) -> T {
        T::min_value()
    }
    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        if b > a {
            b
        } else {
            a
        }
    }
}

/// A value together with the index it was found at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValLoc<T> {
    pub val: T,
    pub loc: usize,
}

impl<T> ValLoc<T> {
    pub fn new(val: T, loc: usize) -> Self {
        Self { val, loc }
    }
}

/// Minimum with location. Equal values resolve to the lowest index.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinLoc;

impl<T: Bounded + PartialOrd + Copy> ReduceOp<ValLoc<T>> for MinLoc {
    fn identity(&self) -> ValLoc<T> {
        ValLoc::new(T::max_value(), usize::MAX)
    }
    #[inline]
    fn combine(&self, a: ValLoc<T>, b: ValLoc<T>) -> ValLoc<T> {
        if b.val < a.val || (b.val == a.val && b.loc < a.loc) {
            b
        } else {
            a
        }
    }
}

/// Maximum with location. Equal values resolve to the lowest index.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxLoc;

impl<T: Bounded + PartialOrd + Copy> ReduceOp<ValLoc<T>> for MaxLoc {
    fn identity(&self) -> ValLoc<T> {
        ValLoc::new(T::min_value(), usize::MAX)
    }
    #[inline]
    fn combine(&self, a: ValLoc<T>, b: ValLoc<T>) -> ValLoc<T> {
        if b.val > a.val || (b.val == a.val && b.loc < a.loc) {
            b
        } else {
            a
        }
    }
}

/// Ad-hoc operator for struct-valued reductions.
pub struct Combine<T, F> {
    identity: T,
    f: F,
}

impl<T, F> Combine<T, F>
where
    T: Copy + Sync,
    F: Fn(T, T) -> T + Sync,
{
    pub fn new(identity: T, f: F) -> Self {
        Self { identity, f }
    }
}

impl<T, F> ReduceOp<T> for Combine<T, F>
where
    T: Copy + Sync,
    F: Fn(T, T) -> T + Sync,
{
    fn identity(&self) -> T {
        self.identity
    }
    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        (self.f)(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_neutral() {
        for v in [-3.5f64, 0.0, 7.25] {
            assert_eq!(Sum.combine(ReduceOp::<f64>::identity(&Sum), v), v);
            assert_eq!(Min.combine(ReduceOp::<f64>::identity(&Min), v), v);
            assert_eq!(Max.combine(ReduceOp::<f64>::identity(&Max), v), v);
        }
        let v = ValLoc::new(1.0f64, 4);
        assert_eq!(MinLoc.combine(MinLoc.identity(), v), v);
        assert_eq!(MaxLoc.combine(MaxLoc.identity(), v), v);
    }

    #[test]
    fn locations_prefer_first_index() {
        let a = ValLoc::new(-1.0f64, 9);
        let b = ValLoc::new(-1.0f64, 2);
        assert_eq!(MinLoc.combine(a, b).loc, 2);
        assert_eq!(MinLoc.combine(b, a).loc, 2);
        assert_eq!(MaxLoc.combine(a, b).loc, 2);
        assert_eq!(MinLoc.combine(a, ValLoc::new(-2.0, 50)).loc, 50);
    }

    #[test]
    fn combine_wraps_closure() {
        let op = Combine::new((0.0f64, 0usize), |a: (f64, usize), b: (f64, usize)| {
            (a.0 + b.0, a.1 + b.1)
        });
        assert_eq!(op.combine(op.identity(), (1.5, 2)), (1.5, 2));
    }
}
