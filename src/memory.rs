//! Buffer allocation and release for kernel data.

use std::{
    alloc::{handle_alloc_error, Layout},
    ops::{Deref, DerefMut},
};

use serde::{Deserialize, Serialize};
use tracing::{error, trace};

use crate::{
    data::{Complex, DataGenerator, Int, Real},
    variant::{Backend, VariantId},
};

/// Where a buffer lives.
///
/// `Device` is an emulated address space in host memory; it only changes which
/// execution strategy is allowed to touch the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemorySpace {
    Host,
    PinnedHost,
    Device,
}

impl MemorySpace {
    /// Space for kernel working data of a variant
    pub fn for_variant(vid: VariantId) -> Self {
        if vid.backend().is_device() {
            MemorySpace::Device
        } else {
            MemorySpace::Host
        }
    }

    /// Space for host-side copy-back scratch of a variant
    pub fn staging_for(vid: VariantId) -> Self {
        match vid.backend() {
            Backend::Cuda | Backend::Hip => MemorySpace::PinnedHost,
            _ => MemorySpace::Host,
        }
    }
}

/// Contiguous typed storage owned by one kernel instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer<T> {
    data: Vec<T>,
    space: MemorySpace,
}

impl<T: Copy + Default> Buffer<T> {
    /// Allocates `len` default-valued elements. Running out of memory aborts.
    pub fn alloc(len: usize, space: MemorySpace) -> Self {
        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            out_of_memory::<T>(len, space);
        }
        data.resize(len, T::default());
        trace!(
            target: "kernelperf::memory",
            len,
            bytes = len * std::mem::size_of::<T>(),
            ?space,
            "allocated"
        );
        Self { data, space }
    }
}

impl<T> Buffer<T> {
    /// Takes ownership of `data` already resident in `space`.
    pub fn from_vec(data: Vec<T>, space: MemorySpace) -> Self {
        Self { data, space }
    }

    pub fn space(&self) -> MemorySpace {
        self.space
    }

    pub fn bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Deref for Buffer<T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for Buffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

fn out_of_memory<T>(len: usize, space: MemorySpace) -> ! {
    error!(
        target: "kernelperf::memory",
        len,
        elem_bytes = std::mem::size_of::<T>(),
        ?space,
        "allocation failed"
    );
    match Layout::array::<T>(len) {
        Ok(layout) => handle_alloc_error(layout),
        Err(_) => panic!("allocation of {len} elements overflows the address space"),
    }
}

pub fn alloc_and_init_int(len: usize, vid: VariantId, generator: &mut DataGenerator) -> Buffer<Int> {
    let mut buf = Buffer::alloc(len, MemorySpace::for_variant(vid));
    generator.init_int(&mut buf);
    buf
}

pub fn alloc_and_init_real(len: usize, vid: VariantId, generator: &mut DataGenerator) -> Buffer<Real> {
    let mut buf = Buffer::alloc(len, MemorySpace::for_variant(vid));
    generator.init_real(&mut buf);
    buf
}

pub fn alloc_and_init_real_const(
    len: usize,
    value: Real,
    vid: VariantId,
    generator: &mut DataGenerator,
) -> Buffer<Real> {
    let mut buf = Buffer::alloc(len, MemorySpace::for_variant(vid));
    generator.init_real_const(&mut buf, value);
    buf
}

pub fn alloc_and_init_real_rand_sign(
    len: usize,
    vid: VariantId,
    generator: &mut DataGenerator,
) -> Buffer<Real> {
    let mut buf = Buffer::alloc(len, MemorySpace::for_variant(vid));
    generator.init_real_rand_sign(&mut buf);
    buf
}

pub fn alloc_and_init_real_rand_value(
    len: usize,
    vid: VariantId,
    generator: &mut DataGenerator,
) -> Buffer<Real> {
    let mut buf = Buffer::alloc(len, MemorySpace::for_variant(vid));
    generator.init_real_rand_value(&mut buf);
    buf
}

pub fn alloc_and_init_complex(
    len: usize,
    vid: VariantId,
    generator: &mut DataGenerator,
) -> Buffer<Complex> {
    let mut buf = Buffer::alloc(len, MemorySpace::for_variant(vid));
    generator.init_complex(&mut buf);
    buf
}

/// Releases whatever the handle owns and leaves `None` behind.
/// Releasing an empty handle does nothing.
pub fn dealloc_data<T>(handle: &mut Option<T>) {
    if handle.take().is_some() {
        trace!(target: "kernelperf::memory", ty = std::any::type_name::<T>(), "released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_follow_backend() {
        assert_eq!(MemorySpace::for_variant(VariantId::BaseSeq), MemorySpace::Host);
        assert_eq!(MemorySpace::for_variant(VariantId::PortableOpenMp), MemorySpace::Host);
        assert_eq!(MemorySpace::for_variant(VariantId::BaseCuda), MemorySpace::Device);
        assert_eq!(MemorySpace::for_variant(VariantId::BaseOpenMpTarget), MemorySpace::Device);
        assert_eq!(MemorySpace::staging_for(VariantId::LambdaHip), MemorySpace::PinnedHost);
        assert_eq!(MemorySpace::staging_for(VariantId::BaseOpenMpTarget), MemorySpace::Host);
    }

    #[test]
    fn alloc_and_init_fills_and_counts() {
        let mut generator = DataGenerator::new();
        let a = alloc_and_init_real(100, VariantId::BaseSeq, &mut generator);
        let b = alloc_and_init_real_const(50, 7.0, VariantId::BaseHip, &mut generator);
        let c = alloc_and_init_int(10, VariantId::BaseOpenMp, &mut generator);
        let d = alloc_and_init_complex(3, VariantId::BaseSeq, &mut generator);
        assert_eq!(generator.init_count(), 4);
        assert_eq!(a.len(), 100);
        assert_eq!(a.bytes(), 800);
        assert!(b.iter().all(|v| *v == 7.0));
        assert_eq!(b.space(), MemorySpace::Device);
        assert_eq!(c.len(), 10);
        assert_eq!(d.bytes(), 48);
    }

    #[test]
    fn dealloc_nulls_handle_and_is_idempotent() {
        let mut generator = DataGenerator::new();
        let mut handle = Some(alloc_and_init_real(16, VariantId::BaseSeq, &mut generator));
        dealloc_data(&mut handle);
        assert!(handle.is_none());
        dealloc_data(&mut handle);
        assert!(handle.is_none());
        let mut never: Option<Buffer<Int>> = None;
        dealloc_data(&mut never);
        assert!(never.is_none());
    }

    #[test]
    fn zero_length_buffers() {
        let mut generator = DataGenerator::new();
        let buf = alloc_and_init_real(0, VariantId::BaseSeq, &mut generator);
        assert!(buf.is_empty());
        assert_eq!(generator.init_count(), 1);
    }
}
