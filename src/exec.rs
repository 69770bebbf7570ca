//! Generic execution strategies.
//!
//! A kernel body is written once as a closure over an index and handed to an
//! [`ExecPolicy`]. The policy decides how iterations are scheduled:
//!
//! - `Sequential`: a plain loop on the calling thread
//! - `Parallel`: a rayon fork/join over the index space
//! - `Device`: an emulated grid launch of `ceil(n / block_size)` blocks,
//!   blocks scheduled on the rayon pool, threads of a block run in order

use std::{cmp::Ordering, marker::PhantomData, ops::Range};

use rayon::prelude::*;
use tracing::trace;

use crate::{
    memory::{Buffer, MemorySpace},
    reduce::ReduceOp,
    variant::{Backend, VariantId},
};

/// Thread-block width along the contiguous axis of 2D launches.
pub const TILE_WIDTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecPolicy {
    Sequential,
    Parallel,
    /// `staging` is where per-block partials are copied back to.
    Device { block_size: usize, staging: MemorySpace },
}

impl ExecPolicy {
    /// Static mapping from variant to strategy.
    pub fn for_variant(vid: VariantId, block_size: usize) -> Self {
        match vid.backend() {
            Backend::Seq => ExecPolicy::Sequential,
            Backend::OpenMp => ExecPolicy::Parallel,
            Backend::OpenMpTarget | Backend::Cuda | Backend::Hip => {
                ExecPolicy::Device {
                    block_size,
                    staging: MemorySpace::staging_for(vid),
                }
            }
        }
    }

    pub fn is_device(&self) -> bool {
        matches!(self, ExecPolicy::Device { .. })
    }

    /// Runs `body(i)` for every `i` in `0..n`.
    pub fn forall<F>(&self, n: usize, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        self.forall_range(0..n, body)
    }

    pub fn forall_range<F>(&self, range: Range<usize>, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        match *self {
            ExecPolicy::Sequential => range.for_each(body),
            ExecPolicy::Parallel => range.into_par_iter().for_each(body),
            ExecPolicy::Device { block_size, .. } => {
                let (begin, n) = (range.start, range.len());
                let grid = launch_grid(n, block_size);
                (0..grid).into_par_iter().for_each(|block| {
                    for thread in 0..block_size {
                        let i = block * block_size + thread;
                        if i < n {
                            body(begin + i);
                        }
                    }
                });
            }
        }
    }

    /// Runs `body(k, j)` over `outer x inner`; `inner` is the contiguous axis.
    pub fn forall_2d<F>(&self, outer: Range<usize>, inner: Range<usize>, body: F)
    where
        F: Fn(usize, usize) + Sync + Send,
    {
        match *self {
            ExecPolicy::Sequential => {
                for k in outer {
                    for j in inner.clone() {
                        body(k, j);
                    }
                }
            }
            ExecPolicy::Parallel => outer.into_par_iter().for_each(|k| {
                for j in inner.clone() {
                    body(k, j);
                }
            }),
            ExecPolicy::Device { block_size, .. } => {
                let (j_block, k_block) = tile_shape(block_size);
                let (nk, nj) = (outer.len(), inner.len());
                let grid_j = launch_grid(nj, j_block);
                let grid_k = launch_grid(nk, k_block);
                (0..grid_j * grid_k).into_par_iter().for_each(|block| {
                    let (bk, bj) = (block / grid_j, block % grid_j);
                    for ty in 0..k_block {
                        let k = bk * k_block + ty;
                        if k >= nk {
                            break;
                        }
                        for tx in 0..j_block {
                            let j = bj * j_block + tx;
                            if j < nj {
                                body(outer.start + k, inner.start + j);
                            }
                        }
                    }
                });
            }
        }
    }

    /// Reduces `map(i)` over `0..n` with `op`.
    ///
    /// The association order depends on the strategy, so floating point
    /// results agree across strategies only up to rounding.
    pub fn reduce<T, Op, M>(&self, n: usize, op: &Op, map: M) -> T
    where
        T: Copy + Send + Sync,
        Op: ReduceOp<T>,
        M: Fn(usize) -> T + Sync + Send,
    {
        match *self {
            ExecPolicy::Sequential => (0..n).fold(op.identity(), |acc, i| op.combine(acc, map(i))),
            ExecPolicy::Parallel => (0..n)
                .into_par_iter()
                .fold(|| op.identity(), |acc, i| op.combine(acc, map(i)))
                .reduce(|| op.identity(), |a, b| op.combine(a, b)),
            ExecPolicy::Device { block_size, staging } => block_partials(n, block_size, staging, op, map)
                .iter()
                .fold(op.identity(), |acc, p| op.combine(acc, *p)),
        }
    }

    /// Sorts `data` with `cmp`. `cmp` must be a total order for the result
    /// to be identical across strategies.
    pub fn sort_by<T, C>(&self, data: &mut [T], cmp: C)
    where
        T: Send,
        C: Fn(&T, &T) -> Ordering + Sync,
    {
        match self {
            ExecPolicy::Sequential => data.sort_unstable_by(cmp),
            ExecPolicy::Parallel | ExecPolicy::Device { .. } => data.par_sort_unstable_by(cmp),
        }
    }

    /// Waits for outstanding work. Launches here complete before returning,
    /// so this only marks the synchronization point for the timer.
    pub fn synchronize(&self) {
        if self.is_device() {
            trace!(target: "kernelperf::exec", "device synchronize");
        }
    }
}

/// One partial per block of a device reduction, copied back into `staging`
/// for the host to finish.
fn block_partials<T, Op, M>(n: usize, block_size: usize, staging: MemorySpace, op: &Op, map: M) -> Buffer<T>
where
    T: Copy + Send + Sync,
    Op: ReduceOp<T>,
    M: Fn(usize) -> T + Sync + Send,
{
    let grid = launch_grid(n, block_size);
    let partials = (0..grid)
        .into_par_iter()
        .map(|block| {
            let mut shared = (0..block_size)
                .map(|thread| {
                    let i = block * block_size + thread;
                    if i < n {
                        map(i)
                    } else {
                        op.identity()
                    }
                })
                .collect::<Vec<_>>();
            tree_reduce(&mut shared, op)
        })
        .collect::<Vec<_>>();
    Buffer::from_vec(partials, staging)
}

fn launch_grid(n: usize, block_size: usize) -> usize {
    assert!(block_size > 0, "invalid launch configuration: block size 0");
    n.div_ceil(block_size)
}

/// `(j, k)` block extents of a 2D launch with `block_size` threads.
pub fn tile_shape(block_size: usize) -> (usize, usize) {
    assert!(block_size > 0, "invalid launch configuration: block size 0");
    let j_block = block_size.min(TILE_WIDTH);
    assert!(
        block_size % j_block == 0,
        "invalid launch configuration: block size {block_size} cannot be tiled by {TILE_WIDTH}"
    );
    (j_block, block_size / j_block)
}

fn tree_reduce<T: Copy, Op: ReduceOp<T>>(shared: &mut [T], op: &Op) -> T {
    let mut width = shared.len();
    if width == 0 {
        return op.identity();
    }
    while width > 1 {
        let half = width.div_ceil(2);
        for t in 0..width / 2 {
            shared[t] = op.combine(shared[t], shared[t + half]);
        }
        width = half;
    }
    shared[0]
}

/// Shared mutable view for bodies that write disjoint indices in parallel.
pub struct SharedSlice<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for SharedSlice<'_, T> {}
unsafe impl<T: Send + Sync> Sync for SharedSlice<'_, T> {}

impl<'a, T> SharedSlice<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    /// No other iteration of the same launch may access index `i`.
    #[inline]
    pub unsafe fn write(&self, i: usize, value: T) {
        assert!(i < self.len, "index {i} out of bounds for length {}", self.len);
        unsafe { self.ptr.add(i).write(value) }
    }

    /// # Safety
    /// No other iteration of the same launch may write index `i`.
    #[inline]
    pub unsafe fn read(&self, i: usize) -> T
    where
        T: Copy,
    {
        assert!(i < self.len, "index {i} out of bounds for length {}", self.len);
        unsafe { self.ptr.add(i).read() }
    }
}
