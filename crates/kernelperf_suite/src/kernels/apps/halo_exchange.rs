use std::ops::Range;

use itertools::iproduct;
use kernelperf::prelude::*;

use crate::kernels::icbrt;

const HALO_WIDTH: usize = 1;
const NUM_VARS: usize = 3;

/// Offsets of the 26 neighbours of a cube, `(dx, dy, dz)` in `{-1, 0, 1}^3`.
fn neighbors() -> impl Iterator<Item = [i8; 3]> {
    iproduct!(-1i8..=1, -1i8..=1, -1i8..=1)
        .map(|(dz, dy, dx)| [dx, dy, dz])
        .filter(|d| *d != [0, 0, 0])
}

/// Interior layer sent towards direction `d` along one axis.
fn pack_range(d: i8, grid: usize) -> Range<usize> {
    match d {
        -1 => HALO_WIDTH..2 * HALO_WIDTH,
        0 => HALO_WIDTH..HALO_WIDTH + grid,
        _ => grid..grid + HALO_WIDTH,
    }
}

/// Ghost layer received from direction `d` along one axis.
fn unpack_range(d: i8, grid: usize) -> Range<usize> {
    match d {
        -1 => 0..HALO_WIDTH,
        0 => HALO_WIDTH..HALO_WIDTH + grid,
        _ => HALO_WIDTH + grid..2 * HALO_WIDTH + grid,
    }
}

fn region_len(range: impl Fn(i8, usize) -> Range<usize>, d: [i8; 3], grid: usize) -> usize {
    d.iter().map(|&di| range(di, grid).len()).product()
}

/// Packs the halo layers of several variables into per-neighbour buffers,
/// then unpacks the buffers into the ghost layers.
pub struct HaloExchange {
    base: KernelBase,
    grid: usize,
    data: Option<HaloData>,
}

struct HaloData {
    vars: Vec<Buffer<Real>>,
    buffers: Vec<Buffer<Real>>,
    pack_lists: Vec<Buffer<Int>>,
    unpack_lists: Vec<Buffer<Int>>,
}

impl HaloExchange {
    pub fn new(params: &RunParams) -> Self {
        let mut base = KernelBase::new("HALOEXCHANGE", "apps", 1_000_000, 50, params);
        let grid = icbrt(base.run_size()).max(1);
        base.set_actual_size(grid * grid * grid);
        let halo_len = neighbors()
            .map(|d| region_len(pack_range, d, grid))
            .sum::<usize>() as u64;
        let moved = NUM_VARS as u64 * halo_len;
        let (int, real) = (
            std::mem::size_of::<Int>() as u64,
            std::mem::size_of::<Real>() as u64,
        );
        base.set_metrics(KernelMetrics {
            its_per_rep: 2 * moved,
            kernels_per_rep: 2 * 26 * NUM_VARS as u64,
            bytes_per_rep: 2 * moved * (int + 2 * real),
            flops_per_rep: 0,
        });
        base.add_variants(ALL_VARIANTS);
        base.add_feature(Feature::Forall);
        Self {
            base,
            grid,
            data: None,
        }
    }

    /// Extent of a variable along each axis, ghost layers included
    pub fn extent(&self) -> usize {
        self.grid + 2 * HALO_WIDTH
    }

    fn index_list(&self, ranges: [Range<usize>; 3], vid: VariantId) -> Buffer<Int> {
        let e = self.extent();
        let [xs, ys, zs] = ranges;
        let len = xs.len() * ys.len() * zs.len();
        let mut list = Buffer::alloc(len, MemorySpace::for_variant(vid));
        for (slot, (k, j, i)) in list.iter_mut().zip(iproduct!(zs, ys, xs)) {
            *slot = (i + j * e + k * e * e) as Int;
        }
        list
    }
}

impl Kernel for HaloExchange {
    fn base(&self) -> &KernelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut KernelBase {
        &mut self.base
    }

    fn set_up(&mut self, vid: VariantId, generator: &mut DataGenerator) {
        let (grid, e) = (self.grid, self.extent());
        let vars = (0..NUM_VARS)
            .map(|_| alloc_and_init_real(e * e * e, vid, generator))
            .collect();
        let mut data = HaloData {
            vars,
            buffers: vec![],
            pack_lists: vec![],
            unpack_lists: vec![],
        };
        for d in neighbors() {
            let pack = d.map(|di| pack_range(di, grid));
            let unpack = d.map(|di| unpack_range(di, grid));
            let list = self.index_list(pack, vid);
            data.buffers.push(alloc_and_init_real_const(
                NUM_VARS * list.len(),
                0.0,
                vid,
                generator,
            ));
            data.pack_lists.push(list);
            data.unpack_lists.push(self.index_list(unpack, vid));
        }
        self.data = Some(data);
    }

    fn run_kernel(&mut self, vid: VariantId, policy: &ExecPolicy) {
        let Some(HaloData {
            vars,
            buffers,
            pack_lists,
            unpack_lists,
        }) = self.data.as_mut()
        else {
            self.base.report_not_ready(vid);
            return;
        };
        // SAFETY: list entries are distinct and ghost regions of different
        // neighbours are disjoint, so no launch writes an index twice.
        timed_reps(&mut self.base, policy, |_| {
            for (list, buffer) in pack_lists.iter().zip(buffers.iter_mut()) {
                let len = list.len();
                let buffer = SharedSlice::new(buffer);
                for (v, var) in vars.iter().enumerate() {
                    let offset = v * len;
                    policy.forall(len, |i| unsafe {
                        buffer.write(offset + i, var[list[i] as usize])
                    });
                }
            }
            for (list, buffer) in unpack_lists.iter().zip(buffers.iter()) {
                let len = list.len();
                for (v, var) in vars.iter_mut().enumerate() {
                    let offset = v * len;
                    let var = SharedSlice::new(var);
                    policy.forall(len, |i| unsafe {
                        var.write(list[i] as usize, buffer[offset + i])
                    });
                }
            }
        });
    }

    fn output_checksum(&self) -> Option<f64> {
        let d = self.data.as_ref()?;
        let scale = self.base.checksum_scale_factor();
        Some(d.vars.iter().map(|v| calc_checksum(v, scale)).sum())
    }

    fn tear_down(&mut self, _vid: VariantId) {
        dealloc_data(&mut self.data);
    }
}
