//! Multi-operand AND reduction
//!
//! Conjoins N bit-vectors into a caller-owned destination, lane by lane:
//!
//! - **Linear**: `dst = v0 & v1 & ... & v(N-1)` as one accumulator chain.
//!   Dependency depth N - 1.
//! - **Tree**: pairwise halving. Stage one pairs `(v_i, v_{i + ceil(N/2)})`,
//!   each following stage halves again, and an unpaired middle operand is
//!   carried forward. Dependency depth `ceil(log2 N)`.
//!
//! Both shapes produce byte-identical results; they differ only in how much
//! instruction-level parallelism the CPU can extract. Intermediate values
//! live in registers, so neither shape allocates.

use std::ptr;

use crate::bitvector::BitVector;
use crate::error::{BitClassError, Result};
use crate::scalar::check_capacity;
use crate::simd_intrinsics::{
    dispatch_and, dispatch_and16, strategy_for, AndShape, SimdStrategy, MAX_TREE_OPERANDS,
};
use crate::types::Reduction;

fn validate(strategy: SimdStrategy, dst: &BitVector, srcs: &[&BitVector]) -> Result<()> {
    if srcs.is_empty() {
        return Err(BitClassError::EmptyOperands);
    }
    for src in srcs {
        check_capacity(dst.allocated(), src.allocated())?;
    }
    strategy.check_vector(dst)?;
    for src in srcs {
        strategy.check_vector(src)?;
    }
    Ok(())
}

fn auto_strategy(dst: &BitVector, srcs: &[&BitVector]) -> SimdStrategy {
    strategy_for(std::iter::once(dst).chain(srcs.iter().copied()))
}

/// Feed operands to the kernel in register-sized groups. After the first
/// group `dst` itself becomes operand zero of the next one.
fn reduce_grouped(
    strategy: SimdStrategy,
    shape: AndShape,
    dst: &mut BitVector,
    srcs: &[&BitVector],
) -> Result<()> {
    let strategy = strategy.resolve();
    validate(strategy, dst, srcs)?;

    let lanes = dst.allocated() / strategy.lane_bytes();
    let d = dst.as_mut_ptr();
    let mut ptrs = [ptr::null::<u8>(); MAX_TREE_OPERANDS];
    let mut rest = srcs;
    let mut carried = false;

    while !rest.is_empty() {
        let mut n = 0;
        if carried {
            ptrs[0] = d as *const u8;
            n = 1;
        }
        let take = (MAX_TREE_OPERANDS - n).min(rest.len());
        for (slot, src) in ptrs[n..n + take].iter_mut().zip(&rest[..take]) {
            *slot = src.as_ptr();
        }
        n += take;

        // SAFETY: validate() established equal lane-multiple capacities and
        // lane-compatible alignment for dst and every operand. Kernels load
        // every operand of a lane before storing it, so `dst` may also be an
        // operand.
        unsafe { dispatch_and(strategy, shape, d, &ptrs[..n], lanes) };

        rest = &rest[take..];
        carried = true;
    }

    dst.clear_padding();
    Ok(())
}

/// Linear fold with an explicit lane strategy
pub fn and_linear_with(
    strategy: SimdStrategy,
    dst: &mut BitVector,
    srcs: &[&BitVector],
) -> Result<()> {
    reduce_grouped(strategy, AndShape::Linear, dst, srcs)
}

/// Tournament tree with an explicit lane strategy
pub fn and_tree_with(
    strategy: SimdStrategy,
    dst: &mut BitVector,
    srcs: &[&BitVector],
) -> Result<()> {
    reduce_grouped(strategy, AndShape::Tree, dst, srcs)
}

/// `dst = srcs[0] & srcs[1] & ...` as a sequential fold.
///
/// Every operand must share `dst`'s capacity. Zero operands is
/// [`BitClassError::EmptyOperands`].
pub fn and_linear(dst: &mut BitVector, srcs: &[&BitVector]) -> Result<()> {
    let strategy = auto_strategy(dst, srcs);
    and_linear_with(strategy, dst, srcs)
}

/// `dst = srcs[0] & srcs[1] & ...` as a pairwise-halving tournament.
///
/// Accepts any operand count; odd stages carry their unpaired operand.
pub fn and_tree(dst: &mut BitVector, srcs: &[&BitVector]) -> Result<()> {
    let strategy = auto_strategy(dst, srcs);
    and_tree_with(strategy, dst, srcs)
}

/// Fixed 16-way tournament with an explicit lane strategy
pub fn and_tree16_with(
    strategy: SimdStrategy,
    dst: &mut BitVector,
    srcs: &[&BitVector; 16],
) -> Result<()> {
    let strategy = strategy.resolve();
    validate(strategy, dst, srcs)?;

    let lanes = dst.allocated() / strategy.lane_bytes();
    let ptrs = srcs.map(|src| src.as_ptr());
    // SAFETY: see reduce_grouped
    unsafe { dispatch_and16(strategy, dst.as_mut_ptr(), &ptrs, lanes) };

    dst.clear_padding();
    Ok(())
}

/// Sixteen operands reduced 8 → 4 → 2 → 1 per lane
pub fn and_tree16(dst: &mut BitVector, srcs: &[&BitVector; 16]) -> Result<()> {
    let strategy = auto_strategy(dst, srcs);
    and_tree16_with(strategy, dst, srcs)
}

/// Reduce with the shape selected by `reduction`
#[inline]
pub fn and_reduce(reduction: Reduction, dst: &mut BitVector, srcs: &[&BitVector]) -> Result<()> {
    match reduction {
        Reduction::Linear => and_linear(dst, srcs),
        Reduction::Tree => and_tree(dst, srcs),
    }
}
