//! SIMD kernels for bit-vector algebra
//!
//! This module provides lane-wide implementations of the destination-form
//! AND/OR/XOR and of the multi-operand AND reduction:
//! - AVX2 (256-bit) and SSE2 (128-bit) on x86_64
//! - NEON (128-bit) on ARM64
//! - a portable two-word fallback everywhere else
//!
//! All loads and stores are aligned. `BitVector` guarantees base alignment
//! and a lane-multiple capacity at construction, so the kernels never check
//! either in the hot path; the safe wrappers only verify that each vector's
//! alignment is at least as wide as the chosen lane.
//!
//! ## Strategy selection
//!
//! `SimdStrategy::detect()` picks the widest lane the CPU supports. A
//! requested strategy the CPU lacks is degraded to the next narrower one
//! (`Lane256` → `Lane128` → `Portable`) rather than executing unsupported
//! instructions.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

use crate::bitvector::BitVector;
use crate::error::{BitClassError, Result};
use crate::scalar::{check_capacity, BitOp};
use crate::types::LaneWidth;

/// Operands the tree kernel keeps in registers at once; larger reductions
/// are split into groups of this size.
pub const MAX_TREE_OPERANDS: usize = 32;

/// Lane implementation used for destination-form algebra and reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdStrategy {
    /// Two 64-bit words per lane, no vector instructions
    Portable,
    /// 128-bit lanes (SSE2 on x86_64, NEON on ARM64)
    Lane128,
    /// 256-bit lanes (AVX2)
    Lane256,
}

impl SimdStrategy {
    /// Widest strategy supported by the running CPU
    pub fn detect() -> Self {
        SimdStrategy::Lane256.resolve()
    }

    /// Strategy matching `lane`, degraded when the CPU lacks it
    pub fn for_lane(lane: LaneWidth) -> Self {
        match lane {
            LaneWidth::W128 => SimdStrategy::Lane128.resolve(),
            LaneWidth::W256 => SimdStrategy::Lane256.resolve(),
        }
    }

    /// Bytes processed per lane operation
    #[inline(always)]
    pub const fn lane_bytes(self) -> usize {
        match self {
            SimdStrategy::Portable | SimdStrategy::Lane128 => 16,
            SimdStrategy::Lane256 => 32,
        }
    }

    /// Whether this strategy can run on the current CPU
    pub fn is_available(self) -> bool {
        match self {
            SimdStrategy::Portable => true,
            SimdStrategy::Lane128 => cfg!(any(target_arch = "x86_64", target_arch = "aarch64")),
            SimdStrategy::Lane256 => {
                #[cfg(target_arch = "x86_64")]
                {
                    is_x86_feature_detected!("avx2")
                }
                #[cfg(not(target_arch = "x86_64"))]
                {
                    false
                }
            }
        }
    }

    /// This strategy if available, otherwise the widest narrower one that is
    pub fn resolve(self) -> Self {
        let mut strategy = self;
        while !strategy.is_available() {
            strategy = match strategy {
                SimdStrategy::Lane256 => SimdStrategy::Lane128,
                SimdStrategy::Lane128 | SimdStrategy::Portable => SimdStrategy::Portable,
            };
        }
        strategy
    }

    /// Human-readable name for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            SimdStrategy::Portable => "portable",
            SimdStrategy::Lane128 => {
                if cfg!(target_arch = "aarch64") {
                    "neon-128"
                } else {
                    "sse2-128"
                }
            }
            SimdStrategy::Lane256 => "avx2-256",
        }
    }

    /// Reject vectors aligned more narrowly than this strategy's lane
    pub(crate) fn check_vector(self, bv: &BitVector) -> Result<()> {
        let lane = self.lane_bytes();
        let vector_lane = bv.lane().bytes();
        if vector_lane < lane {
            return Err(BitClassError::LaneMismatch { lane, vector_lane });
        }
        debug_assert_eq!(bv.as_ptr() as usize % lane, 0);
        debug_assert_eq!(bv.allocated() % lane, 0);
        Ok(())
    }
}

impl Default for SimdStrategy {
    fn default() -> Self {
        Self::detect()
    }
}

// ============================================================================
// Lane abstraction
// ============================================================================

/// One SIMD register's worth of bits.
///
/// Every method is `#[inline(always)]` so the generic kernels below collapse
/// into the `#[target_feature]` entry points that instantiate them.
trait LaneOps: Copy {
    unsafe fn load(p: *const u8) -> Self;
    unsafe fn store(self, p: *mut u8);
    unsafe fn and(self, other: Self) -> Self;
    unsafe fn or(self, other: Self) -> Self;
    unsafe fn xor(self, other: Self) -> Self;
    unsafe fn zeroed() -> Self;
}

#[derive(Clone, Copy)]
struct PortableLane([u64; 2]);

impl LaneOps for PortableLane {
    #[inline(always)]
    unsafe fn load(p: *const u8) -> Self {
        PortableLane((p as *const [u64; 2]).read_unaligned())
    }
    #[inline(always)]
    unsafe fn store(self, p: *mut u8) {
        (p as *mut [u64; 2]).write_unaligned(self.0)
    }
    #[inline(always)]
    unsafe fn and(self, o: Self) -> Self {
        PortableLane([self.0[0] & o.0[0], self.0[1] & o.0[1]])
    }
    #[inline(always)]
    unsafe fn or(self, o: Self) -> Self {
        PortableLane([self.0[0] | o.0[0], self.0[1] | o.0[1]])
    }
    #[inline(always)]
    unsafe fn xor(self, o: Self) -> Self {
        PortableLane([self.0[0] ^ o.0[0], self.0[1] ^ o.0[1]])
    }
    #[inline(always)]
    unsafe fn zeroed() -> Self {
        PortableLane([0; 2])
    }
}

#[cfg(target_arch = "x86_64")]
#[derive(Clone, Copy)]
struct Sse2Lane(__m128i);

#[cfg(target_arch = "x86_64")]
impl LaneOps for Sse2Lane {
    #[inline(always)]
    unsafe fn load(p: *const u8) -> Self {
        Sse2Lane(_mm_load_si128(p as *const __m128i))
    }
    #[inline(always)]
    unsafe fn store(self, p: *mut u8) {
        _mm_store_si128(p as *mut __m128i, self.0)
    }
    #[inline(always)]
    unsafe fn and(self, o: Self) -> Self {
        Sse2Lane(_mm_and_si128(self.0, o.0))
    }
    #[inline(always)]
    unsafe fn or(self, o: Self) -> Self {
        Sse2Lane(_mm_or_si128(self.0, o.0))
    }
    #[inline(always)]
    unsafe fn xor(self, o: Self) -> Self {
        Sse2Lane(_mm_xor_si128(self.0, o.0))
    }
    #[inline(always)]
    unsafe fn zeroed() -> Self {
        Sse2Lane(_mm_setzero_si128())
    }
}

#[cfg(target_arch = "x86_64")]
#[derive(Clone, Copy)]
struct Avx2Lane(__m256i);

#[cfg(target_arch = "x86_64")]
impl LaneOps for Avx2Lane {
    #[inline(always)]
    unsafe fn load(p: *const u8) -> Self {
        Avx2Lane(_mm256_load_si256(p as *const __m256i))
    }
    #[inline(always)]
    unsafe fn store(self, p: *mut u8) {
        _mm256_store_si256(p as *mut __m256i, self.0)
    }
    #[inline(always)]
    unsafe fn and(self, o: Self) -> Self {
        Avx2Lane(_mm256_and_si256(self.0, o.0))
    }
    #[inline(always)]
    unsafe fn or(self, o: Self) -> Self {
        Avx2Lane(_mm256_or_si256(self.0, o.0))
    }
    #[inline(always)]
    unsafe fn xor(self, o: Self) -> Self {
        Avx2Lane(_mm256_xor_si256(self.0, o.0))
    }
    #[inline(always)]
    unsafe fn zeroed() -> Self {
        Avx2Lane(_mm256_setzero_si256())
    }
}

#[cfg(target_arch = "aarch64")]
#[derive(Clone, Copy)]
struct NeonLane(uint8x16_t);

#[cfg(target_arch = "aarch64")]
impl LaneOps for NeonLane {
    #[inline(always)]
    unsafe fn load(p: *const u8) -> Self {
        NeonLane(vld1q_u8(p))
    }
    #[inline(always)]
    unsafe fn store(self, p: *mut u8) {
        vst1q_u8(p, self.0)
    }
    #[inline(always)]
    unsafe fn and(self, o: Self) -> Self {
        NeonLane(vandq_u8(self.0, o.0))
    }
    #[inline(always)]
    unsafe fn or(self, o: Self) -> Self {
        NeonLane(vorrq_u8(self.0, o.0))
    }
    #[inline(always)]
    unsafe fn xor(self, o: Self) -> Self {
        NeonLane(veorq_u8(self.0, o.0))
    }
    #[inline(always)]
    unsafe fn zeroed() -> Self {
        NeonLane(vdupq_n_u8(0))
    }
}

// ============================================================================
// Generic kernels
// ============================================================================

/// `dst[i] = a[i] op b[i]` for `lanes` lanes. `dst` may equal `a` or `b`.
#[inline(always)]
unsafe fn combine_lanes<L: LaneOps>(
    op: BitOp,
    dst: *mut u8,
    a: *const u8,
    b: *const u8,
    lanes: usize,
) {
    let width = std::mem::size_of::<L>();
    match op {
        BitOp::And => {
            for i in 0..lanes {
                let off = i * width;
                L::load(a.add(off)).and(L::load(b.add(off))).store(dst.add(off));
            }
        }
        BitOp::Or => {
            for i in 0..lanes {
                let off = i * width;
                L::load(a.add(off)).or(L::load(b.add(off))).store(dst.add(off));
            }
        }
        BitOp::Xor => {
            for i in 0..lanes {
                let off = i * width;
                L::load(a.add(off)).xor(L::load(b.add(off))).store(dst.add(off));
            }
        }
    }
}

/// Sequential fold: one accumulator per lane, chain length `srcs.len()`
#[inline(always)]
unsafe fn and_linear_lanes<L: LaneOps>(dst: *mut u8, srcs: &[*const u8], lanes: usize) {
    let width = std::mem::size_of::<L>();
    for i in 0..lanes {
        let off = i * width;
        let mut acc = L::load(srcs[0].add(off));
        for src in &srcs[1..] {
            acc = acc.and(L::load(src.add(off)));
        }
        acc.store(dst.add(off));
    }
}

/// Pairwise halving over one group of at most `MAX_TREE_OPERANDS` sources.
///
/// Stage `k` pairs slot `i` with slot `i + ceil(n/2)`; an unpaired middle
/// slot is carried into the next stage unchanged.
#[inline(always)]
unsafe fn tree_group<L: LaneOps>(srcs: &[*const u8], off: usize) -> L {
    let mut slots = [L::zeroed(); MAX_TREE_OPERANDS];
    let mut n = srcs.len();
    for (slot, src) in slots.iter_mut().zip(srcs) {
        *slot = L::load(src.add(off));
    }
    while n > 1 {
        let half = n.div_ceil(2);
        for i in 0..(n - half) {
            slots[i] = slots[i].and(slots[i + half]);
        }
        n = half;
    }
    slots[0]
}

/// Tournament reduction, chain length `ceil(log2(srcs.len()))` per group
#[inline(always)]
unsafe fn and_tree_lanes<L: LaneOps>(dst: *mut u8, srcs: &[*const u8], lanes: usize) {
    let width = std::mem::size_of::<L>();
    for i in 0..lanes {
        let off = i * width;
        let mut groups = srcs.chunks(MAX_TREE_OPERANDS);
        let mut acc = match groups.next() {
            Some(group) => tree_group::<L>(group, off),
            None => return,
        };
        for group in groups {
            acc = acc.and(tree_group::<L>(group, off));
        }
        acc.store(dst.add(off));
    }
}

/// Fixed 16-way tournament: 8 → 4 → 2 → 1 independent ANDs per lane
#[inline(always)]
unsafe fn and_tree16_lanes<L: LaneOps>(dst: *mut u8, v: &[*const u8; 16], lanes: usize) {
    let width = std::mem::size_of::<L>();
    for i in 0..lanes {
        let off = i * width;
        let s1_0 = L::load(v[0].add(off)).and(L::load(v[8].add(off)));
        let s1_1 = L::load(v[1].add(off)).and(L::load(v[9].add(off)));
        let s1_2 = L::load(v[2].add(off)).and(L::load(v[10].add(off)));
        let s1_3 = L::load(v[3].add(off)).and(L::load(v[11].add(off)));
        let s1_4 = L::load(v[4].add(off)).and(L::load(v[12].add(off)));
        let s1_5 = L::load(v[5].add(off)).and(L::load(v[13].add(off)));
        let s1_6 = L::load(v[6].add(off)).and(L::load(v[14].add(off)));
        let s1_7 = L::load(v[7].add(off)).and(L::load(v[15].add(off)));

        let s2_0 = s1_0.and(s1_4);
        let s2_1 = s1_1.and(s1_5);
        let s2_2 = s1_2.and(s1_6);
        let s2_3 = s1_3.and(s1_7);

        let s3_0 = s2_0.and(s2_2);
        let s3_1 = s2_1.and(s2_3);

        s3_0.and(s3_1).store(dst.add(off));
    }
}

// ============================================================================
// Feature-gated entry points
// ============================================================================

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn combine_avx2(op: BitOp, dst: *mut u8, a: *const u8, b: *const u8, lanes: usize) {
    combine_lanes::<Avx2Lane>(op, dst, a, b, lanes)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn and_linear_avx2(dst: *mut u8, srcs: &[*const u8], lanes: usize) {
    and_linear_lanes::<Avx2Lane>(dst, srcs, lanes)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn and_tree_avx2(dst: *mut u8, srcs: &[*const u8], lanes: usize) {
    and_tree_lanes::<Avx2Lane>(dst, srcs, lanes)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn and_tree16_avx2(dst: *mut u8, srcs: &[*const u8; 16], lanes: usize) {
    and_tree16_lanes::<Avx2Lane>(dst, srcs, lanes)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn combine_sse2(op: BitOp, dst: *mut u8, a: *const u8, b: *const u8, lanes: usize) {
    combine_lanes::<Sse2Lane>(op, dst, a, b, lanes)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn and_linear_sse2(dst: *mut u8, srcs: &[*const u8], lanes: usize) {
    and_linear_lanes::<Sse2Lane>(dst, srcs, lanes)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn and_tree_sse2(dst: *mut u8, srcs: &[*const u8], lanes: usize) {
    and_tree_lanes::<Sse2Lane>(dst, srcs, lanes)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn and_tree16_sse2(dst: *mut u8, srcs: &[*const u8; 16], lanes: usize) {
    and_tree16_lanes::<Sse2Lane>(dst, srcs, lanes)
}

// ============================================================================
// Dispatch
// ============================================================================

/// Shape of a multi-operand AND
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AndShape {
    Linear,
    Tree,
}

/// Run `dst = a op b` with an already validated, available strategy.
///
/// # Safety
/// All pointers must reference buffers of `lanes * strategy.lane_bytes()`
/// bytes aligned to the strategy's lane width.
unsafe fn dispatch_combine(
    strategy: SimdStrategy,
    op: BitOp,
    dst: *mut u8,
    a: *const u8,
    b: *const u8,
    lanes: usize,
) {
    match strategy {
        #[cfg(target_arch = "x86_64")]
        SimdStrategy::Lane256 => combine_avx2(op, dst, a, b, lanes),
        #[cfg(target_arch = "x86_64")]
        SimdStrategy::Lane128 => combine_sse2(op, dst, a, b, lanes),
        #[cfg(target_arch = "aarch64")]
        SimdStrategy::Lane128 => combine_lanes::<NeonLane>(op, dst, a, b, lanes),
        _ => {
            let portable_lanes = lanes * strategy.lane_bytes() / 16;
            combine_lanes::<PortableLane>(op, dst, a, b, portable_lanes)
        }
    }
}

/// Run a multi-operand AND with an already validated, available strategy.
///
/// # Safety
/// Same contract as [`dispatch_combine`] for `dst` and every source.
pub(crate) unsafe fn dispatch_and(
    strategy: SimdStrategy,
    shape: AndShape,
    dst: *mut u8,
    srcs: &[*const u8],
    lanes: usize,
) {
    match (strategy, shape) {
        #[cfg(target_arch = "x86_64")]
        (SimdStrategy::Lane256, AndShape::Linear) => and_linear_avx2(dst, srcs, lanes),
        #[cfg(target_arch = "x86_64")]
        (SimdStrategy::Lane256, AndShape::Tree) => and_tree_avx2(dst, srcs, lanes),
        #[cfg(target_arch = "x86_64")]
        (SimdStrategy::Lane128, AndShape::Linear) => and_linear_sse2(dst, srcs, lanes),
        #[cfg(target_arch = "x86_64")]
        (SimdStrategy::Lane128, AndShape::Tree) => and_tree_sse2(dst, srcs, lanes),
        #[cfg(target_arch = "aarch64")]
        (SimdStrategy::Lane128, AndShape::Linear) => and_linear_lanes::<NeonLane>(dst, srcs, lanes),
        #[cfg(target_arch = "aarch64")]
        (SimdStrategy::Lane128, AndShape::Tree) => and_tree_lanes::<NeonLane>(dst, srcs, lanes),
        (_, AndShape::Linear) => {
            let portable_lanes = lanes * strategy.lane_bytes() / 16;
            and_linear_lanes::<PortableLane>(dst, srcs, portable_lanes)
        }
        (_, AndShape::Tree) => {
            let portable_lanes = lanes * strategy.lane_bytes() / 16;
            and_tree_lanes::<PortableLane>(dst, srcs, portable_lanes)
        }
    }
}

/// Fixed 16-way tournament with an already validated, available strategy.
///
/// # Safety
/// Same contract as [`dispatch_combine`] for `dst` and every source.
pub(crate) unsafe fn dispatch_and16(
    strategy: SimdStrategy,
    dst: *mut u8,
    srcs: &[*const u8; 16],
    lanes: usize,
) {
    match strategy {
        #[cfg(target_arch = "x86_64")]
        SimdStrategy::Lane256 => and_tree16_avx2(dst, srcs, lanes),
        #[cfg(target_arch = "x86_64")]
        SimdStrategy::Lane128 => and_tree16_sse2(dst, srcs, lanes),
        #[cfg(target_arch = "aarch64")]
        SimdStrategy::Lane128 => and_tree16_lanes::<NeonLane>(dst, srcs, lanes),
        _ => {
            let portable_lanes = lanes * strategy.lane_bytes() / 16;
            and_tree16_lanes::<PortableLane>(dst, srcs, portable_lanes)
        }
    }
}

// ============================================================================
// Safe destination-form API
// ============================================================================

/// `dst = a op b` in `strategy`-wide lanes.
///
/// Byte-identical to [`crate::scalar::combine_into`]. Capacities must be
/// equal and every vector must be aligned at least as wide as the lane.
pub fn combine_into_with(
    strategy: SimdStrategy,
    op: BitOp,
    dst: &mut BitVector,
    a: &BitVector,
    b: &BitVector,
) -> Result<()> {
    check_capacity(dst.allocated(), a.allocated())?;
    check_capacity(dst.allocated(), b.allocated())?;
    let strategy = strategy.resolve();
    strategy.check_vector(dst)?;
    strategy.check_vector(a)?;
    strategy.check_vector(b)?;

    let lanes = dst.allocated() / strategy.lane_bytes();
    // SAFETY: capacities are equal lane multiples and every base address is
    // aligned to the lane width (checked above / guaranteed by BitVector)
    unsafe {
        dispatch_combine(strategy, op, dst.as_mut_ptr(), a.as_ptr(), b.as_ptr(), lanes);
    }
    dst.clear_padding();
    Ok(())
}

/// Strategy for a set of vectors: the native lane of the narrowest one
pub(crate) fn strategy_for<'a>(vectors: impl IntoIterator<Item = &'a BitVector>) -> SimdStrategy {
    let narrowest = vectors
        .into_iter()
        .map(|bv| bv.lane())
        .min_by_key(|lane| lane.bytes())
        .unwrap_or_default();
    SimdStrategy::for_lane(narrowest)
}

/// `dst = a & b` using the widest lane all three vectors support
pub fn and_into_simd(dst: &mut BitVector, a: &BitVector, b: &BitVector) -> Result<()> {
    let strategy = strategy_for([&*dst, a, b]);
    combine_into_with(strategy, BitOp::And, dst, a, b)
}

/// `dst = a | b` using the widest lane all three vectors support
pub fn or_into_simd(dst: &mut BitVector, a: &BitVector, b: &BitVector) -> Result<()> {
    let strategy = strategy_for([&*dst, a, b]);
    combine_into_with(strategy, BitOp::Or, dst, a, b)
}

/// `dst = a ^ b` using the widest lane all three vectors support
pub fn xor_into_simd(dst: &mut BitVector, a: &BitVector, b: &BitVector) -> Result<()> {
    let strategy = strategy_for([&*dst, a, b]);
    combine_into_with(strategy, BitOp::Xor, dst, a, b)
}

/// `dst op= src` in `strategy`-wide lanes; capacities must be equal
pub fn combine_assign_with(
    strategy: SimdStrategy,
    op: BitOp,
    dst: &mut BitVector,
    src: &BitVector,
) -> Result<()> {
    check_capacity(dst.allocated(), src.allocated())?;
    let strategy = strategy.resolve();
    strategy.check_vector(dst)?;
    strategy.check_vector(src)?;

    let lanes = dst.allocated() / strategy.lane_bytes();
    let d = dst.as_mut_ptr();
    // SAFETY: as in combine_into_with; each lane is loaded before it is
    // stored, so reading and writing `dst` in the same call is sound
    unsafe {
        dispatch_combine(strategy, op, d, d, src.as_ptr(), lanes);
    }
    dst.clear_padding();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar;

    fn patterned(size: usize, lane: LaneWidth, seed: usize) -> BitVector {
        let mut bv = BitVector::with_lane(size, lane).unwrap();
        for i in 0..size {
            if (i * 7 + seed * 13) % 5 < 2 {
                bv.set(i, true).unwrap();
            }
        }
        bv
    }

    fn all_strategies() -> Vec<SimdStrategy> {
        [SimdStrategy::Portable, SimdStrategy::Lane128, SimdStrategy::Lane256]
            .into_iter()
            .filter(|s| s.is_available())
            .collect()
    }

    #[test]
    fn test_resolve_never_returns_unavailable() {
        for s in [SimdStrategy::Portable, SimdStrategy::Lane128, SimdStrategy::Lane256] {
            assert!(s.resolve().is_available());
        }
        assert!(SimdStrategy::detect().is_available());
    }

    #[test]
    fn test_simd_matches_scalar_all_ops() {
        for strategy in all_strategies() {
            for size in [1, 100, 256, 1000, 4096] {
                let a = patterned(size, LaneWidth::W256, 1);
                let b = patterned(size, LaneWidth::W256, 2);
                for op in [BitOp::And, BitOp::Or, BitOp::Xor] {
                    let mut expected = BitVector::with_lane(size, LaneWidth::W256).unwrap();
                    scalar::combine_into(op, &mut expected, &a, &b).unwrap();
                    let mut actual = BitVector::with_lane(size, LaneWidth::W256).unwrap();
                    combine_into_with(strategy, op, &mut actual, &a, &b).unwrap();
                    assert_eq!(
                        actual.as_bytes(),
                        expected.as_bytes(),
                        "{} {:?} size {}",
                        strategy.name(),
                        op,
                        size
                    );
                }
            }
        }
    }

    #[test]
    fn test_wide_lane_on_narrow_vectors_rejected() {
        let a = patterned(256, LaneWidth::W128, 1);
        let b = patterned(256, LaneWidth::W128, 2);
        let mut dst = BitVector::with_lane(256, LaneWidth::W128).unwrap();
        let result = combine_into_with(SimdStrategy::Lane256, BitOp::And, &mut dst, &a, &b);
        if SimdStrategy::Lane256.is_available() {
            assert!(matches!(
                result,
                Err(BitClassError::LaneMismatch { lane: 32, vector_lane: 16 })
            ));
        } else {
            // Degraded to a 128-bit or portable lane, which fits
            assert!(result.is_ok());
        }
    }

    #[test]
    fn test_capacity_mismatch_rejected() {
        let a = BitVector::new(256).unwrap();
        let b = BitVector::new(512).unwrap();
        let mut dst = BitVector::new(256).unwrap();
        assert!(matches!(
            and_into_simd(&mut dst, &a, &b),
            Err(BitClassError::CapacityMismatch { expected: 32, actual: 64 })
        ));
    }

    #[test]
    fn test_assign_matches_into() {
        for strategy in all_strategies() {
            let a = patterned(700, LaneWidth::W256, 3);
            let b = patterned(700, LaneWidth::W256, 4);
            let mut expected = BitVector::new(700).unwrap();
            and_into_simd(&mut expected, &a, &b).unwrap();

            let mut acc = a.clone();
            combine_assign_with(strategy, BitOp::And, &mut acc, &b).unwrap();
            assert_eq!(acc, expected);
        }
    }

    #[test]
    fn test_narrow_destination_padding_cleared() {
        // Equal capacities, but dst is logically shorter than the operands
        let mut a = BitVector::new(200).unwrap();
        let mut b = BitVector::new(200).unwrap();
        a.set(150, true).unwrap();
        b.set(150, true).unwrap();
        let mut dst = BitVector::new(100).unwrap();
        or_into_simd(&mut dst, &a, &b).unwrap();
        assert_eq!(dst.first_set_bit(), None);
    }
}
