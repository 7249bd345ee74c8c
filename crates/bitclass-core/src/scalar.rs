//! Byte-wise AND/OR/XOR over bit-vectors
//!
//! Every operator comes in three forms:
//! - allocating (`and`): returns a new vector sized to the shorter operand
//! - in-place (`and_inplace`): overwrites the first operand
//! - destination (`and_into`): writes into a caller-owned vector, no allocation
//!
//! These are the ground truth the SIMD kernels are tested against.

use crate::bitvector::BitVector;
use crate::error::{BitClassError, Result};

/// Binary bitwise operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOp {
    /// Intersection
    And,
    /// Union
    Or,
    /// Symmetric difference
    Xor,
}

impl BitOp {
    /// Apply the operator to one byte pair
    #[inline(always)]
    pub fn apply(self, a: u8, b: u8) -> u8 {
        match self {
            BitOp::And => a & b,
            BitOp::Or => a | b,
            BitOp::Xor => a ^ b,
        }
    }
}

#[inline(always)]
pub(crate) fn check_capacity(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(BitClassError::CapacityMismatch { expected, actual });
    }
    Ok(())
}

#[inline(always)]
fn apply_bytes(op: BitOp, dst: &mut [u8], a: &[u8], b: &[u8]) {
    for ((d, &x), &y) in dst.iter_mut().zip(a).zip(b) {
        *d = op.apply(x, y);
    }
}

/// New vector of `min(a.size, b.size)` bits holding `a op b`
pub fn combine(op: BitOp, a: &BitVector, b: &BitVector) -> Result<BitVector> {
    let mut out = BitVector::with_lane(a.size().min(b.size()), a.lane())?;
    let count = out.allocated().min(a.allocated()).min(b.allocated());
    apply_bytes(
        op,
        &mut out.bytes_mut()[..count],
        &a.as_bytes()[..count],
        &b.as_bytes()[..count],
    );
    // The longer operand's bits past the shorter size must not survive
    out.clear_padding();
    Ok(out)
}

/// `a = a op b` over `b`'s capacity; `a` must be at least as large as `b`
pub fn combine_inplace(op: BitOp, a: &mut BitVector, b: &BitVector) -> Result<()> {
    if a.allocated() < b.allocated() {
        return Err(BitClassError::CapacityMismatch {
            expected: b.allocated(),
            actual: a.allocated(),
        });
    }
    let count = b.allocated();
    for (d, &y) in a.bytes_mut()[..count].iter_mut().zip(b.as_bytes()) {
        *d = op.apply(*d, y);
    }
    a.clear_padding();
    Ok(())
}

/// `dst = a op b` over `dst`'s capacity; all three capacities must match
pub fn combine_into(op: BitOp, dst: &mut BitVector, a: &BitVector, b: &BitVector) -> Result<()> {
    check_capacity(dst.allocated(), a.allocated())?;
    check_capacity(dst.allocated(), b.allocated())?;
    apply_bytes(op, dst.bytes_mut(), a.as_bytes(), b.as_bytes());
    dst.clear_padding();
    Ok(())
}

/// Intersection as a new vector
pub fn and(a: &BitVector, b: &BitVector) -> Result<BitVector> {
    combine(BitOp::And, a, b)
}

/// Union as a new vector
pub fn or(a: &BitVector, b: &BitVector) -> Result<BitVector> {
    combine(BitOp::Or, a, b)
}

/// Symmetric difference as a new vector
pub fn xor(a: &BitVector, b: &BitVector) -> Result<BitVector> {
    combine(BitOp::Xor, a, b)
}

/// `a &= b`
pub fn and_inplace(a: &mut BitVector, b: &BitVector) -> Result<()> {
    combine_inplace(BitOp::And, a, b)
}

/// `a |= b`
pub fn or_inplace(a: &mut BitVector, b: &BitVector) -> Result<()> {
    combine_inplace(BitOp::Or, a, b)
}

/// `a ^= b`
pub fn xor_inplace(a: &mut BitVector, b: &BitVector) -> Result<()> {
    combine_inplace(BitOp::Xor, a, b)
}

/// `dst = a & b`
pub fn and_into(dst: &mut BitVector, a: &BitVector, b: &BitVector) -> Result<()> {
    combine_into(BitOp::And, dst, a, b)
}

/// `dst = a | b`
pub fn or_into(dst: &mut BitVector, a: &BitVector, b: &BitVector) -> Result<()> {
    combine_into(BitOp::Or, dst, a, b)
}

/// `dst = a ^ b`
pub fn xor_into(dst: &mut BitVector, a: &BitVector, b: &BitVector) -> Result<()> {
    combine_into(BitOp::Xor, dst, a, b)
}
