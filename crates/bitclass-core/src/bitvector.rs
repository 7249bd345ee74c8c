//! Fixed-capacity, lane-aligned bit-vector
//!
//! A `BitVector` owns a zero-initialized byte buffer whose base address and
//! length are both multiples of the SIMD lane width it was created for. The
//! logical bit length (`size`) never changes after creation.
//!
//! ## Bit convention
//!
//! Bit `i` lives in byte `i >> 3`, at position `i & 7` of that byte
//! (least-significant bit first). Word scans read bytes as little-endian
//! `u64`s, so `first_set_bit` is independent of host byte order.
//!
//! ## Padding
//!
//! Bits in `[size, allocated * 8)` are always zero. `first_set_bit` and
//! `count_ones` scan the whole allocation, so every mutator that could leak
//! a bit past `size` clears the padding before returning.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::ptr::NonNull;

use crate::error::{BitClassError, Result};
use crate::types::LaneWidth;

/// Byte capacity of a vector holding `bits` bits laid out for `lane`.
///
/// Always a positive multiple of the lane width; a zero-bit vector still
/// occupies one lane.
#[inline]
pub fn capacity_for(bits: usize, lane: LaneWidth) -> usize {
    let lane_bytes = lane.bytes();
    let bytes = bits.div_ceil(8);
    bytes.div_ceil(lane_bytes).max(1) * lane_bytes
}

/// In-memory header preceding the byte image of a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitVectorHeader {
    /// Allocated byte capacity
    pub allocated: u64,
    /// Logical bit length
    pub size: u64,
}

/// Lane-aligned, densely packed bit-vector with a fixed logical size
pub struct BitVector {
    ptr: NonNull<u8>,
    allocated: usize,
    size: usize,
    lane: LaneWidth,
}

impl BitVector {
    /// Create a zeroed vector of `bit_size` bits using the default lane width
    pub fn new(bit_size: usize) -> Result<Self> {
        Self::with_lane(bit_size, LaneWidth::default())
    }

    /// Create a zeroed vector of `bit_size` bits laid out for `lane`
    pub fn with_lane(bit_size: usize, lane: LaneWidth) -> Result<Self> {
        let allocated = capacity_for(bit_size, lane);
        let layout = Layout::from_size_align(allocated, lane.bytes())
            .map_err(|_| BitClassError::AllocationFailure { bytes: allocated })?;

        // SAFETY: layout has a non-zero size (capacity_for never returns 0)
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(BitClassError::AllocationFailure { bytes: allocated })?;

        Ok(Self {
            ptr,
            allocated,
            size: bit_size,
            lane,
        })
    }

    /// Rebuild a vector from an exported byte image.
    ///
    /// The image is copied into a freshly aligned buffer, so it may come from
    /// any source (file, socket, unaligned slice).
    pub fn from_bytes(bit_size: usize, lane: LaneWidth, bytes: &[u8]) -> Result<Self> {
        let mut bv = Self::with_lane(bit_size, lane)?;
        if bytes.len() != bv.allocated {
            return Err(BitClassError::CapacityMismatch {
                expected: bv.allocated,
                actual: bytes.len(),
            });
        }
        bv.bytes_mut().copy_from_slice(bytes);
        if bv.has_padding_bits() {
            return Err(BitClassError::PaddingViolation { size: bit_size });
        }
        Ok(bv)
    }

    /// Independent copy in a freshly aligned buffer
    pub fn try_clone(&self) -> Result<Self> {
        let mut out = Self::with_lane(self.size, self.lane)?;
        out.bytes_mut().copy_from_slice(self.as_bytes());
        Ok(out)
    }

    /// Release the buffer. Equivalent to dropping the vector.
    pub fn destroy(self) {
        drop(self);
    }

    /// Logical bit length
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocated byte capacity
    #[inline(always)]
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Lane width the buffer is laid out for
    #[inline(always)]
    pub fn lane(&self) -> LaneWidth {
        self.lane
    }

    /// Number of bytes touched by the logical bits
    #[inline(always)]
    pub fn logical_bytes(&self) -> usize {
        self.size.div_ceil(8)
    }

    /// Header describing the in-memory layout
    pub fn header(&self) -> BitVectorHeader {
        BitVectorHeader {
            allocated: self.allocated as u64,
            size: self.size as u64,
        }
    }

    /// Full allocated byte image, padding included
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: ptr owns `allocated` initialized bytes for the lifetime of self
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.allocated) }
    }

    #[inline(always)]
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: &mut self gives exclusive access to the owned buffer
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.allocated) }
    }

    #[inline(always)]
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline(always)]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline(always)]
    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.size {
            return Err(BitClassError::OutOfRange {
                index,
                size: self.size,
            });
        }
        Ok(())
    }

    /// Set bit `index` to `value` without touching its neighbors
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) -> Result<()> {
        self.check_index(index)?;
        let bit = index & 7;
        let byte = &mut self.bytes_mut()[index >> 3];
        *byte = (*byte & !(1u8 << bit)) | ((value as u8) << bit);
        Ok(())
    }

    /// Read bit `index`
    #[inline]
    pub fn get(&self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        Ok((self.as_bytes()[index >> 3] >> (index & 7)) & 1 == 1)
    }

    /// Complement of the logical bits as a new vector of the same size and lane
    pub fn not(&self) -> Result<BitVector> {
        let mut out = BitVector::with_lane(self.size, self.lane)?;
        let count = self.logical_bytes();
        let src = &self.as_bytes()[..count];
        for (d, s) in out.bytes_mut()[..count].iter_mut().zip(src) {
            *d = !*s;
        }
        out.clear_padding();
        Ok(out)
    }

    /// Little-endian 64-bit words over the whole allocation
    #[inline]
    pub fn words(&self) -> impl Iterator<Item = u64> + '_ {
        self.as_bytes().chunks_exact(8).map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            u64::from_le_bytes(word)
        })
    }

    /// Offset of the lowest set bit, scanning the full allocation in
    /// ascending word order. `None` when every bit is clear.
    #[inline]
    pub fn first_set_bit(&self) -> Option<usize> {
        self.words()
            .enumerate()
            .find(|&(_, word)| word != 0)
            .map(|(i, word)| (i << 6) + word.trailing_zeros() as usize)
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.words().map(|w| w.count_ones() as usize).sum()
    }

    /// True when no bit is set
    pub fn is_zero(&self) -> bool {
        self.words().all(|w| w == 0)
    }

    /// Clear every bit
    pub fn clear(&mut self) {
        self.bytes_mut().fill(0);
    }

    /// Set every logical bit, leaving padding clear
    pub fn fill(&mut self) {
        let count = self.logical_bytes();
        self.bytes_mut()[..count].fill(0xFF);
        self.clear_padding();
    }

    /// Iterate over set bit offsets in ascending order
    pub fn iter_ones(&self) -> Ones<'_> {
        Ones {
            bytes: self.as_bytes(),
            word_idx: 0,
            current: 0,
        }
    }

    /// Overwrite this vector's bytes with `other`'s; capacities must match
    pub fn copy_from(&mut self, other: &BitVector) -> Result<()> {
        if other.allocated != self.allocated {
            return Err(BitClassError::CapacityMismatch {
                expected: self.allocated,
                actual: other.allocated,
            });
        }
        self.bytes_mut().copy_from_slice(other.as_bytes());
        self.clear_padding();
        Ok(())
    }

    /// Hint the CPU to pull the head of the buffer into cache
    #[inline(always)]
    pub fn prefetch(&self) {
        #[cfg(target_arch = "x86_64")]
        {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T2};
            // SAFETY: prefetch is a hint; SSE is baseline on x86_64
            unsafe { _mm_prefetch::<_MM_HINT_T2>(self.as_ptr() as *const i8) };
        }
    }

    /// Zero every bit in `[size, allocated * 8)`
    pub(crate) fn clear_padding(&mut self) {
        let full = self.size >> 3;
        let rem = self.size & 7;
        let bytes = self.bytes_mut();
        let tail = if rem != 0 {
            bytes[full] &= (1u8 << rem) - 1;
            full + 1
        } else {
            full
        };
        bytes[tail..].fill(0);
    }

    /// True when any padding bit is set
    pub(crate) fn has_padding_bits(&self) -> bool {
        let full = self.size >> 3;
        let rem = self.size & 7;
        let bytes = self.as_bytes();
        let (partial, tail) = if rem != 0 {
            (bytes[full] & !((1u8 << rem) - 1), full + 1)
        } else {
            (0, full)
        };
        partial != 0 || bytes[tail..].iter().any(|&b| b != 0)
    }
}

impl Drop for BitVector {
    fn drop(&mut self) {
        // Same size/align as the allocation in with_lane, which succeeded
        if let Ok(layout) = Layout::from_size_align(self.allocated, self.lane.bytes()) {
            // SAFETY: ptr was produced by alloc_zeroed with this exact layout
            unsafe { dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

impl Clone for BitVector {
    fn clone(&self) -> Self {
        self.try_clone()
            .expect("allocation failed while cloning BitVector")
    }
}

impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.as_bytes() == other.as_bytes()
    }
}

impl Eq for BitVector {}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitVector")
            .field("size", &self.size)
            .field("allocated", &self.allocated)
            .field("lane", &self.lane)
            .field("ones", &self.count_ones())
            .finish()
    }
}

/// Logical bytes, highest byte first, bits printed MSB to LSB, four bytes
/// per line.
impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        for i in (0..self.logical_bytes()).rev() {
            write!(f, "{:08b}", bytes[i])?;
            if i & 3 == 0 {
                writeln!(f)?;
            } else {
                write!(f, " ")?;
            }
        }
        Ok(())
    }
}

// SAFETY: BitVector uniquely owns its buffer; shared access is read-only and
// mutation requires &mut.
unsafe impl Send for BitVector {}
unsafe impl Sync for BitVector {}

/// Ascending iterator over set bits
pub struct Ones<'a> {
    bytes: &'a [u8],
    word_idx: usize,
    current: u64,
}

impl<'a> Iterator for Ones<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(((self.word_idx - 1) << 6) + bit);
            }
            let start = self.word_idx * 8;
            if start >= self.bytes.len() {
                return None;
            }
            let mut word = [0u8; 8];
            word.copy_from_slice(&self.bytes[start..start + 8]);
            self.current = u64::from_le_bytes(word);
            self.word_idx += 1;
        }
    }
}
