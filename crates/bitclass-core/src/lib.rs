//! # Bitclass Core
//!
//! Lane-aligned bit-vectors with SIMD set algebra and multi-operand AND
//! reduction, the computational kernel of a multi-field / longest-prefix-match
//! packet classifier.
//!
//! ## Features
//!
//! - **BitVector**: fixed-capacity buffer aligned to 128-bit or 256-bit lanes,
//!   padding bits kept zero by every mutator
//! - **Scalar Algebra**: AND/OR/XOR in allocating, in-place and destination forms
//! - **SIMD Algebra**: AVX2 / SSE2 / NEON destination-form kernels with a
//!   portable fallback and runtime feature detection
//! - **Reduction**: N-way AND as a linear fold or a pairwise tournament tree,
//!   plus a fixed 16-way specialization
//! - **Classifier**: per-field, per-byte-value bit-vector arrays built from
//!   prefix rules and frozen for concurrent lookups
//!
//! ## Example
//!
//! ```
//! use bitclass_core::{BitVector, reduction};
//!
//! let mut a = BitVector::new(16).unwrap();
//! let mut b = BitVector::new(16).unwrap();
//! a.set(3, true).unwrap();
//! a.set(9, true).unwrap();
//! b.set(9, true).unwrap();
//!
//! let mut dst = BitVector::new(16).unwrap();
//! reduction::and_tree(&mut dst, &[&a, &b]).unwrap();
//! assert_eq!(dst.first_set_bit(), Some(9));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitvector;
pub mod classifier;
pub mod error;
pub mod reduction;
pub mod rules;
pub mod scalar;
pub mod simd_intrinsics;
pub mod types;

pub use bitvector::{capacity_for, BitVector, BitVectorHeader, Ones};
pub use classifier::{Classifier, ClassifierBuilder};
pub use error::{BitClassError, Result};
pub use reduction::{and_linear, and_reduce, and_tree, and_tree16};
pub use rules::{parse_rule_line, Rule, RuleSet};
pub use scalar::BitOp;
pub use simd_intrinsics::{and_into_simd, or_into_simd, xor_into_simd, SimdStrategy};
pub use types::{ClassifierConfig, LaneWidth, Reduction, RuleId};
