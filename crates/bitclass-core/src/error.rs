//! Error types for bitclass

use thiserror::Error;

/// Result type alias for bitclass operations
pub type Result<T> = std::result::Result<T, BitClassError>;

/// Main error type for bitclass
#[derive(Error, Debug)]
pub enum BitClassError {
    /// The allocator could not provide an aligned buffer
    #[error("Allocation failure: could not allocate {bytes} bytes")]
    AllocationFailure {
        /// Requested byte count
        bytes: usize,
    },

    /// Bit index outside the logical size of a vector
    #[error("Bit index {index} out of range for size {size}")]
    OutOfRange {
        /// Requested bit index
        index: usize,
        /// Logical bit size of the vector
        size: usize,
    },

    /// Operands or destination do not share the required byte capacity
    #[error("Capacity mismatch: expected {expected} bytes, got {actual}")]
    CapacityMismatch {
        /// Expected allocated byte count
        expected: usize,
        /// Actual allocated byte count
        actual: usize,
    },

    /// SIMD lane wider than the alignment a vector was created with
    #[error("Lane mismatch: {lane}-byte lanes need {lane}-byte aligned vectors, got {vector_lane}-byte")]
    LaneMismatch {
        /// Strategy lane width in bytes
        lane: usize,
        /// Lane width (and alignment) of the offending vector in bytes
        vector_lane: usize,
    },

    /// Reduction called without operands
    #[error("Reduction requires at least one operand")]
    EmptyOperands,

    /// Reloaded byte image has set bits beyond the logical size
    #[error("Padding violation: bits beyond logical size {size} are set")]
    PaddingViolation {
        /// Logical bit size of the image
        size: usize,
    },

    /// Every bit position of a classifier is already assigned
    #[error("Capacity exceeded: classifier holds at most {capacity} rules")]
    CapacityExceeded {
        /// Maximum number of rules
        capacity: usize,
    },

    /// Prefix length longer than the key
    #[error("Invalid prefix length {prefix_len}: key has {max} bits")]
    InvalidPrefix {
        /// Requested prefix length
        prefix_len: u32,
        /// Key length in bits
        max: u32,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed rule file line
    #[error("Parse error at line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
