//! Core types shared by the bit-vector engine and the classifier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BitClassError;

/// SIMD lane width a bit-vector is laid out for.
///
/// Capacity is always a multiple of the lane width and the buffer base is
/// aligned to it, so aligned vector loads never straddle an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneWidth {
    /// 128-bit lanes (SSE2 / NEON)
    W128,
    /// 256-bit lanes (AVX2)
    W256,
}

impl LaneWidth {
    /// Lane width in bytes
    #[inline(always)]
    pub const fn bytes(self) -> usize {
        match self {
            LaneWidth::W128 => 16,
            LaneWidth::W256 => 32,
        }
    }

    /// Lane width in bits
    #[inline(always)]
    pub const fn bits(self) -> usize {
        self.bytes() * 8
    }

    /// Widest lane the running CPU can process natively
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                return LaneWidth::W256;
            }
        }
        LaneWidth::W128
    }
}

impl Default for LaneWidth {
    fn default() -> Self {
        LaneWidth::W256
    }
}

impl fmt::Display for LaneWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl FromStr for LaneWidth {
    type Err = BitClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "128" | "w128" | "sse" | "neon" => Ok(LaneWidth::W128),
            "256" | "w256" | "avx2" => Ok(LaneWidth::W256),
            "auto" => Ok(LaneWidth::detect()),
            other => Err(BitClassError::InvalidConfig(format!(
                "unknown lane width '{}'",
                other
            ))),
        }
    }
}

/// Strategy used to AND the per-field vectors of a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Sequential fold, dependency chain of length N
    Linear,
    /// Pairwise-halving tournament, dependency chain of length log2(N)
    Tree,
}

impl Default for Reduction {
    fn default() -> Self {
        Reduction::Tree
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduction::Linear => write!(f, "linear"),
            Reduction::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for Reduction {
    type Err = BitClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" | "fold" => Ok(Reduction::Linear),
            "tree" | "tournament" => Ok(Reduction::Tree),
            other => Err(BitClassError::InvalidConfig(format!(
                "unknown reduction strategy '{}'",
                other
            ))),
        }
    }
}

/// Rule identifier as it appears in rule files
pub type RuleId = u32;

/// Configuration for a classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Number of one-byte key fields (4 for IPv4)
    pub num_fields: usize,
    /// Lane width of every per-field vector
    pub lane: LaneWidth,
    /// Reduction used by lookups
    pub reduction: Reduction,
}

impl ClassifierConfig {
    /// Largest supported key, in one-byte fields
    pub const MAX_FIELDS: usize = 16;

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.num_fields == 0 || self.num_fields > Self::MAX_FIELDS {
            return Err(BitClassError::InvalidConfig(format!(
                "num_fields must be between 1 and {}, got {}",
                Self::MAX_FIELDS,
                self.num_fields
            )));
        }
        Ok(())
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            num_fields: 4,
            lane: LaneWidth::default(),
            reduction: Reduction::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_bytes() {
        assert_eq!(LaneWidth::W128.bytes(), 16);
        assert_eq!(LaneWidth::W256.bytes(), 32);
        assert_eq!(LaneWidth::W256.bits(), 256);
    }

    #[test]
    fn test_parse_lane_and_reduction() {
        assert_eq!("128".parse::<LaneWidth>().unwrap(), LaneWidth::W128);
        assert_eq!("W256".parse::<LaneWidth>().unwrap(), LaneWidth::W256);
        assert!("512".parse::<LaneWidth>().is_err());

        assert_eq!("tree".parse::<Reduction>().unwrap(), Reduction::Tree);
        assert_eq!("Linear".parse::<Reduction>().unwrap(), Reduction::Linear);
        assert!("random".parse::<Reduction>().is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(ClassifierConfig::default().validate().is_ok());

        let zero = ClassifierConfig {
            num_fields: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(BitClassError::InvalidConfig(_))));

        let wide = ClassifierConfig {
            num_fields: 17,
            ..Default::default()
        };
        assert!(wide.validate().is_err());
    }
}
