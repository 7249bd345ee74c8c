//! Multi-field prefix classifier built on per-byte-value bit-vectors
//!
//! A key of `num_fields` bytes is classified by keeping one bit-vector per
//! (field, byte value) pair. Every rule owns one bit position; the vector for
//! `(f, v)` has that bit set when the rule accepts value `v` in field `f`.
//! A lookup selects one vector per field, ANDs them, and the lowest surviving
//! bit names the winning rule.
//!
//! Construction and querying are separate types: rules go into a
//! [`ClassifierBuilder`], and [`ClassifierBuilder::freeze`] turns it into an
//! immutable [`Classifier`] that can be shared across threads.

use std::net::Ipv4Addr;

use crate::bitvector::BitVector;
use crate::error::{BitClassError, Result};
use crate::reduction::{and_reduce, and_tree16};
use crate::types::{ClassifierConfig, Reduction, RuleId};

/// Distinct values of one key field
const FIELD_VALUES: usize = 256;

/// Accumulates rules into per-field bit-vector arrays
pub struct ClassifierBuilder {
    config: ClassifierConfig,
    capacity: usize,
    fields: Vec<BitVector>,
    rule_ids: Vec<RuleId>,
}

impl ClassifierBuilder {
    /// Builder for `num_fields`-byte keys with room for `num_rules` rules
    pub fn new(num_fields: usize, num_rules: usize) -> Result<Self> {
        let config = ClassifierConfig {
            num_fields,
            ..Default::default()
        };
        Self::from_config(config, num_rules)
    }

    /// Builder with an explicit lane width and reduction
    pub fn from_config(config: ClassifierConfig, num_rules: usize) -> Result<Self> {
        config.validate()?;
        if num_rules == 0 {
            return Err(BitClassError::InvalidConfig(
                "num_rules must be greater than 0".to_string(),
            ));
        }

        let count = config.num_fields * FIELD_VALUES;
        tracing::debug!(
            "Allocating {} bit-vectors of {} bits ({}-bit lanes)",
            count,
            num_rules,
            config.lane
        );

        let fields = (0..count)
            .map(|_| BitVector::with_lane(num_rules, config.lane))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            capacity: num_rules,
            fields,
            rule_ids: Vec::with_capacity(num_rules),
        })
    }

    /// Rules added so far
    pub fn len(&self) -> usize {
        self.rule_ids.len()
    }

    /// True before the first rule is added
    pub fn is_empty(&self) -> bool {
        self.rule_ids.is_empty()
    }

    /// Maximum number of rules
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add a rule matching the first `prefix_len` bits of `field_bytes`.
    ///
    /// Rules added earlier take priority over rules added later.
    pub fn add_rule(&mut self, field_bytes: &[u8], prefix_len: u32, rule_id: RuleId) -> Result<()> {
        let num_fields = self.config.num_fields;
        if field_bytes.len() != num_fields {
            return Err(BitClassError::InvalidConfig(format!(
                "rule {} has {} field bytes, expected {}",
                rule_id,
                field_bytes.len(),
                num_fields
            )));
        }
        let max = (num_fields * 8) as u32;
        if prefix_len > max {
            return Err(BitClassError::InvalidPrefix { prefix_len, max });
        }
        let position = self.rule_ids.len();
        if position >= self.capacity {
            return Err(BitClassError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        for (field, &byte) in field_bytes.iter().enumerate() {
            let covered = prefix_len.saturating_sub(field as u32 * 8).min(8);
            let (lo, hi) = value_range(byte, covered);
            let base = field * FIELD_VALUES;
            for value in lo..=hi {
                self.fields[base + value as usize].set(position, true)?;
            }
        }
        self.rule_ids.push(rule_id);

        tracing::trace!(
            "Rule {} (/{}) assigned bit position {}",
            rule_id,
            prefix_len,
            position
        );
        Ok(())
    }

    /// Finish construction; no rule can be added afterwards
    pub fn freeze(self) -> Classifier {
        tracing::info!(
            "Classifier ready: {} of {} rules, {} fields, {} reduction",
            self.rule_ids.len(),
            self.capacity,
            self.config.num_fields,
            self.config.reduction
        );
        Classifier {
            config: self.config,
            capacity: self.capacity,
            fields: self.fields,
            rule_ids: self.rule_ids,
        }
    }
}

/// Byte values sharing the top `covered` bits with `byte`, inclusive
#[inline]
fn value_range(byte: u8, covered: u32) -> (u8, u8) {
    if covered == 0 {
        return (0, u8::MAX);
    }
    let mask = u8::MAX << (8 - covered);
    let lo = byte & mask;
    (lo, lo | !mask)
}

/// Immutable classifier answering lookups by bit-vector conjunction
pub struct Classifier {
    config: ClassifierConfig,
    capacity: usize,
    fields: Vec<BitVector>,
    rule_ids: Vec<RuleId>,
}

impl Classifier {
    /// Configuration the classifier was built with
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Number of rules installed
    pub fn rule_count(&self) -> usize {
        self.rule_ids.len()
    }

    /// Rule id stored at a bit position
    pub fn rule_at(&self, position: usize) -> Option<RuleId> {
        self.rule_ids.get(position).copied()
    }

    /// Per-field vector for byte `value` of `field`
    pub fn field_vector(&self, field: usize, value: u8) -> Option<&BitVector> {
        if field >= self.config.num_fields {
            return None;
        }
        self.fields.get(field * FIELD_VALUES + value as usize)
    }

    /// Working vector sized for [`Classifier::lookup_with`]
    pub fn scratch(&self) -> Result<BitVector> {
        BitVector::with_lane(self.capacity, self.config.lane)
    }

    /// Classify `key`, allocating a scratch vector
    pub fn lookup(&self, key: &[u8]) -> Result<Option<RuleId>> {
        let mut scratch = self.scratch()?;
        self.lookup_with(key, &mut scratch)
    }

    /// Classify `key` into a caller-owned scratch vector
    pub fn lookup_with(&self, key: &[u8], scratch: &mut BitVector) -> Result<Option<RuleId>> {
        let num_fields = self.config.num_fields;
        if key.len() != num_fields {
            return Err(BitClassError::InvalidConfig(format!(
                "key has {} bytes, expected {}",
                key.len(),
                num_fields
            )));
        }

        let mut operands = [&self.fields[0]; ClassifierConfig::MAX_FIELDS];
        for (field, (slot, &byte)) in operands.iter_mut().zip(key).enumerate() {
            let operand = &self.fields[field * FIELD_VALUES + byte as usize];
            operand.prefetch();
            *slot = operand;
        }

        if num_fields == ClassifierConfig::MAX_FIELDS && self.config.reduction == Reduction::Tree {
            and_tree16(scratch, &operands)?;
        } else {
            and_reduce(self.config.reduction, scratch, &operands[..num_fields])?;
        }

        Ok(scratch
            .first_set_bit()
            .and_then(|position| self.rule_at(position)))
    }

    /// Classify an IPv4 address; requires a four-field classifier
    pub fn lookup_ipv4(&self, addr: Ipv4Addr) -> Result<Option<RuleId>> {
        self.lookup(&addr.octets())
    }
}
