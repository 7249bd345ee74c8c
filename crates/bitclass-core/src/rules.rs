//! IPv4 prefix rule files
//!
//! One rule per line: `<id> <a.b.c.d>/<len>`. Blank lines and lines starting
//! with `#` are ignored. Ids are positive: `0` is rejected so it never
//! collides with the "no match" reading of a zeroed result.
//!
//! ```text
//! # id  prefix
//! 1     10.0.0.0/8
//! 2     10.1.0.0/16
//! 3     0.0.0.0/0
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::Ipv4Addr;
use std::path::Path;

use crate::classifier::{Classifier, ClassifierBuilder};
use crate::error::{BitClassError, Result};
use crate::types::{ClassifierConfig, RuleId};

/// Longest IPv4 prefix
pub const MAX_PREFIX_LEN: u32 = 32;

/// IPv4 prefix rule
///
/// Only constructible through [`Rule::new`], the rule-file parser or a
/// validating deserialize, so `prefix_len <= 32` and `id > 0` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RuleRecord")]
pub struct Rule {
    id: RuleId,
    addr: Ipv4Addr,
    prefix_len: u32,
}

/// Unchecked serialized form of [`Rule`]
#[derive(Deserialize)]
struct RuleRecord {
    id: RuleId,
    addr: Ipv4Addr,
    prefix_len: u32,
}

impl TryFrom<RuleRecord> for Rule {
    type Error = BitClassError;

    fn try_from(record: RuleRecord) -> Result<Self> {
        Rule::new(record.id, record.addr, record.prefix_len)
    }
}

impl Rule {
    /// Rule matching `addr/prefix_len`
    pub fn new(id: RuleId, addr: Ipv4Addr, prefix_len: u32) -> Result<Self> {
        if id == 0 {
            return Err(BitClassError::InvalidConfig(
                "rule id must be positive".to_string(),
            ));
        }
        if prefix_len > MAX_PREFIX_LEN {
            return Err(BitClassError::InvalidPrefix {
                prefix_len,
                max: MAX_PREFIX_LEN,
            });
        }
        Ok(Self {
            id,
            addr,
            prefix_len,
        })
    }

    /// Identifier reported on match
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Prefix address; bits past `prefix_len` are ignored
    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    /// Number of leading address bits that must match
    pub fn prefix_len(&self) -> u32 {
        self.prefix_len
    }

    /// Address bytes in network order, one classifier field each
    pub fn field_bytes(&self) -> [u8; 4] {
        self.addr.octets()
    }

    fn mask(&self) -> u32 {
        let len = self.prefix_len.min(MAX_PREFIX_LEN);
        u32::MAX.checked_shl(MAX_PREFIX_LEN - len).unwrap_or(0)
    }

    /// True when `addr` falls inside this rule's prefix
    pub fn matches(&self, addr: Ipv4Addr) -> bool {
        let mask = self.mask();
        u32::from(addr) & mask == u32::from(self.addr) & mask
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.id, self.addr, self.prefix_len)
    }
}

/// Parse one rule-file line. `Ok(None)` for blank and comment lines.
///
/// `line` is the 1-based line number reported in errors.
pub fn parse_rule_line(text: &str, line: usize) -> Result<Option<Rule>> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let err = |message: String| BitClassError::ParseError { line, message };

    let mut tokens = text.split_whitespace();
    let (id, prefix) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(id), Some(prefix), None) => (id, prefix),
        _ => return Err(err(format!("expected '<id> <a.b.c.d>/<len>', got '{}'", text))),
    };

    let id: RuleId = id
        .parse()
        .map_err(|_| err(format!("invalid rule id '{}'", id)))?;
    if id == 0 {
        return Err(err("rule id must be positive".to_string()));
    }
    let (addr, len) = prefix
        .split_once('/')
        .ok_or_else(|| err(format!("missing prefix length in '{}'", prefix)))?;
    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|_| err(format!("invalid IPv4 address '{}'", addr)))?;
    let prefix_len: u32 = len
        .parse()
        .map_err(|_| err(format!("invalid prefix length '{}'", len)))?;
    if prefix_len > MAX_PREFIX_LEN {
        return Err(err(format!(
            "prefix length {} exceeds {}",
            prefix_len, MAX_PREFIX_LEN
        )));
    }

    Ok(Some(Rule {
        id,
        addr,
        prefix_len,
    }))
}

/// Ordered collection of rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse rules from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut rules = Vec::new();
        for (idx, text) in reader.lines().enumerate() {
            if let Some(rule) = parse_rule_line(&text?, idx + 1)? {
                rules.push(rule);
            }
        }
        Ok(Self { rules })
    }

    /// Parse a rule file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let set = Self::from_reader(BufReader::new(file))?;
        tracing::debug!(
            "Loaded {} rules from {}",
            set.len(),
            path.as_ref().display()
        );
        Ok(set)
    }

    /// Append a rule
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when the set holds no rule
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in their current order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Iterate over rules in their current order
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Copy ordered longest prefix first, lowest id among equal lengths
    pub fn sorted_for_lpm(&self) -> RuleSet {
        let mut rules = self.rules.clone();
        rules.sort_by(|a, b| b.prefix_len.cmp(&a.prefix_len).then(a.id.cmp(&b.id)));
        RuleSet { rules }
    }

    /// Rule count per prefix length, indexed `0..=32`
    pub fn prefix_histogram(&self) -> [usize; MAX_PREFIX_LEN as usize + 1] {
        let mut histogram = [0; MAX_PREFIX_LEN as usize + 1];
        for rule in &self.rules {
            if let Some(count) = histogram.get_mut(rule.prefix_len as usize) {
                *count += 1;
            }
        }
        histogram
    }

    /// Longest-prefix match by direct scan; lowest id breaks ties
    pub fn best_match(&self, addr: Ipv4Addr) -> Option<&Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(addr))
            .max_by(|a, b| a.prefix_len.cmp(&b.prefix_len).then(b.id.cmp(&a.id)))
    }

    /// Build and freeze a four-field classifier holding every rule, in the
    /// set's current order. Call [`RuleSet::sorted_for_lpm`] first for
    /// longest-prefix-match priority.
    pub fn build_classifier(&self, config: &ClassifierConfig) -> Result<Classifier> {
        if config.num_fields != 4 {
            return Err(BitClassError::InvalidConfig(format!(
                "IPv4 rules need 4 fields, config has {}",
                config.num_fields
            )));
        }
        if self.rules.is_empty() {
            return Err(BitClassError::InvalidConfig("rule set is empty".to_string()));
        }

        let mut builder = ClassifierBuilder::from_config(config.clone(), self.rules.len())?;
        for rule in &self.rules {
            builder.add_rule(&rule.field_bytes(), rule.prefix_len, rule.id)?;
        }
        Ok(builder.freeze())
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
