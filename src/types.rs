use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{LinktuneError, Result};

/// A single record from a data source: field name -> value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    values: HashMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. Empty values are dropped.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.values.insert(field.into(), value);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Value of the first identity field holding a non-empty value.
    pub fn identity<'a>(&'a self, id_fields: &[String]) -> Result<&'a str> {
        id_fields
            .iter()
            .filter_map(|field| self.get(field))
            .find(|value| !value.is_empty())
            .ok_or_else(|| LinktuneError::IdentityMissing(format!("{:?}", self.values)))
    }
}

/// Whether a data set is deduplicated or linked against a second source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    Deduplication,
    Linking,
}

impl MatchMode {
    /// Lower bound for random thresholds in this mode.
    pub fn threshold_low_limit(self) -> f64 {
        match self {
            MatchMode::Deduplication => 0.4,
            MatchMode::Linking => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    Same,
    Different,
}

impl LinkKind {
    pub fn symbol(self) -> char {
        match self {
            LinkKind::Same => '+',
            LinkKind::Different => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkStatus {
    Asserted,
    Inferred,
}

/// A labeled link between two record identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id1: String,
    pub id2: String,
    pub status: LinkStatus,
    pub kind: LinkKind,
    pub confidence: f64,
}

impl Link {
    pub fn new(
        id1: impl Into<String>,
        id2: impl Into<String>,
        status: LinkStatus,
        kind: LinkKind,
        confidence: f64,
    ) -> Self {
        Self {
            id1: id1.into(),
            id2: id2.into(),
            status,
            kind,
            confidence,
        }
    }

    pub fn asserted(id1: impl Into<String>, id2: impl Into<String>, kind: LinkKind) -> Self {
        Self::new(id1, id2, LinkStatus::Asserted, kind, 1.0)
    }

    /// The identifier at the other end of the link from `id`.
    pub fn other_id(&self, id: &str) -> &str {
        if self.id1 == id {
            &self.id2
        } else {
            &self.id1
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(&self.id1, &self.id2)
    }
}

/// Unordered pair of record identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: String,
    high: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self { low: a.to_string(), high: b.to_string() }
        } else {
            Self { low: b.to_string(), high: a.to_string() }
        }
    }

    pub fn ids(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_uses_first_non_empty_id_field() {
        let record = Record::new().with("ALT_ID", "x7").with("NAME", "Acme");
        let ids = vec!["ID".to_string(), "ALT_ID".to_string()];
        assert_eq!(record.identity(&ids).unwrap(), "x7");
    }

    #[test]
    fn test_identity_missing_is_error() {
        let record = Record::new().with("NAME", "Acme").with("ID", "");
        let ids = vec!["ID".to_string()];
        assert!(matches!(
            record.identity(&ids),
            Err(LinktuneError::IdentityMissing(_))
        ));
    }

    #[test]
    fn test_pair_key_is_unordered() {
        assert_eq!(PairKey::new("b", "a"), PairKey::new("a", "b"));
        assert_eq!(PairKey::new("b", "a").ids(), ("a", "b"));
    }
}
