use serde::{Deserialize, Serialize};

use super::comparators::ComparatorKind;

/// How one record field takes part in matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub name: String,
    pub role: PropertyRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyRole {
    /// Identifies records; never compared.
    Identity,
    Compared {
        comparator: ComparatorKind,
        low: f64,
        high: f64,
    },
}

impl PropertyConfig {
    pub fn identity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: PropertyRole::Identity,
        }
    }

    pub fn compared(name: impl Into<String>, comparator: ComparatorKind, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            role: PropertyRole::Compared {
                comparator,
                low,
                high,
            },
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.role, PropertyRole::Identity)
    }

    pub fn comparator(&self) -> Option<ComparatorKind> {
        match self.role {
            PropertyRole::Compared { comparator, .. } => Some(comparator),
            PropertyRole::Identity => None,
        }
    }

    pub fn low(&self) -> Option<f64> {
        match self.role {
            PropertyRole::Compared { low, .. } => Some(low),
            PropertyRole::Identity => None,
        }
    }

    pub fn high(&self) -> Option<f64> {
        match self.role {
            PropertyRole::Compared { high, .. } => Some(high),
            PropertyRole::Identity => None,
        }
    }

    /// Probability that two records match given this field's similarity.
    ///
    /// Similarities below 0.5 count as evidence against a match and map to
    /// `low`; above that the probability rises quadratically toward `high`.
    pub fn probability(&self, v1: &str, v2: &str) -> f64 {
        match self.role {
            PropertyRole::Identity => 0.5,
            PropertyRole::Compared { comparator, low, high } => {
                let sim = comparator.compare(v1, v2);
                if sim >= 0.5 {
                    (high - 0.5) * (sim * sim) + 0.5
                } else {
                    low
                }
            }
        }
    }
}

/// Combines two independent match probabilities with Bayes' rule.
pub fn combine_bayes(p1: f64, p2: f64) -> f64 {
    let joint = p1 * p2;
    joint / (joint + (1.0 - p1) * (1.0 - p2))
}

/// Names of the identity-designated properties, in configuration order.
pub fn identity_fields(properties: &[PropertyConfig]) -> Vec<String> {
    properties
        .iter()
        .filter(|p| p.is_identity())
        .map(|p| p.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_maps_similarity_to_bounds() {
        let prop = PropertyConfig::compared("NAME", ComparatorKind::Exact, 0.2, 0.9);
        assert!((prop.probability("a", "a") - 0.9).abs() < 1e-12);
        assert_eq!(prop.probability("a", "b"), 0.2);
    }

    #[test]
    fn test_bayes_neutral_element() {
        assert!((combine_bayes(0.5, 0.8) - 0.8).abs() < 1e-12);
        assert!(combine_bayes(0.8, 0.8) > 0.8);
    }
}
