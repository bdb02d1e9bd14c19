//! The mutable facets of a genome.
//!
//! Every aspect can read its value from a genome, write a value into one,
//! and replace its value with a random draw. Mutation applies random
//! aspects; mating copies each aspect from one of two parents.

use rand::seq::SliceRandom;
use rand::Rng;

use super::genome::Genome;
use crate::matching::{ComparatorKind, PropertyConfig, PropertyRole};
use crate::types::MatchMode;

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyFacet {
    Comparator,
    LowProbability,
    HighProbability,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AspectValue {
    Number(f64),
    Comparator(ComparatorKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aspect {
    Threshold { low_limit: f64 },
    Property { field: String, facet: PropertyFacet },
}

impl Aspect {
    pub fn get(&self, genome: &Genome) -> Option<AspectValue> {
        match self {
            Aspect::Threshold { .. } => Some(AspectValue::Number(genome.threshold())),
            Aspect::Property { field, facet } => {
                let prop = genome.property(field)?;
                match (facet, &prop.role) {
                    (_, PropertyRole::Identity) => None,
                    (PropertyFacet::Comparator, PropertyRole::Compared { comparator, .. }) => {
                        Some(AspectValue::Comparator(*comparator))
                    }
                    (PropertyFacet::LowProbability, PropertyRole::Compared { low, .. }) => {
                        Some(AspectValue::Number(*low))
                    }
                    (PropertyFacet::HighProbability, PropertyRole::Compared { high, .. }) => {
                        Some(AspectValue::Number(*high))
                    }
                }
            }
        }
    }

    /// Writes `value` into the genome. Values of the wrong shape are ignored.
    pub fn set(&self, genome: &mut Genome, value: AspectValue) {
        match (self, value) {
            (Aspect::Threshold { .. }, AspectValue::Number(v)) => genome.set_threshold(v),
            (Aspect::Property { field, facet }, value) => {
                let Some(PropertyRole::Compared {
                    comparator,
                    low,
                    high,
                }) = genome.role_mut(field)
                else {
                    return;
                };
                match (facet, value) {
                    (PropertyFacet::Comparator, AspectValue::Comparator(c)) => *comparator = c,
                    (PropertyFacet::LowProbability, AspectValue::Number(v)) => *low = v,
                    (PropertyFacet::HighProbability, AspectValue::Number(v)) => *high = v,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    /// Replaces this aspect's value with a random draw.
    pub fn modify<R: Rng + ?Sized>(&self, genome: &mut Genome, rng: &mut R) {
        let value = match self {
            Aspect::Threshold { low_limit } => {
                AspectValue::Number(round2(rng.gen_range(*low_limit..=1.0)))
            }
            Aspect::Property { facet, .. } => match facet {
                PropertyFacet::Comparator => {
                    AspectValue::Comparator(*ComparatorKind::ALL.choose(rng).unwrap_or(&ComparatorKind::Exact))
                }
                PropertyFacet::LowProbability => AspectValue::Number(round2(rng.gen_range(0.0..=0.5))),
                PropertyFacet::HighProbability => AspectValue::Number(round2(rng.gen_range(0.5..=1.0))),
            },
        };
        self.set(genome, value);
    }
}

/// One threshold aspect plus comparator/low/high aspects per compared field.
#[derive(Debug, Clone)]
pub struct AspectRegistry {
    aspects: Vec<Aspect>,
}

impl AspectRegistry {
    pub fn new(properties: &[PropertyConfig], mode: MatchMode, evolve_comparators: bool) -> Self {
        Self::with_low_limit(properties, mode.threshold_low_limit(), evolve_comparators)
    }

    pub fn with_low_limit(properties: &[PropertyConfig], low_limit: f64, evolve_comparators: bool) -> Self {
        let mut aspects = vec![Aspect::Threshold { low_limit }];
        for prop in properties.iter().filter(|p| !p.is_identity()) {
            let mut facets = Vec::with_capacity(3);
            if evolve_comparators {
                facets.push(PropertyFacet::Comparator);
            }
            facets.push(PropertyFacet::LowProbability);
            facets.push(PropertyFacet::HighProbability);

            aspects.extend(facets.into_iter().map(|facet| Aspect::Property {
                field: prop.name.clone(),
                facet,
            }));
        }
        Self { aspects }
    }

    pub fn aspects(&self) -> &[Aspect] {
        &self.aspects
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }

    /// Uniformly random aspect.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &Aspect {
        &self.aspects[rng.gen_range(0..self.aspects.len())]
    }

    /// A parentless copy of `template` with every aspect drawn at random.
    pub fn randomize<R: Rng + ?Sized>(&self, template: &Genome, rng: &mut R) -> Genome {
        let mut genome = Genome::new(template.threshold(), template.properties().to_vec());
        for aspect in &self.aspects {
            aspect.modify(&mut genome, rng);
        }
        genome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn template() -> Genome {
        Genome::new(
            0.8,
            vec![
                PropertyConfig::identity("ID"),
                PropertyConfig::compared("NAME", ComparatorKind::Levenshtein, 0.3, 0.9),
                PropertyConfig::compared("CITY", ComparatorKind::Exact, 0.4, 0.7),
            ],
        )
    }

    #[test]
    fn test_registry_layout() {
        let g = template();
        let registry = AspectRegistry::new(g.properties(), MatchMode::Deduplication, true);
        assert_eq!(registry.len(), 1 + 3 * 2);
        assert_eq!(registry.aspects()[0], Aspect::Threshold { low_limit: 0.4 });

        let frozen = AspectRegistry::new(g.properties(), MatchMode::Linking, false);
        assert_eq!(frozen.len(), 1 + 2 * 2);
        assert!(frozen.aspects().iter().all(|a| !matches!(
            a,
            Aspect::Property { facet: PropertyFacet::Comparator, .. }
        )));
    }

    #[test]
    fn test_modify_stays_in_range_and_rounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let registry = AspectRegistry::new(template().properties(), MatchMode::Deduplication, true);
        for _ in 0..200 {
            let g = registry.randomize(&template(), &mut rng);
            assert!((0.4..=1.0).contains(&g.threshold()));
            assert_eq!(g.threshold(), round2(g.threshold()));
            for prop in g.properties().iter().filter(|p| !p.is_identity()) {
                let (low, high) = (prop.low().unwrap(), prop.high().unwrap());
                assert!((0.0..=0.5).contains(&low));
                assert!((0.5..=1.0).contains(&high));
                assert_eq!(low, round2(low));
            }
            assert!(g.parent().is_none());
        }
    }

    #[test]
    fn test_get_set_round_trip_per_aspect() {
        let g = template();
        let registry = AspectRegistry::new(g.properties(), MatchMode::Linking, true);
        let mut other = registry.randomize(&g, &mut StdRng::seed_from_u64(1));
        for aspect in registry.aspects() {
            let value = aspect.get(&g).unwrap();
            aspect.set(&mut other, value);
        }
        assert_eq!(other, g);
    }

    #[test]
    fn test_identity_property_has_no_aspect_value() {
        let aspect = Aspect::Property {
            field: "ID".to_string(),
            facet: PropertyFacet::LowProbability,
        };
        assert_eq!(aspect.get(&template()), None);
    }
}
