use log::{debug, warn};

use super::cache::FitnessCache;
use super::fmeasure::{FMeasure, FMeasureListener};
use crate::engines::generation::Genome;
use crate::engines::learning::InMemoryLinkDatabase;
use crate::error::{LinktuneError, Result};
use crate::matching::MatchEngine;

/// Scores genomes by the F-measure of a full linkage pass.
///
/// Scores are memoized by genome value for the life of the evaluator, even
/// if the truth set grows later.
pub struct FitnessEvaluator<E: MatchEngine> {
    engine: E,
    id_fields: Vec<String>,
    pessimistic: bool,
    cache: FitnessCache,
}

impl<E: MatchEngine> FitnessEvaluator<E> {
    pub fn new(engine: E, id_fields: Vec<String>, pessimistic: bool) -> Self {
        Self {
            engine,
            id_fields,
            pessimistic,
            cache: FitnessCache::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn id_fields(&self) -> &[String] {
        &self.id_fields
    }

    /// Cached fitness of `genome`, computing it on a miss.
    /// Configurations that can never match score 0.0.
    pub fn evaluate(&self, genome: &Genome, truth: &InMemoryLinkDatabase) -> Result<f64> {
        if let Some(fitness) = self.cache.get(genome) {
            debug!("Cache hit for {}", genome);
            return Ok(fitness);
        }

        let fitness = match self.measure(genome, truth, self.pessimistic) {
            Ok(result) => result.fmeasure,
            Err(LinktuneError::ConfigInvalid(reason)) => {
                warn!("Non-viable configuration {}: {}", genome, reason);
                0.0
            }
            Err(e) => return Err(e),
        };
        self.cache.set(genome, fitness);
        Ok(fitness)
    }

    /// Uncached score, for validating against a separate truth set.
    pub fn score(&self, genome: &Genome, truth: &InMemoryLinkDatabase, pessimistic: bool) -> Result<f64> {
        match self.measure(genome, truth, pessimistic) {
            Ok(result) => Ok(result.fmeasure),
            Err(LinktuneError::ConfigInvalid(_)) => Ok(0.0),
            Err(e) => Err(e),
        }
    }

    /// Previously computed fitness, without running anything.
    pub fn cached(&self, genome: &Genome) -> Option<f64> {
        self.cache.get(genome)
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    fn measure(&self, genome: &Genome, truth: &InMemoryLinkDatabase, pessimistic: bool) -> Result<FMeasure> {
        let mut listener = FMeasureListener::new(truth, &self.id_fields, pessimistic);
        self.engine
            .link_records(&genome.match_configuration(), &mut listener)?;
        let result = listener.result().unwrap_or_default();
        debug!(
            "{}: precision {:.3}, recall {:.3}, f {:.3}",
            genome, result.precision, result.recall, result.fmeasure
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{ComparatorKind, InMemoryEngine, PropertyConfig};
    use crate::types::{Link, LinkKind, Record};

    fn evaluator() -> FitnessEvaluator<InMemoryEngine> {
        let records = vec![
            Record::new().with("ID", "1").with("NAME", "acme"),
            Record::new().with("ID", "2").with("NAME", "acme"),
            Record::new().with("ID", "3").with("NAME", "zenith"),
        ];
        let ids = vec!["ID".to_string()];
        let engine = InMemoryEngine::index(vec![records], &ids).unwrap();
        FitnessEvaluator::new(engine, ids, false)
    }

    fn genome(threshold: f64, high: f64) -> Genome {
        Genome::new(
            threshold,
            vec![
                PropertyConfig::identity("ID"),
                PropertyConfig::compared("NAME", ComparatorKind::Exact, 0.1, high),
            ],
        )
    }

    #[test]
    fn test_perfect_configuration() {
        let truth = InMemoryLinkDatabase::from_links([Link::asserted("1", "2", LinkKind::Same)], false);
        let eval = evaluator();
        assert_eq!(eval.evaluate(&genome(0.8, 0.9), &truth).unwrap(), 1.0);
    }

    #[test]
    fn test_unreachable_threshold_scores_zero() {
        let truth = InMemoryLinkDatabase::from_links([Link::asserted("1", "2", LinkKind::Same)], false);
        let eval = evaluator();
        assert_eq!(eval.evaluate(&genome(0.95, 0.6), &truth).unwrap(), 0.0);
        assert_eq!(eval.cached(&genome(0.95, 0.6)), Some(0.0));
    }

    #[test]
    fn test_equal_genomes_share_cache_entry() {
        let truth = InMemoryLinkDatabase::from_links([Link::asserted("1", "2", LinkKind::Same)], false);
        let eval = evaluator();
        let g = genome(0.8, 0.9);
        eval.evaluate(&g, &truth).unwrap();

        // a later truth set would change the score, but the memo wins
        let other = InMemoryLinkDatabase::new(false);
        let child = g.copy();
        assert_eq!(eval.evaluate(&child, &other).unwrap(), 1.0);
        assert_eq!(eval.cache_size(), 1);
        assert_eq!(eval.score(&child, &other, true).unwrap(), 0.0);
    }
}
