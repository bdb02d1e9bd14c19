//! Picks the record pairs most worth labeling next.
//!
//! Every genome in the population is run through the matcher once and each
//! reported pair is counted. How many genomes agree on a pair says how
//! informative a label for it would be.

use std::collections::HashMap;

use log::{debug, info};

use crate::engines::generation::Genome;
use crate::error::{LinktuneError, Result};
use crate::matching::{MatchEngine, MatchListener};
use crate::types::{PairKey, Record};

use super::link_database::InMemoryLinkDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringStrategy {
    /// Favors pairs most of the population matches, to seed clean positives.
    Bootstrap,
    /// Favors pairs the population is split on.
    SteadyState,
}

impl ScoringStrategy {
    /// Bootstrap for the first round and for as long as nothing has scored.
    pub fn for_round(generation: usize, best_fitness: f64) -> Self {
        if generation == 0 || best_fitness == 0.0 {
            ScoringStrategy::Bootstrap
        } else {
            ScoringStrategy::SteadyState
        }
    }

    /// Score of a pair matched by `count` out of `population` genomes.
    pub fn score(self, count: usize, population: usize) -> i64 {
        let c = count as i64;
        let n = population as i64;
        match self {
            ScoringStrategy::Bootstrap => c,
            ScoringStrategy::SteadyState => (n - c) * (n - (n - c)) + c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exemplar {
    pub pair: PairKey,
    /// Genomes that matched this pair.
    pub count: usize,
    pub score: i64,
}

struct PairCounter<'a> {
    id_fields: &'a [String],
    counts: &'a mut HashMap<PairKey, usize>,
}

impl MatchListener for PairCounter<'_> {
    fn matches(&mut self, r1: &Record, r2: &Record, _confidence: f64) -> Result<()> {
        let key = PairKey::new(r1.identity(self.id_fields)?, r2.identity(self.id_fields)?);
        *self.counts.entry(key).or_insert(0) += 1;
        Ok(())
    }
}

pub struct ExemplarTracker<'e, E: MatchEngine + ?Sized> {
    engine: &'e E,
    id_fields: Vec<String>,
}

impl<'e, E: MatchEngine + ?Sized> ExemplarTracker<'e, E> {
    pub fn new(engine: &'e E, id_fields: Vec<String>) -> Self {
        Self { engine, id_fields }
    }

    /// How many genomes of `population` match each pair.
    pub fn count(&self, population: &[Genome]) -> Result<HashMap<PairKey, usize>> {
        let mut counts = HashMap::new();
        for genome in population {
            let mut counter = PairCounter {
                id_fields: &self.id_fields,
                counts: &mut counts,
            };
            match self
                .engine
                .link_records(&genome.match_configuration(), &mut counter)
            {
                Ok(()) => {}
                Err(LinktuneError::ConfigInvalid(reason)) => {
                    debug!("Genome contributes no pairs: {}", reason);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(counts)
    }

    /// The `questions` highest-scoring pairs not already in `known`.
    pub fn select(
        &self,
        population: &[Genome],
        known: &InMemoryLinkDatabase,
        strategy: ScoringStrategy,
        questions: usize,
    ) -> Result<Vec<Exemplar>> {
        let counts = self.count(population)?;
        let total = counts.len();
        let exemplars = rank_exemplars(counts, known, strategy, population.len(), questions);
        info!(
            "{:?} scoring: {} candidate pairs, {} selected",
            strategy,
            total,
            exemplars.len()
        );
        Ok(exemplars)
    }
}

/// Scores counted pairs, drops known ones, and keeps the best `questions`.
/// Ties go to the lower pair key so selection is deterministic.
pub fn rank_exemplars(
    counts: HashMap<PairKey, usize>,
    known: &InMemoryLinkDatabase,
    strategy: ScoringStrategy,
    population: usize,
    questions: usize,
) -> Vec<Exemplar> {
    let mut exemplars: Vec<Exemplar> = counts
        .into_iter()
        .filter(|(pair, _)| !known.contains(pair))
        .map(|(pair, count)| Exemplar {
            score: strategy.score(count, population),
            pair,
            count,
        })
        .collect();

    exemplars.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.pair.cmp(&b.pair)));
    exemplars.truncate(questions);
    exemplars
}
