use crate::engines::generation::genome::Genome;

use std::collections::HashSet;

#[derive(Clone, Debug)]
pub struct HallOfFameEntry {
    pub genome: Genome,
    pub fitness: f64,
}

/// The best distinct genomes seen during a run.
pub struct HallOfFame {
    entries: Vec<HallOfFameEntry>,
    max_size: usize,
    seen: HashSet<Genome>,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_size,
            seen: HashSet::new(),
        }
    }

    /// Attempt to add a genome. Genomes equal by value are only kept once.
    pub fn try_add(&mut self, genome: &Genome, fitness: f64) -> bool {
        if self.max_size == 0 || self.seen.contains(genome) {
            return false;
        }
        if self.entries.len() >= self.max_size
            && self.entries.last().is_some_and(|worst| worst.fitness >= fitness)
        {
            return false;
        }

        self.entries.push(HallOfFameEntry {
            genome: genome.clone(),
            fitness,
        });
        self.seen.insert(genome.clone());

        // Sort by fitness (descending), earlier entries first on ties
        self.entries.sort_by(|a, b| {
            b.fitness.partial_cmp(&a.fitness).unwrap_or(std::cmp::Ordering::Equal)
        });

        while self.entries.len() > self.max_size {
            if let Some(removed) = self.entries.pop() {
                self.seen.remove(&removed.genome);
            }
        }
        true
    }

    pub fn get_all(&self) -> &[HallOfFameEntry] {
        &self.entries
    }

    pub fn best(&self) -> Option<&HallOfFameEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
