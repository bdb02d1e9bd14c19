use crate::engines::generation::Genome;
use std::collections::HashMap;
use std::sync::Mutex;

/// Fitness memo keyed by genome value. Entries live for the whole run.
#[derive(Default)]
pub struct FitnessCache {
    data: Mutex<HashMap<Genome, f64>>,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, genome: &Genome) -> Option<f64> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.get(genome).copied()
    }

    pub fn set(&self, genome: &Genome, fitness: f64) {
        // store without lineage so cached keys don't pin ancestors
        let key = Genome::new(genome.threshold(), genome.properties().to_vec());
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.insert(key, fitness);
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
