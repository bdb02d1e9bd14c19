use super::traits::ConfigSection;
use crate::error::{LinktuneError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Pairs put to the oracle per active-learning round.
    pub questions: usize,
    /// Worker threads for evaluation; 1 keeps everything on the driver thread.
    pub threads: usize,
    pub seed: Option<u64>,
    /// Ask an oracle for labels instead of scoring against a fixed test file.
    pub active: bool,
    /// The test file is known to miss links, so unlabeled matches are not
    /// counted against a configuration.
    pub incomplete: bool,
    pub evolve_comparators: bool,
    /// Copies of the loaded configuration placed in the first generation.
    pub copies_of_original: usize,
    /// Answer log for active runs; `answers.txt` when unset.
    pub answers_log: Option<PathBuf>,
    /// Where the best configuration found so far is written.
    pub output: Option<PathBuf>,
    pub hall_of_fame_size: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 100,
            questions: 10,
            threads: 1,
            seed: None,
            active: false,
            incomplete: false,
            evolve_comparators: true,
            copies_of_original: 0,
            answers_log: None,
            output: None,
            hall_of_fame_size: 10,
        }
    }
}

pub const DEFAULT_ANSWERS_LOG: &str = "answers.txt";

impl EvolutionConfig {
    /// Where an active run records its answers.
    pub fn answers_log_path(&self) -> PathBuf {
        self.answers_log
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ANSWERS_LOG))
    }

    /// Unlabeled matches count as wrong only against a complete test file.
    pub fn pessimistic(&self) -> bool {
        !self.active && !self.incomplete
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(LinktuneError::Configuration(
                "Population size must be at least 2".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(LinktuneError::Configuration(
                "Thread count must be at least 1".to_string(),
            ));
        }
        if self.copies_of_original > self.population_size {
            return Err(LinktuneError::Configuration(format!(
                "Cannot seed {} copies of the original into a population of {}",
                self.copies_of_original, self.population_size
            )));
        }
        if self.active && self.questions == 0 {
            return Err(LinktuneError::Configuration(
                "Active learning needs at least one question per round".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EvolutionConfig::default();
        assert_eq!(config.population_size, 100);
        assert_eq!(config.questions, 10);
        assert!(config.validate().is_ok());
        assert!(config.pessimistic());
    }

    #[test]
    fn test_active_scoring_is_optimistic() {
        let config = EvolutionConfig {
            active: true,
            ..Default::default()
        };
        assert!(!config.pessimistic());
        assert_eq!(config.answers_log_path(), PathBuf::from("answers.txt"));

        let logged = EvolutionConfig {
            answers_log: Some(PathBuf::from("run/labels.txt")),
            ..config
        };
        assert_eq!(logged.answers_log_path(), PathBuf::from("run/labels.txt"));
    }

    #[test]
    fn test_rejects_oversized_seeding() {
        let config = EvolutionConfig {
            population_size: 10,
            copies_of_original: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
