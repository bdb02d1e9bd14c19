use crate::config::{EvolutionConfig, MatchingConfig};
use crate::engines::evaluation::FitnessEvaluator;
use crate::engines::generation::{
    aspects::AspectRegistry,
    genome::Genome,
    hall_of_fame::{HallOfFame, HallOfFameEntry},
    operators::{breeding_pool, cull, rank},
};
use crate::engines::learning::{ExemplarTracker, InMemoryLinkDatabase, Labeler, ScoringStrategy};
use crate::error::Result;
use crate::matching::MatchEngine;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::PathBuf;

/// One genome's result, as reported to progress callbacks.
pub struct Evaluated<'a> {
    pub index: usize,
    pub genome: &'a Genome,
    pub fitness: f64,
    pub parent_rank: Option<usize>,
    pub parent_fitness: Option<f64>,
}

/// An ancestor of a genome with the fitness it was scored at.
pub struct LineageEntry {
    pub genome: Genome,
    pub fitness: Option<f64>,
}

pub struct GenerationSummary {
    /// Fitness of every genome, best first.
    pub fitnesses: Vec<f64>,
    pub average: f64,
    pub best_ever: f64,
    pub hall_of_fame_size: usize,
}

/// Scores against a held-out gold set, when running in validation mode.
pub struct ValidationReport {
    pub actual_best: f64,
    pub actual_average: f64,
    /// Mean absolute difference between estimated and actual fitness.
    pub deviation: f64,
    pub questions_asked: usize,
}

pub struct RunSummary {
    pub best: Option<HallOfFameEntry>,
    pub generations: usize,
    pub questions_asked: usize,
}

pub trait ProgressCallback {
    fn on_generation_start(&mut self, generation: usize);
    fn on_genome_evaluated(&mut self, evaluated: &Evaluated<'_>);
    fn on_new_best(&mut self, genome: &Genome, fitness: f64, lineage: &[LineageEntry]);
    fn on_generation_complete(&mut self, generation: usize, summary: &GenerationSummary);

    fn on_questions_asked(&mut self, _generation: usize, _asked: usize, _total: usize) {}

    fn on_validation(&mut self, _report: &ValidationReport) {}
}

/// Runs the generational loop: optionally label new pairs, evaluate,
/// rank, cull, oversample the elite, and reproduce.
///
/// Owns every piece of mutable run state: the fitness cache (through the
/// evaluator), the knowledge base scored against, the best genome, and
/// the random source.
pub struct EvolutionEngine<E: MatchEngine> {
    config: EvolutionConfig,
    evaluator: FitnessEvaluator<E>,
    registry: AspectRegistry,
    template: Genome,
    truth: InMemoryLinkDatabase,
    validation: Option<InMemoryLinkDatabase>,
    labeler: Option<Labeler>,
    export: Option<(PathBuf, MatchingConfig)>,
    hall_of_fame: HallOfFame,
    best: Option<(Genome, f64)>,
    pool: Option<ThreadPool>,
    rng: StdRng,
}

impl<E: MatchEngine> EvolutionEngine<E> {
    /// `template` is the loaded configuration; random genomes keep its
    /// property layout.
    pub fn new(config: EvolutionConfig, evaluator: FitnessEvaluator<E>, template: Genome) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let pool = if config.threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads)
                    .build()?,
            )
        } else {
            None
        };

        let registry = AspectRegistry::new(
            template.properties(),
            evaluator.engine().mode(),
            config.evolve_comparators,
        );

        Ok(Self {
            hall_of_fame: HallOfFame::new(config.hall_of_fame_size),
            config,
            evaluator,
            registry,
            template,
            truth: InMemoryLinkDatabase::new(true),
            validation: None,
            labeler: None,
            export: None,
            best: None,
            pool,
            rng,
        })
    }

    /// Score against a fixed set of known links.
    pub fn with_truth(mut self, truth: InMemoryLinkDatabase) -> Self {
        self.truth = truth;
        self
    }

    /// Learn actively: on generations 0, 1, 2, 4, 6 and so on, put the most
    /// informative pairs to `labeler` and score against the answers.
    pub fn with_labeler(mut self, labeler: Labeler) -> Self {
        self.labeler = Some(labeler);
        self
    }

    /// Also score every genome pessimistically against `gold` each
    /// generation, to see how well the estimated fitness tracks reality.
    pub fn with_validation(mut self, gold: InMemoryLinkDatabase) -> Self {
        self.validation = Some(gold);
        self
    }

    /// Write the best configuration to `path` after every generation.
    pub fn with_export(mut self, path: PathBuf, matching: MatchingConfig) -> Self {
        self.export = Some((path, matching));
        self
    }

    pub fn knowledge_base(&self) -> &InMemoryLinkDatabase {
        &self.truth
    }

    pub fn hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }

    pub fn best(&self) -> Option<(&Genome, f64)> {
        self.best.as_ref().map(|(g, f)| (g, *f))
    }

    pub fn registry(&self) -> &AspectRegistry {
        &self.registry
    }

    /// Run the evolution process
    pub fn run<C: ProgressCallback>(&mut self, callback: &mut C) -> Result<RunSummary> {
        let size = self.config.population_size;
        let mut population = self.initialize_population();
        let mut generations = 0;

        for generation in 0..self.config.generations {
            generations += 1;
            callback.on_generation_start(generation);

            if asks_questions(generation) {
                self.ask_questions(generation, &population, callback)?;
            }

            let fitnesses = self.evaluate_population(&population)?;
            for (index, (genome, &fitness)) in population.iter().zip(&fitnesses).enumerate() {
                let parent = genome.parent();
                callback.on_genome_evaluated(&Evaluated {
                    index,
                    genome,
                    fitness,
                    parent_rank: parent.and_then(Genome::rank),
                    parent_fitness: parent.and_then(|p| self.evaluator.cached(p)),
                });

                self.hall_of_fame.try_add(genome, fitness);
                if fitness > self.best_fitness() {
                    self.best = Some((genome.clone(), fitness));
                    callback.on_new_best(genome, fitness, &self.lineage(genome));
                }
            }

            if let Some(gold) = &self.validation {
                let report = self.validate(&population, &fitnesses, gold)?;
                callback.on_validation(&report);
            }

            let ranked = rank(population.into_iter().zip(fitnesses).collect());
            let fitnesses: Vec<f64> = ranked.iter().map(|(_, f)| *f).collect();
            let average = fitnesses.iter().sum::<f64>() / fitnesses.len().max(1) as f64;
            callback.on_generation_complete(
                generation,
                &GenerationSummary {
                    fitnesses,
                    average,
                    best_ever: self.best_fitness(),
                    hall_of_fame_size: self.hall_of_fame.len(),
                },
            );
            self.export_best()?;

            if self.best_fitness() >= 1.0 {
                info!("Perfect configuration found in generation {}", generation);
                break;
            }
            if generation + 1 == self.config.generations {
                break;
            }

            let culled = cull(ranked, size);
            let pool = breeding_pool(&culled, size);
            population = pool
                .iter()
                .map(|genome| genome.reproduce(&pool, &self.registry, &mut self.rng))
                .collect();
        }

        Ok(RunSummary {
            best: self
                .best
                .clone()
                .map(|(genome, fitness)| HallOfFameEntry { genome, fitness }),
            generations,
            questions_asked: self.labeler.as_ref().map_or(0, Labeler::asked),
        })
    }

    fn best_fitness(&self) -> f64 {
        self.best.as_ref().map_or(0.0, |(_, f)| *f)
    }

    /// The ancestors of `genome` with their cached fitness.
    pub fn lineage(&self, genome: &Genome) -> Vec<LineageEntry> {
        genome
            .ancestors()
            .map(|ancestor| LineageEntry {
                genome: ancestor.clone(),
                fitness: self.evaluator.cached(ancestor),
            })
            .collect()
    }

    fn initialize_population(&mut self) -> Vec<Genome> {
        let size = self.config.population_size;
        let copies = self.config.copies_of_original.min(size);
        let mut population: Vec<Genome> = (0..copies)
            .map(|_| Genome::new(self.template.threshold(), self.template.properties().to_vec()))
            .collect();
        while population.len() < size {
            population.push(self.registry.randomize(&self.template, &mut self.rng));
        }
        info!(
            "Initial population: {} random, {} copies of the original",
            size - copies,
            copies
        );
        population
    }

    fn ask_questions<C: ProgressCallback>(
        &mut self,
        generation: usize,
        population: &[Genome],
        callback: &mut C,
    ) -> Result<()> {
        let best = self.best_fitness();
        let Some(labeler) = self.labeler.as_mut() else {
            return Ok(());
        };

        let engine = self.evaluator.engine();
        let tracker = ExemplarTracker::new(engine, self.evaluator.id_fields().to_vec());
        let strategy = ScoringStrategy::for_round(generation, best);
        let exemplars = tracker.select(population, &self.truth, strategy, self.config.questions)?;
        let asked = labeler.ask(engine, &exemplars, population.len(), &mut self.truth)?;

        callback.on_questions_asked(generation, asked, labeler.asked());
        Ok(())
    }

    fn evaluate_population(&self, population: &[Genome]) -> Result<Vec<f64>> {
        let evaluator = &self.evaluator;
        let truth = &self.truth;
        map_population(self.pool.as_ref(), population, |genome| {
            evaluator.evaluate(genome, truth)
        })
    }

    fn validate(
        &self,
        population: &[Genome],
        estimated: &[f64],
        gold: &InMemoryLinkDatabase,
    ) -> Result<ValidationReport> {
        let evaluator = &self.evaluator;
        let actual = map_population(self.pool.as_ref(), population, |genome| {
            evaluator.score(genome, gold, true)
        })?;

        let n = actual.len().max(1) as f64;
        Ok(ValidationReport {
            actual_best: actual.iter().copied().fold(0.0, f64::max),
            actual_average: actual.iter().sum::<f64>() / n,
            deviation: actual
                .iter()
                .zip(estimated)
                .map(|(a, e)| (a - e).abs())
                .sum::<f64>()
                / n,
            questions_asked: self.labeler.as_ref().map_or(0, Labeler::asked),
        })
    }

    fn export_best(&self) -> Result<()> {
        if let (Some((path, matching)), Some((genome, _))) = (&self.export, &self.best) {
            matching.save_best(genome, path)?;
        }
        Ok(())
    }
}

/// Oracle rounds run on every even generation and on generation 1.
pub fn asks_questions(generation: usize) -> bool {
    generation % 2 == 0 || generation == 1
}

/// Applies `f` to every genome, on `pool` if there is one.
fn map_population<F>(pool: Option<&ThreadPool>, population: &[Genome], f: F) -> Result<Vec<f64>>
where
    F: Fn(&Genome) -> Result<f64> + Sync + Send,
{
    match pool {
        Some(pool) => pool.install(|| population.par_iter().map(&f).collect()),
        None => population.iter().map(f).collect(),
    }
}
