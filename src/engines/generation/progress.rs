use super::evolution_engine::{
    Evaluated, GenerationSummary, LineageEntry, ProgressCallback, ValidationReport,
};
use super::genome::Genome;

/// Prints progress to stdout. With `show_genomes` off only a one-line
/// summary per generation is printed.
pub struct ConsoleProgressCallback {
    show_genomes: bool,
}

impl ConsoleProgressCallback {
    pub fn new(show_genomes: bool) -> Self {
        Self { show_genomes }
    }
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        println!("===== GENERATION {} =====", generation);
    }

    fn on_genome_evaluated(&mut self, evaluated: &Evaluated<'_>) {
        if !self.show_genomes {
            return;
        }
        println!("{} # {}", evaluated.genome, evaluated.index);
        match (evaluated.parent_rank, evaluated.parent_fitness) {
            (Some(rank), Some(fitness)) => {
                println!("   {} #{}, {}", evaluated.fitness, rank, fitness)
            }
            _ => println!("   {}", evaluated.fitness),
        }
    }

    fn on_new_best(&mut self, genome: &Genome, fitness: f64, lineage: &[LineageEntry]) {
        if !self.show_genomes {
            return;
        }
        println!();
        println!("BEST SO FAR: {}", fitness);
        println!("{}", genome);
        print_lineage(lineage);
        println!();
    }

    fn on_generation_complete(&mut self, _generation: usize, summary: &GenerationSummary) {
        if self.show_genomes {
            println!("SUMMARY: {:?} avg: {}", summary.fitnesses, summary.average);
        } else {
            println!(
                "BEST: {} AVERAGE: {} (best ever {}, hall of fame {})",
                summary.fitnesses.first().copied().unwrap_or(0.0),
                summary.average,
                summary.best_ever,
                summary.hall_of_fame_size
            );
        }
    }

    fn on_questions_asked(&mut self, _generation: usize, asked: usize, total: usize) {
        println!("Asked {} questions, {} in total", asked, total);
    }

    fn on_validation(&mut self, report: &ValidationReport) {
        println!(
            "ACTUAL BEST: {} ACTUAL AVERAGE: {} DEVIATION: {} QUESTIONS ASKED: {}",
            report.actual_best, report.actual_average, report.deviation, report.questions_asked
        );
    }
}

/// Prints each ancestor with the fitness it scored.
pub fn print_lineage(lineage: &[LineageEntry]) {
    for entry in lineage {
        match entry.fitness {
            Some(fitness) => println!("DERIVED FROM: {} {}", entry.genome, fitness),
            None => println!("DERIVED FROM: {}", entry.genome),
        }
    }
}
