pub mod aspects;
pub mod evolution_engine;
pub mod genome;
pub mod hall_of_fame;
pub mod operators;
pub mod progress;

pub use aspects::{Aspect, AspectRegistry, AspectValue, PropertyFacet};
pub use evolution_engine::{
    EvolutionEngine, Evaluated, GenerationSummary, LineageEntry, ProgressCallback, RunSummary,
    ValidationReport,
};
pub use genome::{Genome, Variation};
pub use hall_of_fame::{HallOfFame, HallOfFameEntry};
pub use progress::ConsoleProgressCallback;
