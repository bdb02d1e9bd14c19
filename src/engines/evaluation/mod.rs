pub mod cache;
pub mod fitness;
pub mod fmeasure;

pub use cache::FitnessCache;
pub use fitness::FitnessEvaluator;
pub use fmeasure::{FMeasure, FMeasureListener};
