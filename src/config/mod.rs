pub mod traits;
pub mod evolution;
pub mod matching;
pub mod manager;

pub use manager::AppConfig;
pub use evolution::EvolutionConfig;
pub use matching::{DataSourceConfig, MatchingConfig, PropertySettings};
pub use traits::ConfigSection;
