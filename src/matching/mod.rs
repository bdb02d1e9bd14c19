pub mod comparators;
pub mod engine;
pub mod in_memory;
pub mod property;

pub use comparators::ComparatorKind;
pub use engine::{MatchConfiguration, MatchEngine, MatchListener};
pub use in_memory::InMemoryEngine;
pub use property::{identity_fields, PropertyConfig, PropertyRole};
