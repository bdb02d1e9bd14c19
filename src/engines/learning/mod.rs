pub mod answer_log;
pub mod exemplars;
pub mod link_database;
pub mod oracle;

pub use answer_log::AnswerLog;
pub use exemplars::{Exemplar, ExemplarTracker, ScoringStrategy};
pub use link_database::{InMemoryLinkDatabase, LinkDatabase};
pub use oracle::{ConsoleOracle, GoldOracle, Labeler, Oracle, Question};
