pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod matching;
pub mod types;

pub use error::{LinktuneError, Result};
