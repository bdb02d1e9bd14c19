use crate::error::{LinktuneError, Result};
use crate::types::{MatchMode, Record};

use super::property::{combine_bayes, PropertyConfig};

/// The configuration pushed into a matching engine for one linkage pass.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfiguration<'a> {
    pub threshold: f64,
    pub properties: &'a [PropertyConfig],
}

impl<'a> MatchConfiguration<'a> {
    pub fn new(threshold: f64, properties: &'a [PropertyConfig]) -> Self {
        Self {
            threshold,
            properties,
        }
    }

    /// Highest probability any pair could reach with these bounds.
    pub fn max_probability(&self) -> f64 {
        self.properties
            .iter()
            .filter_map(PropertyConfig::high)
            .filter(|&high| high != 0.0)
            .fold(0.5, combine_bayes)
    }

    /// Rejects configurations that can never reach their threshold.
    pub fn validate(&self) -> Result<()> {
        if self.properties.iter().all(PropertyConfig::is_identity) {
            return Err(LinktuneError::ConfigInvalid(
                "configuration has no compared properties".to_string(),
            ));
        }
        let max = self.max_probability();
        if max < self.threshold {
            return Err(LinktuneError::ConfigInvalid(format!(
                "maximum possible probability is {}, below threshold {}",
                max, self.threshold
            )));
        }
        Ok(())
    }
}

/// Receives candidate matches from a linkage pass.
pub trait MatchListener {
    fn matches(&mut self, r1: &Record, r2: &Record, confidence: f64) -> Result<()>;

    fn end_processing(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A record-linkage engine over an already indexed set of data sources.
///
/// Implementations must not mutate their index while `link_records` runs,
/// since the optimizer may call it from several threads at once.
pub trait MatchEngine: Send + Sync {
    fn mode(&self) -> MatchMode;

    /// Runs one pairwise linkage pass, reporting every pair above the
    /// threshold. Fails with `ConfigInvalid` if the threshold is unreachable.
    fn link_records(
        &self,
        config: &MatchConfiguration<'_>,
        listener: &mut dyn MatchListener,
    ) -> Result<()>;

    fn find_record(&self, id: &str) -> Option<&Record>;
}
