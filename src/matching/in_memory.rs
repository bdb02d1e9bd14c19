use std::collections::HashMap;

use log::{debug, info};

use crate::error::{LinktuneError, Result};
use crate::types::{MatchMode, Record};

use super::engine::{MatchConfiguration, MatchEngine, MatchListener};
use super::property::combine_bayes;

/// Brute-force pairwise engine holding every record in memory.
pub struct InMemoryEngine {
    mode: MatchMode,
    primary: Vec<Record>,
    secondary: Vec<Record>,
    by_id: HashMap<String, (bool, usize)>,
}

impl InMemoryEngine {
    /// Indexes one source (deduplication) or two sources (linking).
    pub fn index(sources: Vec<Vec<Record>>, id_fields: &[String]) -> Result<Self> {
        let mut sources = sources.into_iter();
        let (mode, primary, secondary) = match (sources.next(), sources.next(), sources.next()) {
            (Some(only), None, None) => (MatchMode::Deduplication, only, Vec::new()),
            (Some(left), Some(right), None) => (MatchMode::Linking, left, right),
            _ => {
                return Err(LinktuneError::Configuration(
                    "expected one or two data sources".to_string(),
                ))
            }
        };

        let mut by_id = HashMap::with_capacity(primary.len() + secondary.len());
        for (ix, record) in primary.iter().enumerate() {
            by_id.insert(record.identity(id_fields)?.to_string(), (false, ix));
        }
        for (ix, record) in secondary.iter().enumerate() {
            by_id.insert(record.identity(id_fields)?.to_string(), (true, ix));
        }

        info!(
            "Indexed {} records ({:?} mode, {} secondary)",
            primary.len(),
            mode,
            secondary.len()
        );

        Ok(Self {
            mode,
            primary,
            secondary,
            by_id,
        })
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Match probability of two records under `config`.
    pub fn compare(&self, config: &MatchConfiguration<'_>, r1: &Record, r2: &Record) -> f64 {
        let mut prob = 0.5;
        for prop in config.properties.iter().filter(|p| !p.is_identity()) {
            let (Some(v1), Some(v2)) = (r1.get(&prop.name), r2.get(&prop.name)) else {
                continue;
            };
            prob = combine_bayes(prob, prop.probability(v1, v2));
        }
        prob
    }

    fn report(
        &self,
        config: &MatchConfiguration<'_>,
        r1: &Record,
        r2: &Record,
        listener: &mut dyn MatchListener,
    ) -> Result<()> {
        let prob = self.compare(config, r1, r2);
        if prob > config.threshold {
            listener.matches(r1, r2, prob)?;
        }
        Ok(())
    }
}

impl MatchEngine for InMemoryEngine {
    fn mode(&self) -> MatchMode {
        self.mode
    }

    fn link_records(
        &self,
        config: &MatchConfiguration<'_>,
        listener: &mut dyn MatchListener,
    ) -> Result<()> {
        config.validate()?;

        match self.mode {
            MatchMode::Deduplication => {
                for (i, r1) in self.primary.iter().enumerate() {
                    for r2 in &self.primary[i + 1..] {
                        self.report(config, r1, r2, listener)?;
                    }
                }
            }
            MatchMode::Linking => {
                for r1 in &self.primary {
                    for r2 in &self.secondary {
                        self.report(config, r1, r2, listener)?;
                    }
                }
            }
        }

        debug!("Linkage pass done at threshold {}", config.threshold);
        listener.end_processing()
    }

    fn find_record(&self, id: &str) -> Option<&Record> {
        let &(secondary, ix) = self.by_id.get(id)?;
        if secondary {
            self.secondary.get(ix)
        } else {
            self.primary.get(ix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::comparators::ComparatorKind;
    use crate::matching::property::PropertyConfig;

    struct Collect(Vec<(String, String)>);

    impl MatchListener for Collect {
        fn matches(&mut self, r1: &Record, r2: &Record, _confidence: f64) -> Result<()> {
            let id = |r: &Record| r.get("ID").unwrap_or_default().to_string();
            self.0.push((id(r1), id(r2)));
            Ok(())
        }
    }

    fn people() -> Vec<Record> {
        vec![
            Record::new().with("ID", "1").with("NAME", "acme"),
            Record::new().with("ID", "2").with("NAME", "acme"),
            Record::new().with("ID", "3").with("NAME", "zenith"),
        ]
    }

    #[test]
    fn test_dedup_reports_each_pair_once() {
        let engine = InMemoryEngine::index(vec![people()], &["ID".to_string()]).unwrap();
        let props = vec![
            PropertyConfig::identity("ID"),
            PropertyConfig::compared("NAME", ComparatorKind::Exact, 0.1, 0.9),
        ];
        let mut out = Collect(Vec::new());
        engine
            .link_records(&MatchConfiguration::new(0.8, &props), &mut out)
            .unwrap();
        assert_eq!(out.0, vec![("1".to_string(), "2".to_string())]);
        assert_eq!(engine.find_record("3").and_then(|r| r.get("NAME")), Some("zenith"));
    }

    #[test]
    fn test_unreachable_threshold_is_config_invalid() {
        let engine = InMemoryEngine::index(vec![people()], &["ID".to_string()]).unwrap();
        let props = vec![
            PropertyConfig::identity("ID"),
            PropertyConfig::compared("NAME", ComparatorKind::Exact, 0.1, 0.6),
        ];
        let mut out = Collect(Vec::new());
        let result = engine.link_records(&MatchConfiguration::new(0.95, &props), &mut out);
        assert!(matches!(result, Err(LinktuneError::ConfigInvalid(_))));
    }
}
