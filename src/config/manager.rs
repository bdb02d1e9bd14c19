use super::{evolution::EvolutionConfig, matching::MatchingConfig, traits::ConfigSection};
use crate::error::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub matching: MatchingConfig,
    #[serde(default)]
    pub evolution: EvolutionConfig,
}

impl AppConfig {
    /// Loads a TOML or JSON file, then applies `LINKTUNE__SECTION__KEY`
    /// environment overrides. Relative data paths resolve against the
    /// file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut app: AppConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("LINKTUNE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Some(base) = path.parent() {
            app.matching.resolve_paths(base);
        }
        info!(
            "Loaded configuration from {} ({} properties, {} data sources)",
            path.display(),
            app.matching.properties.len(),
            app.matching.data_sources.len()
        );
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        self.evolution.validate()?;
        debug!(
            "Validated [{}] and [{}] sections",
            MatchingConfig::section_name(),
            EvolutionConfig::section_name()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[matching]
threshold = 0.85

[[matching.data_sources]]
path = "people.csv"

[[matching.properties]]
name = "ID"
id = true

[[matching.properties]]
name = "NAME"
comparator = "JaroWinkler"
low = 0.2
high = 0.95

[evolution]
population_size = 20
generations = 5
"#;

    #[test]
    fn test_load_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linktune.toml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(SAMPLE.as_bytes())
            .unwrap();

        let app = AppConfig::load(&path).unwrap();
        app.validate().unwrap();
        assert_eq!(app.evolution.population_size, 20);
        assert_eq!(app.evolution.questions, 10);
        assert_eq!(app.matching.data_sources[0].path, dir.path().join("people.csv"));

        let mut best = app.matching.to_genome().unwrap();
        best.set_threshold(0.91);
        let out = dir.path().join("best.toml");
        app.matching.save_best(&best, &out).unwrap();

        let written: toml::Value = toml::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["matching"]["threshold"].as_float(), Some(0.91));
        assert_eq!(
            written["matching"]["properties"][1]["comparator"].as_str(),
            Some("JaroWinkler")
        );
    }
}
