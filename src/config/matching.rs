use super::traits::ConfigSection;
use crate::engines::generation::Genome;
use crate::error::{LinktuneError, Result};
use crate::matching::{ComparatorKind, PropertyConfig, PropertyRole};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The matcher configuration being tuned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub threshold: f64,
    #[serde(default)]
    pub data_sources: Vec<DataSourceConfig>,
    #[serde(default)]
    pub properties: Vec<PropertySettings>,
}

#[derive(Serialize)]
struct MatchingDocument<'a> {
    matching: &'a MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertySettings {
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
}

impl PropertySettings {
    fn to_property(&self) -> Result<PropertyConfig> {
        if self.id {
            return Ok(PropertyConfig::identity(&self.name));
        }
        let missing = |what: &str| {
            LinktuneError::Configuration(format!("Property {} has no {}", self.name, what))
        };
        let comparator: ComparatorKind = self
            .comparator
            .as_deref()
            .ok_or_else(|| missing("comparator"))?
            .parse()?;
        let low = self.low.ok_or_else(|| missing("low probability"))?;
        let high = self.high.ok_or_else(|| missing("high probability"))?;
        for p in [low, high] {
            if !(0.0..=1.0).contains(&p) {
                return Err(LinktuneError::Configuration(format!(
                    "Property {} has probability {} outside [0, 1]",
                    self.name, p
                )));
            }
        }
        Ok(PropertyConfig::compared(&self.name, comparator, low, high))
    }

    fn from_property(prop: &PropertyConfig) -> Self {
        match prop.role {
            PropertyRole::Identity => Self {
                name: prop.name.clone(),
                id: true,
                ..Default::default()
            },
            PropertyRole::Compared {
                comparator,
                low,
                high,
            } => Self {
                name: prop.name.clone(),
                id: false,
                comparator: Some(comparator.name().to_string()),
                low: Some(low),
                high: Some(high),
            },
        }
    }
}

impl MatchingConfig {
    pub fn to_properties(&self) -> Result<Vec<PropertyConfig>> {
        self.properties.iter().map(PropertySettings::to_property).collect()
    }

    /// The configured starting point as a genome.
    pub fn to_genome(&self) -> Result<Genome> {
        Ok(Genome::new(self.threshold, self.to_properties()?))
    }

    /// This configuration with threshold and properties taken from `genome`.
    pub fn with_genome(&self, genome: &Genome) -> Self {
        Self {
            threshold: genome.threshold(),
            data_sources: self.data_sources.clone(),
            properties: genome
                .properties()
                .iter()
                .map(PropertySettings::from_property)
                .collect(),
        }
    }

    /// Writes this configuration, updated from `genome`, as a `[matching]`
    /// TOML document.
    pub fn save_best<P: AsRef<Path>>(&self, genome: &Genome, path: P) -> Result<()> {
        let document = MatchingDocument {
            matching: &self.with_genome(genome),
        };
        std::fs::write(path, toml::to_string_pretty(&document)?)?;
        Ok(())
    }

    /// Makes relative data source paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.data_sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
    }
}

impl ConfigSection for MatchingConfig {
    fn section_name() -> &'static str {
        "matching"
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(LinktuneError::Configuration(format!(
                "Threshold {} must be between 0 and 1",
                self.threshold
            )));
        }
        if !(1..=2).contains(&self.data_sources.len()) {
            return Err(LinktuneError::Configuration(format!(
                "Expected one or two data sources, found {}",
                self.data_sources.len()
            )));
        }
        let properties = self.to_properties()?;
        if !properties.iter().any(PropertyConfig::is_identity) {
            return Err(LinktuneError::Configuration(
                "No identity property configured".to_string(),
            ));
        }
        if properties.iter().all(PropertyConfig::is_identity) {
            return Err(LinktuneError::Configuration(
                "No compared properties configured".to_string(),
            ));
        }
        Ok(())
    }
}
