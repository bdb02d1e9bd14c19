use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use super::aspects::AspectRegistry;
use crate::error::{LinktuneError, Result};
use crate::matching::{ComparatorKind, MatchConfiguration, PropertyConfig, PropertyRole};

/// One candidate matching configuration.
///
/// Equality and hashing look only at the threshold and the per-property
/// settings, so two genomes reached by different lineages compare equal
/// and share one fitness cache entry. The parent link and rank are
/// bookkeeping for progress reports.
#[derive(Debug, Clone)]
pub struct Genome {
    threshold: f64,
    properties: Vec<PropertyConfig>,
    parent: Option<Arc<Genome>>,
    rank: Option<usize>,
}

/// How a breeding-pool member produces its offspring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variation {
    Mate,
    Mutate(usize),
}

impl Variation {
    /// Maps a draw from 0..=3: zero mates, anything else mutates that often.
    pub fn from_draw(draw: usize) -> Self {
        match draw {
            0 => Variation::Mate,
            k => Variation::Mutate(k),
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_draw(rng.gen_range(0..=3))
    }
}

impl Genome {
    pub fn new(threshold: f64, properties: Vec<PropertyConfig>) -> Self {
        Self {
            threshold,
            properties,
            parent: None,
            rank: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn properties(&self) -> &[PropertyConfig] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyConfig> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub(crate) fn role_mut(&mut self, name: &str) -> Option<&mut PropertyRole> {
        self.properties
            .iter_mut()
            .find(|p| p.name == name)
            .map(|p| &mut p.role)
    }

    pub fn parent(&self) -> Option<&Genome> {
        self.parent.as_deref()
    }

    /// Ancestors from the immediate parent back to the random founder.
    pub fn ancestors(&self) -> impl Iterator<Item = &Genome> {
        std::iter::successors(self.parent(), |g| g.parent())
    }

    /// 1-based position in the most recent ranking this genome took part in.
    pub fn rank(&self) -> Option<usize> {
        self.rank
    }

    pub fn set_rank(&mut self, rank: usize) {
        self.rank = Some(rank);
    }

    pub fn match_configuration(&self) -> MatchConfiguration<'_> {
        MatchConfiguration::new(self.threshold, &self.properties)
    }

    /// Same values, parented to a snapshot of `self`.
    pub fn copy(&self) -> Genome {
        Genome {
            threshold: self.threshold,
            properties: self.properties.clone(),
            parent: Some(Arc::new(self.clone())),
            rank: None,
        }
    }

    /// A copy with `times` random aspects redrawn, repeats allowed.
    /// `vary` routes a zero count to `mate` instead.
    pub fn mutate<R: Rng + ?Sized>(&self, times: usize, registry: &AspectRegistry, rng: &mut R) -> Genome {
        let mut child = self.copy();
        for _ in 0..times {
            registry.choose(rng).modify(&mut child, rng);
        }
        child
    }

    /// A copy taking each aspect from `self` or `other` with equal odds.
    pub fn mate<R: Rng + ?Sized>(&self, other: &Genome, registry: &AspectRegistry, rng: &mut R) -> Genome {
        let mut child = self.copy();
        for aspect in registry.aspects() {
            let source = if rng.gen_bool(0.5) { self } else { other };
            if let Some(value) = aspect.get(source) {
                aspect.set(&mut child, value);
            }
        }
        child
    }

    /// One offspring: mates with a random member of `pool` or mutates 1-3 times.
    pub fn reproduce<R: Rng + ?Sized>(&self, pool: &[Genome], registry: &AspectRegistry, rng: &mut R) -> Genome {
        self.vary(Variation::random(rng), pool, registry, rng)
    }

    pub fn vary<R: Rng + ?Sized>(
        &self,
        variation: Variation,
        pool: &[Genome],
        registry: &AspectRegistry,
        rng: &mut R,
    ) -> Genome {
        match variation {
            Variation::Mate | Variation::Mutate(0) => match pool.choose(rng) {
                Some(partner) => self.mate(partner, registry, rng),
                None => self.copy(),
            },
            Variation::Mutate(times) => self.mutate(times, registry, rng),
        }
    }
}

fn hash_f64<H: Hasher>(value: f64, state: &mut H) {
    // -0.0 == 0.0 must hash alike
    let value = if value == 0.0 { 0.0 } else { value };
    value.to_bits().hash(state);
}

impl PartialEq for Genome {
    fn eq(&self, other: &Self) -> bool {
        self.threshold == other.threshold && self.properties == other.properties
    }
}

impl Eq for Genome {}

impl Hash for Genome {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_f64(self.threshold, state);
        for prop in &self.properties {
            prop.name.hash(state);
            match prop.role {
                PropertyRole::Identity => 0u8.hash(state),
                PropertyRole::Compared {
                    comparator,
                    low,
                    high,
                } => {
                    comparator.name().hash(state);
                    hash_f64(low, state);
                    hash_f64(high, state);
                }
            }
        }
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[GeneticConfiguration {}", self.threshold)?;
        for prop in &self.properties {
            match prop.role {
                PropertyRole::Identity => write!(f, " [{}]", prop.name)?,
                PropertyRole::Compared {
                    comparator,
                    low,
                    high,
                } => write!(f, " [{} {} {} {}]", prop.name, comparator, low, high)?,
            }
        }
        write!(f, "]")
    }
}

impl FromStr for Genome {
    type Err = LinktuneError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = |why: &str| LinktuneError::GenomeParse(format!("{}: {}", why, s));

        let body = s
            .trim()
            .strip_prefix("[GeneticConfiguration")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| bad("missing [GeneticConfiguration ...] wrapper"))?;

        let (head, mut rest) = match body.find('[') {
            Some(ix) => body.split_at(ix),
            None => (body, ""),
        };
        let threshold: f64 = head.trim().parse().map_err(|_| bad("bad threshold"))?;

        let mut properties = Vec::new();
        while let Some(start) = rest.find('[') {
            let end = rest[start..]
                .find(']')
                .map(|ix| start + ix)
                .ok_or_else(|| bad("unterminated property"))?;
            let tokens: Vec<&str> = rest[start + 1..end].split_whitespace().collect();
            let prop = match tokens.as_slice() {
                [name] => PropertyConfig::identity(*name),
                [name, comparator, low, high] => PropertyConfig::compared(
                    *name,
                    comparator.parse::<ComparatorKind>()?,
                    low.parse().map_err(|_| bad("bad low probability"))?,
                    high.parse().map_err(|_| bad("bad high probability"))?,
                ),
                _ => return Err(bad("property needs 1 or 4 fields")),
            };
            properties.push(prop);
            rest = &rest[end + 1..];
        }

        if !rest.trim().is_empty() {
            return Err(bad("trailing text"));
        }
        Ok(Genome::new(threshold, properties))
    }
}
