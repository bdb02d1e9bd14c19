use std::collections::HashSet;

use crate::engines::learning::{InMemoryLinkDatabase, LinkDatabase};
use crate::error::{LinktuneError, Result};
use crate::matching::MatchListener;
use crate::types::{LinkKind, PairKey, Record};

/// Outcome of scoring one linkage pass against known links.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FMeasure {
    pub correct_found: usize,
    pub wrong_found: usize,
    pub unknown: usize,
    /// SAME links in the truth set.
    pub known_same: usize,
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
}

impl FMeasure {
    /// Unknown pairs only count against precision when `pessimistic`.
    pub fn compute(
        correct_found: usize,
        wrong_found: usize,
        unknown: usize,
        known_same: usize,
        pessimistic: bool,
    ) -> Self {
        let mut total = correct_found + wrong_found;
        if pessimistic {
            total += unknown;
        }
        let precision = ratio(correct_found, total);
        let recall = ratio(correct_found, known_same);
        let fmeasure = if correct_found == 0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            correct_found,
            wrong_found,
            unknown,
            known_same,
            precision,
            recall,
            fmeasure,
        }
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Scores matches as they are reported against a truth link set.
pub struct FMeasureListener<'a> {
    truth: &'a InMemoryLinkDatabase,
    id_fields: &'a [String],
    pessimistic: bool,
    found: HashSet<PairKey>,
    wrong_found: usize,
    unknown: usize,
    result: Option<FMeasure>,
}

impl<'a> FMeasureListener<'a> {
    pub fn new(truth: &'a InMemoryLinkDatabase, id_fields: &'a [String], pessimistic: bool) -> Self {
        Self {
            truth,
            id_fields,
            pessimistic,
            found: HashSet::new(),
            wrong_found: 0,
            unknown: 0,
            result: None,
        }
    }

    /// The score, once processing has ended.
    pub fn result(&self) -> Option<FMeasure> {
        self.result
    }
}

impl MatchListener for FMeasureListener<'_> {
    fn matches(&mut self, r1: &Record, r2: &Record, _confidence: f64) -> Result<()> {
        let id1 = r1.identity(self.id_fields)?;
        let id2 = r2.identity(self.id_fields)?;
        match self.truth.infer_link(id1, id2).map(|link| link.kind) {
            Some(LinkKind::Same) => {
                self.found.insert(PairKey::new(id1, id2));
            }
            Some(LinkKind::Different) => self.wrong_found += 1,
            None => self.unknown += 1,
        }
        Ok(())
    }

    fn end_processing(&mut self) -> Result<()> {
        let result = FMeasure::compute(
            self.found.len(),
            self.wrong_found,
            self.unknown,
            self.truth.same_count(),
            self.pessimistic,
        );
        if result.fmeasure > 1.0 {
            return Err(LinktuneError::SanityViolation {
                fmeasure: result.fmeasure,
            });
        }
        self.result = Some(result);
        Ok(())
    }
}
