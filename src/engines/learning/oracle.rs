use std::io::{BufRead, Write};
use std::path::Path;

use log::info;

use crate::error::{LinktuneError, Result};
use crate::matching::MatchEngine;
use crate::types::{Link, LinkKind, PairKey, Record};

use super::answer_log::AnswerLog;
use super::exemplars::Exemplar;
use super::link_database::{InMemoryLinkDatabase, LinkDatabase};

/// One pair put to an oracle.
pub struct Question<'a> {
    pub pair: &'a PairKey,
    pub left: &'a Record,
    pub right: &'a Record,
    /// Genomes in the population that matched the pair.
    pub agreement: usize,
    pub population: usize,
}

/// Source of same/different labels.
pub trait Oracle {
    fn label(&mut self, question: &Question<'_>) -> Result<LinkKind>;
}

/// Answers from a gold link set. Pairs missing from it are different.
pub struct GoldOracle {
    gold: InMemoryLinkDatabase,
}

impl GoldOracle {
    pub fn new(gold: InMemoryLinkDatabase) -> Self {
        Self { gold }
    }
}

impl Oracle for GoldOracle {
    fn label(&mut self, question: &Question<'_>) -> Result<LinkKind> {
        let (id1, id2) = question.pair.ids();
        match self.gold.infer_link(id1, id2) {
            Some(link) => Ok(link.kind),
            None => {
                info!("No gold link for {}, assuming different", question.pair);
                Ok(LinkKind::Different)
            }
        }
    }
}

/// Asks a person, showing both records side by side.
pub struct ConsoleOracle<R, W> {
    input: R,
    output: W,
    fields: Vec<String>,
}

impl<R: BufRead, W: Write> ConsoleOracle<R, W> {
    /// `fields` are shown in order; pass the configured property names.
    pub fn new(input: R, output: W, fields: Vec<String>) -> Self {
        Self {
            input,
            output,
            fields,
        }
    }

    fn show(&mut self, question: &Question<'_>) -> Result<()> {
        writeln!(self.output)?;
        writeln!(
            self.output,
            "Matched by {} of {} configurations",
            question.agreement, question.population
        )?;
        let width = self.fields.iter().map(String::len).max().unwrap_or(0);
        for field in &self.fields {
            writeln!(
                self.output,
                "{:<width$}  {:<40}  {}",
                field,
                question.left.get(field).unwrap_or(""),
                question.right.get(field).unwrap_or(""),
                width = width
            )?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Oracle for ConsoleOracle<R, W> {
    fn label(&mut self, question: &Question<'_>) -> Result<LinkKind> {
        self.show(question)?;
        loop {
            write!(self.output, "Same? (y/n) ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(LinktuneError::Oracle(
                    "input closed before an answer was given".to_string(),
                ));
            }
            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(LinkKind::Same),
                "n" | "no" => return Ok(LinkKind::Different),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }
}

/// Puts selected pairs to the oracle, logs each answer, and asserts it
/// into the knowledge base.
pub struct Labeler {
    oracle: Box<dyn Oracle>,
    log: Option<AnswerLog>,
    asked: usize,
}

impl Labeler {
    pub fn new(oracle: Box<dyn Oracle>, log: Option<AnswerLog>) -> Self {
        Self {
            oracle,
            log,
            asked: 0,
        }
    }

    /// A labeler recording every answer to a fresh log at `path`.
    pub fn with_log_at<P: AsRef<Path>>(oracle: Box<dyn Oracle>, path: P) -> Result<Self> {
        Ok(Self::new(oracle, Some(AnswerLog::create(path)?)))
    }

    /// Total questions answered so far.
    pub fn asked(&self) -> usize {
        self.asked
    }

    /// Labels every exemplar not already implied by earlier answers and
    /// returns how many were asked.
    pub fn ask<E: MatchEngine + ?Sized>(
        &mut self,
        engine: &E,
        exemplars: &[Exemplar],
        population: usize,
        known: &mut InMemoryLinkDatabase,
    ) -> Result<usize> {
        let mut asked = 0;
        for exemplar in exemplars {
            if known.contains(&exemplar.pair) {
                continue;
            }
            let (id1, id2) = exemplar.pair.ids();
            let find = |id: &str| {
                engine
                    .find_record(id)
                    .ok_or_else(|| LinktuneError::Oracle(format!("no record with id {}", id)))
            };
            let question = Question {
                pair: &exemplar.pair,
                left: find(id1)?,
                right: find(id2)?,
                agreement: exemplar.count,
                population,
            };

            let kind = self.oracle.label(&question)?;
            let link = Link::asserted(id1, id2, kind);
            if let Some(log) = self.log.as_mut() {
                log.record(&link)?;
            }
            info!("Labeled {} as {:?}", exemplar.pair, kind);
            known.assert_link(link);
            asked += 1;
        }
        self.asked += asked;
        Ok(asked)
    }
}
