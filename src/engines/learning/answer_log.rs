use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;
use crate::types::Link;

/// Durable record of every label obtained during a run, in link file
/// format so a later run can use it as a test file.
///
/// Each answer is flushed and synced before `record` returns.
pub struct AnswerLog {
    file: File,
    path: PathBuf,
    written: usize,
}

impl AnswerLog {
    /// Starts a fresh log, truncating anything already at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        info!("Writing answers to {}", path.display());
        Ok(Self {
            file,
            path,
            written: 0,
        })
    }

    /// Continues an existing log.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file,
            path,
            written: 0,
        })
    }

    pub fn record(&mut self, link: &Link) -> Result<()> {
        writeln!(
            self.file,
            "{},{},{},{}",
            link.kind.symbol(),
            link.id1,
            link.id2,
            link.confidence
        )?;
        self.file.flush()?;
        self.file.sync_data()?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Answers recorded through this handle.
    pub fn written(&self) -> usize {
        self.written
    }
}
