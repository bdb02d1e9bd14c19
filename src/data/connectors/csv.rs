use crate::error::{LinktuneError, Result};
use crate::types::{Link, LinkKind, Record};
use log::{debug, warn};
use polars::prelude::*;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into a DataFrame with every column as a string
    pub fn load<P: AsRef<Path>>(path: P, has_header: bool) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(has_header)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| LinktuneError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// One record per row, keyed by the header names. Empty cells are dropped.
    pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
        let df = Self::load(&path, true)?;
        let mut records = vec![Record::new(); df.height()];

        for column in df.get_columns() {
            let name = column.name().to_string();
            let values = column.str()?;
            for (record, value) in records.iter_mut().zip(values.into_iter()) {
                if let Some(value) = value {
                    record.set(name.clone(), value.trim());
                }
            }
        }

        debug!(
            "Loaded {} records from {}",
            records.len(),
            path.as_ref().display()
        );
        Ok(records)
    }

    /// Reads a headerless link file of `+|-,idA,idB,confidence` rows.
    /// Anything but `+` in the first column is a different-link.
    pub fn load_links<P: AsRef<Path>>(path: P) -> Result<Vec<Link>> {
        let path = path.as_ref();
        if std::fs::metadata(path)?.len() == 0 {
            return Ok(Vec::new());
        }

        let df = Self::load(path, false)?;
        if df.width() < 3 {
            return Err(LinktuneError::DataLoading(format!(
                "Link file {} needs at least 3 columns, found {}",
                path.display(),
                df.width()
            )));
        }

        let columns = df.get_columns();
        let kinds = columns[0].str()?;
        let ids1 = columns[1].str()?;
        let ids2 = columns[2].str()?;
        let confidences = match columns.get(3) {
            Some(column) => Some(column.str()?),
            None => None,
        };

        let mut links = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let (Some(id1), Some(id2)) = (ids1.get(row), ids2.get(row)) else {
                warn!("Skipping incomplete link on row {} of {}", row + 1, path.display());
                continue;
            };
            let kind = match kinds.get(row).map(str::trim) {
                Some("+") => LinkKind::Same,
                _ => LinkKind::Different,
            };
            let mut link = Link::asserted(id1.trim(), id2.trim(), kind);
            if let Some(conf) = confidences
                .and_then(|c| c.get(row))
                .and_then(|c| c.trim().parse::<f64>().ok())
            {
                link.confidence = conf;
            }
            links.push(link);
        }

        debug!("Loaded {} links from {}", links.len(), path.display());
        Ok(links)
    }
}
