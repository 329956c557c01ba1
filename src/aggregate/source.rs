use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::{
    aggregate::schema::{Cell, RawTable},
    country::Country,
    error::DataError,
};

/// Supplier of per-country raw tables.
pub trait CountrySource: Send + Sync {
    /// Load the raw table of `country`.
    /// A missing or unreadable source is `DataError::Unavailable`.
    fn load(&self, country: Country) -> Result<RawTable, DataError>;
}

/// Reads `<dir>/<country>.csv`, one file per country, first line is the header.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, country: Country) -> PathBuf {
        self.dir.join(format!("{}.csv", country.code()))
    }
}

impl CountrySource for CsvDirSource {
    fn load(&self, country: Country) -> Result<RawTable, DataError> {
        let path = self.path_for(country);
        let unavailable = |reason: String| DataError::Unavailable { country, reason };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(&path)
            .map_err(|e| unavailable(format!("{}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| unavailable(format!("{}: failed to read headers: {e}", path.display())))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut table = RawTable::new(headers);
        let mut skipped = 0usize;
        for (line, record) in reader.byte_records().enumerate() {
            let row = line + 2;
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => {
                    return Err(unavailable(format!("{}: row {row}: {e}", path.display())));
                }
                Err(e) => {
                    debug!(%country, row, error = %e, "skipping malformed row");
                    skipped += 1;
                    continue;
                }
            };
            let cells: Result<Vec<Cell>, _> = record
                .iter()
                .map(|field| std::str::from_utf8(field).map(Cell::parse))
                .collect();
            match cells {
                Ok(cells) => {
                    table.push_row(cells);
                }
                Err(e) => {
                    debug!(%country, row, error = %e, "skipping row with invalid utf-8");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!(%country, skipped, "skipped unreadable rows");
        }
        Ok(table)
    }
}

/// Tables held in memory, for callers that load data themselves.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: IndexMap<Country, RawTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, country: Country, table: RawTable) -> &mut Self {
        self.tables.insert(country, table);
        self
    }

    /// Convenience for two-column `keyword,frequency` data.
    pub fn insert_counts<S: AsRef<str>>(&mut self, country: Country, rows: &[(S, f64)]) -> &mut Self {
        let mut table = RawTable::new(vec!["keyword".to_string(), "frequency".to_string()]);
        for (kw, freq) in rows {
            table.push_row(vec![Cell::Text(kw.as_ref().to_string()), Cell::Number(*freq)]);
        }
        self.insert(country, table)
    }
}

impl CountrySource for MemorySource {
    fn load(&self, country: Country) -> Result<RawTable, DataError> {
        self.tables
            .get(&country)
            .cloned()
            .ok_or_else(|| DataError::Unavailable {
                country,
                reason: "no table supplied".to_string(),
            })
    }
}
