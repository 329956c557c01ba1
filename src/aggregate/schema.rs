use serde::{Deserialize, Serialize};

/// One cell of a per-country source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Classify a raw textual field: blank -> `Empty`, parseable finite
    /// number -> `Number`, anything else -> `Text`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Keyword text of the cell, `None` when missing or blank.
    pub fn as_keyword(&self) -> Option<String> {
        let text = match self {
            Cell::Empty => return None,
            Cell::Number(v) => format!("{v:?}"),
            Cell::Text(s) => s.clone(),
        };
        let keyword = text.trim().to_lowercase();
        (!keyword.is_empty()).then_some(keyword)
    }

    /// Frequency as a positive integer, rounding half to even.
    /// `None` when the cell cannot be coerced or the result is <= 0.
    pub fn as_frequency(&self) -> Option<u64> {
        let value = match self {
            Cell::Empty => return None,
            Cell::Number(v) => *v,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        if !value.is_finite() {
            return None;
        }
        let rounded = value.round_ties_even();
        if rounded <= 0.0 || rounded > u64::MAX as f64 {
            return None;
        }
        Some(rounded as u64)
    }
}

/// A raw per-country table as handed over by the data-loading side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> &mut Self {
        self.rows.push(row);
        self
    }

    /// Cell at `(row, col)`; short rows read as `Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(EMPTY)
    }

    /// Indices of numeric columns: every non-empty cell is a number and
    /// there is at least one.
    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&col| {
                let mut seen = false;
                for row in 0..self.rows.len() {
                    match self.cell(row, col) {
                        Cell::Empty => {}
                        Cell::Number(_) => seen = true,
                        Cell::Text(_) => return false,
                    }
                }
                seen
            })
            .collect()
    }
}

/// Detected column roles of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRoles {
    pub keyword: usize,
    pub frequency: usize,
}

const FREQUENCY_MARKERS: [&str; 3] = ["freq", "frequency", "count"];

/// Pick the keyword and frequency columns from the header names.
///
/// The frequency column is the first whose name contains a frequency marker
/// (case-insensitive), else the first numeric column. The keyword column is
/// the first remaining column.
///
/// # Arguments
/// * `columns` - header names in table order
/// * `numeric_columns` - indices of columns holding numbers
pub fn detect_columns<S>(columns: &[S], numeric_columns: &[usize]) -> Result<ColumnRoles, String>
where
    S: AsRef<str>,
{
    let frequency = columns
        .iter()
        .position(|name| {
            let lower = name.as_ref().to_lowercase();
            FREQUENCY_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .or_else(|| numeric_columns.iter().copied().find(|&i| i < columns.len()))
        .ok_or_else(|| format!("no frequency-like column among {:?}", names(columns)))?;

    let keyword = (0..columns.len())
        .find(|&i| i != frequency)
        .ok_or_else(|| format!("no keyword column besides {:?}", columns[frequency].as_ref()))?;

    Ok(ColumnRoles { keyword, frequency })
}

fn names<S: AsRef<str>>(columns: &[S]) -> Vec<&str> {
    columns.iter().map(|c| c.as_ref()).collect()
}
