//! Frequency aggregation.
//!
//! Turns raw per-country tables into the country × keyword count table the
//! lexical index is fit on. One country's failure never fails the batch; it
//! is reported back as a warning.

pub mod schema;
pub mod source;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use schema::{detect_columns, Cell, ColumnRoles, RawTable};
pub use source::{CountrySource, CsvDirSource, MemorySource};

use crate::{
    country::Country,
    error::{DataError, RecommenderError},
    vectorizer::token::TermFrequency,
};

/// Country -> keyword counts, iterated in country order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    countries: IndexMap<Country, TermFrequency>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a country's counts, keeping countries sorted.
    pub fn insert(&mut self, country: Country, freq: TermFrequency) -> &mut Self {
        self.countries.insert(country, freq);
        self.countries.sort_keys();
        self
    }

    pub fn get(&self, country: Country) -> Option<&TermFrequency> {
        self.countries.get(&country)
    }

    pub fn countries(&self) -> impl Iterator<Item = Country> + '_ {
        self.countries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Country, &TermFrequency)> {
        self.countries.iter().map(|(c, f)| (*c, f))
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Sorted union of every country's keywords.
    /// This order is the column order of the lexical matrix.
    pub fn vocabulary(&self) -> Vec<String> {
        let mut vocab: Vec<String> = self
            .countries
            .values()
            .flat_map(|freq| freq.terms().map(str::to_string))
            .collect();
        vocab.sort_unstable();
        vocab.dedup();
        vocab
    }
}

/// Result of aggregating every country.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub table: FrequencyTable,
    /// Countries that were skipped, and why.
    pub warnings: Vec<DataError>,
}

/// Aggregate one country's raw table into keyword counts.
///
/// Rows with a blank keyword or a frequency that does not coerce to a
/// positive integer are skipped; repeated keywords are summed.
pub fn country_counts(country: Country, table: &RawTable) -> Result<TermFrequency, DataError> {
    let roles = detect_columns(&table.columns, &table.numeric_columns())
        .map_err(|reason| DataError::Schema { country, reason })?;

    let mut freq = TermFrequency::new();
    let mut skipped = 0usize;
    for row in 0..table.rows.len() {
        let keyword = table.cell(row, roles.keyword).as_keyword();
        let count = table.cell(row, roles.frequency).as_frequency();
        match (keyword, count) {
            (Some(kw), Some(n)) => {
                freq.add_count(&kw, n);
            }
            _ => skipped += 1,
        }
    }
    debug!(%country, keywords = freq.term_num(), skipped, "aggregated country table");
    Ok(freq)
}

/// Load and aggregate `countries` from `source`.
///
/// Per-country failures are absorbed into `warnings`. Only when no country
/// at all could be loaded does this fail, with [`RecommenderError::NoData`].
pub fn aggregate<S>(source: &S, countries: &[Country]) -> Result<Aggregation, RecommenderError>
where
    S: CountrySource + ?Sized,
{
    let loaded: Vec<(Country, Result<TermFrequency, DataError>)> = countries
        .par_iter()
        .map(|&country| {
            let counts = source.load(country).and_then(|t| country_counts(country, &t));
            (country, counts)
        })
        .collect();

    let mut table = FrequencyTable::new();
    let mut warnings = Vec::new();
    for (country, counts) in loaded {
        match counts {
            Ok(freq) => {
                table.insert(country, freq);
            }
            Err(e) => {
                warn!(%country, error = %e, "skipping country");
                warnings.push(e);
            }
        }
    }

    if table.is_empty() {
        return Err(RecommenderError::NoData(warnings));
    }
    Ok(Aggregation { table, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        let mut t = RawTable::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row.iter().map(|c| Cell::parse(c)).collect());
        }
        t
    }

    #[test]
    fn country_counts_sums_and_filters() {
        let raw = table(
            &["Keyword", "Count"],
            &[
                &["Vegan", "3"],
                &[" vegan ", "2.4"],
                &["", "10"],
                &["toner", "0"],
                &["serum", "-1"],
                &["mask", "n/a"],
                &["Cream", "1.5"],
            ],
        );
        let freq = country_counts(Country::Usa, &raw).unwrap();
        assert_eq!(freq.term_count("vegan"), 5);
        assert_eq!(freq.term_count("cream"), 2);
        assert!(!freq.contains_term("toner"));
        assert!(!freq.contains_term("serum"));
        assert!(!freq.contains_term("mask"));
        assert_eq!(freq.term_num(), 2);
    }

    #[test]
    fn country_counts_reports_schema_failure() {
        let raw = table(&["keyword", "note"], &[&["vegan", "popular"]]);
        let err = country_counts(Country::Uk, &raw).unwrap_err();
        assert!(matches!(err, DataError::Schema { country: Country::Uk, .. }));
    }

    #[test]
    fn aggregate_skips_missing_countries() {
        let mut source = MemorySource::new();
        source
            .insert_counts(Country::Usa, &[("vegan", 5.0), ("toner", 1.0)])
            .insert_counts(Country::Brazil, &[("sunscreen", 4.0)]);

        let agg = aggregate(&source, &Country::ALL).unwrap();
        assert_eq!(agg.table.len(), 2);
        assert_eq!(agg.warnings.len(), 10);
        assert_eq!(agg.table.countries().collect::<Vec<_>>(), vec![Country::Brazil, Country::Usa]);
        assert_eq!(agg.table.vocabulary(), vec!["sunscreen", "toner", "vegan"]);
    }

    #[test]
    fn aggregate_fails_when_nothing_loads() {
        let source = MemorySource::new();
        let err = aggregate(&source, &[Country::Japan, Country::China]).unwrap_err();
        match err {
            RecommenderError::NoData(warnings) => assert_eq!(warnings.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn vocabulary_is_sorted_and_deduplicated() {
        let mut table = FrequencyTable::new();
        let mut a = TermFrequency::new();
        a.add_count("zeta", 1).add_count("alpha", 2);
        let mut b = TermFrequency::new();
        b.add_count("alpha", 1).add_count("mid", 1);
        table.insert(Country::Vietnam, a).insert(Country::China, b);
        assert_eq!(table.vocabulary(), vec!["alpha", "mid", "zeta"]);
        assert_eq!(table.countries().next(), Some(Country::China));
    }
}
