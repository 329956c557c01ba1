use std::sync::OnceLock;

use crate::{keyword::AliasTable, utils::memo::BoundedMemo};

fn builtin_table() -> &'static AliasTable {
    static TABLE: OnceLock<AliasTable> = OnceLock::new();
    TABLE.get_or_init(AliasTable::builtin)
}

/// Trim, lowercase and resolve through the built-in alias table.
///
/// Pure; `normalize(&normalize(x)) == normalize(x)` for every input.
pub fn normalize(raw: &str) -> String {
    normalize_with(builtin_table(), raw)
}

fn normalize_with(table: &AliasTable, raw: &str) -> String {
    let cleaned = raw.trim().to_lowercase();
    match table.resolve(&cleaned) {
        Some(target) => target.to_string(),
        None => cleaned,
    }
}

/// Split a comma separated input line into keywords, dropping blanks.
///
/// # Examples
/// ```
/// use country_recommender::keyword::parse_keywords;
/// assert_eq!(parse_keywords(" 비건, skincare ,,"), vec!["비건", "skincare"]);
/// ```
pub fn parse_keywords(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|kw| !kw.is_empty())
        .map(str::to_string)
        .collect()
}

/// Memoizing wrapper around the normalizer.
///
/// The same keywords recur across requests, so results are kept in a
/// fixed-capacity table.
#[derive(Debug)]
pub struct KeywordNormalizer {
    aliases: AliasTable,
    memo: BoundedMemo<String, String>,
}

impl KeywordNormalizer {
    pub fn new(aliases: AliasTable, memo_capacity: usize) -> Self {
        Self {
            aliases,
            memo: BoundedMemo::new(memo_capacity),
        }
    }

    pub fn with_capacity(memo_capacity: usize) -> Self {
        Self::new(AliasTable::builtin(), memo_capacity)
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.memo
            .get_or_insert_with(raw.to_string(), |raw| normalize_with(&self.aliases, raw))
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}

impl Default for KeywordNormalizer {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}
