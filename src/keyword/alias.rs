use indexmap::IndexMap;

/// Surface form -> canonical keyword pairs bundled with the crate.
/// Keys are already lowercased and trimmed.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("비건", "vegan"),
    ("ヴィーガン", "vegan"),
    ("纯素", "vegan"),
    ("채식", "vegan"),
    ("ヴィーガンライフ", "vegan"),
    ("유기농", "organic"),
    ("オーガニック", "organic"),
    ("유해성분무첨가", "clean beauty"),
];

/// Static mapping from a surface form in any supported language to its
/// canonical keyword.
#[derive(Debug, Clone)]
pub struct AliasTable {
    map: IndexMap<Box<str>, Box<str>>,
}

impl AliasTable {
    /// The multilingual table shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_ALIASES.iter().copied())
    }

    /// Build a table from `(surface, canonical)` pairs.
    /// Surface forms are trimmed and lowercased so lookups match normalized input.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let map = pairs
            .into_iter()
            .map(|(from, to)| {
                (
                    from.as_ref().trim().to_lowercase().into_boxed_str(),
                    to.as_ref().trim().to_lowercase().into_boxed_str(),
                )
            })
            .collect();
        Self { map }
    }

    /// Canonical target for an already trimmed/lowercased keyword.
    #[inline]
    pub fn resolve(&self, keyword: &str) -> Option<&str> {
        self.map.get(keyword).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_ref(), v.as_ref()))
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}
