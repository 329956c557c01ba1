use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target export country.
///
/// Variants are declared in alphabetical order of their identifiers, so the
/// derived `Ord` is the deterministic tie-break order used by ranking and by
/// the rows of the lexical matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    Brazil,
    China,
    France,
    India,
    Indonesia,
    Japan,
    Thailand,
    Turkey,
    Uae,
    Uk,
    Usa,
    Vietnam,
}

impl Country {
    /// All known countries, alphabetical by identifier.
    pub const ALL: [Country; 12] = [
        Country::Brazil,
        Country::China,
        Country::France,
        Country::India,
        Country::Indonesia,
        Country::Japan,
        Country::Thailand,
        Country::Turkey,
        Country::Uae,
        Country::Uk,
        Country::Usa,
        Country::Vietnam,
    ];

    /// Lowercase identifier, also the data file stem (`usa.csv`).
    pub fn code(&self) -> &'static str {
        match self {
            Country::Brazil => "brazil",
            Country::China => "china",
            Country::France => "france",
            Country::India => "india",
            Country::Indonesia => "indonesia",
            Country::Japan => "japan",
            Country::Thailand => "thailand",
            Country::Turkey => "turkey",
            Country::Uae => "uae",
            Country::Uk => "uk",
            Country::Usa => "usa",
            Country::Vietnam => "vietnam",
        }
    }

    /// Korean label shown on the dashboard cards.
    pub fn display_name(&self) -> &'static str {
        match self {
            Country::Brazil => "브라질",
            Country::China => "중국",
            Country::France => "프랑스",
            Country::India => "인도",
            Country::Indonesia => "인도네시아",
            Country::Japan => "일본",
            Country::Thailand => "태국",
            Country::Turkey => "튀르키예",
            Country::Uae => "아랍에미리트",
            Country::Uk => "영국",
            Country::Usa => "미국",
            Country::Vietnam => "베트남",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown country identifier: {0}")]
pub struct UnknownCountry(pub String);

impl FromStr for Country {
    type Err = UnknownCountry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Country::ALL
            .iter()
            .copied()
            .find(|c| c.code() == needle)
            .ok_or(UnknownCountry(s.to_string()))
    }
}
