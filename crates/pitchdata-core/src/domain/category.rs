use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Named group of related statistical metrics inside one upstream payload.
///
/// The known set mirrors the upstream stat blocks; anything else passes
/// through as [`StatCategory::Other`] so upstream schema additions are never
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatCategory {
    Stats,
    Schedule,
    Keeper,
    Shooting,
    Passing,
    PassingTypes,
    Gca,
    Defense,
    Possession,
    Misc,
    Other(String),
}

impl StatCategory {
    /// Category keys the upstream API documents today.
    pub const KNOWN: [&'static str; 10] = [
        "stats",
        "schedule",
        "keeper",
        "shooting",
        "passing",
        "passing_types",
        "gca",
        "defense",
        "possession",
        "misc",
    ];

    pub fn from_key(key: &str) -> Self {
        match key {
            "stats" => Self::Stats,
            "schedule" => Self::Schedule,
            "keeper" => Self::Keeper,
            "shooting" => Self::Shooting,
            "passing" => Self::Passing,
            "passing_types" => Self::PassingTypes,
            "gca" => Self::Gca,
            "defense" => Self::Defense,
            "possession" => Self::Possession,
            "misc" => Self::Misc,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stats => "stats",
            Self::Schedule => "schedule",
            Self::Keeper => "keeper",
            Self::Shooting => "shooting",
            Self::Passing => "passing",
            Self::PassingTypes => "passing_types",
            Self::Gca => "gca",
            Self::Defense => "defense",
            Self::Possession => "possession",
            Self::Misc => "misc",
            Self::Other(name) => name.as_str(),
        }
    }

    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl Display for StatCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for StatCategory {
    fn from(value: String) -> Self {
        Self::from_key(value.as_str())
    }
}

impl From<StatCategory> for String {
    fn from(value: StatCategory) -> Self {
        value.as_str().to_owned()
    }
}
