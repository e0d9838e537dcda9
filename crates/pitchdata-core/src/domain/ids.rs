use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Upstream league identifier (e.g. 182 for the NWSL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeagueId(u32);

impl LeagueId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for LeagueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LeagueId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let parsed: u32 = trimmed.parse().map_err(|_| ValidationError::InvalidLeagueId {
            value: trimmed.to_owned(),
        })?;
        if parsed == 0 {
            return Err(ValidationError::InvalidLeagueId {
                value: trimmed.to_owned(),
            });
        }
        Ok(Self(parsed))
    }
}

/// Season identifier as the upstream API spells it: `2024` for calendar-year
/// leagues, `2023-2024` for cross-year leagues.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonId(String);

impl SeasonId {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySeason);
        }

        let valid = match trimmed.split_once('-') {
            None => is_year(trimmed),
            Some((first, second)) => is_year(first) && is_year(second),
        };
        if !valid {
            return Err(ValidationError::InvalidSeason {
                value: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SeasonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SeasonId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

fn is_year(value: &str) -> bool {
    value.len() == 4 && value.chars().all(|ch| ch.is_ascii_digit())
}

macro_rules! entity_id {
    ($name:ident, $entity:literal) => {
        /// Short alphanumeric upstream identifier.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                let trimmed = value.trim();
                validate_entity_id($entity, trimmed)?;
                Ok(Self(trimmed.to_owned()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::parse(value)
            }
        }
    };
}

entity_id!(TeamId, "team");
entity_id!(PlayerId, "player");
entity_id!(MatchId, "match");

fn validate_entity_id(entity: &'static str, value: &str) -> Result<(), ValidationError> {
    let valid = (4..=16).contains(&value.len())
        && value.chars().all(|ch| ch.is_ascii_alphanumeric());
    if !valid {
        return Err(ValidationError::InvalidEntityId {
            entity,
            value: value.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_calendar_and_cross_year_seasons() {
        assert_eq!(SeasonId::parse("2024").expect("year").as_str(), "2024");
        assert_eq!(
            SeasonId::parse("2023-2024").expect("range").as_str(),
            "2023-2024"
        );
    }

    #[test]
    fn rejects_malformed_seasons() {
        assert!(matches!(
            SeasonId::parse("24"),
            Err(ValidationError::InvalidSeason { .. })
        ));
        assert!(matches!(
            SeasonId::parse("2023/24"),
            Err(ValidationError::InvalidSeason { .. })
        ));
        assert!(matches!(SeasonId::parse("  "), Err(ValidationError::EmptySeason)));
    }

    #[test]
    fn rejects_zero_league_id() {
        assert!(matches!(
            "0".parse::<LeagueId>(),
            Err(ValidationError::InvalidLeagueId { .. })
        ));
    }

    #[test]
    fn entity_id_accepts_fbref_style_hashes() {
        let team = TeamId::parse("6f666f05").expect("team id");
        assert_eq!(team.as_str(), "6f666f05");

        assert!(matches!(
            TeamId::parse("a!"),
            Err(ValidationError::InvalidEntityId { entity: "team", .. })
        ));
    }
}
