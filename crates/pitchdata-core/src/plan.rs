use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{LeagueId, SeasonId, TeamId};
use crate::ValidationError;

/// Upstream endpoints the ingestion pipeline pulls from.
///
/// The declaration order is the per-season processing order: league-level
/// endpoints first, then per-team endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    TeamSeasonStats,
    Matches,
    TeamMatchStats,
    PlayerSeasonStats,
}

impl Endpoint {
    pub const ALL: [Self; 4] = [
        Self::TeamSeasonStats,
        Self::Matches,
        Self::TeamMatchStats,
        Self::PlayerSeasonStats,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            Self::TeamSeasonStats => "team-season-stats",
            Self::Matches => "matches",
            Self::TeamMatchStats => "team-match-stats",
            Self::PlayerSeasonStats => "player-season-stats",
        }
    }

    /// Whether this endpoint is addressed per team rather than per league.
    pub const fn requires_team(self) -> bool {
        matches!(self, Self::TeamMatchStats | Self::PlayerSeasonStats)
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Endpoint {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "team-season-stats" => Ok(Self::TeamSeasonStats),
            "matches" => Ok(Self::Matches),
            "team-match-stats" => Ok(Self::TeamMatchStats),
            "player-season-stats" => Ok(Self::PlayerSeasonStats),
            other => Err(ValidationError::InvalidEndpoint {
                value: other.to_owned(),
            }),
        }
    }
}

/// One addressable upstream fetch: endpoint plus its key parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkUnit {
    pub endpoint: Endpoint,
    pub league_id: LeagueId,
    pub season_id: SeasonId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
}

impl WorkUnit {
    pub fn league_level(endpoint: Endpoint, league_id: LeagueId, season_id: SeasonId) -> Self {
        Self {
            endpoint,
            league_id,
            season_id,
            team_id: None,
        }
    }

    pub fn team_level(
        endpoint: Endpoint,
        league_id: LeagueId,
        season_id: SeasonId,
        team_id: TeamId,
    ) -> Self {
        Self {
            endpoint,
            league_id,
            season_id,
            team_id: Some(team_id),
        }
    }

    /// Stable textual identity used as the checkpoint key.
    pub fn key(&self) -> String {
        match &self.team_id {
            Some(team_id) => format!(
                "{}:{}:{}:{}",
                self.endpoint.path(),
                self.league_id,
                self.season_id,
                team_id
            ),
            None => format!(
                "{}:{}:{}",
                self.endpoint.path(),
                self.league_id,
                self.season_id
            ),
        }
    }

    /// Query string for the upstream request, values URL-encoded.
    pub fn query_string(&self) -> String {
        let mut parts = vec![
            format!("league_id={}", self.league_id),
            format!("season_id={}", urlencoding::encode(self.season_id.as_str())),
        ];
        if let Some(team_id) = &self.team_id {
            parts.push(format!("team_id={}", urlencoding::encode(team_id.as_str())));
        }
        parts.join("&")
    }

    fn sort_key(&self) -> (LeagueId, &SeasonId, Endpoint, Option<&TeamId>) {
        (
            self.league_id,
            &self.season_id,
            self.endpoint,
            self.team_id.as_ref(),
        )
    }
}

impl Display for WorkUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

impl PartialOrd for WorkUnit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkUnit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A league plus the teams known for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueSpec {
    pub league_id: LeagueId,
    pub teams: Vec<TeamId>,
}

impl LeagueSpec {
    pub fn new(league_id: LeagueId, teams: Vec<TeamId>) -> Self {
        Self { league_id, teams }
    }
}

/// Enumerates the full set of work units for an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPlan {
    leagues: Vec<LeagueSpec>,
    seasons: Vec<SeasonId>,
}

impl WorkPlan {
    pub fn new(leagues: Vec<LeagueSpec>, seasons: Vec<SeasonId>) -> Self {
        Self { leagues, seasons }
    }

    /// Deterministic enumeration: sorted by league, season, endpoint, team,
    /// deduplicated. Resumed runs therefore process remaining work in the same
    /// order as the original run.
    pub fn enumerate(&self) -> Vec<WorkUnit> {
        let mut units = Vec::new();
        for league in &self.leagues {
            for season in &self.seasons {
                for endpoint in Endpoint::ALL {
                    if endpoint.requires_team() {
                        for team in &league.teams {
                            units.push(WorkUnit::team_level(
                                endpoint,
                                league.league_id,
                                season.clone(),
                                team.clone(),
                            ));
                        }
                    } else {
                        units.push(WorkUnit::league_level(
                            endpoint,
                            league.league_id,
                            season.clone(),
                        ));
                    }
                }
            }
        }

        units.sort();
        units.dedup();
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> WorkPlan {
        let league = LeagueSpec::new(
            LeagueId::new(182),
            vec![
                TeamId::parse("e813709a").expect("team"),
                TeamId::parse("6f666f05").expect("team"),
            ],
        );
        WorkPlan::new(
            vec![league],
            vec![
                SeasonId::parse("2024").expect("season"),
                SeasonId::parse("2023").expect("season"),
            ],
        )
    }

    #[test]
    fn enumeration_is_deterministic_and_sorted() {
        let first = plan().enumerate();
        let second = plan().enumerate();
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted);

        // 2 seasons x (2 league-level + 2 endpoints x 2 teams)
        assert_eq!(first.len(), 12);
        // Seasons are processed in order regardless of input order.
        assert!(first[0].season_id.as_str() <= first[first.len() - 1].season_id.as_str());
    }

    #[test]
    fn league_level_endpoints_come_before_team_level_within_a_season() {
        let units = plan().enumerate();
        let season_2023: Vec<&WorkUnit> = units
            .iter()
            .filter(|unit| unit.season_id.as_str() == "2023")
            .collect();

        let first_team_level = season_2023
            .iter()
            .position(|unit| unit.endpoint.requires_team())
            .expect("team-level units exist");
        assert!(season_2023[..first_team_level]
            .iter()
            .all(|unit| !unit.endpoint.requires_team()));
    }

    #[test]
    fn unit_key_is_stable() {
        let unit = WorkUnit::team_level(
            Endpoint::TeamMatchStats,
            LeagueId::new(182),
            SeasonId::parse("2024").expect("season"),
            TeamId::parse("6f666f05").expect("team"),
        );
        assert_eq!(unit.key(), "team-match-stats:182:2024:6f666f05");
    }

    #[test]
    fn query_string_encodes_parameters() {
        let unit = WorkUnit::league_level(
            Endpoint::Matches,
            LeagueId::new(182),
            SeasonId::parse("2023-2024").expect("season"),
        );
        assert_eq!(unit.query_string(), "league_id=182&season_id=2023-2024");
    }
}
