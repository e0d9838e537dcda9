use thiserror::Error;

/// Validation and contract errors exposed by `pitchdata-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("season cannot be empty")]
    EmptySeason,
    #[error("season must be YYYY or YYYY-YYYY: '{value}'")]
    InvalidSeason { value: String },

    #[error("league id must be a positive integer: '{value}'")]
    InvalidLeagueId { value: String },

    #[error("{entity} id must be 4-16 alphanumeric characters: '{value}'")]
    InvalidEntityId {
        entity: &'static str,
        value: String,
    },

    #[error("unknown endpoint '{value}', expected one of team-season-stats, matches, team-match-stats, player-season-stats")]
    InvalidEndpoint { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("minimum request interval must be greater than zero")]
    ZeroInterval,

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
