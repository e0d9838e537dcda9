pub mod category;
pub mod ids;
pub mod timestamp;

pub use category::StatCategory;
pub use ids::{LeagueId, MatchId, PlayerId, SeasonId, TeamId};
pub use timestamp::UtcDateTime;
