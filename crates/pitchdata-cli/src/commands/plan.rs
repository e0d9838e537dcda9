use serde::Serialize;

use pitchdata_core::Settings;

use crate::cli::PlanArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct PlanData {
    unit_count: usize,
    units: Vec<PlanUnit>,
}

#[derive(Debug, Serialize)]
struct PlanUnit {
    key: String,
    endpoint: String,
}

pub fn run(args: &PlanArgs) -> Result<CommandResult, CliError> {
    let settings = Settings::from_env()?;
    let plan = super::resolve_plan(&args.scope, &settings)?;

    let units: Vec<PlanUnit> = plan
        .enumerate()
        .iter()
        .map(|unit| PlanUnit {
            key: unit.key(),
            endpoint: unit.endpoint.path().to_owned(),
        })
        .collect();

    let team_level_planned = units
        .iter()
        .any(|unit| unit.endpoint == "team-match-stats" || unit.endpoint == "player-season-stats");

    let data = PlanData {
        unit_count: units.len(),
        units,
    };

    let mut result = CommandResult::ok(serde_json::to_value(&data)?);
    if !team_level_planned {
        result = result.with_warning(
            "no teams given; per-team endpoints (team-match-stats, player-season-stats) are not planned",
        );
    }
    Ok(result)
}
