mod call;
mod ingest;
mod plan;
mod report;
mod sql;
mod tools;

use std::path::Path;
use std::time::Instant;

use serde_json::Value;
use uuid::Uuid;

use pitchdata_core::{
    Envelope, EnvelopeError, EnvelopeMeta, LeagueSpec, SeasonId, Settings, TeamId, WorkPlan,
};
use pitchdata_warehouse::{Warehouse, WarehouseConfig};

use crate::cli::{Cli, Command, ScopeArgs};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_error(mut self, error: EnvelopeError) -> Self {
        self.errors.push(error);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();

    let command_result = match &cli.command {
        Command::Plan(args) => plan::run(args)?,
        Command::Ingest(args) => ingest::run(args, cli.db_path.as_deref()).await?,
        Command::Tools => tools::run(cli.db_path.as_deref())?,
        Command::Call(args) => call::run(args, cli.db_path.as_deref())?,
        Command::Sql(args) => sql::run(args, cli.db_path.as_deref())?,
        Command::Report => report::run(cli.db_path.as_deref())?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
    } = command_result;

    let mut meta = EnvelopeMeta::new(
        Uuid::new_v4().to_string(),
        started.elapsed().as_millis() as u64,
    )?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

pub(crate) fn open_warehouse(db_path: Option<&Path>) -> Result<Warehouse, CliError> {
    let config = match db_path {
        Some(path) => WarehouseConfig {
            home: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            db_path: path.to_path_buf(),
            max_pool_size: 4,
        },
        None => {
            let settings = Settings::from_env()?;
            WarehouseConfig {
                home: settings.home.clone(),
                db_path: settings.db_path(),
                max_pool_size: 4,
            }
        }
    };

    Warehouse::open(config)
        .map_err(|error| CliError::Command(format!("failed to open warehouse: {error}")))
}

/// Merges scope flags over the environment-derived settings into a work plan.
pub(crate) fn resolve_plan(scope: &ScopeArgs, settings: &Settings) -> Result<WorkPlan, CliError> {
    let seasons = if scope.seasons.is_empty() {
        settings.seasons.clone()
    } else {
        scope
            .seasons
            .iter()
            .map(|season| SeasonId::parse(season))
            .collect::<Result<Vec<_>, _>>()?
    };

    let league_id = match &scope.league {
        Some(value) => value.parse()?,
        None => settings.league_id,
    };

    let teams = scope
        .teams
        .iter()
        .map(|team| TeamId::parse(team))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WorkPlan::new(
        vec![LeagueSpec::new(league_id, teams)],
        seasons,
    ))
}
