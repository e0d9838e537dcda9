//! Built-in tool table: read-only data-access functions over ingested records.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use pitchdata_core::StatCategory;
use pitchdata_warehouse::{RecordFilter, Warehouse, WarehouseError};

use crate::registry::{ParamSpec, ParamType, ToolArgs, ToolRegistry, ToolSpec};

const AGGREGATION_SCAN_LIMIT: usize = 10_000;
const DEFAULT_RECENT_MATCHES: i64 = 10;

pub(crate) fn install(registry: &mut ToolRegistry) {
    registry.register(ToolSpec::new(
        "get_raw_data",
        "Get raw ingested statistics for one category, filtered by season and team.",
        vec![
            ParamSpec::required("data_type", ParamType::String, "stat category to return")
                .with_allowed(&StatCategory::KNOWN),
            ParamSpec::required("season", ParamType::String, "season year, e.g. '2024'"),
            ParamSpec::optional("team_id", ParamType::String, "filter by team id"),
            ParamSpec::optional("limit", ParamType::Integer, "maximum rows to return"),
        ],
        Arc::new(get_raw_data),
    ));

    registry.register(ToolSpec::new(
        "get_team_performance",
        "Per-team wins, draws, losses, goals, and points for a season.",
        vec![
            ParamSpec::required("season", ParamType::String, "season year, e.g. '2024'"),
            ParamSpec::optional("team_id", ParamType::String, "restrict to one team"),
        ],
        Arc::new(get_team_performance),
    ));

    registry.register(ToolSpec::new(
        "get_league_standings",
        "Season table ranked by points, then goal difference.",
        vec![ParamSpec::required(
            "season",
            ParamType::String,
            "season year, e.g. '2024'",
        )],
        Arc::new(get_league_standings),
    ));

    registry.register(ToolSpec::new(
        "get_recent_matches",
        "Most recent matches of a season with scores and attendance.",
        vec![
            ParamSpec::required("season", ParamType::String, "season year, e.g. '2024'"),
            ParamSpec::optional("limit", ParamType::Integer, "number of matches (default 10)"),
        ],
        Arc::new(get_recent_matches),
    ));
}

fn get_raw_data(warehouse: &Warehouse, args: &ToolArgs) -> Result<Value, WarehouseError> {
    let filter = RecordFilter {
        category: args.str("data_type").map(str::to_owned),
        season_id: args.str("season").map(str::to_owned),
        team_id: args.str("team_id").map(str::to_owned),
        limit: args.integer("limit").map(|limit| limit.max(1) as usize),
        ..RecordFilter::default()
    };
    let records = warehouse.select_records(&filter)?;
    Ok(serde_json::to_value(records).unwrap_or(Value::Null))
}

#[derive(Debug, Clone, Default, Serialize)]
struct TeamPerformance {
    team_id: String,
    games_played: u32,
    wins: u32,
    draws: u32,
    losses: u32,
    goals_for: i64,
    goals_against: i64,
    goal_diff: i64,
    points: u32,
}

fn get_team_performance(warehouse: &Warehouse, args: &ToolArgs) -> Result<Value, WarehouseError> {
    let table = performance_table(
        warehouse,
        args.str("season").unwrap_or_default(),
        args.str("team_id"),
    )?;
    Ok(serde_json::to_value(table).unwrap_or(Value::Null))
}

fn get_league_standings(warehouse: &Warehouse, args: &ToolArgs) -> Result<Value, WarehouseError> {
    let table = performance_table(warehouse, args.str("season").unwrap_or_default(), None)?;
    let standings: Vec<Value> = table
        .into_iter()
        .enumerate()
        .map(|(index, performance)| {
            let mut row = serde_json::to_value(performance)
                .unwrap_or(Value::Null);
            if let Some(object) = row.as_object_mut() {
                object.insert(String::from("position"), Value::from(index + 1));
            }
            row
        })
        .collect();
    Ok(Value::Array(standings))
}

/// Aggregates the schedule category into a per-team season table. Points use
/// the standard 3/1/0 scheme.
fn performance_table(
    warehouse: &Warehouse,
    season: &str,
    team_id: Option<&str>,
) -> Result<Vec<TeamPerformance>, WarehouseError> {
    let records = warehouse.select_records(&RecordFilter {
        category: Some(String::from("schedule")),
        season_id: Some(season.to_owned()),
        team_id: team_id.map(str::to_owned),
        limit: Some(AGGREGATION_SCAN_LIMIT),
        ..RecordFilter::default()
    })?;

    let mut table: BTreeMap<String, TeamPerformance> = BTreeMap::new();
    for record in records {
        let Some(team) = record.team_id else {
            // League-level match rows carry no team key; team tables come
            // from the per-team schedule records.
            continue;
        };

        let entry = table.entry(team.clone()).or_insert_with(|| TeamPerformance {
            team_id: team,
            ..TeamPerformance::default()
        });

        entry.games_played += 1;
        entry.goals_for += field_i64(&record.fields, "gf");
        entry.goals_against += field_i64(&record.fields, "ga");
        match record.fields.get("result").and_then(Value::as_str) {
            Some("W") => entry.wins += 1,
            Some("D") => entry.draws += 1,
            Some("L") => entry.losses += 1,
            _ => {}
        }
    }

    let mut rows: Vec<TeamPerformance> = table
        .into_values()
        .map(|mut performance| {
            performance.goal_diff = performance.goals_for - performance.goals_against;
            performance.points = performance.wins * 3 + performance.draws;
            performance
        })
        .collect();
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_diff.cmp(&a.goal_diff))
            .then(a.team_id.cmp(&b.team_id))
    });
    Ok(rows)
}

fn get_recent_matches(warehouse: &Warehouse, args: &ToolArgs) -> Result<Value, WarehouseError> {
    let limit = args
        .integer("limit")
        .unwrap_or(DEFAULT_RECENT_MATCHES)
        .max(1) as usize;

    let mut records = warehouse.select_records(&RecordFilter {
        category: Some(String::from("schedule")),
        season_id: args.str("season").map(str::to_owned),
        limit: Some(AGGREGATION_SCAN_LIMIT),
        ..RecordFilter::default()
    })?;

    records.sort_by(|a, b| {
        let date_a = a.fields.get("date").and_then(Value::as_str).unwrap_or("");
        let date_b = b.fields.get("date").and_then(Value::as_str).unwrap_or("");
        date_b.cmp(date_a)
    });

    let matches: Vec<Value> = records
        .into_iter()
        .take(limit)
        .map(|record| {
            let mut row = Map::new();
            if let Some(team_id) = record.team_id {
                row.insert(String::from("team_id"), Value::String(team_id));
            }
            if let Some(match_id) = record.match_id {
                row.insert(String::from("match_id"), Value::String(match_id));
            }
            for field in [
                "date",
                "round",
                "home_away",
                "opponent",
                "result",
                "gf",
                "ga",
                "attendance",
            ] {
                if let Some(value) = record.fields.get(field) {
                    row.insert(field.to_owned(), value.clone());
                }
            }
            Value::Object(row)
        })
        .collect();

    Ok(Value::Array(matches))
}

fn field_i64(fields: &Value, name: &str) -> i64 {
    match fields.get(name) {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64))
            .unwrap_or(0),
        _ => 0,
    }
}
