//! Tool dispatch against an ingested temp warehouse.

use serde_json::{json, Map, Value};
use tempfile::tempdir;

use pitchdata_agent::{ToolError, ToolRegistry};
use pitchdata_core::{
    normalize, Endpoint, LeagueId, RawPayload, SeasonId, TeamId, UtcDateTime, WorkUnit,
};
use pitchdata_tests::temp_warehouse;
use pitchdata_warehouse::StatRecord;

fn params(value: Value) -> Map<String, Value> {
    value.as_object().expect("object").clone()
}

fn schedule_row(team: &str, match_id: &str, fields: Value) -> StatRecord {
    StatRecord {
        category: String::from("schedule"),
        league_id: String::from("182"),
        season_id: String::from("2024"),
        team_id: Some(String::from(team)),
        player_id: None,
        match_id: Some(String::from(match_id)),
        fields,
    }
}

/// Two teams, two matches each; thorns win both, pride lose both.
fn seed_season(warehouse: &pitchdata_warehouse::Warehouse) {
    let thorns = "6f666f05";
    let pride = "e813709a";
    warehouse
        .upsert_unit(
            "team-match-stats:182:2024:6f666f05",
            &[
                schedule_row(
                    thorns,
                    "m0000001",
                    json!({"date": "2024-03-16", "result": "W", "gf": 2, "ga": 1, "attendance": 18204}),
                ),
                schedule_row(
                    thorns,
                    "m0000002",
                    json!({"date": "2024-03-23", "result": "W", "gf": 3, "ga": 0, "attendance": 20511}),
                ),
            ],
        )
        .expect("seed thorns");
    warehouse
        .upsert_unit(
            "team-match-stats:182:2024:e813709a",
            &[
                schedule_row(
                    pride,
                    "m0000001",
                    json!({"date": "2024-03-16", "result": "L", "gf": 1, "ga": 2, "attendance": 18204}),
                ),
                schedule_row(
                    pride,
                    "m0000003",
                    json!({"date": "2024-03-30", "result": "L", "gf": 0, "ga": 1, "attendance": 9842}),
                ),
            ],
        )
        .expect("seed pride");
}

#[test]
fn raw_data_round_trips_ingested_values() {
    let temp = tempdir().expect("tempdir");
    let warehouse = temp_warehouse(&temp);

    // Ingest through the real normalizer so coercion is part of the loop.
    let unit = WorkUnit::team_level(
        Endpoint::TeamMatchStats,
        LeagueId::new(182),
        SeasonId::parse("2024").expect("season"),
        TeamId::parse("6f666f05").expect("team"),
    );
    let payload = RawPayload {
        unit: unit.clone(),
        body: json!({"data": [{
            "meta_data": {"match_id": "a1b2c3d4", "date": "2024-03-16"},
            "stats": {"schedule": {"result": "W", "gf": 2, "ga": 1, "attendance": "31,238"}}
        }]}),
        fetched_at: UtcDateTime::parse("2024-06-01T00:00:00Z").expect("timestamp"),
    };
    let rows: Vec<StatRecord> = normalize(&payload)
        .expect("normalize")
        .iter()
        .map(|record| record.to_stat_record())
        .collect();
    warehouse.upsert_unit(unit.key().as_str(), &rows).expect("upsert");

    let registry = ToolRegistry::with_builtin_tools(warehouse);
    let response = registry
        .dispatch(
            "get_raw_data",
            &params(json!({"data_type": "schedule", "season": "2024"})),
        )
        .expect("dispatch");

    assert_eq!(response.row_count, 1);
    let record = &response.data[0];
    assert_eq!(record["team_id"], json!("6f666f05"));
    assert_eq!(record["match_id"], json!("a1b2c3d4"));
    assert_eq!(record["fields"]["attendance"], json!(31238));
    assert_eq!(record["fields"]["result"], json!("W"));
}

#[test]
fn team_performance_aggregates_schedule_records() {
    let temp = tempdir().expect("tempdir");
    let warehouse = temp_warehouse(&temp);
    seed_season(&warehouse);

    let registry = ToolRegistry::with_builtin_tools(warehouse);
    let response = registry
        .dispatch(
            "get_team_performance",
            &params(json!({"season": "2024", "team_id": "6f666f05"})),
        )
        .expect("dispatch");

    assert_eq!(response.row_count, 1);
    let row = &response.data[0];
    assert_eq!(row["games_played"], json!(2));
    assert_eq!(row["wins"], json!(2));
    assert_eq!(row["losses"], json!(0));
    assert_eq!(row["goals_for"], json!(5));
    assert_eq!(row["goals_against"], json!(1));
    assert_eq!(row["goal_diff"], json!(4));
    assert_eq!(row["points"], json!(6));
}

#[test]
fn standings_rank_by_points_then_goal_difference() {
    let temp = tempdir().expect("tempdir");
    let warehouse = temp_warehouse(&temp);
    seed_season(&warehouse);

    let registry = ToolRegistry::with_builtin_tools(warehouse);
    let response = registry
        .dispatch("get_league_standings", &params(json!({"season": "2024"})))
        .expect("dispatch");

    assert_eq!(response.row_count, 2);
    assert_eq!(response.data[0]["team_id"], json!("6f666f05"));
    assert_eq!(response.data[0]["position"], json!(1));
    assert_eq!(response.data[1]["team_id"], json!("e813709a"));
    assert_eq!(response.data[1]["position"], json!(2));
}

#[test]
fn recent_matches_are_newest_first_and_limited() {
    let temp = tempdir().expect("tempdir");
    let warehouse = temp_warehouse(&temp);
    seed_season(&warehouse);

    let registry = ToolRegistry::with_builtin_tools(warehouse);
    let response = registry
        .dispatch(
            "get_recent_matches",
            &params(json!({"season": "2024", "limit": 2})),
        )
        .expect("dispatch");

    assert_eq!(response.row_count, 2);
    assert_eq!(response.data[0]["date"], json!("2024-03-30"));
    assert_eq!(response.data[1]["date"], json!("2024-03-23"));
}

#[test]
fn missing_required_parameter_is_rejected_by_name() {
    let temp = tempdir().expect("tempdir");
    let registry = ToolRegistry::with_builtin_tools(temp_warehouse(&temp));

    let error = registry
        .dispatch("get_raw_data", &params(json!({"data_type": "schedule"})))
        .expect_err("must fail");

    assert_eq!(
        error,
        ToolError::Validation {
            field: String::from("season"),
            message: String::from("required parameter is missing"),
        }
    );
}

#[test]
fn data_type_outside_the_enum_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let registry = ToolRegistry::with_builtin_tools(temp_warehouse(&temp));

    let error = registry
        .dispatch(
            "get_raw_data",
            &params(json!({"data_type": "sorcery", "season": "2024"})),
        )
        .expect_err("must fail");

    assert!(matches!(
        error,
        ToolError::Validation { ref field, .. } if field == "data_type"
    ));
}

#[test]
fn unknown_tool_is_a_typed_error() {
    let temp = tempdir().expect("tempdir");
    let registry = ToolRegistry::with_builtin_tools(temp_warehouse(&temp));

    let error = registry
        .dispatch("get_raw_dataa", &Map::new())
        .expect_err("must fail");
    assert!(matches!(error, ToolError::NotFound { .. }));
}

#[test]
fn empty_result_is_an_empty_array_not_an_error() {
    let temp = tempdir().expect("tempdir");
    let registry = ToolRegistry::with_builtin_tools(temp_warehouse(&temp));

    let response = registry
        .dispatch(
            "get_raw_data",
            &params(json!({"data_type": "schedule", "season": "1999"})),
        )
        .expect("dispatch");
    assert_eq!(response.row_count, 0);
    assert_eq!(response.data, json!([]));
}
