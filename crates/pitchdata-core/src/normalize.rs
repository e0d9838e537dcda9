use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use pitchdata_warehouse::StatRecord;

use crate::client::RawPayload;
use crate::domain::{LeagueId, MatchId, PlayerId, SeasonId, StatCategory, TeamId};
use crate::plan::{Endpoint, WorkUnit};

/// Scalar value of one normalized metric.
///
/// Deliberately flat: nested upstream structures are flattened before
/// coercion, and list-valued fields are always an ordered sequence of
/// strings, even when upstream sends a lone string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(value) => Value::Number(Number::from(*value)),
            Self::Float(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Bool(value) => Value::Bool(*value),
            Self::Text(value) => Value::String(value.clone()),
            Self::TextList(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Identifying key fields attached to every normalized record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordKeys {
    pub league_id: LeagueId,
    pub season_id: SeasonId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
}

/// One flat, category-tagged record produced from an upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub category: StatCategory,
    pub keys: RecordKeys,
    pub fields: BTreeMap<String, FieldValue>,
}

impl NormalizedRecord {
    /// Warehouse row projection of this record.
    pub fn to_stat_record(&self) -> StatRecord {
        let fields = Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        );
        StatRecord {
            category: self.category.as_str().to_owned(),
            league_id: self.keys.league_id.to_string(),
            season_id: self.keys.season_id.as_str().to_owned(),
            team_id: self.keys.team_id.as_ref().map(|id| id.as_str().to_owned()),
            player_id: self.keys.player_id.as_ref().map(|id| id.as_str().to_owned()),
            match_id: self.keys.match_id.as_ref().map(|id| id.as_str().to_owned()),
            fields,
        }
    }
}

/// Payload shape violated normalization assumptions; the orchestrator treats
/// this as a per-unit failure, never fatal to the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("payload for {unit} has no usable entries")]
    EmptyPayload { unit: String },

    #[error("entry {index} in {unit} is not an object")]
    MalformedEntry { unit: String, index: usize },

    #[error("entry {index} in {unit} is missing identifying fields")]
    MissingMetaData { unit: String, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Numeric,
    TextList,
}

/// Fields the target schema declares numeric even when upstream renders them
/// as formatted strings ("31,238", "+48").
const NUMERIC_FIELDS: &[&str] = &[
    "attendance",
    "age",
    "jersey_number",
    "minutes",
    "games_played",
    "goals",
    "assists",
    "gf",
    "ga",
    "goal_diff",
    "pts",
    "wins",
    "draws",
    "losses",
    "shots",
    "shots_on_target",
    "xg",
    "xga",
];

/// Fields that may arrive as a lone string or a list of strings (ties).
const TEXT_LIST_FIELDS: &[&str] = &["top_scorer_player"];

fn declared_kind(field: &str) -> Option<FieldKind> {
    if NUMERIC_FIELDS.contains(&field) || field.ends_with("_pct") {
        return Some(FieldKind::Numeric);
    }
    if TEXT_LIST_FIELDS.contains(&field) {
        return Some(FieldKind::TextList);
    }
    None
}

/// Flattens one upstream payload into one record per statistical category.
///
/// Entries carrying a `stats` block produce one record per category present,
/// each merged with the entry's `meta_data` identifying fields. Flat entries
/// (the `matches` endpoint) produce a single schedule record.
pub fn normalize(payload: &RawPayload) -> Result<Vec<NormalizedRecord>, NormalizationError> {
    let unit = &payload.unit;
    let entries = extract_entries(&payload.body);
    if entries.is_empty() {
        return Err(NormalizationError::EmptyPayload { unit: unit.key() });
    }

    let mut records = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let object = entry
            .as_object()
            .ok_or_else(|| NormalizationError::MalformedEntry {
                unit: unit.key(),
                index,
            })?;

        match object.get("stats").and_then(Value::as_object) {
            Some(stats) => {
                let meta = object
                    .get("meta_data")
                    .and_then(Value::as_object)
                    .filter(|meta| has_identifying_field(meta))
                    .ok_or_else(|| NormalizationError::MissingMetaData {
                        unit: unit.key(),
                        index,
                    })?;

                let mut base = BTreeMap::new();
                flatten_into(&mut base, None, meta);
                let keys = keys_for(unit, meta);

                for (category_key, category_value) in stats {
                    let category = StatCategory::from_key(category_key);
                    let mut fields = base.clone();
                    match category_value {
                        Value::Object(metrics) => flatten_into(&mut fields, None, metrics),
                        other => {
                            if let Some(value) = coerce_value(category_key, other) {
                                fields.insert(category_key.clone(), value);
                            }
                        }
                    }
                    records.push(NormalizedRecord {
                        category,
                        keys: keys.clone(),
                        fields,
                    });
                }
            }
            None => {
                if !has_identifying_field(object) {
                    return Err(NormalizationError::MissingMetaData {
                        unit: unit.key(),
                        index,
                    });
                }
                let mut fields = BTreeMap::new();
                flatten_into(&mut fields, None, object);
                records.push(NormalizedRecord {
                    category: flat_entry_category(unit.endpoint),
                    keys: keys_for(unit, object),
                    fields,
                });
            }
        }
    }

    Ok(records)
}

fn extract_entries(body: &Value) -> Vec<&Value> {
    match body {
        Value::Array(entries) => entries.iter().collect(),
        Value::Object(object) => match object.get("data") {
            Some(Value::Array(entries)) => entries.iter().collect(),
            Some(single @ Value::Object(_)) => vec![single],
            None if !object.is_empty() => vec![body],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn has_identifying_field(object: &Map<String, Value>) -> bool {
    ["player_id", "match_id", "team_id"]
        .iter()
        .any(|key| matches!(object.get(*key), Some(Value::String(_))))
}

fn keys_for(unit: &WorkUnit, object: &Map<String, Value>) -> RecordKeys {
    let entry_team = object
        .get("team_id")
        .and_then(Value::as_str)
        .and_then(|id| TeamId::parse(id).ok());
    RecordKeys {
        league_id: unit.league_id,
        season_id: unit.season_id.clone(),
        team_id: entry_team.or_else(|| unit.team_id.clone()),
        player_id: object
            .get("player_id")
            .and_then(Value::as_str)
            .and_then(|id| PlayerId::parse(id).ok()),
        match_id: object
            .get("match_id")
            .and_then(Value::as_str)
            .and_then(|id| MatchId::parse(id).ok()),
    }
}

const fn flat_entry_category(endpoint: Endpoint) -> StatCategory {
    match endpoint {
        Endpoint::Matches => StatCategory::Schedule,
        _ => StatCategory::Stats,
    }
}

fn flatten_into(
    fields: &mut BTreeMap<String, FieldValue>,
    prefix: Option<&str>,
    object: &Map<String, Value>,
) {
    for (name, value) in object {
        let key = match prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(fields, Some(key.as_str()), nested),
            other => {
                if let Some(coerced) = coerce_value(key.as_str(), other) {
                    fields.insert(key, coerced);
                }
            }
        }
    }
}

fn coerce_value(field: &str, value: &Value) -> Option<FieldValue> {
    match value {
        // Explicit null is a missing value, never zero or an empty string.
        Value::Null => None,
        Value::Bool(value) => Some(FieldValue::Bool(*value)),
        Value::Number(number) => Some(
            number
                .as_i64()
                .map(FieldValue::Integer)
                .or_else(|| number.as_f64().map(FieldValue::Float))?,
        ),
        Value::String(text) => match declared_kind(field) {
            Some(FieldKind::Numeric) => {
                Some(parse_declared_numeric(text).unwrap_or_else(|| FieldValue::Text(text.clone())))
            }
            Some(FieldKind::TextList) => Some(FieldValue::TextList(vec![text.clone()])),
            None => Some(FieldValue::Text(text.clone())),
        },
        Value::Array(items) => Some(FieldValue::TextList(
            items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )),
        Value::Object(_) => None,
    }
}

/// Parses a declared-numeric string: thousands separators and percent signs
/// are stripped, an explicit leading sign is honored ("31,238" -> 31238,
/// "+48" -> 48, "52%" -> 52).
fn parse_declared_numeric(text: &str) -> Option<FieldValue> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    let unsigned = cleaned.strip_prefix('+').unwrap_or(cleaned.as_str());
    let unsigned = unsigned.strip_suffix('%').unwrap_or(unsigned);

    if let Ok(value) = unsigned.parse::<i64>() {
        return Some(FieldValue::Integer(value));
    }
    unsigned.parse::<f64>().ok().map(FieldValue::Float)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{LeagueId, SeasonId, UtcDateTime};

    fn payload_for(endpoint: Endpoint, team: Option<&str>, body: Value) -> RawPayload {
        let league = LeagueId::new(182);
        let season = SeasonId::parse("2024").expect("season");
        let unit = match team {
            Some(team) => WorkUnit::team_level(
                endpoint,
                league,
                season,
                TeamId::parse(team).expect("team"),
            ),
            None => WorkUnit::league_level(endpoint, league, season),
        };
        RawPayload {
            unit,
            body,
            fetched_at: UtcDateTime::parse("2024-06-01T00:00:00Z").expect("timestamp"),
        }
    }

    fn player_entry() -> Value {
        json!({
            "meta_data": {
                "player_id": "9c6fc2ae",
                "player_name": "Sophia Wilson",
                "age": "24"
            },
            "stats": {
                "shooting": {"goals": 11, "shots": 58, "shots_on_target_pct": "53.4"},
                "passing": {"passes_completed": 412, "pass_completion_pct": 78.1},
                "misc": {"cards_yellow": 2, "fouls": null}
            }
        })
    }

    #[test]
    fn emits_one_record_per_category_with_meta_fields() {
        let payload = payload_for(
            Endpoint::PlayerSeasonStats,
            Some("e813709a"),
            json!({"data": [player_entry()]}),
        );

        let records = normalize(&payload).expect("records");
        assert_eq!(records.len(), 3);

        for record in &records {
            assert_eq!(
                record.fields.get("player_name"),
                Some(&FieldValue::Text(String::from("Sophia Wilson")))
            );
            assert_eq!(record.fields.get("age"), Some(&FieldValue::Integer(24)));
            assert_eq!(
                record.keys.player_id.as_ref().map(|id| id.as_str()),
                Some("9c6fc2ae")
            );
            assert_eq!(
                record.keys.team_id.as_ref().map(|id| id.as_str()),
                Some("e813709a")
            );
        }

        let categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
        assert!(categories.contains(&"shooting"));
        assert!(categories.contains(&"passing"));
        assert!(categories.contains(&"misc"));
    }

    #[test]
    fn thousands_separators_parse_for_declared_numeric_fields() {
        let payload = payload_for(
            Endpoint::Matches,
            None,
            json!({"data": [{"match_id": "a1b2c3d4", "attendance": "31,238", "round": "12"}]}),
        );

        let records = normalize(&payload).expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, StatCategory::Schedule);
        assert_eq!(
            records[0].fields.get("attendance"),
            Some(&FieldValue::Integer(31_238))
        );
        // Undeclared numeric-looking strings are preserved as provided.
        assert_eq!(
            records[0].fields.get("round"),
            Some(&FieldValue::Text(String::from("12")))
        );
    }

    #[test]
    fn signed_differentials_parse_to_signed_numbers() {
        let payload = payload_for(
            Endpoint::TeamSeasonStats,
            None,
            json!({"data": [{
                "meta_data": {"team_id": "6f666f05", "team_name": "Portland Thorns"},
                "stats": {"stats": {"goal_diff": "+48", "pts": "-3", "possession_pct": "52%"}}
            }]}),
        );

        let records = normalize(&payload).expect("records");
        assert_eq!(
            records[0].fields.get("goal_diff"),
            Some(&FieldValue::Integer(48))
        );
        assert_eq!(records[0].fields.get("pts"), Some(&FieldValue::Integer(-3)));
        assert_eq!(
            records[0].fields.get("possession_pct"),
            Some(&FieldValue::Integer(52))
        );
    }

    #[test]
    fn percentage_fields_stay_numeric() {
        let payload = payload_for(
            Endpoint::PlayerSeasonStats,
            Some("e813709a"),
            json!({"data": [player_entry()]}),
        );

        let records = normalize(&payload).expect("records");
        let shooting = records
            .iter()
            .find(|r| r.category == StatCategory::Shooting)
            .expect("shooting record");
        assert_eq!(
            shooting.fields.get("shots_on_target_pct"),
            Some(&FieldValue::Float(53.4))
        );
    }

    #[test]
    fn null_fields_stay_missing() {
        let payload = payload_for(
            Endpoint::PlayerSeasonStats,
            Some("e813709a"),
            json!({"data": [player_entry()]}),
        );

        let records = normalize(&payload).expect("records");
        let misc = records
            .iter()
            .find(|r| r.category == StatCategory::Misc)
            .expect("misc record");
        assert!(!misc.fields.contains_key("fouls"));
    }

    #[test]
    fn lone_top_scorer_promotes_to_single_element_list() {
        let payload = payload_for(
            Endpoint::TeamSeasonStats,
            None,
            json!({"data": [{
                "meta_data": {"team_id": "6f666f05"},
                "stats": {"stats": {"top_scorer": {"player": "Erling Haaland", "goals_scored": 27}}}
            }]}),
        );

        let records = normalize(&payload).expect("records");
        assert_eq!(
            records[0].fields.get("top_scorer_player"),
            Some(&FieldValue::TextList(vec![String::from("Erling Haaland")]))
        );
        assert_eq!(
            records[0].fields.get("top_scorer_goals_scored"),
            Some(&FieldValue::Integer(27))
        );
    }

    #[test]
    fn tied_top_scorers_keep_their_order() {
        let payload = payload_for(
            Endpoint::TeamSeasonStats,
            None,
            json!({"data": [{
                "meta_data": {"team_id": "6f666f05"},
                "stats": {"stats": {"top_scorer": {"player": ["Ada Hegerberg", "Sam Kerr"]}}}
            }]}),
        );

        let records = normalize(&payload).expect("records");
        assert_eq!(
            records[0].fields.get("top_scorer_player"),
            Some(&FieldValue::TextList(vec![
                String::from("Ada Hegerberg"),
                String::from("Sam Kerr"),
            ]))
        );
    }

    #[test]
    fn unknown_categories_pass_through() {
        let payload = payload_for(
            Endpoint::PlayerSeasonStats,
            Some("e813709a"),
            json!({"data": [{
                "meta_data": {"player_id": "9c6fc2ae"},
                "stats": {"playing_time": {"minutes_90s": 18.2}}
            }]}),
        );

        let records = normalize(&payload).expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].category,
            StatCategory::Other(String::from("playing_time"))
        );
        assert_eq!(
            records[0].fields.get("minutes_90s"),
            Some(&FieldValue::Float(18.2))
        );
    }

    #[test]
    fn missing_meta_data_is_an_error() {
        let payload = payload_for(
            Endpoint::PlayerSeasonStats,
            Some("e813709a"),
            json!({"data": [{"stats": {"shooting": {"goals": 3}}}]}),
        );

        let error = normalize(&payload).expect_err("must fail");
        assert!(matches!(
            error,
            NormalizationError::MissingMetaData { index: 0, .. }
        ));
    }

    #[test]
    fn empty_payload_is_an_error() {
        let payload = payload_for(Endpoint::Matches, None, json!({"data": []}));
        assert!(matches!(
            normalize(&payload).expect_err("must fail"),
            NormalizationError::EmptyPayload { .. }
        ));
    }

    #[test]
    fn stat_record_projection_keeps_keys_and_fields() {
        let payload = payload_for(
            Endpoint::Matches,
            None,
            json!({"data": [{"match_id": "a1b2c3d4", "attendance": "31,238"}]}),
        );

        let records = normalize(&payload).expect("records");
        let row = records[0].to_stat_record();
        assert_eq!(row.category, "schedule");
        assert_eq!(row.league_id, "182");
        assert_eq!(row.season_id, "2024");
        assert_eq!(row.match_id.as_deref(), Some("a1b2c3d4"));
        assert_eq!(row.fields["attendance"], json!(31238));
    }
}
