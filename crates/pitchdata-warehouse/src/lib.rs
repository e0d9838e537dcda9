pub mod duckdb;
pub mod migrations;

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ::duckdb::types::Value as DuckValue;
use ::duckdb::Connection;
use ::duckdb::ToSql;
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;

pub use duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("query rejected: {0}")]
    QueryRejected(String),

    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    #[error("corrupt record fields for {unit}: {message}")]
    CorruptFields { unit: String, message: String },
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let home = resolve_pitchdata_home();
        let db_path = home.join("warehouse.duckdb");
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    pub max_rows: usize,
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    fn validate(self) -> Result<(), WarehouseError> {
        if self.max_rows == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<SqlColumn>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    pub truncated: bool,
}

/// One flat, category-tagged statistics row as stored in `stat_records`.
///
/// Identifying keys that do not apply to a record (for example `player_id` on a
/// team-level row) are `None` and stored as empty strings, since they take part
/// in the table's primary key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRecord {
    pub category: String,
    pub league_id: String,
    pub season_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    pub fields: Value,
}

/// Durable per-work-unit ingestion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStatus {
    Done,
    Failed,
}

impl CheckpointStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitCheckpoint {
    pub status: CheckpointStatus,
    pub reason: Option<String>,
}

/// Filter for `select_records`; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub category: Option<String>,
    pub league_id: Option<String>,
    pub season_id: Option<String>,
    pub team_id: Option<String>,
    pub player_id: Option<String>,
    pub match_id: Option<String>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    const DEFAULT_LIMIT: usize = 1_000;

    fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).max(1)
    }
}

#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Writes one work unit's records and marks its checkpoint `done` in a
    /// single transaction, so the checkpoint is never durable before the data.
    pub fn upsert_unit(&self, unit_key: &str, rows: &[StatRecord]) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                let fields = serde_json::to_string(&row.fields).map_err(|error| {
                    WarehouseError::CorruptFields {
                        unit: unit_key.to_owned(),
                        message: error.to_string(),
                    }
                })?;
                let sql = format!(
                    r#"
INSERT OR REPLACE INTO stat_records (
    category, league_id, season_id, team_id, player_id, match_id, fields, updated_at
) VALUES (
    '{category}', '{league_id}', '{season_id}', '{team_id}', '{player_id}', '{match_id}',
    '{fields}', CURRENT_TIMESTAMP
);
"#,
                    category = escape_sql_string(row.category.as_str()),
                    league_id = escape_sql_string(row.league_id.as_str()),
                    season_id = escape_sql_string(row.season_id.as_str()),
                    team_id = escape_sql_string(row.team_id.as_deref().unwrap_or("")),
                    player_id = escape_sql_string(row.player_id.as_deref().unwrap_or("")),
                    match_id = escape_sql_string(row.match_id.as_deref().unwrap_or("")),
                    fields = escape_sql_string(fields.as_str()),
                );
                connection.execute_batch(sql.as_str())?;
            }

            let finish = format!(
                r#"
INSERT OR REPLACE INTO ingest_checkpoints (unit_key, status, reason, updated_at)
VALUES ('{unit_key}', 'done', NULL, CURRENT_TIMESTAMP);
INSERT INTO ingest_log (unit_key, status, detail, record_count)
VALUES ('{unit_key}', 'ok', NULL, {record_count});
"#,
                unit_key = escape_sql_string(unit_key),
                record_count = rows.len(),
            );
            connection.execute_batch(finish.as_str())?;
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    pub fn mark_unit_failed(&self, unit_key: &str, reason: &str) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        let sql = format!(
            r#"
INSERT OR REPLACE INTO ingest_checkpoints (unit_key, status, reason, updated_at)
VALUES ('{unit_key}', 'failed', '{reason}', CURRENT_TIMESTAMP);
INSERT INTO ingest_log (unit_key, status, detail, record_count)
VALUES ('{unit_key}', 'failed', '{reason}', NULL);
"#,
            unit_key = escape_sql_string(unit_key),
            reason = escape_sql_string(reason),
        );
        connection.execute_batch(sql.as_str())?;
        Ok(())
    }

    pub fn load_checkpoints(&self) -> Result<HashMap<String, UnitCheckpoint>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let mut statement =
            connection.prepare("SELECT unit_key, status, reason FROM ingest_checkpoints")?;
        let mut rows = statement.query([] as [&dyn ToSql; 0])?;

        let mut checkpoints = HashMap::new();
        while let Some(row) = rows.next()? {
            let unit_key: String = row.get(0)?;
            let status: String = row.get(1)?;
            let reason: Option<String> = row.get(2)?;
            let Some(status) = CheckpointStatus::parse(status.as_str()) else {
                continue;
            };
            checkpoints.insert(unit_key, UnitCheckpoint { status, reason });
        }

        Ok(checkpoints)
    }

    pub fn select_records(&self, filter: &RecordFilter) -> Result<Vec<StatRecord>, WarehouseError> {
        let mut clauses = Vec::new();
        push_clause(&mut clauses, "category", filter.category.as_deref());
        push_clause(&mut clauses, "league_id", filter.league_id.as_deref());
        push_clause(&mut clauses, "season_id", filter.season_id.as_deref());
        push_clause(&mut clauses, "team_id", filter.team_id.as_deref());
        push_clause(&mut clauses, "player_id", filter.player_id.as_deref());
        push_clause(&mut clauses, "match_id", filter.match_id.as_deref());

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT category, league_id, season_id, team_id, player_id, match_id, fields \
             FROM stat_records {where_clause} \
             ORDER BY category, league_id, season_id, team_id, player_id, match_id \
             LIMIT {limit}",
            where_clause = where_clause,
            limit = filter.effective_limit(),
        );

        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(sql.as_str())?;
        let mut rows = statement.query([] as [&dyn ToSql; 0])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let category: String = row.get(0)?;
            let league_id: String = row.get(1)?;
            let season_id: String = row.get(2)?;
            let team_id: String = row.get(3)?;
            let player_id: String = row.get(4)?;
            let match_id: String = row.get(5)?;
            let fields_text: String = row.get(6)?;

            let fields = serde_json::from_str(fields_text.as_str()).map_err(|error| {
                WarehouseError::CorruptFields {
                    unit: format!("{category}/{league_id}/{season_id}"),
                    message: error.to_string(),
                }
            })?;

            records.push(StatRecord {
                category,
                league_id,
                season_id,
                team_id: non_empty(team_id),
                player_id: non_empty(player_id),
                match_id: non_empty(match_id),
                fields,
            });
        }

        Ok(records)
    }

    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
        allow_write: bool,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;

        if !allow_write {
            enforce_read_only_query(sql)?;
        }

        let mode = if allow_write {
            AccessMode::ReadWrite
        } else {
            AccessMode::ReadOnly
        };
        let connection = self.manager.acquire(mode)?;
        execute_with_guardrails(&connection, sql, guardrails, allow_write)
    }
}

fn push_clause(clauses: &mut Vec<String>, column: &str, value: Option<&str>) {
    if let Some(value) = value {
        clauses.push(format!("{column} = '{}'", escape_sql_string(value)));
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn execute_with_guardrails(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    allow_write: bool,
) -> Result<QueryResult, WarehouseError> {
    let started = Instant::now();
    if is_select_like(sql) {
        execute_select_query(connection, sql, guardrails, started)
    } else if allow_write {
        connection.execute_batch(sql)?;
        ensure_timeout(started, guardrails.timeout())?;
        Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
        })
    } else {
        Err(WarehouseError::QueryRejected(String::from(
            "only SELECT/CTE queries are allowed unless --write is provided",
        )))
    }
}

fn execute_select_query(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    started: Instant,
) -> Result<QueryResult, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let _ = statement.query([] as [&dyn ToSql; 0])?;

    let column_count = statement.column_count();
    let mut columns = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let name = statement.column_name(index).unwrap().to_string();
        let dtype = statement.column_type(index);
        columns.push(SqlColumn {
            name,
            r#type: dtype.to_string(),
        });
    }

    let mut rows_cursor = statement.query([] as [&dyn ToSql; 0])?;
    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows_cursor.next()? {
        ensure_timeout(started, guardrails.timeout())?;

        if rows.len() >= guardrails.max_rows {
            truncated = true;
            break;
        }

        rows.push(read_row(row, column_count)?);
    }

    ensure_timeout(started, guardrails.timeout())?;

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        truncated,
    })
}

fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(value as f64),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        other => Value::String(format!("{other:?}")),
    }
}

fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized.trim_end_matches(';').trim())
}

fn enforce_read_only_query(sql: &str) -> Result<(), WarehouseError> {
    if !is_select_like(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "read-only mode accepts only SELECT/CTE queries; use --write for write statements",
        )));
    }
    if has_multiple_statements(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "multiple SQL statements are not allowed in read-only mode",
        )));
    }
    Ok(())
}

fn is_select_like(sql: &str) -> bool {
    let first_keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first_keyword.as_str(),
        "SELECT" | "WITH" | "EXPLAIN" | "SHOW" | "DESCRIBE"
    )
}

fn has_multiple_statements(sql: &str) -> bool {
    sql.split(';')
        .filter(|part| !part.trim().is_empty())
        .count()
        > 1
}

fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), WarehouseError> {
    if started.elapsed() > timeout {
        return Err(WarehouseError::QueryTimeout {
            timeout_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
        });
    }
    Ok(())
}

fn resolve_pitchdata_home() -> PathBuf {
    if let Some(path) = env::var_os("PITCHDATA_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".pitchdata");
    }

    PathBuf::from(".pitchdata")
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
