use std::path::Path;

use serde::Serialize;

use pitchdata_warehouse::CheckpointStatus;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ReportData {
    done: usize,
    failed: usize,
    failures: Vec<FailureRow>,
}

#[derive(Debug, Serialize)]
struct FailureRow {
    unit: String,
    reason: Option<String>,
}

pub fn run(db_path: Option<&Path>) -> Result<CommandResult, CliError> {
    let warehouse = super::open_warehouse(db_path)?;
    let checkpoints = warehouse
        .load_checkpoints()
        .map_err(|error| CliError::Command(format!("failed to load checkpoints: {error}")))?;

    let mut data = ReportData {
        done: 0,
        failed: 0,
        failures: Vec::new(),
    };

    for (unit, checkpoint) in checkpoints {
        match checkpoint.status {
            CheckpointStatus::Done => data.done += 1,
            CheckpointStatus::Failed => {
                data.failed += 1;
                data.failures.push(FailureRow {
                    unit,
                    reason: checkpoint.reason,
                });
            }
        }
    }
    data.failures.sort_by(|a, b| a.unit.cmp(&b.unit));

    Ok(CommandResult::ok(serde_json::to_value(&data)?))
}
