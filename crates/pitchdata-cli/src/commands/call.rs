use std::path::Path;

use serde_json::{Map, Value};

use pitchdata_agent::ToolRegistry;
use pitchdata_core::EnvelopeError;

use crate::cli::CallArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &CallArgs, db_path: Option<&Path>) -> Result<CommandResult, CliError> {
    let params = parse_params(&args.params)?;

    let warehouse = super::open_warehouse(db_path)?;
    let registry = ToolRegistry::with_builtin_tools(warehouse);

    match registry.dispatch(args.tool.as_str(), &params) {
        Ok(response) => Ok(CommandResult::ok(serde_json::to_value(&response)?)),
        Err(error) => Ok(CommandResult::ok(Value::Null).with_error(EnvelopeError::new(
            format!("tool.{}", error.kind()),
            error.to_string(),
        )?)),
    }
}

/// Parses repeated parameter flags. `NAME=VALUE` passes the value as a string;
/// `NAME:=VALUE` parses the value as JSON so numbers and booleans keep their
/// declared types (`limit:=5`).
fn parse_params(raw: &[String]) -> Result<Map<String, Value>, CliError> {
    let mut params = Map::new();
    for entry in raw {
        if let Some((name, value)) = entry.split_once(":=") {
            let parsed = serde_json::from_str(value).map_err(|error| {
                CliError::Command(format!("parameter '{name}' is not valid JSON: {error}"))
            })?;
            params.insert(name.to_owned(), parsed);
        } else if let Some((name, value)) = entry.split_once('=') {
            params.insert(name.to_owned(), Value::String(value.to_owned()));
        } else {
            return Err(CliError::Command(format!(
                "parameter '{entry}' must be NAME=VALUE or NAME:=JSON"
            )));
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_passes_strings_and_colon_equals_parses_json() {
        let params = parse_params(&[
            String::from("season=2024"),
            String::from("limit:=5"),
            String::from("team_id=6f666f05"),
        ])
        .expect("params");

        assert_eq!(params["season"], Value::String(String::from("2024")));
        assert_eq!(params["limit"], Value::from(5));
        assert_eq!(params["team_id"], Value::String(String::from("6f666f05")));
    }

    #[test]
    fn invalid_json_value_is_rejected() {
        assert!(parse_params(&[String::from("limit:=five")]).is_err());
    }

    #[test]
    fn rejects_entries_without_equals() {
        assert!(parse_params(&[String::from("season")]).is_err());
    }
}
