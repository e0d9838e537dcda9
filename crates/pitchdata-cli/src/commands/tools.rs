use std::path::Path;

use pitchdata_agent::ToolRegistry;

use crate::error::CliError;

use super::CommandResult;

pub fn run(db_path: Option<&Path>) -> Result<CommandResult, CliError> {
    let warehouse = super::open_warehouse(db_path)?;
    let registry = ToolRegistry::with_builtin_tools(warehouse);

    Ok(CommandResult::ok(serde_json::to_value(registry.list())?))
}
