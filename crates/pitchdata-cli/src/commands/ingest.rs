use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pitchdata_core::{
    EnvelopeError, FbrClient, HttpAuth, HttpClient, IngestError, IngestionOrchestrator,
    ReqwestHttpClient, RequestPacer, Settings,
};

use crate::cli::IngestArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &IngestArgs, db_path: Option<&Path>) -> Result<CommandResult, CliError> {
    let settings = Settings::from_env()?;
    let plan = super::resolve_plan(&args.scope, &settings)?;
    let warehouse = super::open_warehouse(db_path)?;

    let min_interval = args
        .min_interval_secs
        .map(Duration::from_secs)
        .unwrap_or(settings.min_interval);
    let pacer = RequestPacer::new(min_interval)?;

    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

    let mut warnings = Vec::new();
    let api_key = match args.api_key.clone().or_else(|| settings.api_key.clone()) {
        Some(key) => key,
        None => {
            warnings.push(String::from(
                "no API key configured; generated a one-time key (set FBR_API_KEY to reuse it)",
            ));
            let bootstrap = FbrClient::new(Arc::clone(&http), HttpAuth::None, pacer.clone());
            bootstrap
                .generate_key()
                .await
                .map_err(|error| CliError::Command(format!("key generation failed: {error}")))?
        }
    };

    let client = FbrClient::new(http, HttpAuth::ApiKey(api_key), pacer);
    let orchestrator = IngestionOrchestrator::new(client, warehouse);

    let mut result = match orchestrator.run(&plan).await {
        Ok(report) => CommandResult::ok(serde_json::to_value(&report)?),
        Err(IngestError::Auth { message, report }) => {
            CommandResult::ok(serde_json::to_value(&report)?)
                .with_error(EnvelopeError::new("ingest.auth", message)?)
        }
        Err(IngestError::Warehouse(error)) => {
            return Err(CliError::Command(format!("warehouse failure: {error}")))
        }
    };

    for warning in warnings {
        result = result.with_warning(warning);
    }
    Ok(result)
}
