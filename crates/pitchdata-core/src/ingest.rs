use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use pitchdata_warehouse::{CheckpointStatus, StatRecord, Warehouse, WarehouseError};

use crate::client::{FbrClient, FetchError};
use crate::normalize::{normalize, NormalizedRecord};
use crate::plan::{WorkPlan, WorkUnit};

/// Where a work unit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Normalize,
    Write,
}

/// One failed work unit with enough context to re-run just the failed subset.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    pub unit: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Operator-facing summary of one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub done: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<UnitFailure>,
}

/// Run-fatal ingestion errors. Everything else is isolated per work unit and
/// lands in the report instead.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Credential problem: the run stops immediately; the partial report
    /// covers the units processed before the abort.
    #[error("ingestion aborted on authentication failure: {message}")]
    Auth {
        message: String,
        report: IngestionReport,
    },

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

struct InFlightWrite {
    unit_key: String,
    handle: JoinHandle<Result<(), WarehouseError>>,
}

/// Drives a full ingestion run: enumerate work units, fetch each through the
/// rate-governed client, normalize, and write batches to the warehouse.
///
/// Upstream calls are strictly serial; the only overlap is a single in-flight
/// warehouse write running while the next fetch sits in its pacer wait.
pub struct IngestionOrchestrator {
    client: FbrClient,
    warehouse: Warehouse,
}

impl IngestionOrchestrator {
    pub fn new(client: FbrClient, warehouse: Warehouse) -> Self {
        Self { client, warehouse }
    }

    pub async fn run(&self, plan: &WorkPlan) -> Result<IngestionReport, IngestError> {
        let checkpoints = self.warehouse.load_checkpoints()?;
        let mut report = IngestionReport::default();
        let mut in_flight: Option<InFlightWrite> = None;

        for unit in plan.enumerate() {
            let already_done = checkpoints
                .get(&unit.key())
                .is_some_and(|checkpoint| checkpoint.status == CheckpointStatus::Done);
            if already_done {
                report.skipped += 1;
                continue;
            }

            match self.client.fetch(&unit).await {
                Err(FetchError::Auth { message }) => {
                    self.settle(&mut in_flight, &mut report).await?;
                    return Err(IngestError::Auth { message, report });
                }
                Err(error) => {
                    self.record_failure(
                        &mut report,
                        unit.key(),
                        FailureKind::Fetch,
                        error.to_string(),
                    )?;
                }
                Ok(payload) => match normalize(&payload) {
                    Err(error) => {
                        self.record_failure(
                            &mut report,
                            unit.key(),
                            FailureKind::Normalize,
                            error.to_string(),
                        )?;
                    }
                    Ok(records) => {
                        self.settle(&mut in_flight, &mut report).await?;
                        in_flight = Some(self.start_write(&unit, records));
                    }
                },
            }
        }

        self.settle(&mut in_flight, &mut report).await?;
        Ok(report)
    }

    fn start_write(&self, unit: &WorkUnit, records: Vec<NormalizedRecord>) -> InFlightWrite {
        let warehouse = self.warehouse.clone();
        let unit_key = unit.key();
        let rows: Vec<StatRecord> = records.iter().map(NormalizedRecord::to_stat_record).collect();
        let key = unit_key.clone();
        let handle = tokio::task::spawn_blocking(move || warehouse.upsert_unit(key.as_str(), &rows));
        InFlightWrite { unit_key, handle }
    }

    async fn settle(
        &self,
        in_flight: &mut Option<InFlightWrite>,
        report: &mut IngestionReport,
    ) -> Result<(), IngestError> {
        let Some(write) = in_flight.take() else {
            return Ok(());
        };

        match write.handle.await {
            Ok(Ok(())) => {
                report.done += 1;
                Ok(())
            }
            Ok(Err(error)) => self.record_failure(
                report,
                write.unit_key,
                FailureKind::Write,
                error.to_string(),
            ),
            Err(join_error) => self.record_failure(
                report,
                write.unit_key,
                FailureKind::Write,
                join_error.to_string(),
            ),
        }
    }

    fn record_failure(
        &self,
        report: &mut IngestionReport,
        unit_key: String,
        kind: FailureKind,
        message: String,
    ) -> Result<(), IngestError> {
        self.warehouse
            .mark_unit_failed(unit_key.as_str(), message.as_str())?;
        report.failed += 1;
        report.failures.push(UnitFailure {
            unit: unit_key,
            kind,
            message,
        });
        Ok(())
    }
}
