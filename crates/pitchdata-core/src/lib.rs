//! Core contracts for pitchdata.
//!
//! This crate contains:
//! - Canonical domain identifiers, stat categories, and validation
//! - Request pacing and retry policy for the upstream FBR API
//! - The rate-governed upstream client and payload normalizer
//! - Work planning and the ingestion orchestrator
//! - Response envelope and runtime settings

pub mod client;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http;
pub mod ingest;
pub mod normalize;
pub mod pacing;
pub mod plan;
pub mod retry;
pub mod settings;

pub use client::{FbrClient, FetchError, RawPayload, FBR_BASE_URL};
pub use domain::{LeagueId, MatchId, PlayerId, SeasonId, StatCategory, TeamId, UtcDateTime};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{CoreError, ValidationError};
pub use http::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};
pub use ingest::{FailureKind, IngestError, IngestionOrchestrator, IngestionReport, UnitFailure};
pub use normalize::{
    normalize, FieldValue, NormalizationError, NormalizedRecord, RecordKeys,
};
pub use pacing::RequestPacer;
pub use pitchdata_warehouse::{
    CheckpointStatus, QueryGuardrails, QueryResult, RecordFilter, SqlColumn, StatRecord,
    UnitCheckpoint, Warehouse, WarehouseConfig, WarehouseError,
};
pub use plan::{Endpoint, LeagueSpec, WorkPlan, WorkUnit};
pub use retry::{Backoff, RetryConfig};
pub use settings::Settings;
