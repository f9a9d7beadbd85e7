use thiserror::Error;

use crate::domain::ValidationError;

/// Error taxonomy shared across the ingest front-end and the worker.
///
/// Each variant maps to exactly one entry in the ingest failure table and
/// the worker's error-handling policy; keep `vitals-ingest`'s
/// `IntoResponse` impl and `vitals-worker`'s loop in sync with any changes
/// here.
#[derive(Debug, Error)]
pub enum PhysioError {
    /// Bad input. Surfaced to the caller, never retried.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Transient; caller may back off. Fixed-window ceiling exceeded.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Success-equivalent: the (patient, timestamp) pair was already
    /// committed, either via the idempotency cache or the store's unique
    /// index.
    #[error("reading already persisted")]
    DuplicatePersisted,

    /// Transient; retry is safe because the idempotency filter and the
    /// unique index on `(patient_id, timestamp)` make replay harmless.
    #[error("durable store unavailable: {0}")]
    StorageUnavailable(String),

    /// Transient; retry is safe because the durable write always precedes
    /// the stream publish.
    #[error("stream unavailable: {0}")]
    StreamUnavailable(String),

    /// Fatal at worker startup only — the worker refuses to start without a
    /// loadable scorer.
    #[error("anomaly model could not be loaded: {0}")]
    ModelUnloadable(String),

    /// Transient; the worker loop backs off and retries.
    #[error("stream read error: {0}")]
    StreamReadError(String),

    /// Any failure while dispatching a delivered entry through the worker
    /// pipeline. Caught at the loop boundary; the entry is left unacked.
    #[error("processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, PhysioError>;
