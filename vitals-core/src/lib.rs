//! Domain model and component implementations for the physiological vitals
//! ingestion and anomaly-detection pipeline.
//!
//! This crate is shared by the `vitals-ingest` front-end and the
//! `vitals-worker` stream consumer: validation, the durable store gateway,
//! the idempotency/rate-limit cache, the stream transport, and the
//! worker-side windowing and classification logic all live here so both
//! binaries depend on one implementation of each commit-order invariant.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod error;
pub mod scorer;
pub mod store;
pub mod stream;
pub mod threshold;
pub mod windows;

pub use domain::{AnomalyKind, Reading, ValidationError};
pub use error::{PhysioError, Result};
