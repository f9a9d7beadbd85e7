//! Ingest orchestrator (C6): composes C1–C5 in the commit order mandated by
//! spec §4.6. The order is load-bearing for the crash-consistency
//! invariants in §8 — do not reorder without re-reading the rationale
//! there.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;
use vitals_core::domain::{RawReading, Reading};
use vitals_core::error::PhysioError;

use crate::error::AppError;
use crate::state::AppState;

/// POST `/vitals`. See spec §6 for the response shapes.
pub async fn ingest_handler(
    State(mut state): State<AppState>,
    Json(raw): Json<RawReading>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // 1. Validate (C1).
    let reading = Reading::validate(raw).map_err(PhysioError::Validation)?;

    // 2. Rate-limit check (C2).
    let admitted = state.cache.check_rate_limit(&reading.patient_id).await?;
    if !admitted {
        return Err(PhysioError::RateLimited.into());
    }

    // 3. Idempotency cache lookup — early exit on hit (C3).
    let fingerprint = reading.fingerprint();
    if state.cache.idempotency_hit(&fingerprint).await? {
        info!(
            "event=ingest_duplicate patient_id={} source=cache",
            reading.patient_id
        );
        return Ok(duplicate_response());
    }

    // 4. Durable commit (C4). A unique-index violation here means another
    // request raced past an expired/absent cache entry; treat identically
    // to a cache hit rather than as an error.
    let event_id = match state.store.commit(&reading).await {
        Ok(id) => id,
        Err(PhysioError::DuplicatePersisted) => {
            info!(
                "event=ingest_duplicate patient_id={} source=unique_index",
                reading.patient_id
            );
            return Ok(duplicate_response());
        }
        Err(e) => return Err(e.into()),
    };

    // 5. Stream publish (C5). Durable write already committed, so a
    // failure here is safe to retry: replay hits the idempotency filter or
    // the unique index.
    let position = state.stream.publish(&reading, event_id).await?;

    // 6. Set idempotency key only after both prior steps succeeded.
    state.cache.set_idempotency(&fingerprint).await?;

    info!("event=ingest_success patient_id={}", reading.patient_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "queued", "id": position, "db_id": event_id })),
    ))
}

fn duplicate_response() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ignored", "detail": "duplicate_event_cache" })),
    )
}

/// `GET /health`. Checks Postgres and Redis reachability, grounded on
/// `ferrex-server::health_handler`.
pub async fn health_handler(State(mut state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_check = state.store.health_check().await;
    let cache_check = state.cache.health_check().await;

    let healthy = db_check.is_ok() && cache_check.is_ok();

    let body = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "checks": {
            "database": check_entry(&db_check),
            "cache": check_entry(&cache_check),
        }
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(body))
}

fn check_entry(result: &vitals_core::error::Result<()>) -> Value {
    match result {
        Ok(()) => json!({ "status": "healthy" }),
        Err(e) => json!({ "status": "unhealthy", "error": e.to_string() }),
    }
}
