//! Per-entry dispatch: `DELIVERED -> PARSED -> WINDOWED -> SCORED ->
//! [CLASSIFIED -> PERSISTED] -> ACKED` (spec §4.11). Ack happens in the
//! caller, after this returns `Ok`, never before — see `worker.rs`.

use tracing::warn;
use vitals_core::classifier;
use vitals_core::error::Result;
use vitals_core::scorer::ModelScorer;
use vitals_core::store::Store;
use vitals_core::stream::StreamEntry;
use vitals_core::threshold;
use vitals_core::windows::WindowStore;

/// Runs one delivered entry through windowing, the threshold detector, the
/// model scorer, and (when flagged) the classifier + anomaly persistence.
/// Any failure surfaces to the caller, which leaves the entry unacked.
pub async fn process_entry(
    windows: &mut WindowStore,
    scorer: &ModelScorer,
    store: &Store,
    entry: &StreamEntry,
) -> Result<()> {
    let reading = &entry.reading;

    // WINDOWED (C7).
    let snapshot = windows.insert(reading.clone());

    // Threshold detector (C8) — independent reference signal, never
    // persisted.
    let crossings = threshold::check(reading);
    threshold::log_crossings(reading, &crossings);

    // SCORED (C9).
    let output = scorer.score(reading.feature_vector());

    // [CLASSIFIED -> PERSISTED] (C10), only when the scorer flagged the
    // reading.
    if output.anomalous {
        let classification = classifier::classify(reading, &snapshot.window_10m, output.score);
        let details = match serde_json::to_value(reading) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to serialize reading snapshot: {e}");
                serde_json::json!({})
            }
        };
        store
            .insert_anomaly(
                &reading.patient_id,
                classification.kind,
                classification.score,
                reading.timestamp,
                &details,
            )
            .await?;
    }

    Ok(())
}
