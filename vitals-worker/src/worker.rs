//! Worker loop (C11) and recovery logic (C12).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};
use vitals_core::error::{PhysioError, Result};
use vitals_core::scorer::ModelScorer;
use vitals_core::store::Store;
use vitals_core::stream::{RawStreamEntry, Stream};
use vitals_core::windows::WindowStore;

use crate::pipeline::process_entry;

#[derive(Debug)]
pub struct Worker {
    pub store: Store,
    pub stream: Stream,
    pub scorer: ModelScorer,
    pub windows: WindowStore,
    pub group: String,
    pub consumer: String,
}

impl Worker {
    /// C12(a): idempotent consumer group creation, then C12(b): claim and
    /// re-process this consumer's own pending entries left from a previous
    /// process lifetime before reading new ones.
    pub async fn recover(&mut self) -> Result<()> {
        self.stream.ensure_group(&self.group).await?;

        let pending = self.stream.claim_pending(&self.group, &self.consumer).await?;
        if !pending.is_empty() {
            info!(
                "recovery: reclaiming {} pending entries for consumer {}",
                pending.len(),
                self.consumer
            );
        }
        for entry in pending {
            self.handle_entry(entry).await;
        }
        Ok(())
    }

    /// Runs until `shutdown` is observed true. The current batch always
    /// finishes (processed and acked) before the loop exits — spec §5.
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("shutdown observed, stopping after current batch");
                return Ok(());
            }

            let batch = match self.stream.read_group(&self.group, &self.consumer).await {
                Ok(entries) => entries,
                Err(PhysioError::StreamReadError(e)) => {
                    warn!("stream read error, backing off 1s: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            for entry in batch {
                self.handle_entry(entry).await;
            }
        }
    }

    /// Drives DELIVERED -> PARSED -> WINDOWED -> SCORED -> [CLASSIFIED ->
    /// PERSISTED] -> ACKED for one raw entry. A failure at any step —
    /// including decode — leaves the entry unacked for redelivery rather
    /// than killing the loop (§4.11, §7): a single poison entry must never
    /// take down the worker, on first read or on PEL recovery.
    async fn handle_entry(&mut self, raw: RawStreamEntry) {
        let entry = match raw.decode() {
            Ok(entry) => entry,
            Err(e) => {
                error!("failed to decode entry {}: {e}, leaving unacked", raw.id());
                return;
            }
        };

        match process_entry(&mut self.windows, &self.scorer, &self.store, &entry).await {
            Ok(()) => {
                if let Err(e) = self.stream.ack(&self.group, &entry.id).await {
                    error!("failed to ack entry {}: {e}", entry.id);
                }
            }
            Err(e) => {
                error!(
                    "processing error for entry {} (patient {}): {e}, leaving unacked",
                    entry.id, entry.reading.patient_id
                );
            }
        }
    }
}
