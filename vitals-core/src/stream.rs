//! Stream transport: publisher (C5) and the consumer-group primitives used
//! by the worker loop (C11) and recovery logic (C12). Built on Redis
//! Streams, which the teacher already depends on `redis` for — consumer
//! groups with explicit ack map directly onto `XREADGROUP`/`XACK`, and
//! pending-entry reclaim onto `XPENDING`/`XCLAIM`.

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::info;

use crate::domain::Reading;
use crate::error::{PhysioError, Result};

pub const DEFAULT_STREAM_KEY: &str = "vitals_stream";
pub const DEFAULT_GROUP_NAME: &str = "physio_workers";

/// Batch size and block duration for `XREADGROUP`, per C11.
const BATCH_SIZE: usize = 10;
const BLOCK_MILLIS: usize = 1000;

/// One delivered stream entry, decoded back into a `Reading` plus its
/// assigned event id.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub id: String,
    pub reading: Reading,
    pub event_id: i64,
}

/// A stream entry as handed back by `XREADGROUP`/`XCLAIM`, before it has
/// been parsed into a `Reading`. Kept separate from `StreamEntry` so a
/// single poison entry (missing field, bad timestamp, non-numeric vital)
/// cannot fail a whole batch read — decoding is deferred to the caller,
/// per-entry, at the loop boundary (§4.11, §7).
#[derive(Debug, Clone)]
pub struct RawStreamEntry(StreamId);

impl RawStreamEntry {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// DELIVERED -> PARSED (§4.11). Fails independently per entry; the
    /// caller is responsible for leaving a failed entry unacked so it is
    /// reclaimed rather than lost.
    pub fn decode(&self) -> Result<StreamEntry> {
        decode_entry(&self.0)
    }
}

#[derive(Clone)]
pub struct Stream {
    conn: ConnectionManager,
    key: String,
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("key", &self.key)
            .finish()
    }
}

impl Stream {
    pub async fn connect(redis_url: &str, stream_key: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| PhysioError::StreamUnavailable(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| PhysioError::StreamUnavailable(format!("redis connect failed: {e}")))?;
        Ok(Self {
            conn,
            key: stream_key.into(),
        })
    }

    /// C5 Stream Publisher: appends the reading plus its event id. Field
    /// order is irrelevant, names are significant (§6).
    pub async fn publish(&mut self, reading: &Reading, event_id: i64) -> Result<String> {
        let id: String = self
            .conn
            .xadd(
                &self.key,
                "*",
                &[
                    ("patient_id", reading.patient_id.clone()),
                    ("timestamp", reading.timestamp.to_rfc3339()),
                    ("hr", reading.hr.to_string()),
                    ("bp_sys", reading.bp_sys.to_string()),
                    ("bp_dia", reading.bp_dia.to_string()),
                    ("spo2", reading.spo2.to_string()),
                    ("rr", reading.rr.to_string()),
                    ("temp", reading.temp.to_string()),
                    ("db_id", event_id.to_string()),
                ],
            )
            .await
            .map_err(|e| PhysioError::StreamUnavailable(format!("XADD failed: {e}")))?;
        Ok(id)
    }

    /// C12(a): idempotent consumer group creation. `BUSYGROUP` (group
    /// already exists) is not an error.
    pub async fn ensure_group(&mut self, group: &str) -> Result<()> {
        let result: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.key)
            .arg(group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut self.conn)
            .await;

        match result {
            Ok(()) => {
                info!("created consumer group {} on stream {}", group, self.key);
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(PhysioError::StreamUnavailable(format!(
                "XGROUP CREATE failed: {e}"
            ))),
        }
    }

    /// C11: batch read of new entries via the named consumer group, batch
    /// size 10, blocking up to 1s. Entries are returned undecoded — a
    /// malformed field in one entry must not fail the whole batch.
    pub async fn read_group(&mut self, group: &str, consumer: &str) -> Result<Vec<RawStreamEntry>> {
        let opts = StreamReadOptions::default()
            .group(group, consumer)
            .count(BATCH_SIZE)
            .block(BLOCK_MILLIS);

        let reply: StreamReadReply = self
            .conn
            .xread_options(&[self.key.as_str()], &[">"], &opts)
            .await
            .map_err(|e| PhysioError::StreamReadError(format!("XREADGROUP failed: {e}")))?;

        let mut out = Vec::new();
        for key in reply.keys {
            for id in key.ids {
                out.push(RawStreamEntry(id));
            }
        }
        Ok(out)
    }

    /// C12(b): claims this consumer's own pending entries left over from a
    /// previous process lifetime (or abandoned by a dead consumer with the
    /// same name), so they are re-processed before new reads proceed.
    pub async fn claim_pending(&mut self, group: &str, consumer: &str) -> Result<Vec<RawStreamEntry>> {
        let pending: redis::streams::StreamPendingCountReply = self
            .conn
            .xpending_count(&self.key, group, "-", "+", BATCH_SIZE)
            .await
            .map_err(|e| PhysioError::StreamReadError(format!("XPENDING failed: {e}")))?;

        let ids: Vec<String> = pending
            .ids
            .into_iter()
            .filter(|p| p.consumer == consumer)
            .map(|p| p.id)
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let reply: redis::streams::StreamClaimReply = self
            .conn
            .xclaim(&self.key, group, consumer, 0, &ids)
            .await
            .map_err(|e| PhysioError::StreamReadError(format!("XCLAIM failed: {e}")))?;

        Ok(reply.ids.into_iter().map(RawStreamEntry).collect())
    }

    pub async fn ack(&mut self, group: &str, id: &str) -> Result<()> {
        let _: i64 = self
            .conn
            .xack(&self.key, group, &[id])
            .await
            .map_err(|e| PhysioError::StreamReadError(format!("XACK failed: {e}")))?;
        Ok(())
    }

    pub async fn health_check(&mut self) -> Result<()> {
        let _: String = redis::cmd("PING")
            .query_async(&mut self.conn)
            .await
            .map_err(|e| PhysioError::StreamUnavailable(format!("redis PING failed: {e}")))?;
        Ok(())
    }
}

/// Parses fields back to the reading type (string -> int/float), per C11.
fn decode_entry(stream_id: &StreamId) -> Result<StreamEntry> {
    let id = stream_id.id.clone();

    let field = |name: &'static str| -> Result<String> {
        stream_id
            .get::<String>(name)
            .ok_or_else(|| PhysioError::Processing(format!("stream entry {id} missing field {name}")))
    };

    let patient_id = field("patient_id")?;
    let timestamp_raw = field("timestamp")?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_raw)
        .map_err(|e| PhysioError::Processing(format!("stream entry {id} bad timestamp: {e}")))?
        .with_timezone(&Utc);

    let parse_int = |name: &'static str| -> Result<i32> {
        field(name)?
            .parse::<i32>()
            .map_err(|e| PhysioError::Processing(format!("stream entry {id} bad {name}: {e}")))
    };

    let hr = parse_int("hr")?;
    let bp_sys = parse_int("bp_sys")?;
    let bp_dia = parse_int("bp_dia")?;
    let spo2 = parse_int("spo2")?;
    let rr = parse_int("rr")?;
    let temp = field("temp")?
        .parse::<f64>()
        .map_err(|e| PhysioError::Processing(format!("stream entry {id} bad temp: {e}")))?;
    let event_id = field("db_id")?
        .parse::<i64>()
        .map_err(|e| PhysioError::Processing(format!("stream entry {id} bad db_id: {e}")))?;

    let reading = Reading::from_validated_parts(patient_id, timestamp, hr, bp_sys, bp_dia, spo2, rr, temp);

    Ok(StreamEntry {
        id,
        reading,
        event_id,
    })
}
