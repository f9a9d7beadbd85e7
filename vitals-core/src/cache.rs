//! Idempotency filter (C3) and rate limiter (C2), both backed by the same
//! Redis connection. Grounded on `ferrex-core`'s `RedisCache` wrapper; the
//! atomic INCR/EXPIRE sequence mirrors the fixed-window fallback branch of
//! `ferrex-server`'s `RedisRateLimiter::check_and_update`.

use std::fmt;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::error::{PhysioError, Result};

/// TTL applied to an idempotency key once the durable write has committed.
pub const IDEMPOTENCY_TTL_SECS: u64 = 600;
/// Rolling window over which the per-patient rate counter is bounded.
pub const RATE_WINDOW_SECS: i64 = 10;
/// Ceiling on ingests per patient per [`RATE_WINDOW_SECS`].
pub const RATE_LIMIT_CEILING: i64 = 20;

#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl Cache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        info!("connecting to redis cache at {}", redis_url);

        let client = redis::Client::open(redis_url)
            .map_err(|e| PhysioError::StorageUnavailable(format!("invalid redis url: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("redis connect failed: {e}")))?;

        info!("connected to redis cache");
        Ok(Self { conn })
    }

    fn idem_key(fingerprint: &str) -> String {
        format!("idem:{fingerprint}")
    }

    fn rate_key(patient_id: &str) -> String {
        format!("rate:{patient_id}")
    }

    /// C3: checked before the durable write. Returns `true` on a cache hit
    /// (a duplicate within the TTL).
    pub async fn idempotency_hit(&mut self, fingerprint: &str) -> Result<bool> {
        let key = Self::idem_key(fingerprint);
        let hit: bool = self
            .conn
            .exists(&key)
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("redis EXISTS failed: {e}")))?;
        debug!("idempotency check {}: {}", key, if hit { "HIT" } else { "MISS" });
        Ok(hit)
    }

    /// C3: set only after the durable write (and stream publish) succeed —
    /// see the commit order in C6.
    pub async fn set_idempotency(&mut self, fingerprint: &str) -> Result<()> {
        let key = Self::idem_key(fingerprint);
        self.conn
            .set_ex::<_, _, ()>(&key, 1_u8, IDEMPOTENCY_TTL_SECS)
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("redis SETEX failed: {e}")))?;
        Ok(())
    }

    /// C2: atomic INCR with TTL set only on the first increment in the
    /// window. Returns `true` while the counter is within the ceiling.
    pub async fn check_rate_limit(&mut self, patient_id: &str) -> Result<bool> {
        let key = Self::rate_key(patient_id);

        let count: i64 = self
            .conn
            .incr(&key, 1)
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("redis INCR failed: {e}")))?;

        if count == 1 {
            self.conn
                .expire::<_, ()>(&key, RATE_WINDOW_SECS)
                .await
                .map_err(|e| PhysioError::StorageUnavailable(format!("redis EXPIRE failed: {e}")))?;
        }

        Ok(count <= RATE_LIMIT_CEILING)
    }

    pub async fn health_check(&mut self) -> Result<()> {
        let _: String = redis::cmd("PING")
            .query_async(&mut self.conn)
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("redis PING failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(Cache::idem_key("abc"), "idem:abc");
        assert_eq!(Cache::rate_key("pt-1"), "rate:pt-1");
    }
}
