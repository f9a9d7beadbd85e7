//! Shared axum state. `Store`, `Cache`, and `Stream` are each `Clone` over a
//! pooled/multiplexed connection handle (`sqlx::PgPool`, Redis
//! `ConnectionManager`), so the state itself is cheaply `Clone` rather than
//! wrapped in a `Mutex` — concurrent handlers each hold their own handle
//! clone, matching how `redis::aio::ConnectionManager` is meant to be used.

use vitals_core::cache::Cache;
use vitals_core::store::Store;
use vitals_core::stream::Stream;

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Store,
    pub cache: Cache,
    pub stream: Stream,
}
