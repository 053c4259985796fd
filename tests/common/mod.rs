//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use scene_directory::cache::{CacheConfig, SceneCache};
use scene_directory::handlers::Handlers;
use scene_directory::store::MemoryStore;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};

/// Serializes the database tests of one test binary
static DB_LOCK: Mutex<()> = Mutex::const_new(());

/// A cache over a fresh in-memory store
pub fn memory_cache() -> (Arc<MemoryStore>, Arc<SceneCache>) {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(SceneCache::new(store.clone(), CacheConfig::default()));
    (store, cache)
}

/// Handlers over a fresh in-memory store, with a page size of 10
pub fn memory_handlers() -> Handlers {
    let (_, cache) = memory_cache();
    Handlers::new(cache, 10)
}

/// Connect to the test database, or `None` when `DATABASE_URL` is unset.
///
/// Every document table is truncated so each test starts empty. The
/// returned guard keeps other database tests out until it is dropped.
pub async fn setup_test_db() -> Option<(MutexGuard<'static, ()>, PgPool)> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let guard = DB_LOCK.lock().await;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::query(
        "TRUNCATE TABLE scenes, scene_groups, scene_rooms, scene_regions, devices, \
         scene_areas, device_maintains, sequences",
    )
    .execute(&pool)
    .await
    .expect("Failed to clean up DB");

    Some((guard, pool))
}
