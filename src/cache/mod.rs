//! Scene Aggregate Cache
//!
//! Process-wide registry of scenes sitting between the handlers and the
//! document store. Reads are read-through, writes are write-through: the
//! store is written first and the in-memory copy mirrors it afterwards.
//!
//! Locking:
//! * the registry lock guards membership of the registry itself;
//! * each [`SceneSlot`] lock guards its scene, group and room state;
//! * records that are not held in memory (areas, devices, regions) take the
//!   write lock of their kind for read-modify-write sequences.
//!
//! A slot lock is never held while acquiring the registry lock.

pub mod area;
pub mod device;
pub mod group;
pub mod maintain;
pub mod region;
pub mod room;
pub mod scene;
pub mod slot;

pub use area::AreaUpdate;
pub use device::{DeviceLookup, DeviceUpdate};
pub use group::GroupUpdate;
pub use region::RegionUpdate;
pub use scene::SceneUpdate;
pub use slot::{Hydration, SceneSlot, SceneState};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::aggregate::{new_object_id, Record, Scene};
use crate::domain::DomainError;
use crate::store::{DocumentStore, Filter, StoreError};

/// Errors returned by cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::Domain(e) if e.is_not_found())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of devices in the lookup cache
    pub device_capacity: usize,
    /// Lifetime of a device lookup entry
    pub device_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            device_capacity: 1024,
            device_ttl: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn with_device_capacity(mut self, capacity: usize) -> Self {
        self.device_capacity = capacity;
        self
    }

    pub fn with_device_ttl(mut self, ttl: Duration) -> Self {
        self.device_ttl = ttl;
        self
    }
}

/// Write locks for records held only in the store.
#[derive(Debug, Default)]
struct WriteLocks {
    area: Mutex<()>,
    device: Mutex<()>,
    region: Mutex<()>,
}

/// The Scene Aggregate Cache
pub struct SceneCache {
    store: Arc<dyn DocumentStore>,
    registry: RwLock<Vec<Arc<SceneSlot>>>,
    devices: DeviceLookup,
    locks: WriteLocks,
}

impl SceneCache {
    pub fn new(store: Arc<dyn DocumentStore>, config: CacheConfig) -> Self {
        Self {
            store,
            registry: RwLock::new(Vec::new()),
            devices: DeviceLookup::new(config.device_capacity, config.device_ttl),
            locks: WriteLocks::default(),
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn device_lookup(&self) -> &DeviceLookup {
        &self.devices
    }

    /// Fill the registry with every live scene, in store order.
    ///
    /// A store failure leaves the registry empty; it is logged, not fatal.
    pub async fn load(&self) -> usize {
        let scenes: Vec<Scene> = match self.store().find_records(&Filter::all()).await {
            Ok(scenes) => scenes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load scenes, starting with an empty registry");
                Vec::new()
            }
        };

        let mut registry = self.registry.write().await;
        *registry = scenes.into_iter().map(|s| Arc::new(SceneSlot::new(s))).collect();
        tracing::info!(scenes = registry.len(), "Scene registry loaded");
        registry.len()
    }

    /// Number of scenes in the registry.
    pub async fn len(&self) -> usize {
        self.registry.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.registry.read().await.is_empty()
    }

    /// Snapshot of the registry for scans that must not hold the registry lock.
    pub(crate) async fn slots(&self) -> Vec<Arc<SceneSlot>> {
        self.registry.read().await.clone()
    }

    /// Registry lookup with read-through on miss.
    pub(crate) async fn try_slot(&self, uid: &str) -> CacheResult<Option<Arc<SceneSlot>>> {
        if uid.is_empty() {
            return Ok(None);
        }
        if let Some(slot) = self.registry.read().await.iter().find(|s| s.uid() == uid) {
            return Ok(Some(slot.clone()));
        }

        let Some(scene) = self.store().fetch_record::<Scene>(uid).await? else {
            return Ok(None);
        };
        Ok(Some(self.admit(scene).await))
    }

    pub(crate) async fn slot(&self, uid: &str) -> CacheResult<Arc<SceneSlot>> {
        self.try_slot(uid)
            .await?
            .ok_or_else(|| DomainError::not_found(Scene::ENTITY, uid).into())
    }

    /// Insert a scene read from the store unless another task beat us to it.
    async fn admit(&self, scene: Scene) -> Arc<SceneSlot> {
        let mut registry = self.registry.write().await;
        if let Some(slot) = registry.iter().find(|s| s.uid() == scene.uid()) {
            return slot.clone();
        }
        let slot = Arc::new(SceneSlot::new(scene));
        registry.push(slot.clone());
        slot
    }

    /// Allocate an object id and the next sequence number of `table`.
    pub(crate) async fn next_identity(&self, table: &'static str) -> CacheResult<(String, u64)> {
        let seq = self.store().next_sequence(table).await?;
        Ok((new_object_id(), seq))
    }
}

/// Reject an empty required field before any store access.
pub(crate) fn require(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} is empty")));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::cache;
    use super::*;
    use crate::aggregate::scene::SceneDraft;

    #[tokio::test]
    async fn test_load_fails_soft() {
        let (store, cache) = cache();
        store.set_unavailable(true);
        assert_eq!(cache.load().await, 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_keeps_store_order() {
        let (store, cache) = cache();
        for name in ["A", "B", "C"] {
            let scene = Scene::create(
                new_object_id(),
                1,
                SceneDraft {
                    name: name.into(),
                    ..Default::default()
                },
                "op",
            );
            let dyn_store: &dyn DocumentStore = store.as_ref();
            dyn_store.insert_record(&scene).await.unwrap();
        }

        assert_eq!(cache.load().await, 3);
        let names: Vec<String> = cache
            .list_scenes(0, 10)
            .await
            .items
            .into_iter()
            .map(|s| s.base.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_read_through_admits_once() {
        let (store, cache) = cache();
        let scene = Scene::create(new_object_id(), 1, SceneDraft::default(), "op");
        let dyn_store: &dyn DocumentStore = store.as_ref();
        dyn_store.insert_record(&scene).await.unwrap();

        cache.slot(scene.uid()).await.unwrap();
        cache.slot(scene.uid()).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_scene_is_not_found() {
        let (_, cache) = cache();
        let err = cache.slot("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_require() {
        assert!(require("name", "  ").is_err());
        assert!(require("name", "Hall").is_ok());
    }
}
