//! Device operations of the cache.
//!
//! Devices are read through a bounded, time-limited lookup cache shared by
//! every area. Any device write through the cache invalidates its entry.
//! The status is derived from the scene and the activation token and is
//! written in the same store update as the field change that affects it.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::aggregate::device::{Binding, DeviceDraft};
use crate::aggregate::{Device, DeviceStatus, Record};
use crate::domain::{AutoSchedule, DomainError};
use crate::store::{Fields, Filter, StoreResult};

use super::{require, CacheResult, SceneCache};

#[derive(Debug, Clone)]
struct CachedDevice {
    device: Device,
    fetched_at: Instant,
}

/// Bounded device lookup cache with a time-to-live per entry
#[derive(Debug)]
pub struct DeviceLookup {
    entries: Mutex<LruCache<String, CachedDevice>>,
    ttl: Duration,
    /// Bumped by every invalidation, under the entries lock
    generation: AtomicU64,
}

impl DeviceLookup {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            generation: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, CachedDevice>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh entry for `uid`; an expired entry is dropped.
    pub fn get(&self, uid: &str) -> Option<Device> {
        let mut entries = self.entries();
        let found = entries
            .get(uid)
            .map(|cached| (cached.fetched_at.elapsed() < self.ttl, cached.device.clone()));
        match found {
            Some((true, device)) => Some(device),
            Some((false, _)) => {
                entries.pop(uid);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, device: Device) {
        let uid = device.uid().to_string();
        self.entries().put(
            uid,
            CachedDevice {
                device,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, uid: &str) {
        let mut entries = self.entries();
        entries.pop(uid);
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    /// Current invalidation generation. Take it before reading the store.
    pub fn generation(&self) -> u64 {
        let _entries = self.entries();
        self.generation.load(Ordering::Relaxed)
    }

    /// Cache a store read unless an invalidation happened since
    /// `generation` was taken. Returns whether the entry was stored.
    pub fn put_if_current(&self, device: Device, generation: u64) -> bool {
        let mut entries = self.entries();
        if self.generation.load(Ordering::Relaxed) != generation {
            return false;
        }
        entries.put(
            device.uid().to_string(),
            CachedDevice {
                device,
                fetched_at: Instant::now(),
            },
        );
        true
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, cached)| cached.fetched_at.elapsed() >= self.ttl)
            .map(|(uid, _)| uid.clone())
            .collect();
        for uid in &expired {
            entries.pop(uid);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub enum DeviceUpdate {
    /// Empty values keep the current ones
    Base { name: String, remark: String },
    Certificate(String),
    Scene(String),
    Aspect(String),
    Kind(u8),
    /// Manual status, e.g. discarding a terminal
    Status(DeviceStatus),
    Auto(AutoSchedule),
    Meta(String),
    Bind(Binding),
}

impl DeviceUpdate {
    /// Apply to `device`, recompute its status and return the store fields.
    fn apply(self, device: &mut Device) -> StoreResult<Fields> {
        let fields = Fields::new();
        let fields = match self {
            DeviceUpdate::Base { name, remark } => {
                if !name.is_empty() {
                    device.base.name = name;
                }
                if !remark.is_empty() {
                    device.base.remark = remark;
                }
                fields
                    .set("name", device.base.name.clone())
                    .set("remark", device.base.remark.clone())
            }
            DeviceUpdate::Certificate(certificate) => {
                device.certificate = certificate;
                fields.set("certificate", device.certificate.clone())
            }
            DeviceUpdate::Scene(scene) => {
                device.scene = scene;
                fields.set("scene", device.scene.clone())
            }
            DeviceUpdate::Aspect(aspect) => {
                device.aspect = aspect;
                fields.set("aspect", device.aspect.clone())
            }
            DeviceUpdate::Kind(kind) => {
                device.kind = kind;
                fields.set("type", kind)
            }
            DeviceUpdate::Status(status) => {
                device.status = status;
                fields
            }
            DeviceUpdate::Auto(auto) => {
                let fields = fields.set_json("auto", &auto)?;
                device.auto = auto;
                fields
            }
            DeviceUpdate::Meta(meta) => {
                device.meta = meta;
                fields.set("meta", device.meta.clone())
            }
            DeviceUpdate::Bind(binding) => {
                device.apply_binding(&binding);
                fields
                    .set("quote", device.quote.clone())
                    .set("os", device.os.clone())
                    .set("activated", device.activated)
                    .set("expiry", device.expiry)
            }
        };
        device.recompute_status();
        Ok(fields.set("status", device.status.code()))
    }
}

impl SceneCache {
    /// Register a terminal; its serial must be unused among live devices.
    pub async fn create_device(&self, draft: DeviceDraft, operator: &str) -> CacheResult<Device> {
        require("sn", &draft.sn)?;
        let _guard = self.locks.device.lock().await;

        if self
            .store()
            .find_one_by(Device::TABLE, &Filter::eq("sn", draft.sn.as_str()))
            .await?
            .is_some()
        {
            return Err(DomainError::SerialRepeated(draft.sn).into());
        }

        let (uid, seq) = self.next_identity(Device::TABLE).await?;
        let device = Device::create(uid, seq, draft, operator);
        self.store().insert_record(&device).await?;
        tracing::info!(device = %device.uid(), sn = %device.sn, "Device created");
        Ok(device)
    }

    /// Lookup through the shared cache; `None` for unknown or removed ids.
    pub async fn find_device(&self, uid: &str) -> CacheResult<Option<Device>> {
        if let Some(device) = self.devices.get(uid) {
            return Ok(Some(device));
        }
        let generation = self.devices.generation();
        let Some(device) = self.store().fetch_record::<Device>(uid).await? else {
            return Ok(None);
        };
        let device = self.heal_status(device).await?;
        self.devices.put_if_current(device.clone(), generation);
        Ok(Some(device))
    }

    pub async fn get_device(&self, uid: &str) -> CacheResult<Device> {
        self.find_device(uid)
            .await?
            .ok_or_else(|| DomainError::not_found(Device::ENTITY, uid).into())
    }

    pub async fn device_by_serial(&self, serial: &str) -> CacheResult<Device> {
        require("sn", serial)?;
        let device = self
            .store()
            .find_record::<Device>(&Filter::eq("sn", serial))
            .await?
            .ok_or_else(|| DomainError::not_found(Device::ENTITY, serial))?;
        self.heal_status(device).await
    }

    pub async fn devices_of_scene(&self, scene: &str) -> CacheResult<Vec<Device>> {
        self.devices_matching(&Filter::eq("scene", scene)).await
    }

    /// Devices with `status`; `None` means every status except discarded.
    pub async fn devices_by_status(&self, status: Option<DeviceStatus>) -> CacheResult<Vec<Device>> {
        match status {
            Some(status) => {
                self.devices_matching(&Filter::eq("status", status.code()))
                    .await
            }
            None => Ok(self
                .devices_matching(&Filter::all())
                .await?
                .into_iter()
                .filter(|d| !d.is_discarded())
                .collect()),
        }
    }

    /// Devices for each id in order; unknown ids are skipped.
    pub async fn devices_by_ids(&self, ids: &[String]) -> CacheResult<Vec<Device>> {
        let mut devices = Vec::with_capacity(ids.len());
        for uid in ids {
            if let Some(device) = self.find_device(uid).await? {
                devices.push(device);
            }
        }
        Ok(devices)
    }

    pub async fn count_devices(&self) -> CacheResult<u64> {
        Ok(self.store().count(Device::TABLE, &Filter::all()).await?)
    }

    pub async fn update_device(&self, uid: &str, update: DeviceUpdate, operator: &str) -> CacheResult<Device> {
        let _guard = self.locks.device.lock().await;
        let mut device = self
            .store()
            .fetch_record::<Device>(uid)
            .await?
            .ok_or_else(|| DomainError::not_found(Device::ENTITY, uid))?;

        let fields = update.apply(&mut device)?;
        let result = self
            .store()
            .update_fields(Device::TABLE, uid, fields.touched(operator))
            .await;
        self.devices.invalidate(uid);
        result?;

        device.base.touch(operator);
        Ok(device)
    }

    /// Activate a terminal with its quote token.
    pub async fn bind_device(&self, uid: &str, binding: Binding, operator: &str) -> CacheResult<Device> {
        self.update_device(uid, DeviceUpdate::Bind(binding), operator).await
    }

    pub async fn remove_device(&self, uid: &str, operator: &str) -> CacheResult<()> {
        let _guard = self.locks.device.lock().await;
        self.store().tombstone(Device::TABLE, uid, operator).await?;
        self.devices.invalidate(uid);
        tracing::info!(device = %uid, operator = %operator, "Device removed");
        Ok(())
    }

    /// Recompute the status of every live device and persist corrections.
    /// Returns how many devices were corrected.
    pub async fn reconcile_devices(&self) -> CacheResult<usize> {
        let devices: Vec<Device> = self.store().find_records(&Filter::all()).await?;
        let mut healed = 0;
        for device in devices {
            if device.expected_status() != device.status {
                self.heal_status(device).await?;
                healed += 1;
            }
        }
        Ok(healed)
    }

    /// Evict expired lookup entries.
    pub fn sweep_device_lookup(&self) -> usize {
        self.devices.sweep()
    }

    async fn devices_matching(&self, filter: &Filter) -> CacheResult<Vec<Device>> {
        let devices: Vec<Device> = self.store().find_records(filter).await?;
        let mut healed = Vec::with_capacity(devices.len());
        for device in devices {
            healed.push(self.heal_status(device).await?);
        }
        Ok(healed)
    }

    /// Persist the derived status when the stored one disagrees.
    ///
    /// The record is read again under the device lock so a concurrent
    /// update is never overwritten with a stale status.
    async fn heal_status(&self, device: Device) -> CacheResult<Device> {
        if device.expected_status() == device.status {
            return Ok(device);
        }
        let _guard = self.locks.device.lock().await;
        let Some(mut current) = self.store().fetch_record::<Device>(device.uid()).await? else {
            return Ok(device);
        };
        let stored = current.status;
        if !current.recompute_status() {
            return Ok(current);
        }
        tracing::warn!(
            device = %current.uid(),
            stored = ?stored,
            derived = ?current.status,
            "Device status disagreed with its fields, correcting"
        );
        self.store()
            .update_fields(
                Device::TABLE,
                current.uid(),
                Fields::new().set("status", current.status.code()),
            )
            .await?;
        self.devices.invalidate(current.uid());
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::cache;
    use crate::cache::CacheError;
    use crate::store::DocumentStore;

    fn draft(sn: &str) -> DeviceDraft {
        DeviceDraft {
            sn: sn.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_serial_is_unique() {
        let (_, cache) = cache();
        cache.create_device(draft("DEV-001"), "op").await.unwrap();
        let err = cache.create_device(draft("DEV-001"), "op").await.unwrap_err();
        assert!(matches!(err, CacheError::Domain(DomainError::SerialRepeated(_))));
    }

    #[tokio::test]
    async fn test_serial_reusable_after_removal() {
        let (_, cache) = cache();
        let d = cache.create_device(draft("DEV-001"), "op").await.unwrap();
        cache.remove_device(d.uid(), "op").await.unwrap();
        cache.create_device(draft("DEV-001"), "op").await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_and_assign_scene() {
        let (_, cache) = cache();
        let d = cache.create_device(draft("DEV-001"), "op").await.unwrap();
        assert_eq!(d.status, DeviceStatus::Idle);

        let binding = Binding {
            quote: "token".into(),
            ..Default::default()
        };
        let d = cache.bind_device(d.uid(), binding, "op").await.unwrap();
        assert_eq!(d.status, DeviceStatus::Awake);

        let d = cache
            .update_device(d.uid(), DeviceUpdate::Scene("scene".into()), "op")
            .await
            .unwrap();
        assert_eq!(d.status, DeviceStatus::Using);
        assert_eq!(cache.get_device(d.uid()).await.unwrap().status, DeviceStatus::Using);
    }

    #[tokio::test]
    async fn test_discarded_stays_discarded() {
        let (_, cache) = cache();
        let d = cache.create_device(draft("DEV-001"), "op").await.unwrap();
        cache
            .update_device(d.uid(), DeviceUpdate::Status(DeviceStatus::Discarded), "op")
            .await
            .unwrap();

        let d = cache
            .update_device(d.uid(), DeviceUpdate::Scene("scene".into()), "op")
            .await
            .unwrap();
        assert_eq!(d.status, DeviceStatus::Discarded);
        assert!(cache.devices_by_status(None).await.unwrap().is_empty());
        assert_eq!(
            cache
                .devices_by_status(Some(DeviceStatus::Discarded))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_read_heals_stale_status() {
        let (store, cache) = cache();
        let d = cache.create_device(draft("DEV-001"), "op").await.unwrap();

        // a field written without its status, as after a crash
        store
            .update_fields(Device::TABLE, d.uid(), Fields::new().set("quote", "token"))
            .await
            .unwrap();

        let healed = cache.get_device(d.uid()).await.unwrap();
        assert_eq!(healed.status, DeviceStatus::Awake);

        let dyn_store: &dyn DocumentStore = store.as_ref();
        let stored: Device = dyn_store.fetch_record(d.uid()).await.unwrap().unwrap();
        assert_eq!(stored.status, DeviceStatus::Awake);
    }

    #[tokio::test]
    async fn test_reconcile_counts_corrections() {
        let (store, cache) = cache();
        let a = cache.create_device(draft("A"), "op").await.unwrap();
        cache.create_device(draft("B"), "op").await.unwrap();
        store
            .update_fields(Device::TABLE, a.uid(), Fields::new().set("scene", "s"))
            .await
            .unwrap();

        assert_eq!(cache.reconcile_devices().await.unwrap(), 1);
        assert_eq!(cache.reconcile_devices().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_writes_invalidate_lookup() {
        let (_, cache) = cache();
        let d = cache.create_device(draft("DEV-001"), "op").await.unwrap();
        cache.get_device(d.uid()).await.unwrap();
        assert_eq!(cache.device_lookup().len(), 1);

        cache
            .update_device(d.uid(), DeviceUpdate::Aspect("16:9".into()), "op")
            .await
            .unwrap();
        assert!(cache.device_lookup().is_empty());
        assert_eq!(cache.get_device(d.uid()).await.unwrap().aspect, "16:9");
    }

    #[test]
    fn test_lookup_is_bounded() {
        let lookup = DeviceLookup::new(2, Duration::from_secs(60));
        for sn in ["a", "b", "c"] {
            lookup.put(Device::create(
                crate::aggregate::new_object_id(),
                1,
                draft(sn),
                "op",
            ));
        }
        assert_eq!(lookup.len(), 2);
    }

    #[test]
    fn test_lookup_expires() {
        let lookup = DeviceLookup::new(8, Duration::ZERO);
        let device = Device::create(crate::aggregate::new_object_id(), 1, draft("a"), "op");
        let uid = device.uid().to_string();
        lookup.put(device);

        assert!(lookup.get(&uid).is_none());
        assert!(lookup.is_empty());
    }

    #[test]
    fn test_read_racing_an_invalidation_is_not_cached() {
        let lookup = DeviceLookup::new(8, Duration::from_secs(60));
        let device = Device::create(crate::aggregate::new_object_id(), 1, draft("a"), "op");
        let uid = device.uid().to_string();

        let generation = lookup.generation();
        // a write lands between the store read and the put
        lookup.invalidate(&uid);
        assert!(!lookup.put_if_current(device.clone(), generation));
        assert!(lookup.get(&uid).is_none());

        assert!(lookup.put_if_current(device, lookup.generation()));
        assert!(lookup.get(&uid).is_some());
    }

    #[test]
    fn test_sweep_drops_expired() {
        let lookup = DeviceLookup::new(8, Duration::ZERO);
        lookup.put(Device::create(crate::aggregate::new_object_id(), 1, draft("a"), "op"));
        assert_eq!(lookup.sweep(), 1);
    }
}
