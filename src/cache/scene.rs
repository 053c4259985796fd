//! Scene operations of the cache.

use std::sync::Arc;

use crate::aggregate::scene::SceneDraft;
use crate::aggregate::{Record, Scene, SceneStatus};
use crate::domain::{paginate, Address, DomainError, DomainTag, Membership, Page, MEMBERS_FIELD};
use crate::store::{Fields, Filter, StoreResult};

use super::{require, CacheResult, SceneCache, SceneSlot};

/// A single-field (or base) change of a scene
#[derive(Debug, Clone)]
pub enum SceneUpdate {
    /// Empty values keep the current ones
    Base { name: String, remark: String },
    Cover(String),
    Location(String),
    Address(Address),
    Master(String),
    Supporter(String),
    Bucket(String),
    Short(String),
    Kind(u8),
    Status(SceneStatus),
    Parents(Vec<String>),
    Domains(Vec<DomainTag>),
}

impl SceneUpdate {
    /// Apply to `scene` and return the matching store fields.
    fn apply(self, scene: &mut Scene) -> StoreResult<Fields> {
        let fields = Fields::new();
        Ok(match self {
            SceneUpdate::Base { name, remark } => {
                if !name.is_empty() {
                    scene.base.name = name;
                }
                if !remark.is_empty() {
                    scene.base.remark = remark;
                }
                fields
                    .set("name", scene.base.name.clone())
                    .set("remark", scene.base.remark.clone())
            }
            SceneUpdate::Cover(cover) => {
                scene.cover = cover;
                fields.set("cover", scene.cover.clone())
            }
            SceneUpdate::Location(location) => {
                scene.location = location;
                fields.set("location", scene.location.clone())
            }
            SceneUpdate::Address(address) => {
                let fields = fields.set_json("address", &address)?;
                scene.address = address;
                fields
            }
            SceneUpdate::Master(master) => {
                scene.master = master;
                fields.set("master", scene.master.clone())
            }
            SceneUpdate::Supporter(supporter) => {
                scene.supporter = supporter;
                fields.set("supporter", scene.supporter.clone())
            }
            SceneUpdate::Bucket(bucket) => {
                scene.bucket = bucket;
                fields.set("bucket", scene.bucket.clone())
            }
            SceneUpdate::Short(short) => {
                scene.short = short;
                fields.set("short", scene.short.clone())
            }
            SceneUpdate::Kind(kind) => {
                scene.kind = kind;
                fields.set("type", kind)
            }
            SceneUpdate::Status(status) => {
                scene.status = status;
                fields.set("status", u8::from(status))
            }
            SceneUpdate::Parents(parents) => {
                let fields = fields.set_json("parents", &parents)?;
                scene.parents = parents;
                fields
            }
            SceneUpdate::Domains(domains) => {
                let fields = fields.set_json("domains", &domains)?;
                scene.domains = domains;
                fields
            }
        })
    }
}

/// True if any slot other than `except` claims `master`.
async fn master_taken(slots: &[Arc<SceneSlot>], master: &str, except: Option<&str>) -> bool {
    for slot in slots {
        if Some(slot.uid()) == except {
            continue;
        }
        if slot.read().await.scene.master == master {
            return true;
        }
    }
    false
}

impl SceneCache {
    pub async fn get_scene(&self, uid: &str) -> CacheResult<Scene> {
        Ok(self.slot(uid).await?.scene().await)
    }

    /// Registry scan first, then a store query on the master field and the
    /// membership list.
    pub async fn get_by_master_or_member(&self, user: &str) -> CacheResult<Option<Scene>> {
        if user.is_empty() {
            return Ok(None);
        }
        for slot in self.slots().await {
            let state = slot.read().await;
            if state.scene.has_member(user) {
                return Ok(Some(state.scene.clone()));
            }
        }

        let found = match self.store().find_record::<Scene>(&Filter::eq("master", user)).await? {
            Some(scene) => Some(scene),
            None => {
                self.store()
                    .find_record::<Scene>(&Filter::contains(MEMBERS_FIELD, user))
                    .await?
            }
        };
        match found {
            Some(scene) => Ok(Some(self.admit(scene).await.scene().await)),
            None => Ok(None),
        }
    }

    pub async fn create_scene(&self, draft: SceneDraft, operator: &str) -> CacheResult<Scene> {
        require("name", &draft.name)?;

        // The registry lock serializes the master check with the insertion.
        let mut registry = self.registry.write().await;
        if !draft.master.is_empty() && master_taken(&registry, &draft.master, None).await {
            return Err(DomainError::MasterUsed(draft.master).into());
        }

        let (uid, seq) = self.next_identity(Scene::TABLE).await?;
        let scene = Scene::create(uid, seq, draft, operator);
        self.store().insert_record(&scene).await?;

        registry.push(Arc::new(SceneSlot::new(scene.clone())));
        tracing::info!(scene = %scene.uid(), name = %scene.name(), "Scene created");
        Ok(scene)
    }

    /// Tombstone then splice out of the registry. Unknown ids are a no-op.
    pub async fn remove_scene(&self, uid: &str, operator: &str) -> CacheResult<()> {
        self.store().tombstone(Scene::TABLE, uid, operator).await?;

        let mut registry = self.registry.write().await;
        if let Some(index) = registry.iter().position(|s| s.uid() == uid) {
            registry.remove(index);
            tracing::info!(scene = %uid, operator = %operator, "Scene removed");
        }
        Ok(())
    }

    pub async fn list_scenes(&self, page: u32, page_size: u32) -> Page<Scene> {
        let mut scenes = Vec::new();
        for slot in self.slots().await {
            scenes.push(slot.scene().await);
        }
        paginate(page, page_size, scenes)
    }

    pub async fn list_scenes_by_parent(&self, parent: &str, page: u32, page_size: u32) -> Page<Scene> {
        let scenes = self.scenes_where(|s| s.has_parent(parent)).await;
        paginate(page, page_size, scenes)
    }

    pub async fn list_scenes_by_type(&self, kind: u8) -> Vec<Scene> {
        self.scenes_where(|s| s.kind == kind).await
    }

    /// Every scene `user` masters or belongs to.
    pub async fn list_scenes_by_member(&self, user: &str) -> Vec<Scene> {
        self.scenes_where(|s| s.has_member(user)).await
    }

    pub async fn list_scenes_by_master(&self, master: &str) -> Vec<Scene> {
        self.scenes_where(|s| !master.is_empty() && s.master == master).await
    }

    pub async fn is_master_used(&self, user: &str) -> bool {
        let registry = self.registry.read().await;
        master_taken(&registry, user, None).await
    }

    pub async fn update_scene(
        &self,
        uid: &str,
        update: SceneUpdate,
        operator: &str,
    ) -> CacheResult<Scene> {
        if let SceneUpdate::Master(master) = &update {
            return self.update_scene_master(uid, master.clone(), operator).await;
        }
        let slot = self.slot(uid).await?;
        let mut state = slot.write().await;
        self.write_scene(&mut state.scene, update, operator).await
    }

    /// The registry lock is held so a concurrent create cannot claim the
    /// same master.
    async fn update_scene_master(&self, uid: &str, master: String, operator: &str) -> CacheResult<Scene> {
        let slot = self.slot(uid).await?;
        let registry = self.registry.write().await;
        if !master.is_empty() && master_taken(&registry, &master, Some(uid)).await {
            return Err(DomainError::MasterUsed(master).into());
        }
        let mut state = slot.write().await;
        let scene = self
            .write_scene(&mut state.scene, SceneUpdate::Master(master), operator)
            .await?;
        drop(state);
        drop(registry);
        Ok(scene)
    }

    async fn write_scene(
        &self,
        current: &mut Scene,
        update: SceneUpdate,
        operator: &str,
    ) -> CacheResult<Scene> {
        let mut next = current.clone();
        let fields = update.apply(&mut next)?;
        self.store()
            .update_fields(Scene::TABLE, next.uid(), fields.touched(operator))
            .await?;
        next.base.touch(operator);
        *current = next;
        Ok(current.clone())
    }

    pub async fn append_scene_member(&self, uid: &str, user: &str) -> CacheResult<Scene> {
        let slot = self.slot(uid).await?;
        let mut state = slot.write().await;
        state.scene.check_append(user)?;
        self.store()
            .append_to_array_field(Scene::TABLE, uid, MEMBERS_FIELD, user.into())
            .await?;
        state.scene.mirror_append(user);
        Ok(state.scene.clone())
    }

    pub async fn remove_scene_member(&self, uid: &str, user: &str) -> CacheResult<Scene> {
        let slot = self.slot(uid).await?;
        let mut state = slot.write().await;
        state.scene.check_remove(user)?;
        self.store()
            .remove_from_array_field(Scene::TABLE, uid, MEMBERS_FIELD, user.into())
            .await?;
        state.scene.mirror_remove(user);
        Ok(state.scene.clone())
    }

    pub async fn scene_members(&self, uid: &str) -> CacheResult<Vec<String>> {
        Ok(self.get_scene(uid).await?.all_members())
    }

    async fn scenes_where(&self, keep: impl Fn(&Scene) -> bool) -> Vec<Scene> {
        let mut scenes = Vec::new();
        for slot in self.slots().await {
            let state = slot.read().await;
            if keep(&state.scene) {
                scenes.push(state.scene.clone());
            }
        }
        scenes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::cache;
    use crate::cache::CacheError;

    fn draft(name: &str, master: &str) -> SceneDraft {
        SceneDraft {
            name: name.into(),
            master: master.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let (_, cache) = cache();
        let err = cache.create_scene(draft("", ""), "op").await.unwrap_err();
        assert!(matches!(err, CacheError::Domain(DomainError::Validation(_))));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_master_is_unique_across_scenes() {
        let (_, cache) = cache();
        cache.create_scene(draft("A", "boss"), "op").await.unwrap();

        let err = cache.create_scene(draft("B", "boss"), "op").await.unwrap_err();
        assert!(matches!(err, CacheError::Domain(DomainError::MasterUsed(_))));
        assert!(cache.is_master_used("boss").await);
        assert!(!cache.is_master_used("other").await);
    }

    #[tokio::test]
    async fn test_update_master_rejects_other_scenes_master() {
        let (_, cache) = cache();
        cache.create_scene(draft("A", "boss"), "op").await.unwrap();
        let b = cache.create_scene(draft("B", "chief"), "op").await.unwrap();

        let err = cache
            .update_scene(b.uid(), SceneUpdate::Master("boss".into()), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Domain(DomainError::MasterUsed(_))));

        // re-asserting its own master is fine
        let same = cache
            .update_scene(b.uid(), SceneUpdate::Master("chief".into()), "op")
            .await
            .unwrap();
        assert_eq!(same.master, "chief");
    }

    #[tokio::test]
    async fn test_update_base_keeps_empty_fields() {
        let (_, cache) = cache();
        let scene = cache.create_scene(draft("Museum", ""), "op").await.unwrap();

        let updated = cache
            .update_scene(
                scene.uid(),
                SceneUpdate::Base {
                    name: String::new(),
                    remark: "north wing".into(),
                },
                "editor",
            )
            .await
            .unwrap();

        assert_eq!(updated.name(), "Museum");
        assert_eq!(updated.base.remark, "north wing");
        assert_eq!(updated.base.operator, "editor");
    }

    #[tokio::test]
    async fn test_membership_round_trip() {
        let (_, cache) = cache();
        let scene = cache.create_scene(draft("A", "boss"), "op").await.unwrap();

        cache.append_scene_member(scene.uid(), "u1").await.unwrap();
        assert!(cache.append_scene_member(scene.uid(), "u1").await.is_err());
        assert!(cache.append_scene_member(scene.uid(), "boss").await.is_err());

        let found = cache.get_by_master_or_member("u1").await.unwrap().unwrap();
        assert_eq!(found.uid(), scene.uid());

        cache.remove_scene_member(scene.uid(), "u1").await.unwrap();
        assert!(cache.remove_scene_member(scene.uid(), "u1").await.is_err());
        assert!(cache.get_by_master_or_member("u1").await.unwrap().is_none());
        assert_eq!(cache.scene_members(scene.uid()).await.unwrap(), vec!["boss"]);
    }

    #[tokio::test]
    async fn test_member_fallback_reads_through() {
        let (store, cache) = cache();
        let scene = cache.create_scene(draft("A", "boss"), "op").await.unwrap();
        cache.append_scene_member(scene.uid(), "u1").await.unwrap();

        // a fresh cache over the same store finds the scene by member
        let cold = SceneCache::new(store, Default::default());
        let found = cold.get_by_master_or_member("u1").await.unwrap().unwrap();
        assert_eq!(found.uid(), scene.uid());
        assert_eq!(cold.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_is_noop_for_unknown() {
        let (_, cache) = cache();
        let scene = cache.create_scene(draft("A", ""), "op").await.unwrap();

        cache.remove_scene("missing", "op").await.unwrap();
        cache.remove_scene(scene.uid(), "op").await.unwrap();
        assert!(cache.get_scene(scene.uid()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_by_parent_and_type() {
        let (_, cache) = cache();
        let mut d = draft("A", "");
        d.parents = vec!["city".into()];
        d.kind = 2;
        cache.create_scene(d, "op").await.unwrap();
        cache.create_scene(draft("B", ""), "op").await.unwrap();

        let page = cache.list_scenes_by_parent("city", 1, 10).await;
        assert_eq!(page.total, 1);
        assert_eq!(cache.list_scenes_by_type(2).await.len(), 1);
        assert_eq!(cache.list_scenes(1, 1).await.max_page, 2);
    }
}
