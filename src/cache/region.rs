//! Region operations of the cache.
//!
//! Regions are not hydrated into scenes. Name uniqueness and the children
//! check are store queries, run under the region write lock.

use crate::aggregate::region::RegionDraft;
use crate::aggregate::{Record, Region};
use crate::domain::{paginate, Address, DomainError, Membership, Page, MEMBERS_FIELD};
use crate::store::{Fields, Filter, StoreResult};

use super::{require, CacheResult, SceneCache};

#[derive(Debug, Clone)]
pub enum RegionUpdate {
    /// Empty remark keeps the current one; the name is required
    Base { name: String, remark: String },
    Master(String),
    Parent(String),
    Location(String),
    Entity(String),
    Code(String),
    Address(Address),
}

impl RegionUpdate {
    fn apply(self, region: &mut Region) -> StoreResult<Fields> {
        let fields = Fields::new();
        Ok(match self {
            RegionUpdate::Base { name, remark } => {
                region.base.name = name;
                if !remark.is_empty() {
                    region.base.remark = remark;
                }
                fields
                    .set("name", region.base.name.clone())
                    .set("remark", region.base.remark.clone())
            }
            RegionUpdate::Master(master) => {
                region.master = master;
                fields.set("master", region.master.clone())
            }
            RegionUpdate::Parent(parent) => {
                region.parent = parent;
                fields.set("parent", region.parent.clone())
            }
            RegionUpdate::Location(location) => {
                region.location = location;
                fields.set("location", region.location.clone())
            }
            RegionUpdate::Entity(entity) => {
                region.entity = entity;
                fields.set("entity", region.entity.clone())
            }
            RegionUpdate::Code(code) => {
                region.code = code;
                fields.set("code", region.code.clone())
            }
            RegionUpdate::Address(address) => {
                let fields = fields.set_json("address", &address)?;
                region.address = address;
                fields
            }
        })
    }
}

impl SceneCache {
    pub async fn create_region(&self, scene: &str, draft: RegionDraft, operator: &str) -> CacheResult<Region> {
        require("name", &draft.name)?;
        self.slot(scene).await?;
        let _guard = self.locks.region.lock().await;

        if self.region_name_taken(scene, &draft.name, None).await? {
            return Err(DomainError::name_repeated(Region::ENTITY, draft.name).into());
        }
        if !draft.parent.is_empty() {
            self.region_in_scene(&draft.parent, scene).await?;
        }

        let (uid, seq) = self.next_identity(Region::TABLE).await?;
        let region = Region::create(uid, seq, scene, draft, operator);
        self.store().insert_record(&region).await?;
        tracing::info!(scene = %scene, region = %region.uid(), "Region created");
        Ok(region)
    }

    pub async fn get_region(&self, uid: &str) -> CacheResult<Region> {
        self.store()
            .fetch_record::<Region>(uid)
            .await?
            .ok_or_else(|| DomainError::not_found(Region::ENTITY, uid).into())
    }

    pub async fn regions_of_scene(&self, scene: &str, page: u32, page_size: u32) -> CacheResult<Page<Region>> {
        let regions = self.store().find_records(&Filter::eq("scene", scene)).await?;
        Ok(paginate(page, page_size, regions))
    }

    pub async fn regions_by_parent(&self, parent: &str) -> CacheResult<Vec<Region>> {
        Ok(self.store().find_records(&Filter::eq("parent", parent)).await?)
    }

    pub async fn regions_by_member(&self, user: &str) -> CacheResult<Vec<Region>> {
        let mut regions: Vec<Region> = self.store().find_records(&Filter::eq("master", user)).await?;
        let listed: Vec<Region> = self
            .store()
            .find_records(&Filter::contains(MEMBERS_FIELD, user))
            .await?;
        for region in listed {
            if !regions.iter().any(|r| r.uid() == region.uid()) {
                regions.push(region);
            }
        }
        Ok(regions)
    }

    pub async fn update_region(&self, uid: &str, update: RegionUpdate, operator: &str) -> CacheResult<Region> {
        if let RegionUpdate::Base { name, .. } = &update {
            require("name", name)?;
        }
        let _guard = self.locks.region.lock().await;
        let mut region = self.get_region(uid).await?;

        match &update {
            RegionUpdate::Base { name, .. } => {
                if self.region_name_taken(&region.scene, name, Some(uid)).await? {
                    return Err(DomainError::name_repeated(Region::ENTITY, name.clone()).into());
                }
            }
            RegionUpdate::Parent(parent) if parent == uid => {
                return Err(DomainError::invalid_value("parent", parent.clone()).into());
            }
            RegionUpdate::Parent(parent) if !parent.is_empty() => {
                self.region_in_scene(parent, &region.scene).await?;
                if self.region_descends_from(parent, uid).await? {
                    return Err(DomainError::invalid_value("parent", parent.clone()).into());
                }
            }
            _ => {}
        }

        let fields = update.apply(&mut region)?;
        self.store()
            .update_fields(Region::TABLE, uid, fields.touched(operator))
            .await?;
        region.base.touch(operator);
        Ok(region)
    }

    pub async fn append_region_member(&self, uid: &str, user: &str) -> CacheResult<Region> {
        let _guard = self.locks.region.lock().await;
        let mut region = self.get_region(uid).await?;
        region.check_append(user)?;
        self.store()
            .append_to_array_field(Region::TABLE, uid, MEMBERS_FIELD, user.into())
            .await?;
        region.mirror_append(user);
        Ok(region)
    }

    pub async fn remove_region_member(&self, uid: &str, user: &str) -> CacheResult<Region> {
        let _guard = self.locks.region.lock().await;
        let mut region = self.get_region(uid).await?;
        region.check_remove(user)?;
        self.store()
            .remove_from_array_field(Region::TABLE, uid, MEMBERS_FIELD, user.into())
            .await?;
        region.mirror_remove(user);
        Ok(region)
    }

    /// Rejected while any region names this one as its parent.
    pub async fn remove_region(&self, uid: &str, operator: &str) -> CacheResult<()> {
        let _guard = self.locks.region.lock().await;
        let region = self.get_region(uid).await?;

        let children = self
            .store()
            .count(Region::TABLE, &Filter::eq("parent", uid))
            .await?;
        if children > 0 {
            return Err(DomainError::HasChildren(uid.to_string()).into());
        }

        self.store().tombstone(Region::TABLE, region.uid(), operator).await?;
        tracing::info!(region = %uid, operator = %operator, "Region removed");
        Ok(())
    }

    async fn region_name_taken(&self, scene: &str, name: &str, except: Option<&str>) -> CacheResult<bool> {
        let same_name: Vec<Region> = self
            .store()
            .find_records(&Filter::eq("scene", scene).and_eq("name", name))
            .await?;
        Ok(same_name.iter().any(|r| Some(r.uid()) != except))
    }

    /// Whether `ancestor` is on the parent chain of `uid`.
    async fn region_descends_from(&self, uid: &str, ancestor: &str) -> CacheResult<bool> {
        let mut seen = vec![uid.to_string()];
        let mut current = self.get_region(uid).await?.parent;
        while !current.is_empty() {
            if current == ancestor {
                return Ok(true);
            }
            if seen.contains(&current) {
                break;
            }
            seen.push(current.clone());
            current = match self.store().fetch_record::<Region>(&current).await? {
                Some(region) => region.parent,
                None => break,
            };
        }
        Ok(false)
    }

    async fn region_in_scene(&self, uid: &str, scene: &str) -> CacheResult<Region> {
        let region = self.get_region(uid).await?;
        if region.scene != scene {
            return Err(DomainError::not_found(Region::ENTITY, uid).into());
        }
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::scene::SceneDraft;
    use crate::aggregate::Scene;
    use crate::cache::test_support::cache;
    use crate::cache::CacheError;

    async fn scene(cache: &SceneCache, name: &str) -> Scene {
        cache
            .create_scene(
                SceneDraft {
                    name: name.into(),
                    ..Default::default()
                },
                "op",
            )
            .await
            .unwrap()
    }

    fn draft(name: &str, parent: &str) -> RegionDraft {
        RegionDraft {
            name: name.into(),
            parent: parent.into(),
            master: "chief".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_region_with_children_cannot_be_removed() {
        let (_, cache) = cache();
        let s = scene(&cache, "City").await;
        let root = cache.create_region(s.uid(), draft("North", ""), "op").await.unwrap();
        let child = cache
            .create_region(s.uid(), draft("North-1", root.uid()), "op")
            .await
            .unwrap();

        let err = cache.remove_region(root.uid(), "op").await.unwrap_err();
        assert!(matches!(err, CacheError::Domain(DomainError::HasChildren(_))));

        cache.remove_region(child.uid(), "op").await.unwrap();
        assert!(cache.get_region(child.uid()).await.unwrap_err().is_not_found());
        cache.remove_region(root.uid(), "op").await.unwrap();
    }

    #[tokio::test]
    async fn test_region_name_unique_per_scene() {
        let (_, cache) = cache();
        let a = scene(&cache, "A").await;
        let b = scene(&cache, "B").await;

        cache.create_region(a.uid(), draft("North", ""), "op").await.unwrap();
        assert!(cache.create_region(a.uid(), draft("North", ""), "op").await.is_err());
        cache.create_region(b.uid(), draft("North", ""), "op").await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_excludes_self() {
        let (_, cache) = cache();
        let a = scene(&cache, "A").await;
        let north = cache.create_region(a.uid(), draft("North", ""), "op").await.unwrap();
        cache.create_region(a.uid(), draft("South", ""), "op").await.unwrap();

        let keep = RegionUpdate::Base {
            name: "North".into(),
            remark: String::new(),
        };
        cache.update_region(north.uid(), keep, "op").await.unwrap();

        let clash = RegionUpdate::Base {
            name: "South".into(),
            remark: String::new(),
        };
        assert!(cache.update_region(north.uid(), clash, "op").await.is_err());
    }

    #[tokio::test]
    async fn test_region_cannot_parent_itself() {
        let (_, cache) = cache();
        let a = scene(&cache, "A").await;
        let north = cache.create_region(a.uid(), draft("North", ""), "op").await.unwrap();
        let update = RegionUpdate::Parent(north.uid().to_string());
        assert!(cache.update_region(north.uid(), update, "op").await.is_err());
    }

    #[tokio::test]
    async fn test_region_cannot_parent_its_descendant() {
        let (_, cache) = cache();
        let a = scene(&cache, "A").await;
        let root = cache.create_region(a.uid(), draft("North", ""), "op").await.unwrap();
        let child = cache
            .create_region(a.uid(), draft("Hills", root.uid()), "op")
            .await
            .unwrap();
        let grandchild = cache
            .create_region(a.uid(), draft("Valley", child.uid()), "op")
            .await
            .unwrap();

        for below in [child.uid(), grandchild.uid()] {
            let update = RegionUpdate::Parent(below.to_string());
            let err = cache.update_region(root.uid(), update, "op").await.unwrap_err();
            assert!(matches!(err, CacheError::Domain(DomainError::InvalidValue { .. })));
        }
        assert_eq!(cache.get_region(root.uid()).await.unwrap().parent, "");

        // the tree still tears down leaf first
        cache.remove_region(grandchild.uid(), "op").await.unwrap();
        cache.remove_region(child.uid(), "op").await.unwrap();
        cache.remove_region(root.uid(), "op").await.unwrap();
    }

    #[tokio::test]
    async fn test_region_reparent_to_sibling() {
        let (_, cache) = cache();
        let a = scene(&cache, "A").await;
        let north = cache.create_region(a.uid(), draft("North", ""), "op").await.unwrap();
        let south = cache.create_region(a.uid(), draft("South", ""), "op").await.unwrap();

        let update = RegionUpdate::Parent(south.uid().to_string());
        let moved = cache.update_region(north.uid(), update, "op").await.unwrap();
        assert_eq!(moved.parent, south.uid());
    }

    #[tokio::test]
    async fn test_region_members() {
        let (_, cache) = cache();
        let a = scene(&cache, "A").await;
        let north = cache.create_region(a.uid(), draft("North", ""), "op").await.unwrap();

        assert!(cache.append_region_member(north.uid(), "chief").await.is_err());
        cache.append_region_member(north.uid(), "u1").await.unwrap();
        assert!(cache.append_region_member(north.uid(), "u1").await.is_err());
        assert_eq!(cache.regions_by_member("u1").await.unwrap().len(), 1);

        let region = cache.remove_region_member(north.uid(), "u1").await.unwrap();
        assert!(!region.has_member("u1"));
        assert!(cache.remove_region_member(north.uid(), "u1").await.is_err());
    }
}
