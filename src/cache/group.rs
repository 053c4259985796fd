//! Group operations of the cache.
//!
//! Groups live inside their scene's slot once hydrated.

use std::sync::Arc;

use crate::aggregate::group::GroupDraft;
use crate::aggregate::{Group, Record};
use crate::domain::{paginate, Address, DomainError, Membership, Page, MEMBERS_FIELD};
use crate::store::{Fields, StoreResult};

use super::{require, CacheResult, SceneCache, SceneSlot};

#[derive(Debug, Clone)]
pub enum GroupUpdate {
    /// Empty remark keeps the current one; the name is required
    Base { name: String, remark: String },
    Contact(String),
    Master(String),
    Assistant(String),
    Cover(String),
    Location(String),
    Address(Address),
}

impl GroupUpdate {
    fn apply(self, group: &mut Group) -> StoreResult<Fields> {
        let fields = Fields::new();
        Ok(match self {
            GroupUpdate::Base { name, remark } => {
                group.base.name = name;
                if !remark.is_empty() {
                    group.base.remark = remark;
                }
                fields
                    .set("name", group.base.name.clone())
                    .set("remark", group.base.remark.clone())
            }
            GroupUpdate::Contact(contact) => {
                group.contact = contact;
                fields.set("contact", group.contact.clone())
            }
            GroupUpdate::Master(master) => {
                group.master = master;
                fields.set("master", group.master.clone())
            }
            GroupUpdate::Assistant(assistant) => {
                group.assistant = assistant;
                fields.set("assistant", group.assistant.clone())
            }
            GroupUpdate::Cover(cover) => {
                group.cover = cover;
                fields.set("cover", group.cover.clone())
            }
            GroupUpdate::Location(location) => {
                group.location = location;
                fields.set("location", group.location.clone())
            }
            GroupUpdate::Address(address) => {
                let fields = fields.set_json("address", &address)?;
                group.address = address;
                fields
            }
        })
    }
}

impl SceneCache {
    /// Create a group; its name must be unique within the scene.
    pub async fn create_group(&self, scene: &str, draft: GroupDraft, operator: &str) -> CacheResult<Group> {
        require("name", &draft.name)?;
        let slot = self.slot(scene).await?;
        let mut state = slot.write_groups(self.store()).await?;

        if state.group_name_taken(&draft.name, None) {
            return Err(DomainError::name_repeated(Group::ENTITY, draft.name).into());
        }

        let (uid, seq) = self.next_identity(Group::TABLE).await?;
        let group = Group::create(uid, seq, scene, draft, operator);
        self.store().insert_record(&group).await?;

        state.mirror_group_created(group.clone());
        tracing::info!(scene = %scene, group = %group.uid(), "Group created");
        Ok(group)
    }

    /// Slot of the scene owning group `uid`, hydrating scenes on the way.
    async fn locate_group(&self, uid: &str) -> CacheResult<Arc<SceneSlot>> {
        for slot in self.slots().await {
            if slot.read_groups(self.store()).await?.group(uid).is_some() {
                return Ok(slot);
            }
        }

        // Owning scene may not be in the registry yet.
        if let Some(group) = self.store().fetch_record::<Group>(uid).await? {
            if let Some(slot) = self.try_slot(&group.scene).await? {
                if slot.read_groups(self.store()).await?.group(uid).is_some() {
                    return Ok(slot);
                }
            }
        }
        Err(DomainError::not_found(Group::ENTITY, uid).into())
    }

    pub async fn get_group(&self, uid: &str) -> CacheResult<Group> {
        let slot = self.locate_group(uid).await?;
        let state = slot.read_groups(self.store()).await?;
        state
            .group(uid)
            .cloned()
            .ok_or_else(|| DomainError::not_found(Group::ENTITY, uid).into())
    }

    pub async fn groups_of_scene(&self, scene: &str, page: u32, page_size: u32) -> CacheResult<Page<Group>> {
        let slot = self.slot(scene).await?;
        let groups = slot.read_groups(self.store()).await?.groups().to_vec();
        Ok(paginate(page, page_size, groups))
    }

    pub async fn groups_by_member(&self, user: &str) -> CacheResult<Vec<Group>> {
        self.groups_where(|g| g.has_member(user)).await
    }

    pub async fn groups_by_contact(&self, phone: &str) -> CacheResult<Vec<Group>> {
        self.groups_where(|g| !phone.is_empty() && g.contact == phone).await
    }

    pub async fn update_group(&self, uid: &str, update: GroupUpdate, operator: &str) -> CacheResult<Group> {
        if let GroupUpdate::Base { name, .. } = &update {
            require("name", name)?;
        }
        let slot = self.locate_group(uid).await?;
        let mut state = slot.write_groups(self.store()).await?;

        if let GroupUpdate::Base { name, .. } = &update {
            if state.group_name_taken(name, Some(uid)) {
                return Err(DomainError::name_repeated(Group::ENTITY, name.clone()).into());
            }
        }

        let current = state
            .group_mut(uid)
            .ok_or_else(|| DomainError::not_found(Group::ENTITY, uid))?;
        let mut next = current.clone();
        let fields = update.apply(&mut next)?;
        self.store()
            .update_fields(Group::TABLE, uid, fields.touched(operator))
            .await?;
        next.base.touch(operator);
        *current = next;
        Ok(current.clone())
    }

    pub async fn remove_group(&self, uid: &str, operator: &str) -> CacheResult<()> {
        let slot = self.locate_group(uid).await?;
        let mut state = slot.write_groups(self.store()).await?;
        self.store().tombstone(Group::TABLE, uid, operator).await?;
        state.mirror_group_removed(uid);
        tracing::info!(group = %uid, operator = %operator, "Group removed");
        Ok(())
    }

    pub async fn append_group_member(&self, uid: &str, user: &str) -> CacheResult<Group> {
        let slot = self.locate_group(uid).await?;
        let mut state = slot.write_groups(self.store()).await?;
        let group = state
            .group_mut(uid)
            .ok_or_else(|| DomainError::not_found(Group::ENTITY, uid))?;

        group.check_append(user)?;
        self.store()
            .append_to_array_field(Group::TABLE, uid, MEMBERS_FIELD, user.into())
            .await?;
        group.mirror_append(user);
        Ok(group.clone())
    }

    pub async fn remove_group_member(&self, uid: &str, user: &str) -> CacheResult<Group> {
        let slot = self.locate_group(uid).await?;
        let mut state = slot.write_groups(self.store()).await?;
        let group = state
            .group_mut(uid)
            .ok_or_else(|| DomainError::not_found(Group::ENTITY, uid))?;

        group.check_remove(user)?;
        self.store()
            .remove_from_array_field(Group::TABLE, uid, MEMBERS_FIELD, user.into())
            .await?;
        group.mirror_remove(user);
        Ok(group.clone())
    }

    async fn groups_where(&self, keep: impl Fn(&Group) -> bool) -> CacheResult<Vec<Group>> {
        let mut groups = Vec::new();
        for slot in self.slots().await {
            let state = slot.read_groups(self.store()).await?;
            groups.extend(state.groups().iter().filter(|g| keep(g)).cloned());
        }
        Ok(groups)
    }
}
