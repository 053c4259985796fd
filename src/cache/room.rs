//! Room operations of the cache.
//!
//! Rooms live inside their scene's slot once hydrated. Quote tokens are
//! exclusive within a scene: assigning them to one room releases them from
//! every other room in the same store transaction.

use std::collections::HashSet;
use std::sync::Arc;

use crate::aggregate::room::{normalize_quotes, QUOTES_FIELD};
use crate::aggregate::{Area, Record, Room};
use crate::domain::{paginate, DomainError, Page};
use crate::store::{FieldWrite, Fields, Filter};

use super::{require, CacheResult, SceneCache, SceneSlot};

impl SceneCache {
    /// Create a room; its name must be unique within the scene.
    pub async fn create_room(
        &self,
        scene: &str,
        name: &str,
        remark: &str,
        operator: &str,
    ) -> CacheResult<Room> {
        require("name", name)?;
        let slot = self.slot(scene).await?;
        let mut state = slot.write_rooms(self.store()).await?;

        if state.room_name_taken(name, None) {
            return Err(DomainError::name_repeated(Room::ENTITY, name).into());
        }

        let (uid, seq) = self.next_identity(Room::TABLE).await?;
        let room = Room::create(uid, seq, scene, name, remark, operator);
        self.store().insert_record(&room).await?;

        state.mirror_room_created(room.clone());
        tracing::info!(scene = %scene, room = %room.uid(), "Room created");
        Ok(room)
    }

    /// Slot of the scene owning room `uid`, hydrating scenes on the way.
    async fn locate_room(&self, uid: &str) -> CacheResult<Arc<SceneSlot>> {
        for slot in self.slots().await {
            if slot.read_rooms(self.store()).await?.room(uid).is_some() {
                return Ok(slot);
            }
        }

        if let Some(room) = self.store().fetch_record::<Room>(uid).await? {
            if let Some(slot) = self.try_slot(&room.scene).await? {
                if slot.read_rooms(self.store()).await?.room(uid).is_some() {
                    return Ok(slot);
                }
            }
        }
        Err(DomainError::not_found(Room::ENTITY, uid).into())
    }

    pub async fn get_room(&self, uid: &str) -> CacheResult<Room> {
        let slot = self.locate_room(uid).await?;
        let state = slot.read_rooms(self.store()).await?;
        state
            .room(uid)
            .cloned()
            .ok_or_else(|| DomainError::not_found(Room::ENTITY, uid).into())
    }

    pub async fn rooms_of_scene(&self, scene: &str, page: u32, page_size: u32) -> CacheResult<Page<Room>> {
        let slot = self.slot(scene).await?;
        let rooms = slot.read_rooms(self.store()).await?.rooms().to_vec();
        Ok(paginate(page, page_size, rooms))
    }

    pub async fn rooms_by_quote(&self, quote: &str) -> CacheResult<Vec<Room>> {
        let mut rooms = Vec::new();
        for slot in self.slots().await {
            let state = slot.read_rooms(self.store()).await?;
            rooms.extend(state.rooms().iter().filter(|r| r.has_quote(quote)).cloned());
        }
        Ok(rooms)
    }

    /// Rooms with at least one area bound to `device`.
    pub async fn rooms_by_device(&self, device: &str) -> CacheResult<Vec<Room>> {
        if device.is_empty() {
            return Ok(Vec::new());
        }
        let areas: Vec<Area> = self.store().find_records(&Filter::eq("device", device)).await?;
        let mut seen = HashSet::new();
        let mut rooms = Vec::new();
        for area in areas {
            if !seen.insert(area.parent.clone()) {
                continue;
            }
            match self.get_room(&area.parent).await {
                Ok(room) => rooms.push(room),
                // dangling parent
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(rooms)
    }

    /// Areas placed in room `uid`.
    pub async fn room_areas(&self, uid: &str) -> CacheResult<Vec<Area>> {
        Ok(self.store().find_records(&Filter::eq("parent", uid)).await?)
    }

    pub async fn room_had_device(&self, uid: &str, device: &str) -> CacheResult<bool> {
        Ok(self
            .room_areas(uid)
            .await?
            .iter()
            .any(|a| a.is_bound_to(device)))
    }

    /// True when any area anywhere is bound to `device`.
    pub async fn device_in_any_room(&self, device: &str) -> CacheResult<bool> {
        if device.is_empty() {
            return Ok(false);
        }
        Ok(self.store().count(Area::TABLE, &Filter::eq("device", device)).await? > 0)
    }

    pub async fn update_room_base(
        &self,
        uid: &str,
        name: &str,
        remark: &str,
        operator: &str,
    ) -> CacheResult<Room> {
        require("name", name)?;
        let slot = self.locate_room(uid).await?;
        let mut state = slot.write_rooms(self.store()).await?;

        if state.room_name_taken(name, Some(uid)) {
            return Err(DomainError::name_repeated(Room::ENTITY, name).into());
        }

        let room = state
            .room_mut(uid)
            .ok_or_else(|| DomainError::not_found(Room::ENTITY, uid))?;
        let remark = if remark.is_empty() { room.base.remark.clone() } else { remark.to_string() };
        let fields = Fields::new()
            .set("name", name)
            .set("remark", remark.clone())
            .touched(operator);
        self.store().update_fields(Room::TABLE, uid, fields).await?;

        room.base.name = name.to_string();
        room.base.remark = remark;
        room.base.touch(operator);
        Ok(room.clone())
    }

    /// Give `tokens` to room `uid`, releasing them from every sibling room.
    ///
    /// Releases and the assignment commit in one store batch under the
    /// scene lock.
    pub async fn assign_quotes(
        &self,
        uid: &str,
        tokens: Vec<String>,
        operator: &str,
    ) -> CacheResult<Room> {
        let tokens = normalize_quotes(tokens);
        let slot = self.locate_room(uid).await?;
        let mut state = slot.write_rooms(self.store()).await?;

        if state.room(uid).is_none() {
            return Err(DomainError::not_found(Room::ENTITY, uid).into());
        }

        let mut writes = Vec::new();
        let mut released = Vec::new();
        for other in state.rooms().iter().filter(|r| r.uid() != uid) {
            if other.holds_any(&tokens) {
                let kept = other.quotes_without(&tokens);
                let fields = Fields::new().set_json(QUOTES_FIELD, &kept)?.touched(operator);
                writes.push(FieldWrite::new(Room::TABLE, other.uid(), fields));
                released.push((other.uid().to_string(), kept));
            }
        }
        let fields = Fields::new().set_json(QUOTES_FIELD, &tokens)?.touched(operator);
        writes.push(FieldWrite::new(Room::TABLE, uid, fields));

        self.store().apply_batch(writes).await?;

        for (other, kept) in released {
            tracing::info!(room = %other, target = %uid, "Released quotes claimed by another room");
            if let Some(room) = state.room_mut(&other) {
                room.quotes = kept;
                room.base.touch(operator);
            }
        }
        let room = state
            .room_mut(uid)
            .ok_or_else(|| DomainError::not_found(Room::ENTITY, uid))?;
        room.quotes = tokens;
        room.base.touch(operator);
        Ok(room.clone())
    }

    /// Bind `device` on one of the room's areas. A no-op when the room
    /// already holds the device.
    pub async fn room_append_device(
        &self,
        uid: &str,
        area: &str,
        device: &str,
        kind: u32,
        operator: &str,
    ) -> CacheResult<Area> {
        require("device", device)?;
        let slot = self.locate_room(uid).await?;
        let _state = slot.write_rooms(self.store()).await?;
        let _areas = self.locks.area.lock().await;

        let areas = self.room_areas(uid).await?;
        if let Some(holding) = areas.iter().find(|a| a.is_bound_to(device)) {
            return Ok(holding.clone());
        }
        let mut target = areas
            .into_iter()
            .find(|a| a.uid() == area)
            .ok_or_else(|| DomainError::not_found(Area::ENTITY, area))?;

        let fields = Fields::new()
            .set("device", device)
            .set("type", kind)
            .touched(operator);
        self.store().update_fields(Area::TABLE, area, fields).await?;

        target.device = device.to_string();
        target.kind = kind;
        target.base.touch(operator);
        Ok(target)
    }

    /// Clear every binding of `device` inside the room. A room that does
    /// not hold the device is left as is.
    pub async fn room_subtract_device(&self, uid: &str, device: &str, operator: &str) -> CacheResult<Vec<Area>> {
        let slot = self.locate_room(uid).await?;
        let _state = slot.write_rooms(self.store()).await?;
        let _areas = self.locks.area.lock().await;

        let bound: Vec<Area> = self
            .room_areas(uid)
            .await?
            .into_iter()
            .filter(|a| a.is_bound_to(device))
            .collect();
        if bound.is_empty() {
            return Ok(Vec::new());
        }

        let writes = bound
            .iter()
            .map(|a| FieldWrite::new(Area::TABLE, a.uid(), Fields::new().set("device", "").touched(operator)))
            .collect();
        self.store().apply_batch(writes).await?;

        Ok(bound
            .into_iter()
            .map(|mut a| {
                a.device.clear();
                a.base.touch(operator);
                a
            })
            .collect())
    }

    /// Replace the display playlist of one of the room's areas.
    pub async fn room_update_displays(
        &self,
        uid: &str,
        area: &str,
        displays: Vec<String>,
        operator: &str,
    ) -> CacheResult<Area> {
        let current = self.get_area(area).await?;
        if current.parent != uid {
            return Err(DomainError::not_found(Area::ENTITY, area).into());
        }
        self.update_area(area, super::AreaUpdate::Displays(displays), operator)
            .await
    }

    pub async fn remove_room(&self, uid: &str, operator: &str) -> CacheResult<()> {
        let slot = self.locate_room(uid).await?;
        let mut state = slot.write_rooms(self.store()).await?;
        self.store().tombstone(Room::TABLE, uid, operator).await?;
        state.mirror_room_removed(uid);
        tracing::info!(room = %uid, operator = %operator, "Room removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::scene::SceneDraft;
    use crate::aggregate::Scene;
    use crate::cache::test_support::cache;

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

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_quote_exclusivity() {
        let (_, cache) = cache();
        let s = scene(&cache, "Museum").await;
        let a = cache.create_room(s.uid(), "A", "", "op").await.unwrap();
        let b = cache.create_room(s.uid(), "B", "", "op").await.unwrap();

        cache.assign_quotes(a.uid(), tokens(&["x", "y"]), "op").await.unwrap();
        let b = cache.assign_quotes(b.uid(), tokens(&["y", "z"]), "op").await.unwrap();

        assert_eq!(b.quotes, vec!["y", "z"]);
        assert_eq!(cache.get_room(a.uid()).await.unwrap().quotes, vec!["x"]);

        let holders = cache.rooms_by_quote("y").await.unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].uid(), b.uid());
    }

    #[tokio::test]
    async fn test_quote_release_is_persisted() {
        let (store, cache) = cache();
        let s = scene(&cache, "Museum").await;
        let a = cache.create_room(s.uid(), "A", "", "op").await.unwrap();
        let b = cache.create_room(s.uid(), "B", "", "op").await.unwrap();
        cache.assign_quotes(a.uid(), tokens(&["x", "y"]), "op").await.unwrap();
        cache.assign_quotes(b.uid(), tokens(&["y"]), "op").await.unwrap();

        let cold = SceneCache::new(store, Default::default());
        assert_eq!(cold.get_room(a.uid()).await.unwrap().quotes, vec!["x"]);
    }

    #[tokio::test]
    async fn test_quotes_in_other_scene_untouched() {
        let (_, cache) = cache();
        let s1 = scene(&cache, "One").await;
        let s2 = scene(&cache, "Two").await;
        let a = cache.create_room(s1.uid(), "A", "", "op").await.unwrap();
        let b = cache.create_room(s2.uid(), "B", "", "op").await.unwrap();

        cache.assign_quotes(a.uid(), tokens(&["x"]), "op").await.unwrap();
        cache.assign_quotes(b.uid(), tokens(&["x"]), "op").await.unwrap();
        assert_eq!(cache.get_room(a.uid()).await.unwrap().quotes, vec!["x"]);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_memory_untouched() {
        let (store, cache) = cache();
        let s = scene(&cache, "Museum").await;
        let a = cache.create_room(s.uid(), "A", "", "op").await.unwrap();
        let b = cache.create_room(s.uid(), "B", "", "op").await.unwrap();
        cache.assign_quotes(a.uid(), tokens(&["x"]), "op").await.unwrap();

        store.set_unavailable(true);
        assert!(cache.assign_quotes(b.uid(), tokens(&["x"]), "op").await.is_err());
        store.set_unavailable(false);

        assert_eq!(cache.get_room(a.uid()).await.unwrap().quotes, vec!["x"]);
        assert!(cache.get_room(b.uid()).await.unwrap().quotes.is_empty());
    }

    #[tokio::test]
    async fn test_subtract_device_not_held_is_a_no_op() {
        let (_, cache) = cache();
        let s = scene(&cache, "Museum").await;
        let hall = cache.create_room(s.uid(), "Hall 1", "", "op").await.unwrap();
        let wall = cache
            .create_area(
                s.uid(),
                crate::aggregate::area::AreaDraft {
                    name: "Wall".into(),
                    parent: hall.uid().to_string(),
                    kind: 1,
                    ..Default::default()
                },
                "op",
            )
            .await
            .unwrap();
        cache
            .room_append_device(hall.uid(), wall.uid(), "dev-1", 1, "op")
            .await
            .unwrap();

        let cleared = cache.room_subtract_device(hall.uid(), "dev-1", "op").await.unwrap();
        assert_eq!(cleared.len(), 1);
        assert!(!cache.room_had_device(hall.uid(), "dev-1").await.unwrap());

        let again = cache.room_subtract_device(hall.uid(), "dev-1", "op").await.unwrap();
        assert!(again.is_empty());
        assert!(cache.room_subtract_device("missing", "dev-1", "op").await.is_err());
    }

    #[tokio::test]
    async fn test_room_name_unique() {
        let (_, cache) = cache();
        let s = scene(&cache, "Museum").await;
        let hall = cache.create_room(s.uid(), "Hall 1", "", "op").await.unwrap();
        assert!(cache.create_room(s.uid(), "Hall 1", "", "op").await.is_err());
        cache.create_room(s.uid(), "Hall 2", "", "op").await.unwrap();

        assert!(cache.update_room_base(hall.uid(), "Hall 2", "", "op").await.is_err());
        let renamed = cache.update_room_base(hall.uid(), "Hall 1", "lobby", "op").await.unwrap();
        assert_eq!(renamed.base.remark, "lobby");
    }
}
