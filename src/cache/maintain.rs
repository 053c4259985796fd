//! Maintenance tickets. Append-only: there is no update or remove path.

use crate::aggregate::maintain::MaintainDraft;
use crate::aggregate::{Maintain, Record};
use crate::domain::{paginate, DomainError, Page};
use crate::store::Filter;

use super::{require, CacheResult, SceneCache};

impl SceneCache {
    /// Open a ticket on an area of `scene`, capturing the device bound to it.
    pub async fn create_maintain(&self, scene: &str, draft: MaintainDraft, operator: &str) -> CacheResult<Maintain> {
        require("area", &draft.area)?;
        self.slot(scene).await?;
        let area = self.get_area(&draft.area).await?;
        if area.scene != scene {
            return Err(DomainError::not_found("area", draft.area).into());
        }

        let (uid, seq) = self.next_identity(Maintain::TABLE).await?;
        let ticket = Maintain::create(uid, seq, scene, &area.device, draft, operator);
        self.store().insert_record(&ticket).await?;
        tracing::info!(scene = %scene, area = %ticket.area, maintain = %ticket.uid(), "Maintain ticket opened");
        Ok(ticket)
    }

    pub async fn get_maintain(&self, uid: &str) -> CacheResult<Maintain> {
        self.store()
            .fetch_record::<Maintain>(uid)
            .await?
            .ok_or_else(|| DomainError::not_found(Maintain::ENTITY, uid).into())
    }

    pub async fn maintains_of_scene(&self, scene: &str, page: u32, page_size: u32) -> CacheResult<Page<Maintain>> {
        let tickets = self.store().find_records(&Filter::eq("scene", scene)).await?;
        Ok(paginate(page, page_size, tickets))
    }

    pub async fn maintains_of_area(&self, area: &str) -> CacheResult<Vec<Maintain>> {
        Ok(self.store().find_records(&Filter::eq("area", area)).await?)
    }

    /// Ticket count, for one scene or (with an empty scene) overall.
    pub async fn count_maintains(&self, scene: &str) -> CacheResult<u64> {
        let filter = if scene.is_empty() {
            Filter::all()
        } else {
            Filter::eq("scene", scene)
        };
        Ok(self.store().count(Maintain::TABLE, &filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::area::AreaDraft;
    use crate::aggregate::scene::SceneDraft;
    use crate::cache::AreaUpdate;

    #[tokio::test]
    async fn test_ticket_captures_bound_device() {
        let (_, cache) = crate::cache::test_support::cache();
        let scene = cache
            .create_scene(
                SceneDraft {
                    name: "Museum".into(),
                    ..Default::default()
                },
                "op",
            )
            .await
            .unwrap();
        let room = cache.create_room(scene.uid(), "Hall", "", "op").await.unwrap();
        let area = cache
            .create_area(
                scene.uid(),
                AreaDraft {
                    name: "Wall".into(),
                    parent: room.uid().to_string(),
                    ..Default::default()
                },
                "op",
            )
            .await
            .unwrap();
        cache
            .update_area(
                area.uid(),
                AreaUpdate::Device {
                    device: "dev-1".into(),
                    kind: 1,
                },
                "op",
            )
            .await
            .unwrap();

        let ticket = cache
            .create_maintain(
                scene.uid(),
                MaintainDraft {
                    name: "Screen flicker".into(),
                    area: area.uid().to_string(),
                    ..Default::default()
                },
                "op",
            )
            .await
            .unwrap();
        assert_eq!(ticket.device, "dev-1");
        assert_eq!(cache.maintains_of_area(area.uid()).await.unwrap().len(), 1);
        assert_eq!(cache.count_maintains(scene.uid()).await.unwrap(), 1);
        assert_eq!(cache.count_maintains("").await.unwrap(), 1);
        assert_eq!(cache.get_maintain(ticket.uid()).await.unwrap().base.name, "Screen flicker");
    }

    #[tokio::test]
    async fn test_ticket_requires_existing_area() {
        let (_, cache) = crate::cache::test_support::cache();
        let scene = cache
            .create_scene(
                SceneDraft {
                    name: "Museum".into(),
                    ..Default::default()
                },
                "op",
            )
            .await
            .unwrap();
        let draft = MaintainDraft {
            area: "missing".into(),
            ..Default::default()
        };
        let err = cache.create_maintain(scene.uid(), draft, "op").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
