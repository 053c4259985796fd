//! Maintain Handler
//!
//! Tickets are append-only; remove and update requests are rejected.

use std::sync::Arc;

use serde::Deserialize;

use crate::aggregate::maintain::MaintainDraft;
use crate::aggregate::Maintain;
use crate::cache::SceneCache;
use crate::domain::{DomainError, OperationContext};
use crate::error::AppError;

use super::commands::{required, unknown_key};
use super::{page_size, FilterRequest, ListReply};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddMaintainRequest {
    pub scene: String,
    #[serde(flatten)]
    pub draft: MaintainDraft,
}

/// Handler for maintenance tickets
#[derive(Clone)]
pub struct MaintainHandler {
    cache: Arc<SceneCache>,
    default_page_size: u32,
}

impl MaintainHandler {
    pub fn new(cache: Arc<SceneCache>, default_page_size: u32) -> Self {
        Self {
            cache,
            default_page_size,
        }
    }

    pub async fn add_one(&self, request: AddMaintainRequest, context: &OperationContext) -> Result<Maintain, AppError> {
        required("scene", &request.scene)?;
        required("area", &request.draft.area)?;
        Ok(self
            .cache
            .create_maintain(&request.scene, request.draft, context.operator())
            .await?)
    }

    pub async fn get_one(&self, uid: &str) -> Result<Maintain, AppError> {
        required("uid", uid)?;
        Ok(self.cache.get_maintain(uid).await?)
    }

    pub async fn remove_one(&self, _uid: &str) -> Result<(), AppError> {
        Err(DomainError::Unsupported("remove maintain").into())
    }

    /// Modes: `scene` (paged), `area`
    pub async fn get_list(&self, request: &FilterRequest) -> Result<ListReply<Maintain>, AppError> {
        let size = page_size(request.number, self.default_page_size);
        let reply = match request.key.as_str() {
            "scene" => {
                required("value", &request.value)?;
                self.cache
                    .maintains_of_scene(&request.value, request.page, size)
                    .await?
                    .into()
            }
            "area" => {
                required("value", &request.value)?;
                self.cache.maintains_of_area(&request.value).await?.into()
            }
            other => return Err(unknown_key(other)),
        };
        Ok(reply)
    }

    /// Tickets in one scene, or everywhere for an empty scene
    pub async fn count(&self, scene: &str) -> Result<u64, AppError> {
        Ok(self.cache.count_maintains(scene).await?)
    }
}
