//! Scene Handler
//!
//! RPC surface of the scene aggregate.

use std::sync::Arc;

use crate::aggregate::scene::SceneDraft;
use crate::aggregate::{Scene, SceneStatus};
use crate::cache::{SceneCache, SceneUpdate};
use crate::domain::{DomainError, OperationContext};
use crate::error::AppError;

use super::commands::{parse_json, parse_number, required, unknown_key};
use super::{page_size, BaseRequest, FilterRequest, ListReply, MemberRequest, UpdateRequest};

/// Handler for scene requests
#[derive(Clone)]
pub struct SceneHandler {
    cache: Arc<SceneCache>,
    default_page_size: u32,
}

impl SceneHandler {
    pub fn new(cache: Arc<SceneCache>, default_page_size: u32) -> Self {
        Self {
            cache,
            default_page_size,
        }
    }

    pub async fn add_one(&self, draft: SceneDraft, context: &OperationContext) -> Result<Scene, AppError> {
        required("name", &draft.name)?;
        Ok(self.cache.create_scene(draft, context.operator()).await?)
    }

    pub async fn get_one(&self, uid: &str) -> Result<Scene, AppError> {
        required("uid", uid)?;
        Ok(self.cache.get_scene(uid).await?)
    }

    /// Scene that `user` masters or belongs to
    pub async fn get_by_member(&self, user: &str) -> Result<Scene, AppError> {
        required("user", user)?;
        self.cache
            .get_by_master_or_member(user)
            .await?
            .ok_or_else(|| DomainError::not_found("scene", user).into())
    }

    pub async fn remove_one(&self, uid: &str, context: &OperationContext) -> Result<(), AppError> {
        required("uid", uid)?;
        Ok(self.cache.remove_scene(uid, context.operator()).await?)
    }

    /// Modes: `""` (all, paged), `parent` (paged), `type`, `master`, `member`
    pub async fn get_list(&self, request: &FilterRequest) -> Result<ListReply<Scene>, AppError> {
        let size = page_size(request.number, self.default_page_size);
        let reply = match request.key.as_str() {
            "" => self.cache.list_scenes(request.page, size).await.into(),
            "parent" => {
                required("value", &request.value)?;
                self.cache
                    .list_scenes_by_parent(&request.value, request.page, size)
                    .await
                    .into()
            }
            "type" => {
                let kind = parse_number(&request.key, &request.value)?;
                self.cache.list_scenes_by_type(kind).await.into()
            }
            "master" => self.cache.list_scenes_by_master(&request.value).await.into(),
            "member" => self.cache.list_scenes_by_member(&request.value).await.into(),
            other => return Err(unknown_key(other)),
        };
        Ok(reply)
    }

    pub async fn update_base(&self, request: BaseRequest, context: &OperationContext) -> Result<Scene, AppError> {
        required("uid", &request.uid)?;
        let update = SceneUpdate::Base {
            name: request.name,
            remark: request.remark,
        };
        Ok(self
            .cache
            .update_scene(&request.uid, update, context.operator())
            .await?)
    }

    pub async fn update_by_filter(
        &self,
        request: UpdateRequest,
        context: &OperationContext,
    ) -> Result<Scene, AppError> {
        required("uid", &request.uid)?;
        let UpdateRequest { uid, key, value } = request;
        let update = match key.as_str() {
            "cover" => SceneUpdate::Cover(value),
            "location" => SceneUpdate::Location(value),
            "address" => SceneUpdate::Address(parse_json(&key, &value)?),
            "master" => SceneUpdate::Master(value),
            "supporter" => SceneUpdate::Supporter(value),
            "bucket" => SceneUpdate::Bucket(value),
            "short" => SceneUpdate::Short(value),
            "type" => SceneUpdate::Kind(parse_number(&key, &value)?),
            "status" => {
                let code: u8 = parse_number(&key, &value)?;
                SceneUpdate::Status(SceneStatus::try_from(code)?)
            }
            "parents" => SceneUpdate::Parents(parse_json(&key, &value)?),
            "domains" => SceneUpdate::Domains(parse_json(&key, &value)?),
            other => return Err(unknown_key(other)),
        };
        Ok(self.cache.update_scene(&uid, update, context.operator()).await?)
    }

    pub async fn append_member(&self, request: &MemberRequest) -> Result<Scene, AppError> {
        required("uid", &request.uid)?;
        required("member", &request.member)?;
        Ok(self
            .cache
            .append_scene_member(&request.uid, &request.member)
            .await?)
    }

    pub async fn subtract_member(&self, request: &MemberRequest) -> Result<Scene, AppError> {
        required("uid", &request.uid)?;
        required("member", &request.member)?;
        Ok(self
            .cache
            .remove_scene_member(&request.uid, &request.member)
            .await?)
    }

    /// Master first, then the membership list
    pub async fn members(&self, uid: &str) -> Result<Vec<String>, AppError> {
        required("uid", uid)?;
        Ok(self.cache.scene_members(uid).await?)
    }
}
