//! Group Handler

use std::sync::Arc;

use serde::Deserialize;

use crate::aggregate::group::GroupDraft;
use crate::aggregate::Group;
use crate::cache::{GroupUpdate, SceneCache};
use crate::domain::OperationContext;
use crate::error::AppError;

use super::commands::{parse_json, required, unknown_key};
use super::{page_size, BaseRequest, FilterRequest, ListReply, MemberRequest, UpdateRequest};

/// `AddOne` for a group: the owning scene next to the draft
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddGroupRequest {
    pub scene: String,
    #[serde(flatten)]
    pub draft: GroupDraft,
}

/// Handler for group requests
#[derive(Clone)]
pub struct GroupHandler {
    cache: Arc<SceneCache>,
    default_page_size: u32,
}

impl GroupHandler {
    pub fn new(cache: Arc<SceneCache>, default_page_size: u32) -> Self {
        Self {
            cache,
            default_page_size,
        }
    }

    pub async fn add_one(&self, request: AddGroupRequest, context: &OperationContext) -> Result<Group, AppError> {
        required("scene", &request.scene)?;
        required("name", &request.draft.name)?;
        Ok(self
            .cache
            .create_group(&request.scene, request.draft, context.operator())
            .await?)
    }

    pub async fn get_one(&self, uid: &str) -> Result<Group, AppError> {
        required("uid", uid)?;
        Ok(self.cache.get_group(uid).await?)
    }

    pub async fn remove_one(&self, uid: &str, context: &OperationContext) -> Result<(), AppError> {
        required("uid", uid)?;
        Ok(self.cache.remove_group(uid, context.operator()).await?)
    }

    /// Modes: `scene` (paged), `member`, `contact`
    pub async fn get_list(&self, request: &FilterRequest) -> Result<ListReply<Group>, AppError> {
        let size = page_size(request.number, self.default_page_size);
        let reply = match request.key.as_str() {
            "scene" => {
                required("value", &request.value)?;
                self.cache
                    .groups_of_scene(&request.value, request.page, size)
                    .await?
                    .into()
            }
            "member" => self.cache.groups_by_member(&request.value).await?.into(),
            "contact" => self.cache.groups_by_contact(&request.value).await?.into(),
            other => return Err(unknown_key(other)),
        };
        Ok(reply)
    }

    pub async fn update_base(&self, request: BaseRequest, context: &OperationContext) -> Result<Group, AppError> {
        required("uid", &request.uid)?;
        required("name", &request.name)?;
        let update = GroupUpdate::Base {
            name: request.name,
            remark: request.remark,
        };
        Ok(self
            .cache
            .update_group(&request.uid, update, context.operator())
            .await?)
    }

    pub async fn update_by_filter(
        &self,
        request: UpdateRequest,
        context: &OperationContext,
    ) -> Result<Group, AppError> {
        required("uid", &request.uid)?;
        let UpdateRequest { uid, key, value } = request;
        let update = match key.as_str() {
            "contact" => GroupUpdate::Contact(value),
            "master" => GroupUpdate::Master(value),
            "assistant" => GroupUpdate::Assistant(value),
            "cover" => GroupUpdate::Cover(value),
            "location" => GroupUpdate::Location(value),
            "address" => GroupUpdate::Address(parse_json(&key, &value)?),
            other => return Err(unknown_key(other)),
        };
        Ok(self.cache.update_group(&uid, update, context.operator()).await?)
    }

    pub async fn append_member(&self, request: &MemberRequest) -> Result<Group, AppError> {
        required("uid", &request.uid)?;
        required("member", &request.member)?;
        Ok(self
            .cache
            .append_group_member(&request.uid, &request.member)
            .await?)
    }

    pub async fn subtract_member(&self, request: &MemberRequest) -> Result<Group, AppError> {
        required("uid", &request.uid)?;
        required("member", &request.member)?;
        Ok(self
            .cache
            .remove_group_member(&request.uid, &request.member)
            .await?)
    }
}
