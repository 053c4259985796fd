//! Region Handler

use std::sync::Arc;

use serde::Deserialize;

use crate::aggregate::region::RegionDraft;
use crate::aggregate::Region;
use crate::cache::{RegionUpdate, SceneCache};
use crate::domain::OperationContext;
use crate::error::AppError;

use super::commands::{parse_json, required, unknown_key};
use super::{page_size, BaseRequest, FilterRequest, ListReply, MemberRequest, UpdateRequest};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddRegionRequest {
    pub scene: String,
    #[serde(flatten)]
    pub draft: RegionDraft,
}

/// Handler for region requests
#[derive(Clone)]
pub struct RegionHandler {
    cache: Arc<SceneCache>,
    default_page_size: u32,
}

impl RegionHandler {
    pub fn new(cache: Arc<SceneCache>, default_page_size: u32) -> Self {
        Self {
            cache,
            default_page_size,
        }
    }

    pub async fn add_one(&self, request: AddRegionRequest, context: &OperationContext) -> Result<Region, AppError> {
        required("scene", &request.scene)?;
        required("name", &request.draft.name)?;
        Ok(self
            .cache
            .create_region(&request.scene, request.draft, context.operator())
            .await?)
    }

    pub async fn get_one(&self, uid: &str) -> Result<Region, AppError> {
        required("uid", uid)?;
        Ok(self.cache.get_region(uid).await?)
    }

    pub async fn remove_one(&self, uid: &str, context: &OperationContext) -> Result<(), AppError> {
        required("uid", uid)?;
        Ok(self.cache.remove_region(uid, context.operator()).await?)
    }

    /// Modes: `scene` (paged), `parent`, `member`
    pub async fn get_list(&self, request: &FilterRequest) -> Result<ListReply<Region>, AppError> {
        let size = page_size(request.number, self.default_page_size);
        let reply = match request.key.as_str() {
            "scene" => {
                required("value", &request.value)?;
                self.cache
                    .regions_of_scene(&request.value, request.page, size)
                    .await?
                    .into()
            }
            "parent" => self.cache.regions_by_parent(&request.value).await?.into(),
            "member" => {
                required("value", &request.value)?;
                self.cache.regions_by_member(&request.value).await?.into()
            }
            other => return Err(unknown_key(other)),
        };
        Ok(reply)
    }

    pub async fn update_base(&self, request: BaseRequest, context: &OperationContext) -> Result<Region, AppError> {
        required("uid", &request.uid)?;
        required("name", &request.name)?;
        let update = RegionUpdate::Base {
            name: request.name,
            remark: request.remark,
        };
        Ok(self
            .cache
            .update_region(&request.uid, update, context.operator())
            .await?)
    }

    pub async fn update_by_filter(
        &self,
        request: UpdateRequest,
        context: &OperationContext,
    ) -> Result<Region, AppError> {
        required("uid", &request.uid)?;
        let UpdateRequest { uid, key, value } = request;
        let update = match key.as_str() {
            "master" => RegionUpdate::Master(value),
            "parent" => RegionUpdate::Parent(value),
            "location" => RegionUpdate::Location(value),
            "entity" => RegionUpdate::Entity(value),
            "code" => RegionUpdate::Code(value),
            "address" => RegionUpdate::Address(parse_json(&key, &value)?),
            other => return Err(unknown_key(other)),
        };
        Ok(self.cache.update_region(&uid, update, context.operator()).await?)
    }

    pub async fn append_member(&self, request: &MemberRequest) -> Result<Region, AppError> {
        required("uid", &request.uid)?;
        required("member", &request.member)?;
        Ok(self
            .cache
            .append_region_member(&request.uid, &request.member)
            .await?)
    }

    pub async fn subtract_member(&self, request: &MemberRequest) -> Result<Region, AppError> {
        required("uid", &request.uid)?;
        required("member", &request.member)?;
        Ok(self
            .cache
            .remove_region_member(&request.uid, &request.member)
            .await?)
    }
}
