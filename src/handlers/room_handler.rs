//! Room Handler
//!
//! Rooms carry the quote tokens and the device bindings of their areas.

use std::sync::Arc;

use serde::Deserialize;

use crate::aggregate::{Area, Room};
use crate::cache::SceneCache;
use crate::domain::OperationContext;
use crate::error::AppError;

use super::commands::{parse_json, required, unknown_key, DeviceRequest};
use super::{page_size, BaseRequest, FilterRequest, ListReply, UpdateRequest};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddRoomRequest {
    pub scene: String,
    pub name: String,
    pub remark: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplaysRequest {
    pub uid: String,
    pub area: String,
    pub list: Vec<String>,
}

/// Handler for room requests
#[derive(Clone)]
pub struct RoomHandler {
    cache: Arc<SceneCache>,
    default_page_size: u32,
}

impl RoomHandler {
    pub fn new(cache: Arc<SceneCache>, default_page_size: u32) -> Self {
        Self {
            cache,
            default_page_size,
        }
    }

    pub async fn add_one(&self, request: AddRoomRequest, context: &OperationContext) -> Result<Room, AppError> {
        required("scene", &request.scene)?;
        required("name", &request.name)?;
        Ok(self
            .cache
            .create_room(&request.scene, &request.name, &request.remark, context.operator())
            .await?)
    }

    pub async fn get_one(&self, uid: &str) -> Result<Room, AppError> {
        required("uid", uid)?;
        Ok(self.cache.get_room(uid).await?)
    }

    pub async fn remove_one(&self, uid: &str, context: &OperationContext) -> Result<(), AppError> {
        required("uid", uid)?;
        Ok(self.cache.remove_room(uid, context.operator()).await?)
    }

    /// Modes: `scene` (paged), `quote`, `device`
    pub async fn get_list(&self, request: &FilterRequest) -> Result<ListReply<Room>, AppError> {
        let size = page_size(request.number, self.default_page_size);
        let reply = match request.key.as_str() {
            "scene" => {
                required("value", &request.value)?;
                self.cache
                    .rooms_of_scene(&request.value, request.page, size)
                    .await?
                    .into()
            }
            "quote" => self.cache.rooms_by_quote(&request.value).await?.into(),
            "device" => self.cache.rooms_by_device(&request.value).await?.into(),
            other => return Err(unknown_key(other)),
        };
        Ok(reply)
    }

    pub async fn update_base(&self, request: BaseRequest, context: &OperationContext) -> Result<Room, AppError> {
        required("uid", &request.uid)?;
        required("name", &request.name)?;
        Ok(self
            .cache
            .update_room_base(&request.uid, &request.name, &request.remark, context.operator())
            .await?)
    }

    /// Keys: `quotes` (JSON array of tokens)
    pub async fn update_by_filter(
        &self,
        request: UpdateRequest,
        context: &OperationContext,
    ) -> Result<Room, AppError> {
        required("uid", &request.uid)?;
        match request.key.as_str() {
            "quotes" => {
                let tokens: Vec<String> = parse_json(&request.key, &request.value)?;
                Ok(self
                    .cache
                    .assign_quotes(&request.uid, tokens, context.operator())
                    .await?)
            }
            other => Err(unknown_key(other)),
        }
    }

    pub async fn append_device(&self, request: &DeviceRequest, context: &OperationContext) -> Result<Area, AppError> {
        required("uid", &request.uid)?;
        required("area", &request.area)?;
        required("device", &request.device)?;
        Ok(self
            .cache
            .room_append_device(
                &request.uid,
                &request.area,
                &request.device,
                request.kind,
                context.operator(),
            )
            .await?)
    }

    pub async fn subtract_device(
        &self,
        request: &DeviceRequest,
        context: &OperationContext,
    ) -> Result<Vec<Area>, AppError> {
        required("uid", &request.uid)?;
        required("device", &request.device)?;
        Ok(self
            .cache
            .room_subtract_device(&request.uid, &request.device, context.operator())
            .await?)
    }

    pub async fn had_device(&self, uid: &str, device: &str) -> Result<bool, AppError> {
        required("uid", uid)?;
        required("device", device)?;
        Ok(self.cache.room_had_device(uid, device).await?)
    }

    pub async fn update_displays(&self, request: DisplaysRequest, context: &OperationContext) -> Result<Area, AppError> {
        required("uid", &request.uid)?;
        required("area", &request.area)?;
        Ok(self
            .cache
            .room_update_displays(&request.uid, &request.area, request.list, context.operator())
            .await?)
    }
}
