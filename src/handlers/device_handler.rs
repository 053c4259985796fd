//! Device Handler

use std::sync::Arc;

use serde::Deserialize;

use crate::aggregate::device::{Binding, DeviceDraft};
use crate::aggregate::{Device, DeviceStatus};
use crate::cache::{DeviceUpdate, SceneCache};
use crate::domain::{DomainError, OperationContext};
use crate::error::AppError;

use super::commands::{parse_json, parse_number, required, unknown_key};
use super::{BaseRequest, FilterRequest, ListReply, UpdateRequest};

/// `Bind`: activation data for one device
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BindRequest {
    pub uid: String,
    #[serde(flatten)]
    pub binding: Binding,
}

/// Handler for device requests
#[derive(Clone)]
pub struct DeviceHandler {
    cache: Arc<SceneCache>,
}

impl DeviceHandler {
    pub fn new(cache: Arc<SceneCache>) -> Self {
        Self { cache }
    }

    pub async fn add_one(&self, draft: DeviceDraft, context: &OperationContext) -> Result<Device, AppError> {
        required("sn", &draft.sn)?;
        Ok(self.cache.create_device(draft, context.operator()).await?)
    }

    pub async fn get_one(&self, uid: &str) -> Result<Device, AppError> {
        required("uid", uid)?;
        Ok(self.cache.get_device(uid).await?)
    }

    pub async fn get_by_serial(&self, sn: &str) -> Result<Device, AppError> {
        required("sn", sn)?;
        Ok(self.cache.device_by_serial(sn).await?)
    }

    pub async fn remove_one(&self, uid: &str, context: &OperationContext) -> Result<(), AppError> {
        required("uid", uid)?;
        Ok(self.cache.remove_device(uid, context.operator()).await?)
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        Ok(self.cache.count_devices().await?)
    }

    /// Modes: `scene`, `status` (negative for every status but discarded),
    /// `array`
    pub async fn get_list(&self, request: &FilterRequest) -> Result<ListReply<Device>, AppError> {
        let devices = match request.key.as_str() {
            "scene" => {
                required("value", &request.value)?;
                self.cache.devices_of_scene(&request.value).await?
            }
            "status" => {
                let code: i32 = parse_number(&request.key, &request.value)?;
                let status = if code < 0 {
                    None
                } else {
                    let code = u8::try_from(code)
                        .map_err(|_| DomainError::invalid_value("status", request.value.clone()))?;
                    Some(DeviceStatus::try_from(code)?)
                };
                self.cache.devices_by_status(status).await?
            }
            "array" => self.cache.devices_by_ids(&request.values).await?,
            other => return Err(unknown_key(other)),
        };
        Ok(devices.into())
    }

    pub async fn update_base(&self, request: BaseRequest, context: &OperationContext) -> Result<Device, AppError> {
        required("uid", &request.uid)?;
        let update = DeviceUpdate::Base {
            name: request.name,
            remark: request.remark,
        };
        Ok(self
            .cache
            .update_device(&request.uid, update, context.operator())
            .await?)
    }

    /// Keys: `certificate`, `scene`, `aspect`, `type`, `status`, `auto`, `meta`
    pub async fn update_by_filter(
        &self,
        request: UpdateRequest,
        context: &OperationContext,
    ) -> Result<Device, AppError> {
        required("uid", &request.uid)?;
        let UpdateRequest { uid, key, value } = request;
        let update = match key.as_str() {
            "certificate" => DeviceUpdate::Certificate(value),
            "scene" => DeviceUpdate::Scene(value),
            "aspect" => DeviceUpdate::Aspect(value),
            "type" => DeviceUpdate::Kind(parse_number(&key, &value)?),
            "status" => {
                let code: u8 = parse_number(&key, &value)?;
                DeviceUpdate::Status(DeviceStatus::try_from(code)?)
            }
            "auto" => DeviceUpdate::Auto(parse_json(&key, &value)?),
            "meta" => DeviceUpdate::Meta(value),
            other => return Err(unknown_key(other)),
        };
        Ok(self.cache.update_device(&uid, update, context.operator()).await?)
    }

    pub async fn bind(&self, request: BindRequest, context: &OperationContext) -> Result<Device, AppError> {
        required("uid", &request.uid)?;
        required("quote", &request.binding.quote)?;
        Ok(self
            .cache
            .bind_device(&request.uid, request.binding, context.operator())
            .await?)
    }
}
