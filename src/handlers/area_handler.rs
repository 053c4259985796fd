//! Area Handler
//!
//! Areas come back flattened with the serial number and aspect of their
//! bound device.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::area::AreaDraft;
use crate::aggregate::Area;
use crate::cache::{AreaUpdate, SceneCache};
use crate::domain::{OperationContext, PairInfo};
use crate::error::AppError;

use super::commands::{parse_json, parse_number, required, unknown_key, DeviceRequest};
use super::{page_size, BaseRequest, FilterRequest, ListReply, UpdateRequest};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddAreaRequest {
    pub scene: String,
    #[serde(flatten)]
    pub draft: AreaDraft,
}

/// An area with its device resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaInfo {
    #[serde(flatten)]
    pub area: Area,
    pub sn: String,
    pub aspect: String,
}

#[derive(Debug, Deserialize)]
struct SizeValue {
    width: i32,
    height: i32,
}

/// Handler for area requests
#[derive(Clone)]
pub struct AreaHandler {
    cache: Arc<SceneCache>,
    default_page_size: u32,
}

impl AreaHandler {
    pub fn new(cache: Arc<SceneCache>, default_page_size: u32) -> Self {
        Self {
            cache,
            default_page_size,
        }
    }

    async fn info(&self, area: Area) -> Result<AreaInfo, AppError> {
        let device = area.device_info(&self.cache).await?;
        let (sn, aspect) = device.map(|d| (d.sn, d.aspect)).unwrap_or_default();
        Ok(AreaInfo { area, sn, aspect })
    }

    async fn infos(&self, areas: Vec<Area>) -> Result<Vec<AreaInfo>, AppError> {
        let mut infos = Vec::with_capacity(areas.len());
        for area in areas {
            infos.push(self.info(area).await?);
        }
        Ok(infos)
    }

    pub async fn add_one(&self, request: AddAreaRequest, context: &OperationContext) -> Result<AreaInfo, AppError> {
        required("scene", &request.scene)?;
        required("parent", &request.draft.parent)?;
        let area = self
            .cache
            .create_area(&request.scene, request.draft, context.operator())
            .await?;
        self.info(area).await
    }

    pub async fn get_one(&self, uid: &str) -> Result<AreaInfo, AppError> {
        required("uid", uid)?;
        let area = self.cache.get_area(uid).await?;
        self.info(area).await
    }

    pub async fn remove_one(&self, uid: &str, context: &OperationContext) -> Result<(), AppError> {
        required("uid", uid)?;
        Ok(self.cache.remove_area(uid, context.operator()).await?)
    }

    /// Modes: `scene` (paged), `parent` (room), `template` (optionally
    /// within `scene`), `device`, `sn`, `array`
    pub async fn get_list(&self, request: &FilterRequest) -> Result<ListReply<AreaInfo>, AppError> {
        let size = page_size(request.number, self.default_page_size);
        let value = request.value.as_str();
        match request.key.as_str() {
            "scene" => {
                required("value", value)?;
                let page = self.cache.areas_of_scene(value, request.page, size).await?;
                let total = page.total;
                let pages = page.max_page;
                let list = self.infos(page.items).await?;
                Ok(ListReply { total, pages, list })
            }
            "parent" => {
                let areas = self.cache.room_areas(value).await?;
                Ok(self.infos(areas).await?.into())
            }
            "template" => {
                let areas = self.cache.areas_by_template(&request.scene, value).await?;
                Ok(self.infos(areas).await?.into())
            }
            "device" => {
                let area = self.cache.area_by_device(value).await?;
                Ok(vec![self.info(area).await?].into())
            }
            "sn" => {
                let area = self.cache.area_by_serial(value).await?;
                Ok(vec![self.info(area).await?].into())
            }
            "array" => {
                let areas = self.cache.areas_by_ids(&request.values).await?;
                Ok(self.infos(areas).await?.into())
            }
            other => Err(unknown_key(other)),
        }
    }

    pub async fn update_base(&self, request: BaseRequest, context: &OperationContext) -> Result<AreaInfo, AppError> {
        required("uid", &request.uid)?;
        let update = AreaUpdate::Base {
            name: request.name,
            remark: request.remark,
        };
        let area = self
            .cache
            .update_area(&request.uid, update, context.operator())
            .await?;
        self.info(area).await
    }

    /// Keys: `template`, `sn`, `displays`, `type`, `catalog`, `question`,
    /// `size`, `limit`, `module`, `source`
    pub async fn update_by_filter(
        &self,
        request: UpdateRequest,
        context: &OperationContext,
    ) -> Result<AreaInfo, AppError> {
        required("uid", &request.uid)?;
        let UpdateRequest { uid, key, value } = request;
        let update = match key.as_str() {
            "template" => AreaUpdate::Template(value),
            "sn" => {
                required("value", &value)?;
                AreaUpdate::Serial(value)
            }
            "displays" => AreaUpdate::Displays(parse_json(&key, &value)?),
            "type" => AreaUpdate::Kind(parse_number(&key, &value)?),
            "catalog" => AreaUpdate::Catalog(value),
            "question" => AreaUpdate::Question(value),
            "size" => {
                let size: SizeValue = parse_json(&key, &value)?;
                AreaUpdate::Size {
                    width: size.width,
                    height: size.height,
                }
            }
            "limit" => AreaUpdate::Limit(parse_number(&key, &value)?),
            "module" => {
                let pair: PairInfo = parse_json(&key, &value)?;
                AreaUpdate::Module {
                    key: pair.key,
                    value: pair.value,
                }
            }
            "source" => {
                let pair: PairInfo = parse_json(&key, &value)?;
                AreaUpdate::Source {
                    key: pair.key,
                    value: pair.value,
                }
            }
            other => return Err(unknown_key(other)),
        };
        let area = self.cache.update_area(&uid, update, context.operator()).await?;
        self.info(area).await
    }

    /// Bind a device on the area with its product type.
    pub async fn append_device(&self, request: DeviceRequest, context: &OperationContext) -> Result<AreaInfo, AppError> {
        required("uid", &request.uid)?;
        required("device", &request.device)?;
        let update = AreaUpdate::Device {
            device: request.device,
            kind: request.kind,
        };
        let area = self
            .cache
            .update_area(&request.uid, update, context.operator())
            .await?;
        self.info(area).await
    }

    /// Clear the device binding, keeping the product type.
    pub async fn subtract_device(&self, uid: &str, context: &OperationContext) -> Result<AreaInfo, AppError> {
        required("uid", uid)?;
        let current = self.cache.get_area(uid).await?;
        let update = AreaUpdate::Device {
            device: String::new(),
            kind: current.kind,
        };
        let area = self.cache.update_area(uid, update, context.operator()).await?;
        self.info(area).await
    }
}
