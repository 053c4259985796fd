//! Area operations of the cache.
//!
//! Areas are not held in memory; every read goes to the store and
//! read-modify-write sequences run under the area write lock.

use crate::aggregate::area::{AreaDraft, MODULES_FIELD, SOURCES_FIELD};
use crate::aggregate::{Area, Device, Record};
use crate::domain::{paginate, DomainError, Page};
use crate::store::{Fields, Filter, StoreResult};

use super::{require, CacheResult, SceneCache};

#[derive(Debug, Clone)]
pub enum AreaUpdate {
    /// Empty remark keeps the current one
    Base { name: String, remark: String },
    Template(String),
    /// Bind (or with an empty id, unbind) a device and set the product type
    Device { device: String, kind: u32 },
    /// Bind the device with this serial number, keeping the product type
    Serial(String),
    Displays(Vec<String>),
    Kind(u32),
    Catalog(String),
    Question(String),
    Size { width: i32, height: i32 },
    Limit(u32),
    Module { key: String, value: String },
    Source { key: String, value: String },
}

impl AreaUpdate {
    /// `Serial` carries the resolved device id by the time this runs.
    fn apply(self, area: &mut Area) -> StoreResult<Fields> {
        let fields = Fields::new();
        Ok(match self {
            AreaUpdate::Base { name, remark } => {
                if !name.is_empty() {
                    area.base.name = name;
                }
                if !remark.is_empty() {
                    area.base.remark = remark;
                }
                fields
                    .set("name", area.base.name.clone())
                    .set("remark", area.base.remark.clone())
            }
            AreaUpdate::Template(template) => {
                area.template = template;
                fields.set("template", area.template.clone())
            }
            AreaUpdate::Device { device, kind } => {
                area.device = device;
                area.kind = kind;
                fields.set("device", area.device.clone()).set("type", kind)
            }
            AreaUpdate::Serial(serial) => {
                area.device = serial;
                fields.set("device", area.device.clone())
            }
            AreaUpdate::Displays(displays) => {
                let fields = fields.set_json("displays", &displays)?;
                area.displays = displays;
                fields
            }
            AreaUpdate::Kind(kind) => {
                area.kind = kind;
                fields.set("type", kind)
            }
            AreaUpdate::Catalog(catalog) => {
                area.catalog = catalog;
                fields.set("catalog", area.catalog.clone())
            }
            AreaUpdate::Question(question) => {
                area.question = question;
                fields.set("question", area.question.clone())
            }
            AreaUpdate::Size { width, height } => {
                area.width = width;
                area.height = height;
                fields.set("width", width).set("height", height)
            }
            AreaUpdate::Limit(limit) => {
                area.limit = limit;
                fields.set("limit", limit)
            }
            AreaUpdate::Module { key, value } => {
                area.modules = area.modules_with(&key, &value);
                fields.set_json(MODULES_FIELD, &area.modules)?
            }
            AreaUpdate::Source { key, value } => {
                area.sources = area.sources_with(&key, &value);
                fields.set_json(SOURCES_FIELD, &area.sources)?
            }
        })
    }
}

impl SceneCache {
    /// Create an area inside a room of `scene`.
    pub async fn create_area(&self, scene: &str, draft: AreaDraft, operator: &str) -> CacheResult<Area> {
        require("parent", &draft.parent)?;
        let slot = self.slot(scene).await?;
        if slot.read_rooms(self.store()).await?.room(&draft.parent).is_none() {
            return Err(DomainError::not_found("room", draft.parent).into());
        }

        let (uid, seq) = self.next_identity(Area::TABLE).await?;
        let area = Area::create(uid, seq, scene, draft, operator);
        self.store().insert_record(&area).await?;
        tracing::info!(scene = %scene, room = %area.parent, area = %area.uid(), "Area created");
        Ok(area)
    }

    pub async fn find_area(&self, uid: &str) -> CacheResult<Option<Area>> {
        Ok(self.store().fetch_record(uid).await?)
    }

    pub async fn get_area(&self, uid: &str) -> CacheResult<Area> {
        self.find_area(uid)
            .await?
            .ok_or_else(|| DomainError::not_found(Area::ENTITY, uid).into())
    }

    pub async fn area_by_device(&self, device: &str) -> CacheResult<Area> {
        require("device", device)?;
        self.store()
            .find_record(&Filter::eq("device", device))
            .await?
            .ok_or_else(|| DomainError::not_found(Area::ENTITY, device).into())
    }

    /// Serial number to device to area.
    pub async fn area_by_serial(&self, serial: &str) -> CacheResult<Area> {
        let device = self.device_by_serial(serial).await?;
        self.area_by_device(device.uid()).await
    }

    pub async fn areas_of_scene(&self, scene: &str, page: u32, page_size: u32) -> CacheResult<Page<Area>> {
        let areas = self.store().find_records(&Filter::eq("scene", scene)).await?;
        Ok(paginate(page, page_size, areas))
    }

    pub async fn areas_by_template(&self, scene: &str, template: &str) -> CacheResult<Vec<Area>> {
        let mut filter = Filter::eq("template", template);
        if !scene.is_empty() {
            filter = filter.and_eq("scene", scene);
        }
        Ok(self.store().find_records(&filter).await?)
    }

    /// Areas for each id in order; unknown ids are skipped.
    pub async fn areas_by_ids(&self, ids: &[String]) -> CacheResult<Vec<Area>> {
        let mut areas = Vec::with_capacity(ids.len());
        for uid in ids {
            if let Some(area) = self.find_area(uid).await? {
                areas.push(area);
            }
        }
        Ok(areas)
    }

    pub async fn update_area(&self, uid: &str, update: AreaUpdate, operator: &str) -> CacheResult<Area> {
        let update = match update {
            AreaUpdate::Serial(serial) => {
                let device = self.device_by_serial(&serial).await?;
                AreaUpdate::Serial(device.uid().to_string())
            }
            other => other,
        };

        let _guard = self.locks.area.lock().await;
        let mut area = self.get_area(uid).await?;
        let fields = update.apply(&mut area)?;
        self.store()
            .update_fields(Area::TABLE, uid, fields.touched(operator))
            .await?;
        area.base.touch(operator);
        Ok(area)
    }

    pub async fn remove_area(&self, uid: &str, operator: &str) -> CacheResult<()> {
        let area = self.get_area(uid).await?;
        self.store().tombstone(Area::TABLE, area.uid(), operator).await?;
        tracing::info!(area = %uid, operator = %operator, "Area removed");
        Ok(())
    }
}

// Device resolution through the shared lookup cache. A dangling reference
// resolves to `None`.
impl Area {
    pub async fn device_info(&self, cache: &SceneCache) -> CacheResult<Option<Device>> {
        if !self.is_bound() {
            return Ok(None);
        }
        cache.find_device(&self.device).await
    }

    /// Serial number of the bound device, empty when there is none.
    pub async fn device_serial(&self, cache: &SceneCache) -> CacheResult<String> {
        Ok(self
            .device_info(cache)
            .await?
            .map(|d| d.sn)
            .unwrap_or_default())
    }

    /// Display profile of the bound device, empty when there is none.
    pub async fn aspect(&self, cache: &SceneCache) -> CacheResult<String> {
        Ok(self
            .device_info(cache)
            .await?
            .map(|d| d.aspect)
            .unwrap_or_default())
    }
}
