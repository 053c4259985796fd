//! Area Aggregate
//!
//! A spatial slot inside a room, optionally bound to one device, with its
//! product configuration.

use serde::{Deserialize, Serialize};

use crate::domain::{upsert_pair, PairInfo};

use super::{tables, BaseInfo, Record};

pub const MODULES_FIELD: &str = "modules";
pub const SOURCES_FIELD: &str = "sources";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    #[serde(flatten)]
    pub base: BaseInfo,

    pub scene: String,

    /// Owning room
    pub parent: String,

    /// Product type
    #[serde(rename = "type", default)]
    pub kind: u32,

    #[serde(default)]
    pub width: i32,

    #[serde(default)]
    pub height: i32,

    /// Product configuration template
    #[serde(default)]
    pub template: String,

    /// Bound device uid, empty when unbound
    #[serde(default)]
    pub device: String,

    /// Question mode tag used by the terminal
    #[serde(default)]
    pub question: String,

    /// Free-form catalog blob
    #[serde(default)]
    pub catalog: String,

    /// Maximum number of items on display
    #[serde(default)]
    pub limit: u32,

    #[serde(default)]
    pub displays: Vec<String>,

    #[serde(default)]
    pub modules: Vec<PairInfo>,

    #[serde(default)]
    pub sources: Vec<PairInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AreaDraft {
    pub name: String,
    pub remark: String,
    /// Owning room
    pub parent: String,
    #[serde(rename = "type")]
    pub kind: u32,
    pub template: String,
    pub width: i32,
    pub height: i32,
}

impl Area {
    pub fn create(uid: String, id: u64, scene: &str, draft: AreaDraft, operator: &str) -> Self {
        Self {
            base: BaseInfo::new(uid, id, draft.name, operator).with_remark(draft.remark),
            scene: scene.to_string(),
            parent: draft.parent,
            kind: draft.kind,
            width: draft.width,
            height: draft.height,
            template: draft.template,
            device: String::new(),
            question: String::new(),
            catalog: String::new(),
            limit: 0,
            displays: Vec::new(),
            modules: Vec::new(),
            sources: Vec::new(),
        }
    }

    pub fn is_bound(&self) -> bool {
        !self.device.is_empty()
    }

    pub fn is_bound_to(&self, device: &str) -> bool {
        !device.is_empty() && self.device == device
    }

    /// Module list after setting `key` to `value`.
    pub fn modules_with(&self, key: &str, value: &str) -> Vec<PairInfo> {
        let mut list = self.modules.clone();
        upsert_pair(&mut list, PairInfo::new(key, value));
        list
    }

    /// Custom source list after setting `key` to `value`.
    pub fn sources_with(&self, key: &str, value: &str) -> Vec<PairInfo> {
        let mut list = self.sources.clone();
        upsert_pair(&mut list, PairInfo::new(key, value));
        list
    }
}

impl Record for Area {
    const TABLE: &'static str = tables::AREA;
    const ENTITY: &'static str = "area";

    fn base(&self) -> &BaseInfo {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseInfo {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::new_object_id;

    fn area() -> Area {
        Area::create(
            new_object_id(),
            1,
            "scene",
            AreaDraft {
                name: "Left wall".into(),
                parent: "room".into(),
                kind: 1,
                ..Default::default()
            },
            "op",
        )
    }

    #[test]
    fn test_new_area_is_unbound() {
        let area = area();
        assert!(!area.is_bound());
        assert!(!area.is_bound_to(""));
        assert_eq!(area.kind, 1);
        assert_eq!(area.parent, "room");
    }

    #[test]
    fn test_module_override_last_write_wins() {
        let mut area = area();
        area.modules = area.modules_with("player", "v1");
        area.modules = area.modules_with("quiz", "on");
        area.modules = area.modules_with("player", "v2");

        assert_eq!(
            area.modules,
            vec![PairInfo::new("player", "v2"), PairInfo::new("quiz", "on")]
        );
    }

    #[test]
    fn test_sources_do_not_touch_modules() {
        let area = area();
        let sources = area.sources_with("logo", "a.png");
        assert_eq!(sources.len(), 1);
        assert!(area.modules.is_empty());
    }
}
