//! Maintain Aggregate
//!
//! Append-only service ticket for an area. Immutable once created.

use serde::{Deserialize, Serialize};

use crate::domain::MaintainContent;

use super::{tables, BaseInfo, Record};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintain {
    #[serde(flatten)]
    pub base: BaseInfo,

    pub scene: String,

    pub area: String,

    /// Device bound to the area when the ticket was opened
    #[serde(default)]
    pub device: String,

    #[serde(rename = "type", default)]
    pub kind: u8,

    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub submitter: String,

    /// Customer contact
    #[serde(default)]
    pub contacts: String,

    #[serde(default)]
    pub maintainers: Vec<String>,

    #[serde(default)]
    pub contents: Vec<MaintainContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MaintainDraft {
    pub name: String,
    pub remark: String,
    pub area: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub date: String,
    pub submitter: String,
    pub contacts: String,
    pub maintainers: Vec<String>,
    pub contents: Vec<MaintainContent>,
}

impl Maintain {
    pub fn create(
        uid: String,
        id: u64,
        scene: &str,
        device: &str,
        draft: MaintainDraft,
        operator: &str,
    ) -> Self {
        Self {
            base: BaseInfo::new(uid, id, draft.name, operator).with_remark(draft.remark),
            scene: scene.to_string(),
            area: draft.area,
            device: device.to_string(),
            kind: draft.kind,
            date: draft.date,
            submitter: draft.submitter,
            contacts: draft.contacts,
            maintainers: draft.maintainers,
            contents: draft.contents,
        }
    }
}

impl Record for Maintain {
    const TABLE: &'static str = tables::MAINTAIN;
    const ENTITY: &'static str = "maintain";

    fn base(&self) -> &BaseInfo {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseInfo {
        &mut self.base
    }
}
