//! Region Aggregate
//!
//! An administrative-boundary node. Regions of a scene form a tree through
//! their parent link.

use serde::{Deserialize, Serialize};

use crate::domain::{Address, Membership};

use super::{tables, BaseInfo, Record};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(flatten)]
    pub base: BaseInfo,

    pub scene: String,

    /// Parent region, empty for a root
    #[serde(default)]
    pub parent: String,

    #[serde(default)]
    pub entity: String,

    /// Administrative code
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub master: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub address: Address,

    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegionDraft {
    pub name: String,
    pub remark: String,
    pub parent: String,
    pub entity: String,
    pub code: String,
    pub master: String,
    pub location: String,
    pub address: Address,
}

impl Region {
    pub fn create(uid: String, id: u64, scene: &str, draft: RegionDraft, operator: &str) -> Self {
        Self {
            base: BaseInfo::new(uid, id, draft.name, operator).with_remark(draft.remark),
            scene: scene.to_string(),
            parent: draft.parent,
            entity: draft.entity,
            code: draft.code,
            master: draft.master,
            location: draft.location,
            address: draft.address,
            members: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_empty()
    }
}

impl Record for Region {
    const TABLE: &'static str = tables::REGION;
    const ENTITY: &'static str = "region";

    fn base(&self) -> &BaseInfo {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseInfo {
        &mut self.base
    }
}

impl Membership for Region {
    fn master(&self) -> &str {
        &self.master
    }

    fn members(&self) -> &[String] {
        &self.members
    }

    fn members_mut(&mut self) -> &mut Vec<String> {
        &mut self.members
    }
}
