//! Group Aggregate
//!
//! A department or virtual team inside a scene.

use serde::{Deserialize, Serialize};

use crate::domain::{Address, Membership};

use super::{tables, BaseInfo, Record};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(flatten)]
    pub base: BaseInfo,

    /// Owning scene
    pub scene: String,

    #[serde(default)]
    pub cover: String,

    /// Contact phone
    #[serde(default)]
    pub contact: String,

    #[serde(default)]
    pub master: String,

    #[serde(default)]
    pub assistant: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub address: Address,

    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupDraft {
    pub name: String,
    pub remark: String,
    pub contact: String,
    pub master: String,
    pub cover: String,
    pub location: String,
    pub address: Address,
}

impl Group {
    pub fn create(uid: String, id: u64, scene: &str, draft: GroupDraft, operator: &str) -> Self {
        Self {
            base: BaseInfo::new(uid, id, draft.name, operator).with_remark(draft.remark),
            scene: scene.to_string(),
            cover: draft.cover,
            contact: draft.contact,
            master: draft.master,
            assistant: String::new(),
            location: draft.location,
            address: draft.address,
            members: Vec::new(),
        }
    }
}

impl Record for Group {
    const TABLE: &'static str = tables::GROUP;
    const ENTITY: &'static str = "group";

    fn base(&self) -> &BaseInfo {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseInfo {
        &mut self.base
    }
}

/// The assistant is not counted; only the master is an implicit member.
impl Membership for Group {
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
