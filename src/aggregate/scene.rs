//! Scene Aggregate
//!
//! Root of the directory: a venue that owns groups, rooms, regions, areas,
//! devices and maintenance records by reference.

use serde::{Deserialize, Serialize};

use crate::domain::{Address, DomainError, DomainTag, Membership};

use super::{tables, BaseInfo, Record};

/// Scene status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SceneStatus {
    #[default]
    Idle,
    Frozen,
}

impl From<SceneStatus> for u8 {
    fn from(status: SceneStatus) -> Self {
        match status {
            SceneStatus::Idle => 0,
            SceneStatus::Frozen => 1,
        }
    }
}

impl TryFrom<u8> for SceneStatus {
    type Error = DomainError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Frozen),
            other => Err(DomainError::invalid_value("status", other.to_string())),
        }
    }
}

/// Scene Aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(flatten)]
    pub base: BaseInfo,

    /// Venue category
    #[serde(rename = "type", default)]
    pub kind: u8,

    #[serde(default)]
    pub status: SceneStatus,

    #[serde(default)]
    pub short: String,

    #[serde(default)]
    pub cover: String,

    /// Single privileged member, unique across scenes
    #[serde(default)]
    pub master: String,

    #[serde(default)]
    pub supporter: String,

    #[serde(default)]
    pub bucket: String,

    #[serde(default)]
    pub entity: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub address: Address,

    /// Parent groupings this scene belongs to
    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(default)]
    pub members: Vec<String>,

    #[serde(default)]
    pub domains: Vec<DomainTag>,
}

/// Input for a new scene
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SceneDraft {
    pub name: String,
    pub remark: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub master: String,
    pub entity: String,
    pub short: String,
    pub cover: String,
    pub location: String,
    pub address: Address,
    pub parents: Vec<String>,
}

impl Scene {
    pub fn create(uid: String, id: u64, draft: SceneDraft, operator: &str) -> Self {
        Self {
            base: BaseInfo::new(uid, id, draft.name, operator).with_remark(draft.remark),
            kind: draft.kind,
            status: SceneStatus::Idle,
            short: draft.short,
            cover: draft.cover,
            master: draft.master,
            supporter: String::new(),
            bucket: String::new(),
            entity: draft.entity,
            location: draft.location,
            address: draft.address,
            parents: draft.parents,
            members: Vec::new(),
            domains: Vec::new(),
        }
    }

    pub fn has_parent(&self, parent: &str) -> bool {
        self.parents.iter().any(|p| p == parent)
    }

    /// Master first, then listed members.
    pub fn all_members(&self) -> Vec<String> {
        let mut all = Vec::with_capacity(self.members.len() + 1);
        if !self.master.is_empty() {
            all.push(self.master.clone());
        }
        all.extend(self.members.iter().filter(|m| **m != self.master).cloned());
        all
    }
}

impl Record for Scene {
    const TABLE: &'static str = tables::SCENE;
    const ENTITY: &'static str = "scene";

    fn base(&self) -> &BaseInfo {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseInfo {
        &mut self.base
    }
}

impl Membership for Scene {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::new_object_id;

    fn museum() -> Scene {
        Scene::create(
            new_object_id(),
            1,
            SceneDraft {
                name: "Museum A".into(),
                master: "curator".into(),
                parents: vec!["city".into()],
                ..Default::default()
            },
            "admin",
        )
    }

    #[test]
    fn test_create_scene() {
        let scene = museum();
        assert_eq!(scene.name(), "Museum A");
        assert_eq!(scene.status, SceneStatus::Idle);
        assert_eq!(scene.base.creator, "admin");
        assert!(scene.members.is_empty());
        assert!(scene.has_parent("city"));
    }

    #[test]
    fn test_master_counts_as_member() {
        let scene = museum();
        assert!(scene.has_member("curator"));
        assert_eq!(scene.all_members(), vec!["curator".to_string()]);
    }

    #[test]
    fn test_status_round_trips_as_code() {
        let mut scene = museum();
        scene.status = SceneStatus::Frozen;

        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["status"], 1);
        assert_eq!(json["type"], 0);

        let back: Scene = serde_json::from_value(json).unwrap();
        assert_eq!(back.status, SceneStatus::Frozen);
    }

    #[test]
    fn test_unknown_status_code_rejected() {
        assert!(SceneStatus::try_from(7).is_err());
    }
}
