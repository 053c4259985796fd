//! Aggregate module
//!
//! Plain records of the directory with their pure state logic. Every
//! aggregate is persisted as one document in its own table.

pub mod area;
pub mod device;
pub mod group;
pub mod maintain;
pub mod region;
pub mod room;
pub mod scene;

pub use area::Area;
pub use device::{Device, DeviceStatus};
pub use group::Group;
pub use maintain::Maintain;
pub use region::Region;
pub use room::Room;
pub use scene::{Scene, SceneStatus};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Table names of the document store
pub mod tables {
    pub const SCENE: &str = "scenes";
    pub const GROUP: &str = "scene_groups";
    pub const ROOM: &str = "scene_rooms";
    pub const REGION: &str = "scene_regions";
    pub const DEVICE: &str = "devices";
    pub const AREA: &str = "scene_areas";
    pub const MAINTAIN: &str = "device_maintains";
    pub const SEQUENCE: &str = "sequences";

    /// Aggregate tables, sequences excluded
    pub const ALL: [&str; 7] = [SCENE, GROUP, ROOM, REGION, DEVICE, AREA, MAINTAIN];
}

/// Record trait that all aggregates must implement
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table the record lives in
    const TABLE: &'static str;

    /// Entity name used in not-found and conflict messages
    const ENTITY: &'static str;

    fn base(&self) -> &BaseInfo;

    fn base_mut(&mut self) -> &mut BaseInfo;

    fn uid(&self) -> &str {
        &self.base().uid
    }

    fn name(&self) -> &str {
        &self.base().name
    }
}

/// Fields shared by every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseInfo {
    /// Object id, 24 hex digits
    pub uid: String,

    /// Sequence id assigned from the per-table counter
    pub id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub remark: String,

    #[serde(default)]
    pub creator: String,

    #[serde(default)]
    pub operator: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl BaseInfo {
    pub fn new(uid: String, id: u64, name: impl Into<String>, creator: impl Into<String>) -> Self {
        let now = Utc::now();
        let creator = creator.into();
        Self {
            uid,
            id,
            name: name.into(),
            remark: String::new(),
            operator: creator.clone(),
            creator,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    /// Mirror of a persisted write by `operator`.
    pub fn touch(&mut self, operator: &str) {
        self.operator = operator.to_string();
        self.updated_at = Utc::now();
    }
}

/// Generate a new object id: 4 bytes of seconds then 8 random bytes.
pub fn new_object_id() -> String {
    let seconds = Utc::now().timestamp() as u32;
    let random = Uuid::new_v4().simple().to_string();
    format!("{:08x}{}", seconds, &random[..16])
}

/// True when `uid` has the object id shape.
pub fn is_object_id(uid: &str) -> bool {
    uid.len() == 24 && uid.bytes().all(|b| b.is_ascii_hexdigit())
}
