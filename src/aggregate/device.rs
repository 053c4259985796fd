//! Device Aggregate
//!
//! A physical terminal. Globally identified by serial number, bound into a
//! scene, and activated with a quote token. Its status is derived from those
//! two facts.

use serde::{Deserialize, Serialize};

use crate::domain::{AutoSchedule, DomainError};

use super::{tables, BaseInfo, Record};

/// Device lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DeviceStatus {
    /// No scene, no activation token
    #[default]
    Idle,
    /// Activation token, no scene
    Awake,
    /// Scene and activation token
    Using,
    /// Scene, no activation token
    PendingSleep,
    /// Terminal state
    Discarded,
}

impl DeviceStatus {
    /// Derive the status from the two binding facts.
    pub fn derive(scene_set: bool, token_set: bool) -> Self {
        match (scene_set, token_set) {
            (false, false) => Self::Idle,
            (false, true) => Self::Awake,
            (true, false) => Self::PendingSleep,
            (true, true) => Self::Using,
        }
    }

    pub fn code(self) -> u8 {
        self.into()
    }
}

impl From<DeviceStatus> for u8 {
    fn from(status: DeviceStatus) -> Self {
        match status {
            DeviceStatus::Idle => 0,
            DeviceStatus::Awake => 1,
            DeviceStatus::Using => 2,
            DeviceStatus::PendingSleep => 3,
            DeviceStatus::Discarded => 99,
        }
    }
}

impl TryFrom<u8> for DeviceStatus {
    type Error = DomainError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Awake),
            2 => Ok(Self::Using),
            3 => Ok(Self::PendingSleep),
            99 => Ok(Self::Discarded),
            other => Err(DomainError::invalid_value("status", other.to_string())),
        }
    }
}

/// Device Aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(flatten)]
    pub base: BaseInfo,

    /// Serial number, unique among live devices
    pub sn: String,

    /// Owning scene, empty when unassigned
    #[serde(default)]
    pub scene: String,

    #[serde(rename = "type", default)]
    pub kind: u8,

    #[serde(default)]
    pub status: DeviceStatus,

    /// Operating system tag
    #[serde(default)]
    pub os: String,

    /// Display profile
    #[serde(default)]
    pub aspect: String,

    /// Activation token
    #[serde(default)]
    pub quote: String,

    /// Activation time, unix seconds
    #[serde(default)]
    pub activated: i64,

    /// Validity after activation, seconds
    #[serde(default)]
    pub expiry: u32,

    #[serde(default)]
    pub certificate: String,

    #[serde(default)]
    pub meta: String,

    #[serde(default)]
    pub auto: AutoSchedule,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceDraft {
    pub name: String,
    pub remark: String,
    pub sn: String,
    pub scene: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

/// Activation data written by a bind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Binding {
    pub quote: String,
    pub os: String,
    pub activated: i64,
    pub expiry: u32,
}

impl Device {
    pub fn create(uid: String, id: u64, draft: DeviceDraft, operator: &str) -> Self {
        let mut device = Self {
            base: BaseInfo::new(uid, id, draft.name, operator).with_remark(draft.remark),
            sn: draft.sn,
            scene: draft.scene,
            kind: draft.kind,
            status: DeviceStatus::Idle,
            os: String::new(),
            aspect: String::new(),
            quote: String::new(),
            activated: 0,
            expiry: 0,
            certificate: String::new(),
            meta: String::new(),
            auto: AutoSchedule::default(),
        };
        device.status = device.expected_status();
        device
    }

    pub fn is_discarded(&self) -> bool {
        self.status == DeviceStatus::Discarded
    }

    /// Status implied by the current fields. Discarded is sticky.
    pub fn expected_status(&self) -> DeviceStatus {
        if self.is_discarded() {
            return DeviceStatus::Discarded;
        }
        DeviceStatus::derive(!self.scene.is_empty(), !self.quote.is_empty())
    }

    /// Apply the derived status. Returns `true` when it changed.
    pub fn recompute_status(&mut self) -> bool {
        let next = self.expected_status();
        let changed = next != self.status;
        self.status = next;
        changed
    }

    pub fn apply_binding(&mut self, binding: &Binding) {
        self.quote = binding.quote.clone();
        self.os = binding.os.clone();
        self.activated = binding.activated;
        self.expiry = binding.expiry;
    }
}

impl Record for Device {
    const TABLE: &'static str = tables::DEVICE;
    const ENTITY: &'static str = "device";

    fn base(&self) -> &BaseInfo {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseInfo {
        &mut self.base
    }
}
