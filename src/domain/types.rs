//! Shared value types embedded in aggregate records.

use serde::{Deserialize, Serialize};

/// Structured postal address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub country: String,
    pub province: String,
    pub city: String,
    pub zone: String,
}

/// Key/value override carried by areas (modules and custom sources).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairInfo {
    pub key: String,
    pub value: String,
}

impl PairInfo {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Replace the value of a matching key, otherwise append.
///
/// Returns `true` when the list changed.
pub fn upsert_pair(list: &mut Vec<PairInfo>, pair: PairInfo) -> bool {
    match list.iter_mut().find(|p| p.key == pair.key) {
        Some(existing) if existing.value == pair.value => false,
        Some(existing) => {
            existing.value = pair.value;
            true
        }
        None => {
            list.push(pair);
            true
        }
    }
}

/// Classification tag on a scene
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainTag {
    #[serde(rename = "type")]
    pub kind: u32,
    pub uid: String,
    pub keywords: Vec<String>,
    pub remark: String,
}

/// Automatic on/off schedule of a device, `HH:MM` strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSchedule {
    pub begin: String,
    pub stop: String,
}

impl AutoSchedule {
    pub fn is_enabled(&self) -> bool {
        !self.begin.is_empty() && !self.stop.is_empty()
    }
}

/// One typed entry of a maintenance ticket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintainContent {
    #[serde(rename = "type")]
    pub kind: u32,
    pub content: String,
    pub assets: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_matching_key() {
        let mut list = vec![PairInfo::new("a", "1"), PairInfo::new("b", "2")];

        assert!(upsert_pair(&mut list, PairInfo::new("a", "9")));
        assert_eq!(list, vec![PairInfo::new("a", "9"), PairInfo::new("b", "2")]);
    }

    #[test]
    fn test_upsert_appends_new_key() {
        let mut list = vec![PairInfo::new("a", "1")];

        assert!(upsert_pair(&mut list, PairInfo::new("c", "3")));
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].key, "c");
    }

    #[test]
    fn test_upsert_same_value_is_unchanged() {
        let mut list = vec![PairInfo::new("a", "1")];
        assert!(!upsert_pair(&mut list, PairInfo::new("a", "1")));
    }

    #[test]
    fn test_domain_tag_serializes_type_field() {
        let tag = DomainTag {
            kind: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json["type"], 3);
    }
}
