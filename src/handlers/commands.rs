//! Command definitions
//!
//! Requests and replies shared by every aggregate handler.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, Page};
use crate::error::{AppError, ResultStatus};

// =========================================================================
// Requests
// =========================================================================

/// `GetListByFilter`: `key` selects one of the aggregate's named query modes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    pub key: String,
    pub value: String,
    /// Owning scene, for modes scoped to one
    pub scene: String,
    /// Ids for the `array` mode
    pub values: Vec<String>,
    /// 1-based page, 0 for everything
    pub page: u32,
    /// Page size, 0 for the configured default
    pub number: u32,
}

impl FilterRequest {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = scene.into();
        self
    }

    pub fn with_page(mut self, page: u32, number: u32) -> Self {
        self.page = page;
        self.number = number;
        self
    }
}

/// `UpdateBase`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseRequest {
    pub uid: String,
    pub name: String,
    pub remark: String,
}

/// `UpdateByFilter`: `key` names the field, `value` carries it as text
/// (JSON text for structured fields)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRequest {
    pub uid: String,
    pub key: String,
    pub value: String,
}

impl UpdateRequest {
    pub fn new(uid: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// `AppendMember` / `SubtractMember`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberRequest {
    pub uid: String,
    pub member: String,
}

/// `AppendDevice` / `SubtractDevice`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRequest {
    pub uid: String,
    /// Target area, for room requests
    pub area: String,
    pub device: String,
    #[serde(rename = "type")]
    pub kind: u32,
}

// =========================================================================
// Replies
// =========================================================================

/// Success body: the status code next to the payload
#[derive(Debug, Clone, Serialize)]
pub struct Reply<T> {
    pub code: ResultStatus,
    pub data: T,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: ResultStatus::Ok,
            data,
        }
    }
}

/// Payload of a list request
#[derive(Debug, Clone, Serialize)]
pub struct ListReply<T> {
    pub total: u32,
    pub pages: u32,
    pub list: Vec<T>,
}

impl<T> From<Page<T>> for ListReply<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            total: page.total,
            pages: page.max_page,
            list: page.items,
        }
    }
}

impl<T> From<Vec<T>> for ListReply<T> {
    fn from(list: Vec<T>) -> Self {
        Self {
            total: list.len() as u32,
            pages: 1,
            list,
        }
    }
}

// =========================================================================
// Input helpers
// =========================================================================

/// Reject an empty required input before reaching the cache.
pub fn required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::EmptyInput(field.to_string()));
    }
    Ok(())
}

pub fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, DomainError> {
    value
        .trim()
        .parse()
        .map_err(|_| DomainError::invalid_value(key, value))
}

pub fn parse_json<T: DeserializeOwned>(key: &str, value: &str) -> Result<T, DomainError> {
    serde_json::from_str(value).map_err(|_| DomainError::invalid_value(key, value))
}

pub fn unknown_key(key: &str) -> AppError {
    DomainError::UnknownKey(key.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{paginate, Address};

    #[test]
    fn test_list_reply_from_page() {
        let reply: ListReply<u32> = paginate(2, 2, vec![1, 2, 3]).into();
        assert_eq!(reply.total, 3);
        assert_eq!(reply.pages, 2);
        assert_eq!(reply.list, vec![3]);
    }

    #[test]
    fn test_parse_number_rejects_text() {
        assert_eq!(parse_number::<u8>("type", " 3 ").unwrap(), 3);
        assert!(matches!(
            parse_number::<u8>("type", "three"),
            Err(DomainError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_json_address() {
        let address: Address = parse_json("address", r#"{"city":"Hangzhou"}"#).unwrap();
        assert_eq!(address.city, "Hangzhou");
        assert!(parse_json::<Address>("address", "not json").is_err());
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(matches!(required("uid", " "), Err(AppError::EmptyInput(_))));
        assert!(required("uid", "abc").is_ok());
    }

    #[test]
    fn test_filter_request_defaults() {
        let request: FilterRequest = serde_json::from_str(r#"{"key":"type","value":"2"}"#).unwrap();
        assert_eq!(request.page, 0);
        assert!(request.values.is_empty());
    }
}
