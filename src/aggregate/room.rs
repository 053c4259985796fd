//! Room Aggregate
//!
//! A venue sub-location. Holds the quote tokens it currently claims.

use serde::{Deserialize, Serialize};

use super::{tables, BaseInfo, Record};

/// Store field holding the quote list.
pub const QUOTES_FIELD: &str = "quotes";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(flatten)]
    pub base: BaseInfo,

    pub scene: String,

    #[serde(default)]
    pub quotes: Vec<String>,
}

impl Room {
    pub fn create(uid: String, id: u64, scene: &str, name: &str, remark: &str, operator: &str) -> Self {
        Self {
            base: BaseInfo::new(uid, id, name, operator).with_remark(remark),
            scene: scene.to_string(),
            quotes: Vec::new(),
        }
    }

    pub fn has_quote(&self, quote: &str) -> bool {
        self.quotes.iter().any(|q| q == quote)
    }

    /// True if the room claims any of `tokens`.
    pub fn holds_any(&self, tokens: &[String]) -> bool {
        tokens.iter().any(|t| self.has_quote(t))
    }

    /// Quotes left after releasing every token in `tokens`.
    pub fn quotes_without(&self, tokens: &[String]) -> Vec<String> {
        self.quotes
            .iter()
            .filter(|q| !tokens.contains(q))
            .cloned()
            .collect()
    }
}

/// Dedup while keeping first-seen order.
pub fn normalize_quotes(tokens: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if !token.is_empty() && !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

impl Record for Room {
    const TABLE: &'static str = tables::ROOM;
    const ENTITY: &'static str = "room";

    fn base(&self) -> &BaseInfo {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseInfo {
        &mut self.base
    }
}
