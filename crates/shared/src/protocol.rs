use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Filters, Record};

/// Parameters handed to a page fetch. Filters serialize flattened next to `page` and `pageSize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(flatten)]
    pub filters: Filters,
}

impl PageQuery {
    pub fn new(page: u32, page_size: u32, filters: Filters) -> Self {
        Self {
            page,
            page_size,
            filters,
        }
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// `limit`/`offset` followed by the filter pairs, ready for a query string.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("limit".to_string(), self.limit().to_string()),
            ("offset".to_string(), self.offset().to_string()),
        ];
        pairs.extend(filter_query_pairs(&self.filters));
        pairs
    }
}

/// Encodes filters as query parameters. Nulls and blank strings are treated as "no filter".
pub fn filter_query_pairs(filters: &Filters) -> Vec<(String, String)> {
    filters
        .iter()
        .filter_map(|(key, value)| {
            let encoded = match value {
                Value::Null => return None,
                Value::String(text) if text.trim().is_empty() => return None,
                Value::String(text) => text.clone(),
                Value::Bool(_) | Value::Number(_) => value.to_string(),
                Value::Array(_) | Value::Object(_) => value.to_string(),
            };
            Some((key.clone(), encoded))
        })
        .collect()
}

/// Result shapes a page fetch may produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPage {
    Bare(Vec<Record>),
    Wrapped(WrappedPage),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrappedPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl RawPage {
    pub fn empty() -> Self {
        RawPage::Wrapped(WrappedPage::default())
    }

    /// Parses a response body. A JSON `null` is an empty page.
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        if value.is_null() {
            return Ok(Self::empty());
        }
        serde_json::from_value(value)
    }

    pub fn normalize(&self) -> PageResult {
        match self {
            RawPage::Bare(items) => PageResult {
                total: items.len() as u64,
                items: items.clone(),
            },
            RawPage::Wrapped(page) => {
                let items = page
                    .data
                    .as_ref()
                    .or(page.items.as_ref())
                    .cloned()
                    .unwrap_or_default();
                let total = page.total.or(page.count).unwrap_or(items.len() as u64);
                PageResult { items, total }
            }
        }
    }
}

impl From<Vec<Record>> for RawPage {
    fn from(items: Vec<Record>) -> Self {
        RawPage::Bare(items)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub items: Vec<Record>,
    pub total: u64,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
