//! Domain types for the content API.
//!
//! # Design
//! Content records are schema-less on the client side: the server decides
//! which fields a content type has, so records are kept as JSON maps.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::HttpResponse;

/// A single content record as returned by the API.
pub type Record = Map<String, Value>;

/// Decoded `{ "data": [...] }` envelope together with the raw response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub raw: HttpResponse,
    pub data: Vec<Record>,
}

impl ApiResponse {
    /// First record of the envelope, if any.
    pub fn first(&self) -> Option<&Record> {
        self.data.first()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub data: Vec<Record>,
}

/// Sort order for collection queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_COUNT: u32 = 10;

/// Paging options for `contents` and `search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Page size; 0 means "unspecified" and is sent as the default of 10.
    pub count: u32,
    pub offset: u32,
    pub order: Order,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            offset: 0,
            order: Order::Desc,
        }
    }
}

impl QueryOptions {
    pub(crate) fn effective_count(&self) -> u32 {
        if self.count == 0 {
            DEFAULT_COUNT
        } else {
            self.count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_without_data_is_empty() {
        let env: Envelope = serde_json::from_str("{}").unwrap();
        assert!(env.data.is_empty());
    }

    #[test]
    fn envelope_rejects_non_record_items() {
        let result: Result<Envelope, _> = serde_json::from_str(r#"{"data":[1,2]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn query_options_defaults() {
        let opts = QueryOptions::default();
        assert_eq!(opts.count, 10);
        assert_eq!(opts.offset, 0);
        assert_eq!(opts.order, Order::Desc);

        let zero = QueryOptions {
            count: 0,
            ..QueryOptions::default()
        };
        assert_eq!(zero.effective_count(), 10);
    }

    #[test]
    fn order_deserializes_uppercase() {
        let opts: QueryOptions = serde_json::from_str(r#"{"order":"ASC"}"#).unwrap();
        assert_eq!(opts.order, Order::Asc);
        assert_eq!(opts.count, 10);
    }
}
