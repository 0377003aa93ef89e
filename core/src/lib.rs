//! Synchronous client core for a remote content-management API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values; the caller
//! supplies a `Transport` that performs the actual round-trip (host-does-IO).
//! On top of that split the crate provides:
//!
//! - `ResponseCache`: endpoint-keyed cache whose TTL comes from the
//!   response's `Cache-Control: max-age` directive, expired lazily.
//! - `ValueSet`: multi-valued form data with `key.0 … key.(n-1)` indexing for
//!   repeated fields, filled from any `Serialize` record by `to_values`.
//! - `multipart_request`: `multipart/form-data` bodies with file uploads.
//! - `parse_reference_uri`: typed lookups from embedded reference URIs.

pub mod cache;
pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod http;
pub mod multipart;
pub mod reference;
pub mod types;
pub mod values;

pub use cache::ResponseCache;
pub use client::{CacheStatus, ContentClient, Fetched};
pub use config::ClientConfig;
pub use encoding::{to_values, to_values_indexed, FieldShape};
pub use error::{ApiError, CacheError, ReferenceError, TransportError};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use multipart::{multipart_request, MultipartForm};
pub use reference::{parse_reference_uri, Target};
pub use types::{ApiResponse, Order, QueryOptions, Record};
pub use values::{Arity, FieldValue, ValueSet};
