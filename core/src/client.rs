//! Request builders, response parsing and cached orchestration for the
//! content API.
//!
//! # Design
//! `ContentClient` follows the host-does-IO split: every operation has a
//! `build_*` method that produces an `HttpRequest` and the shared
//! `parse_response` that consumes an `HttpResponse`. The convenience methods
//! (`content`, `contents`, `create`, ...) wire the two together through a
//! caller-supplied `Transport` and, for reads, the `ResponseCache`.
//!
//! The cache key is the full request URL. Write operations are never cached
//! and do not invalidate cached reads.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::config::ClientConfig;
use crate::encoding::to_values;
use crate::error::{ApiError, CacheError};
use crate::http::{merge_headers, HttpRequest, HttpResponse, Transport};
use crate::multipart::multipart_request;
use crate::reference::{parse_reference_uri, Target};
use crate::types::{ApiResponse, Envelope, QueryOptions};
use crate::values::ValueSet;

/// What happened to the cache during a read.
#[derive(Debug)]
pub enum CacheStatus {
    /// Served from the cache; no request was made.
    Hit,
    /// Fetched and stored for the given TTL.
    Stored(Duration),
    /// Fetched, but the response could not be cached.
    Skipped(CacheError),
    /// The client was configured without a cache.
    Disabled,
}

/// Result of a read operation.
#[derive(Debug)]
pub struct Fetched {
    pub response: ApiResponse,
    pub cache: CacheStatus,
}

impl Fetched {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.cache, CacheStatus::Hit)
    }
}

#[derive(Debug)]
pub struct ContentClient {
    config: ClientConfig,
    cache: Option<ResponseCache>,
}

impl ContentClient {
    pub fn new(config: ClientConfig) -> Self {
        let cache = (!config.disable_cache).then(ResponseCache::new);
        Self { config, cache }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in params {
            query.append_pair(k, v);
        }
        format!("{}{path}?{}", self.config.host, query.finish())
    }

    fn get(&self, path: &str, params: &[(&str, &str)]) -> HttpRequest {
        merge_headers(HttpRequest::get(self.url(path, params)), &self.config.headers)
    }

    fn post(
        &self,
        path: &str,
        params: &[(&str, &str)],
        values: &ValueSet,
        file_keys: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        let req = multipart_request(&self.url(path, params), values, file_keys)?;
        Ok(merge_headers(req, &self.config.headers))
    }

    // ---------------------------------------------------------------------
    // Request builders
    // ---------------------------------------------------------------------

    pub fn build_content(&self, content_type: &str, id: i64) -> HttpRequest {
        self.get(
            "/api/content",
            &[("type", content_type), ("id", &id.to_string())],
        )
    }

    pub fn build_content_by_slug(&self, slug: &str) -> HttpRequest {
        self.get("/api/content", &[("slug", slug)])
    }

    pub fn build_contents(&self, content_type: &str, opts: &QueryOptions) -> HttpRequest {
        self.get(
            "/api/contents",
            &[
                ("type", content_type),
                ("count", &opts.effective_count().to_string()),
                ("offset", &opts.offset.to_string()),
                ("order", opts.order.as_str()),
            ],
        )
    }

    pub fn build_search(&self, content_type: &str, query: &str, opts: &QueryOptions) -> HttpRequest {
        self.get(
            "/api/search",
            &[
                ("type", content_type),
                ("q", query),
                ("count", &opts.effective_count().to_string()),
                ("offset", &opts.offset.to_string()),
            ],
        )
    }

    pub fn build_upload_by_slug(&self, slug: &str) -> HttpRequest {
        self.get("/api/uploads", &[("slug", slug)])
    }

    pub fn build_create(
        &self,
        content_type: &str,
        values: &ValueSet,
        file_keys: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        self.post(
            "/api/content/create",
            &[("type", content_type)],
            values,
            file_keys,
        )
    }

    pub fn build_update(
        &self,
        content_type: &str,
        id: i64,
        values: &ValueSet,
        file_keys: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        self.post(
            "/api/content/update",
            &[("type", content_type), ("id", &id.to_string())],
            values,
            file_keys,
        )
    }

    pub fn build_delete(&self, content_type: &str, id: i64) -> Result<HttpRequest, ApiError> {
        self.post(
            "/api/content/delete",
            &[("type", content_type), ("id", &id.to_string())],
            &ValueSet::new(),
            &[],
        )
    }

    // ---------------------------------------------------------------------
    // Response parsing
    // ---------------------------------------------------------------------

    /// Decode the `{ "data": [...] }` envelope. Failures keep the raw response
    /// inside the error.
    pub fn parse_response(&self, response: HttpResponse) -> Result<ApiResponse, ApiError> {
        if response.body.trim().is_empty() {
            return Err(ApiError::EmptyBody {
                status_text: response.status_text(),
                response: Box::new(response),
            });
        }

        match serde_json::from_str::<Envelope>(&response.body) {
            Ok(envelope) => Ok(ApiResponse {
                raw: response,
                data: envelope.data,
            }),
            Err(e) => Err(ApiError::Decode {
                reason: e.to_string(),
                response: Box::new(response),
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Orchestrated calls
    // ---------------------------------------------------------------------

    /// Serve `request` from the cache, or execute it and cache the result.
    pub fn fetch<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: HttpRequest,
    ) -> Result<Fetched, ApiError> {
        let endpoint = request.path.clone();

        if let Some(cache) = &self.cache {
            if let Some(response) = cache.check(&endpoint) {
                return Ok(Fetched {
                    response,
                    cache: CacheStatus::Hit,
                });
            }
        }

        let response = self.submit(transport, request)?;

        let status = match &self.cache {
            None => CacheStatus::Disabled,
            Some(cache) => match cache.add(&endpoint, &response) {
                Ok(ttl) => CacheStatus::Stored(ttl),
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "response not cached");
                    CacheStatus::Skipped(e)
                }
            },
        };

        Ok(Fetched {
            response,
            cache: status,
        })
    }

    /// Execute `request` without touching the cache.
    pub fn submit<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: HttpRequest,
    ) -> Result<ApiResponse, ApiError> {
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let response = transport.execute(request).map_err(ApiError::Transport)?;
        self.parse_response(response)
    }

    pub fn content<T: Transport + ?Sized>(
        &self,
        transport: &T,
        content_type: &str,
        id: i64,
    ) -> Result<Fetched, ApiError> {
        self.fetch(transport, self.build_content(content_type, id))
    }

    pub fn content_by_slug<T: Transport + ?Sized>(
        &self,
        transport: &T,
        slug: &str,
    ) -> Result<Fetched, ApiError> {
        self.fetch(transport, self.build_content_by_slug(slug))
    }

    /// Resolve a reference URI found in another record and fetch its target.
    pub fn content_by_reference<T: Transport + ?Sized>(
        &self,
        transport: &T,
        uri: &str,
    ) -> Result<Fetched, ApiError> {
        let Target { content_type, id } = parse_reference_uri(uri)?;
        self.content(transport, &content_type, id)
    }

    pub fn contents<T: Transport + ?Sized>(
        &self,
        transport: &T,
        content_type: &str,
        opts: &QueryOptions,
    ) -> Result<Fetched, ApiError> {
        self.fetch(transport, self.build_contents(content_type, opts))
    }

    pub fn search<T: Transport + ?Sized>(
        &self,
        transport: &T,
        content_type: &str,
        query: &str,
        opts: &QueryOptions,
    ) -> Result<Fetched, ApiError> {
        self.fetch(transport, self.build_search(content_type, query, opts))
    }

    pub fn upload_by_slug<T: Transport + ?Sized>(
        &self,
        transport: &T,
        slug: &str,
    ) -> Result<Fetched, ApiError> {
        self.fetch(transport, self.build_upload_by_slug(slug))
    }

    /// Create a content item from `record`. Fields listed in `file_keys` hold
    /// local paths whose files are uploaded.
    pub fn create<T, R>(
        &self,
        transport: &T,
        content_type: &str,
        record: &R,
        file_keys: &[&str],
    ) -> Result<ApiResponse, ApiError>
    where
        T: Transport + ?Sized,
        R: Serialize + ?Sized,
    {
        let values = to_values(record)?;
        let request = self.build_create(content_type, &values, file_keys)?;
        self.submit(transport, request)
    }

    pub fn update<T, R>(
        &self,
        transport: &T,
        content_type: &str,
        id: i64,
        record: &R,
        file_keys: &[&str],
    ) -> Result<ApiResponse, ApiError>
    where
        T: Transport + ?Sized,
        R: Serialize + ?Sized,
    {
        let values = to_values(record)?;
        let request = self.build_update(content_type, id, &values, file_keys)?;
        self.submit(transport, request)
    }

    pub fn delete<T: Transport + ?Sized>(
        &self,
        transport: &T,
        content_type: &str,
        id: i64,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.build_delete(content_type, id)?;
        self.submit(transport, request)
    }
}
