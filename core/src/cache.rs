//! Endpoint-keyed response cache with server-driven TTLs.
//!
//! # Design
//! Each entry lives for the `max-age` announced in the response's
//! `Cache-Control` header. Expiry is lazy: a stale entry is dropped by the
//! `check` that finds it, and nothing sweeps in the background unless the
//! owner calls `purge_expired`. All access goes through one mutex.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::CacheError;
use crate::types::ApiResponse;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: ApiResponse,
    /// `None` when `max-age` reaches past what `Instant` can represent; such
    /// an entry never expires.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached response for `endpoint` if it is still fresh. A
    /// stale entry is evicted.
    pub fn check(&self, endpoint: &str) -> Option<ApiResponse> {
        let mut entries = self.lock();
        let now = Instant::now();

        match entries.get(endpoint) {
            Some(entry) if entry.is_fresh(now) => {
                debug!(endpoint, "cache hit");
                Some(entry.response.clone())
            }
            Some(_) => {
                entries.remove(endpoint);
                debug!(endpoint, "cache entry expired, evicted");
                None
            }
            None => {
                debug!(endpoint, "cache miss");
                None
            }
        }
    }

    /// Store `response` under `endpoint` for the duration of its `max-age`
    /// directive, replacing any previous entry.
    pub fn add(&self, endpoint: &str, response: &ApiResponse) -> Result<Duration, CacheError> {
        let ttl = parse_max_age(response.raw.header("Cache-Control"))?;

        self.lock().insert(
            endpoint.to_string(),
            CacheEntry {
                response: response.clone(),
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        debug!(endpoint, ttl_secs = ttl.as_secs(), "cached response");
        Ok(ttl)
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Read the TTL from a `Cache-Control` value whose first directive must be
/// `max-age=<seconds>`.
pub fn parse_max_age(header: Option<&str>) -> Result<Duration, CacheError> {
    let header = header.ok_or(CacheError::MissingDirective)?;
    let first = header.split(',').next().unwrap_or_default().trim();

    let (name, value) = first
        .split_once('=')
        .ok_or_else(|| CacheError::MalformedDirective(header.to_string()))?;
    if !name.trim().eq_ignore_ascii_case("max-age") {
        return Err(CacheError::MalformedDirective(header.to_string()));
    }

    let value = value.trim();
    let secs: u64 = value.parse().map_err(|source| CacheError::InvalidMaxAge {
        value: value.to_string(),
        source,
    })?;
    Ok(Duration::from_secs(secs))
}
