//! Session-scoped memo of downloaded bodies.
//!
//! Entries are keyed by `(url, bucket)` where the bucket is the Unix
//! timestamp divided by the bucket length. A new bucket means a fresh fetch;
//! older buckets are evicted on insert.
//!
//! Each `td` subcommand fetches a URL at most once, so the binary itself never
//! hits the cache. It pays off for callers that keep one `Session` across
//! several loads (repeated `load_history` / `load_market` calls).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

pub const DEFAULT_BUCKET_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct FetchCache {
    bucket_secs: i64,
    entries: HashMap<(String, i64), Vec<u8>>,
}

impl FetchCache {
    /// Non-positive lengths fall back to the default.
    pub fn new(bucket_secs: i64) -> Self {
        let bucket_secs = if bucket_secs > 0 { bucket_secs } else { DEFAULT_BUCKET_SECS };
        Self {
            bucket_secs,
            entries: HashMap::new(),
        }
    }

    pub fn bucket_secs(&self) -> i64 {
        self.bucket_secs
    }

    pub fn bucket_at(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.bucket_secs)
    }

    pub fn get(&self, url: &str, now: DateTime<Utc>) -> Option<&[u8]> {
        self.entries
            .get(&(url.to_string(), self.bucket_at(now)))
            .map(Vec::as_slice)
    }

    pub fn insert(&mut self, url: &str, now: DateTime<Utc>, body: Vec<u8>) {
        let bucket = self.bucket_at(now);
        self.entries.retain(|(u, b), _| u != url || *b == bucket);
        self.entries.insert((url.to_string(), bucket), body);
    }

    /// Return the cached body for the current bucket or run `fetch` and store it.
    pub fn get_or_fetch<F, E>(&mut self, url: &str, now: DateTime<Utc>, fetch: F) -> Result<Vec<u8>, E>
    where
        F: FnOnce(&str) -> Result<Vec<u8>, E>,
    {
        if let Some(body) = self.get(url, now) {
            tracing::debug!(url, "cache hit");
            return Ok(body.to_vec());
        }
        let body = fetch(url)?;
        self.insert(url, now, body.clone());
        Ok(body)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_SECS)
    }
}
