// Cache-through resolution of sorting requests.
//
// The fingerprint is looked up in the store; a hit returns the stored sorted
// request without sorting, a miss sorts and writes the result back. There is
// no locking around the miss path: concurrent misses for one fingerprint
// compute equal results and the last write wins.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::currency::CurrencyConverter;
use crate::error::SortError;
use crate::fingerprint::fingerprint;
use crate::request::{MalformedRequest, SortRequest};
use crate::sorting::sort_request;
use crate::store::{decode_snapshot, encode_snapshot, Store};

/// Counters owned by the caller. `sorts_performed` only moves on the miss
/// path, so it tells whether a request actually triggered ordering work.
#[derive(Debug, Default)]
pub struct SortStats {
    pub sorts_performed: AtomicUsize,
    pub cache_hits: AtomicUsize,
    pub cache_misses: AtomicUsize,
    pub rejected_requests: AtomicUsize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SortStatsSnapshot {
    pub sorts_performed: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub rejected_requests: usize,
}

impl SortStats {
    pub fn snapshot(&self) -> SortStatsSnapshot {
        SortStatsSnapshot {
            sorts_performed: self.sorts_performed.load(Ordering::SeqCst),
            cache_hits: self.cache_hits.load(Ordering::SeqCst),
            cache_misses: self.cache_misses.load(Ordering::SeqCst),
            rejected_requests: self.rejected_requests.load(Ordering::SeqCst),
        }
    }
}

/// Resolves an already validated request. Without a store every call sorts.
pub async fn resolve(
    mut request: SortRequest,
    store: Option<&dyn Store>,
    converter: &CurrencyConverter,
    stats: &SortStats,
) -> Result<SortRequest, SortError> {
    let key = fingerprint(&request);
    debug!(
        fingerprint = %key,
        sorting_type = %request.sorting_type(),
        itineraries = request.itineraries().len(),
        "resolving sorting request"
    );

    if let Some(store) = store {
        let cached = store.get(key.as_str()).await.map_err(|e| {
            warn!(fingerprint = %key, error = %e, "cache lookup failed");
            e
        })?;

        if let Some(bytes) = cached {
            let sorted = decode_snapshot(&bytes, converter).map_err(|e| {
                warn!(fingerprint = %key, error = %e, "cached request is unreadable");
                e
            })?;
            stats.cache_hits.fetch_add(1, Ordering::SeqCst);
            info!(fingerprint = %key, "cache hit");
            return Ok(sorted);
        }

        stats.cache_misses.fetch_add(1, Ordering::SeqCst);
        info!(fingerprint = %key, "cache miss");
    }

    sort_request(&mut request);
    stats.sorts_performed.fetch_add(1, Ordering::SeqCst);

    if let Some(store) = store {
        let value = encode_snapshot(&request)?;
        store.put(key.as_str(), value).await.map_err(|e| {
            warn!(fingerprint = %key, error = %e, "cache write failed");
            e
        })?;
    }

    Ok(request)
}

/// Entry point for a transport layer: validates a body, resolves it and
/// renders the outbound JSON.
pub struct Resolver {
    converter: Arc<CurrencyConverter>,
    store: Option<Arc<dyn Store>>,
    stats: Arc<SortStats>,
}

impl Resolver {
    pub fn new(converter: Arc<CurrencyConverter>) -> Self {
        Self {
            converter,
            store: None,
            stats: Arc::new(SortStats::default()),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_stats(mut self, stats: Arc<SortStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn converter(&self) -> &CurrencyConverter {
        &self.converter
    }

    pub fn stats(&self) -> &Arc<SortStats> {
        &self.stats
    }

    pub fn parse(&self, body: &Value) -> Result<SortRequest, SortError> {
        SortRequest::from_value(body, &self.converter).map_err(|e| self.reject(e))
    }

    pub async fn resolve(&self, request: SortRequest) -> Result<SortRequest, SortError> {
        resolve(request, self.store.as_deref(), &self.converter, &self.stats).await
    }

    pub async fn handle(&self, body: &Value) -> Result<String, SortError> {
        let request = self.parse(body)?;
        let sorted = self.resolve(request).await?;

        sorted.to_json().map_err(|e| {
            warn!(error = %e, "failed to render sorted request");
            SortError::Internal(e.to_string())
        })
    }

    pub async fn handle_str(&self, body: &str) -> Result<String, SortError> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            debug!(error = %e, "request body is not JSON");
            self.reject(MalformedRequest)
        })?;

        self.handle(&value).await
    }

    fn reject(&self, e: MalformedRequest) -> SortError {
        self.stats.rejected_requests.fetch_add(1, Ordering::SeqCst);
        warn!("rejected malformed sorting request");
        SortError::from(e)
    }
}
