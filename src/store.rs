// Key-value storage for sorted requests, plus the snapshot encoding the
// orchestrator writes into it.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::currency::CurrencyConverter;
use crate::request::{Itinerary, ItineraryPayload, SortRequest, SortingType};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cached value could not be decoded: {0}")]
    Codec(String),
}

/// Single-namespace store keyed by request fingerprint. Values are opaque
/// bytes; independent keys must be safe to read and write concurrently.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError>;
}

pub const SNAPSHOT_VERSION: u32 = 1;

// Same shape as the outbound body, tagged with a format version.
#[derive(Debug, Deserialize, Serialize)]
struct Snapshot {
    version: u32,
    sorting_type: SortingType,
    sorted_itineraries: Vec<ItineraryPayload>,
}

pub fn encode_snapshot(request: &SortRequest) -> Result<Bytes, StoreError> {
    let payload = request.to_payload();
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        sorting_type: payload.sorting_type,
        sorted_itineraries: payload.sorted_itineraries,
    };

    serde_json::to_vec(&snapshot)
        .map(Bytes::from)
        .map_err(|e| StoreError::Codec(e.to_string()))
}

/// Rebuilds a stored request. Prices are re-derived with `converter`; a
/// snapshot that no longer validates is a storage problem, not bad input.
pub fn decode_snapshot(
    value: &[u8],
    converter: &CurrencyConverter,
) -> Result<SortRequest, StoreError> {
    let snapshot: Snapshot =
        serde_json::from_slice(value).map_err(|e| StoreError::Codec(e.to_string()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StoreError::Codec(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }

    let itineraries = snapshot
        .sorted_itineraries
        .into_iter()
        .map(|i| Itinerary::from_payload(i, converter))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Codec(e.to_string()))?;

    Ok(SortRequest::new(snapshot.sorting_type, itineraries))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub size_bytes: usize,
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub write_count: usize,
}

pub fn calculate_item_size(key: &str, data: &[u8]) -> usize {
    key.len() + data.len()
}

/// In-process store. Entries live as long as the store itself.
#[derive(Default)]
pub struct MemoryStore {
    store: DashMap<String, Bytes>,
    stats: Arc<RwLock<StoreStats>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let value = self.store.get(key).map(|v| v.value().clone());

        let mut stats = self.stats.write();
        if value.is_some() {
            stats.hit_count += 1;
        } else {
            stats.miss_count += 1;
        }

        Ok(value)
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        let added = calculate_item_size(key, &value);
        let replaced = self.store.insert(key.to_string(), value);

        let mut stats = self.stats.write();
        stats.write_count += 1;
        stats.size_bytes += added;
        match replaced {
            Some(old) => stats.size_bytes -= calculate_item_size(key, &old),
            None => stats.items_count += 1,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Price;
    use std::thread;

    fn sample(converter: &CurrencyConverter) -> SortRequest {
        SortRequest::new(
            SortingType::Fastest,
            vec![
                Itinerary::new("bar", 150, Price::new(200, "EUR", converter).unwrap()).unwrap(),
                Itinerary::new("foo", 300, Price::new(100, "CZK", converter).unwrap()).unwrap(),
            ],
        )
    }

    #[test]
    fn test_snapshot_keeps_order_and_content() {
        let converter = CurrencyConverter::embedded().unwrap();
        let request = sample(&converter);

        let encoded = encode_snapshot(&request).unwrap();
        let decoded = decode_snapshot(&encoded, &converter).unwrap();

        assert_eq!(decoded, request);
        assert_eq!(decoded.to_json().unwrap(), request.to_json().unwrap());
        assert_eq!(
            decoded.itineraries()[1].price().amount_in_reference(),
            request.itineraries()[1].price().amount_in_reference()
        );
    }

    #[test]
    fn test_snapshot_is_versioned_json() {
        let converter = CurrencyConverter::embedded().unwrap();
        let encoded = encode_snapshot(&sample(&converter)).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(value["version"], SNAPSHOT_VERSION);
        assert_eq!(value["sorting_type"], "fastest");
        assert_eq!(value["sorted_itineraries"][0]["id"], "bar");
        assert!(value["sorted_itineraries"][0]["price"]
            .get("amount_in_reference")
            .is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let converter = CurrencyConverter::embedded().unwrap();

        assert!(matches!(
            decode_snapshot(b"\x00\x01not json", &converter),
            Err(StoreError::Codec(_))
        ));

        let future = br#"{"version": 2, "sorting_type": "best", "sorted_itineraries": []}"#;
        assert!(matches!(
            decode_snapshot(future, &converter),
            Err(StoreError::Codec(_))
        ));

        let unknown_currency = br#"{"version": 1, "sorting_type": "best", "sorted_itineraries": [
            {"id": "a", "duration_minutes": 1, "price": {"amount": 1, "currency": "FOO"}}
        ]}"#;
        assert!(matches!(
            decode_snapshot(unknown_currency, &converter),
            Err(StoreError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_get_put() {
        let store = MemoryStore::new();

        assert!(store.get("missing").await.unwrap().is_none());

        store.put("k1", Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(
            store.get("k1").await.unwrap(),
            Some(Bytes::from_static(b"hello"))
        );

        // overwrite keeps a single entry
        store.put("k1", Bytes::from_static(b"hi")).await.unwrap();
        assert_eq!(store.len(), 1);

        let stats = store.stats();
        assert_eq!(stats.items_count, 1);
        assert_eq!(stats.write_count, 2);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.size_bytes, calculate_item_size("k1", b"hi"));
    }

    #[test]
    fn test_concurrent_independent_keys() {
        let store = Arc::new(MemoryStore::new());
        let threads_count = 8;
        let keys_per_thread = 100;

        let mut handles = vec![];
        for t in 0..threads_count {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                tokio_test::block_on(async {
                    for k in 0..keys_per_thread {
                        let key = format!("t{t}-k{k}");
                        store.put(&key, Bytes::from(key.clone())).await.unwrap();
                        let read = store.get(&key).await.unwrap().unwrap();
                        assert_eq!(read, Bytes::from(key));
                    }
                });
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), threads_count * keys_per_thread);
        assert_eq!(store.stats().items_count, threads_count * keys_per_thread);
    }
}
