//! Creation Service
//!
//! Validates creation requests for markets and predictions, assigns ids
//! through the item store and serves lookups of what was created.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use forecast_core::{CreatableItem, CreationError, CreationResult, ItemId, ItemKind};
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::store::{ItemStore, MemoryStore};

/// Default maximum accepted payload (64 KiB)
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Default bound on how long a request body may take to arrive
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

/// Default number of items returned by a listing
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Hard cap on items returned by a listing
pub const MAX_LIST_LIMIT: usize = 1000;

/// Bounds applied to every creation request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationLimits {
    /// Bodies longer than this are rejected with `PayloadTooLarge`
    pub max_payload_bytes: usize,
    /// Body reads slower than this fail with `Timeout`
    pub read_timeout: Duration,
}

impl Default for CreationLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

/// Service that validates, stores and looks up markets and predictions
pub struct CreationService {
    store: Arc<dyn ItemStore>,
    limits: CreationLimits,
}

impl CreationService {
    pub fn new(store: Arc<dyn ItemStore>, limits: CreationLimits) -> Self {
        Self { store, limits }
    }

    /// Service over a fresh in-memory store with default limits
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), CreationLimits::default())
    }

    /// Name of the backing store
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Create an item from a fully buffered body
    ///
    /// Fails with `PayloadTooLarge` above the configured limit and with
    /// `InvalidRequest` for an empty body. The store is only touched once
    /// both checks pass.
    pub fn create_item(&self, kind: ItemKind, raw_body: &[u8]) -> CreationResult<CreatableItem> {
        if raw_body.len() > self.limits.max_payload_bytes {
            return Err(CreationError::PayloadTooLarge {
                size: raw_body.len() as u64,
                limit: self.limits.max_payload_bytes,
            });
        }

        if raw_body.is_empty() {
            return Err(CreationError::invalid_request(format!(
                "{} payload must be non-empty",
                kind.display_name()
            )));
        }

        let item = self.store.insert(kind, raw_body.to_vec(), Utc::now())?;

        info!(
            kind = %item.kind,
            id = %item.id,
            payload_len = item.payload_len(),
            "Created {}",
            kind
        );

        Ok(item)
    }

    /// Read a request body stream to the end, then create an item from it
    ///
    /// `declared_len` is the request's `Content-Length`, if any. A declared
    /// length over the limit is rejected before anything is read or
    /// allocated. A chunk error aborts the request with `Io` and leaves the
    /// store untouched.
    pub async fn create_from_stream<S, E>(
        &self,
        kind: ItemKind,
        body: S,
        declared_len: Option<u64>,
    ) -> CreationResult<CreatableItem>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let raw_body = match self.read_body(body, declared_len).await {
            Ok(raw_body) => raw_body,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Failed to read {} body", kind);
                return Err(e);
            }
        };

        self.create_item(kind, &raw_body)
    }

    async fn read_body<S, E>(&self, body: S, declared_len: Option<u64>) -> CreationResult<Vec<u8>>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let limit = self.limits.max_payload_bytes;

        if let Some(len) = declared_len {
            if len > limit as u64 {
                return Err(CreationError::PayloadTooLarge { size: len, limit });
            }
        }

        let read = collect_body(body, declared_len, limit);
        match tokio::time::timeout(self.limits.read_timeout, read).await {
            Ok(result) => result,
            Err(_) => Err(CreationError::Timeout(self.limits.read_timeout)),
        }
    }

    /// Fetch a single item, failing with `NotFound` for unknown ids
    pub fn get_item(&self, kind: ItemKind, id: ItemId) -> CreationResult<CreatableItem> {
        self.store
            .get(kind, id)?
            .ok_or(CreationError::NotFound { kind, id })
    }

    /// Items of one kind in id order
    ///
    /// `limit` defaults to [`DEFAULT_LIST_LIMIT`] and is capped at
    /// [`MAX_LIST_LIMIT`].
    pub fn list_items(&self, kind: ItemKind, limit: Option<usize>) -> CreationResult<Vec<CreatableItem>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
        Ok(self.store.list(kind, limit)?)
    }

    pub fn count_items(&self, kind: ItemKind) -> CreationResult<usize> {
        Ok(self.store.count(kind)?)
    }
}

/// Drain `body` into a buffer, aborting once it grows past `limit`
async fn collect_body<S, E>(body: S, declared_len: Option<u64>, limit: usize) -> CreationResult<Vec<u8>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    futures::pin_mut!(body);

    // Declared length is already known to be within the limit.
    let mut buf = Vec::with_capacity(declared_len.unwrap_or(0) as usize);
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| CreationError::io(e.to_string()))?;

        let total = buf.len() + chunk.len();
        if total > limit {
            return Err(CreationError::PayloadTooLarge {
                size: total as u64,
                limit,
            });
        }
        buf.extend_from_slice(&chunk);
    }

    debug!(len = buf.len(), "Read request body");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    use crate::store::SqliteStore;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, io::Error>> {
        let items: Vec<Result<Bytes, io::Error>> = parts
            .iter()
            .map(|&p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        futures::stream::iter(items)
    }

    fn service_with_limits(max_payload_bytes: usize, read_timeout: Duration) -> CreationService {
        CreationService::new(
            Arc::new(MemoryStore::new()),
            CreationLimits {
                max_payload_bytes,
                read_timeout,
            },
        )
    }

    #[test]
    fn test_create_assigns_fresh_ids() {
        let service = CreationService::in_memory();

        let first = service.create_item(ItemKind::Market, b"{}").unwrap();
        let second = service.create_item(ItemKind::Market, b"{}").unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(service.count_items(ItemKind::Market).unwrap(), 2);
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        let service = CreationService::in_memory();

        let err = service.create_item(ItemKind::Prediction, b"").unwrap_err();
        assert!(matches!(err, CreationError::InvalidRequest(_)));
        assert_eq!(service.count_items(ItemKind::Prediction).unwrap(), 0);
    }

    #[test]
    fn test_get_and_list() {
        let service = CreationService::in_memory();
        let created = service.create_item(ItemKind::Prediction, b"rain tomorrow").unwrap();

        let fetched = service.get_item(ItemKind::Prediction, created.id).unwrap();
        assert_eq!(fetched.payload_utf8(), Some("rain tomorrow"));

        let missing = service
            .get_item(ItemKind::Market, created.id)
            .unwrap_err();
        assert!(matches!(missing, CreationError::NotFound { .. }));

        assert_eq!(service.list_items(ItemKind::Prediction, None).unwrap().len(), 1);
        assert!(service.list_items(ItemKind::Market, Some(10)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_is_joined() {
        let service = CreationService::in_memory();

        let item = service
            .create_from_stream(ItemKind::Market, chunks(&["{\"title\":", "\"x\"}"]), None)
            .await
            .unwrap();

        assert_eq!(item.payload, b"{\"title\":\"x\"}".to_vec());
    }

    #[tokio::test]
    async fn test_read_failure_leaves_store_unmutated() {
        let service = CreationService::in_memory();

        let body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"partial\":")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client disconnected")),
        ]);

        let err = service
            .create_from_stream(ItemKind::Prediction, body, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CreationError::Io(_)));
        assert_eq!(service.count_items(ItemKind::Prediction).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_declared_length_over_limit_is_rejected() {
        let service = service_with_limits(8, Duration::from_secs(1));

        let err = service
            .create_from_stream(ItemKind::Market, chunks(&["{}"]), Some(1024))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CreationError::PayloadTooLarge { size: 1024, limit: 8 }
        ));
        assert_eq!(service.count_items(ItemKind::Market).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit_is_rejected() {
        let service = service_with_limits(8, Duration::from_secs(1));

        let err = service
            .create_from_stream(ItemKind::Market, chunks(&["12345", "67890"]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CreationError::PayloadTooLarge { size: 10, .. }));
        assert_eq!(service.count_items(ItemKind::Market).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_body_at_limit_is_accepted() {
        let service = service_with_limits(4, Duration::from_secs(1));

        let item = service
            .create_from_stream(ItemKind::Market, chunks(&["ab", "cd"]), Some(4))
            .await
            .unwrap();

        assert_eq!(item.payload_len(), 4);
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let service = service_with_limits(1024, Duration::from_millis(50));

        let body = futures::stream::pending::<Result<Bytes, io::Error>>();
        let err = service
            .create_from_stream(ItemKind::Prediction, body, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CreationError::Timeout(_)));
        assert_eq!(service.count_items(ItemKind::Prediction).unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_distinct_ids() {
        let service = Arc::new(CreationService::in_memory());
        let num_concurrent = 128;

        let mut handles = Vec::new();
        for i in 0..num_concurrent {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let payload = Bytes::from(format!("{{\"n\":{}}}", i));
                let body = futures::stream::iter(vec![Ok::<_, io::Error>(payload)]);
                service
                    .create_from_stream(ItemKind::Market, body, None)
                    .await
                    .unwrap()
                    .id
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()), "duplicate id issued");
        }

        assert_eq!(ids.len(), num_concurrent);
        assert_eq!(service.count_items(ItemKind::Market).unwrap(), num_concurrent);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_on_sqlite() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let service = Arc::new(CreationService::new(store, CreationLimits::default()));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.create_item(ItemKind::Prediction, b"p").unwrap().id
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids.len(), 100);
    }
}
