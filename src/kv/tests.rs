//! Key-Value Store Tests
//!
//! ## Test Scopes
//! - **MemoryKv**: read/write and the compare-and-swap rules.
//! - **HTTP service**: `HttpKv` against a real `kv` service on an ephemeral port.

#[cfg(test)]
mod tests {
    use crate::kv::http::HttpKv;
    use crate::kv::memory::MemoryKv;
    use crate::kv::{CasOutcome, KvStore, handlers};
    use serde_json::json;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    async fn spawn_kv_service() -> (SocketAddr, Arc<MemoryKv>) {
        let store = Arc::new(MemoryKv::new());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = handlers::router(store.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr, store)
    }

    // ============================================================
    // MEMORY STORE
    // ============================================================

    #[tokio::test]
    async fn test_read_missing_key_is_none() {
        let store = MemoryKv::new();
        assert_eq!(store.read("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let store = MemoryKv::new();

        store.write("k", json!(1)).await.unwrap();
        store.write("k", json!([1, 2])).await.unwrap();

        assert_eq!(store.read("k").await.unwrap(), Some(json!([1, 2])));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_cas_swaps_on_match() {
        let store = MemoryKv::new();
        store.write("k", json!([1])).await.unwrap();

        let outcome = store
            .cas("k", Some(json!([1])), json!([1, 2]), false)
            .await
            .unwrap();

        assert_eq!(outcome, CasOutcome::Swapped);
        assert_eq!(store.get("k"), Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_cas_conflicts_on_stale_value() {
        let store = MemoryKv::new();
        store.write("k", json!([1, 2])).await.unwrap();

        let outcome = store
            .cas("k", Some(json!([1])), json!([1, 3]), true)
            .await
            .unwrap();

        assert_eq!(outcome, CasOutcome::Conflict);
        assert_eq!(store.get("k"), Some(json!([1, 2])), "value must be untouched");
    }

    #[tokio::test]
    async fn test_cas_creates_absent_key_only_when_asked() {
        let store = MemoryKv::new();

        let refused = store.cas("k", None, json!([7]), false).await.unwrap();
        assert_eq!(refused, CasOutcome::Conflict);
        assert!(store.is_empty());

        let created = store.cas("k", None, json!([7]), true).await.unwrap();
        assert_eq!(created, CasOutcome::Swapped);

        // A second creator loses: the key now exists.
        let again = store.cas("k", None, json!([8]), true).await.unwrap();
        assert_eq!(again, CasOutcome::Conflict);
        assert_eq!(store.get("k"), Some(json!([7])));
    }

    #[tokio::test]
    async fn test_cas_with_expected_value_on_absent_key_conflicts() {
        let store = MemoryKv::new();

        let outcome = store.cas("k", Some(json!([])), json!([1]), true).await.unwrap();
        assert_eq!(outcome, CasOutcome::Conflict);
    }

    // ============================================================
    // HTTP SERVICE
    // ============================================================

    #[tokio::test]
    async fn test_http_kv_read_write() {
        let (addr, backing) = spawn_kv_service().await;
        let client = HttpKv::new(addr);

        assert_eq!(client.read("log/a").await.unwrap(), None);

        client.write("log/a", json!([10, 20])).await.unwrap();

        assert_eq!(client.read("log/a").await.unwrap(), Some(json!([10, 20])));
        assert_eq!(backing.get("log/a"), Some(json!([10, 20])));
    }

    #[tokio::test]
    async fn test_http_kv_cas() {
        let (addr, _backing) = spawn_kv_service().await;
        let client = HttpKv::new(addr);

        let created = client.cas("c", None, json!(1), true).await.unwrap();
        assert_eq!(created, CasOutcome::Swapped);

        let stale = client.cas("c", Some(json!(0)), json!(2), false).await.unwrap();
        assert_eq!(stale, CasOutcome::Conflict);

        let swapped = client.cas("c", Some(json!(1)), json!(2), false).await.unwrap();
        assert_eq!(swapped, CasOutcome::Swapped);
        assert_eq!(client.read("c").await.unwrap(), Some(json!(2)));
    }

    /// A kv service that answers every request after `delay`.
    async fn spawn_slow_kv_service(delay: Duration) -> (SocketAddr, Arc<MemoryKv>) {
        let store = Arc::new(MemoryKv::new());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = handlers::router(store.clone()).layer(axum::middleware::from_fn(
            move |request: axum::extract::Request, next: axum::middleware::Next| async move {
                tokio::time::sleep(delay).await;
                next.run(request).await
            },
        ));

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr, store)
    }

    #[tokio::test]
    async fn test_http_kv_write_is_not_cut_off_by_request_timeout() {
        let (addr, backing) = spawn_slow_kv_service(Duration::from_millis(300)).await;
        let client = HttpKv::with_request_timeout(addr, Duration::from_millis(50));

        client.write("log/p", json!([1, 2])).await.unwrap();
        assert_eq!(backing.get("log/p"), Some(json!([1, 2])));

        // Reads keep their deadline.
        let read = client.read("log/p").await;
        assert!(matches!(read, Err(crate::kv::KvError::Transport(ref e)) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_http_kv_unreachable_service_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpKv::new(addr);
        let result = client.read("k").await;

        assert!(matches!(result, Err(crate::kv::KvError::Transport(_))));
    }
}
