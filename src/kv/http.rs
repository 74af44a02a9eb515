use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;

use super::protocol::*;
use super::{CasOutcome, KvError, KvStore};

/// Applied to `read` and `cas` only, see `write`.
const KV_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
const KV_CONNECT_ATTEMPTS: usize = 3;

/// Client for a store hosted by a `kv` service process.
#[derive(Debug, Clone)]
pub struct HttpKv {
    base_url: String,
    http_client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpKv {
    pub fn new(addr: SocketAddr) -> Self {
        Self::with_request_timeout(addr, KV_REQUEST_TIMEOUT)
    }

    pub fn with_request_timeout(addr: SocketAddr, request_timeout: Duration) -> Self {
        Self {
            base_url: format!("http://{}", addr),
            http_client: reqwest::Client::new(),
            request_timeout,
        }
    }

    /// Retries only when the connection could not be established, so a
    /// request is never applied twice by the store.
    async fn post<T: Serialize>(
        &self,
        endpoint: &str,
        payload: &T,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, KvError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut delay_ms = 50u64;
        let mut attempt = 0;

        loop {
            let mut request = self.http_client.post(url.clone()).json(payload);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            match request.send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_connect() && attempt + 1 < KV_CONNECT_ATTEMPTS => {
                    tracing::debug!("kv connect to {} failed, retrying: {}", url, e);
                    let jitter = rand::random::<u64>() % 25;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(800);
                    attempt += 1;
                }
                Err(e) => return Err(KvError::Transport(e)),
            }
        }
    }
}

impl KvStore for HttpKv {
    async fn read(&self, key: &str) -> Result<Option<Value>, KvError> {
        let response = self
            .post(
                ENDPOINT_KV_READ,
                &ReadRequest { key: key.to_string() },
                Some(self.request_timeout),
            )
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(KvError::Status(response.status().as_u16()));
        }

        let body: ReadResponse = response.json().await?;
        Ok(body.value)
    }

    /// No timeout: a write abandoned by the client could still be applied by
    /// the service after a newer write of the same key, reordering that
    /// key's writes.
    async fn write(&self, key: &str, value: Value) -> Result<(), KvError> {
        let response = self
            .post(
                ENDPOINT_KV_WRITE,
                &WriteRequest {
                    key: key.to_string(),
                    value,
                },
                None,
            )
            .await?;

        if !response.status().is_success() {
            return Err(KvError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    async fn cas(
        &self,
        key: &str,
        from: Option<Value>,
        to: Value,
        create_if_absent: bool,
    ) -> Result<CasOutcome, KvError> {
        let payload = CasRequest {
            key: key.to_string(),
            from,
            to,
            create_if_not_exists: create_if_absent,
        };
        let response = self
            .post(ENDPOINT_KV_CAS, &payload, Some(self.request_timeout))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(CasOutcome::Swapped),
            reqwest::StatusCode::PRECONDITION_FAILED => Ok(CasOutcome::Conflict),
            status => Err(KvError::Status(status.as_u16())),
        }
    }
}
