use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use super::Transport;
use super::protocol::{ENDPOINT_PEER, PeerReply, PeerRequest};
use crate::membership::cluster::Cluster;
use crate::membership::types::NodeId;

/// Delivers peer requests as JSON POSTs to the member's HTTP address.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    cluster: Arc<Cluster>,
    http_client: reqwest::Client,
    timeout: Option<Duration>,
    connect_attempts: usize,
}

impl HttpTransport {
    /// `timeout` of `None` waits for the peer indefinitely.
    pub fn new(cluster: Arc<Cluster>, timeout: Option<Duration>, connect_attempts: usize) -> Self {
        Self {
            cluster,
            http_client: reqwest::Client::new(),
            timeout,
            connect_attempts: connect_attempts.max(1),
        }
    }

    /// Only connection failures are retried: the request never reached the
    /// peer, so resending cannot apply an operation twice.
    async fn post_with_retry(
        &self,
        url: String,
        payload: &PeerRequest,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;
        let mut attempt = 0;

        loop {
            let mut request = self.http_client.post(url.clone()).json(payload);
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }

            match request.send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_connect() && attempt + 1 < self.connect_attempts => {
                    tracing::warn!("Connect to {} failed (attempt {}): {}", url, attempt + 1, e);
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                    attempt += 1;
                }
                Err(e) => return Err(anyhow::anyhow!(e)),
            }
        }
    }
}

impl Transport for HttpTransport {
    async fn call(&self, target: &NodeId, request: PeerRequest) -> Result<PeerReply> {
        let node = self
            .cluster
            .get_member(target)
            .ok_or_else(|| anyhow::anyhow!("Peer node not found: {}", target))?;

        let url = format!("http://{}{}", node.http_addr, ENDPOINT_PEER);
        let response = self.post_with_retry(url, &request).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Peer {} replied {}: {}", target, status, body));
        }

        let reply: PeerReply = response.json().await?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::types::Node;

    fn transport(attempts: usize) -> HttpTransport {
        // Port 9 (discard) on loopback has no listener in test environments.
        let members = vec![
            Node { id: NodeId::new("n0"), http_addr: "127.0.0.1:9".parse().unwrap() },
            Node { id: NodeId::new("n1"), http_addr: "127.0.0.1:9".parse().unwrap() },
        ];
        let cluster = Arc::new(Cluster::new(NodeId::new("n0"), members).unwrap());
        HttpTransport::new(cluster, Some(Duration::from_millis(500)), attempts)
    }

    #[tokio::test]
    async fn test_unknown_peer_is_error() {
        let result = transport(1)
            .call(&NodeId::new("n7"), PeerRequest::send("k", 1))
            .await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("n7"), "{}", err);
    }

    #[tokio::test]
    async fn test_refused_connection_fails_after_retries() {
        let result = transport(2)
            .call(&NodeId::new("n1"), PeerRequest::send("k", 1))
            .await;

        assert!(result.is_err());
    }
}
