//! Reachability probing
//!
//! A probe answers exactly one question: did the device respond within the
//! per-probe timeout? Probe mechanics stay behind the trait so tests (and
//! deployments with ICMP available) can substitute their own.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Single-boolean liveness probe contract
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// One independent probe; true when the device answered within `timeout`
    async fn probe(&self, ip: &str, port: u16, timeout: Duration) -> bool;
}

/// Default probe: a TCP connect attempt against the device's service port.
///
/// ICMP echo would need raw sockets and elevated privileges; a connect
/// attempt exercises the same path the session will use anyway.
pub struct TcpProbe;

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self, ip: &str, port: u16, timeout: Duration) -> bool {
        let addr = format!("{}:{}", ip, port);
        match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Probe to {} failed: {}", addr, e);
                false
            }
            Err(_) => {
                debug!("Probe to {} timed out", addr);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn probe_succeeds_against_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let reachable = TcpProbe
            .probe("127.0.0.1", port, Duration::from_millis(500))
            .await;
        assert!(reachable);
    }

    #[tokio::test]
    async fn probe_fails_against_closed_port() {
        // bind then drop to get a port that is known to be closed
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let reachable = TcpProbe
            .probe("127.0.0.1", port, Duration::from_millis(500))
            .await;
        assert!(!reachable);
    }
}
