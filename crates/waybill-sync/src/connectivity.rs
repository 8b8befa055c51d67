//! # Connectivity Probe
//!
//! Answers "can we reach the mirror right now?" before a sync touches it.
//!
//! ```text
//! SyncEngine::sync()
//!      │
//!      ├── force_offline? ──yes──► SyncError::Offline
//!      │
//!      ├── probe.is_online()? ──no──► SyncError::Offline
//!      │
//!      ▼
//!   remote calls
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Connectivity check used by the sync engine.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

// =============================================================================
// TCP Probe
// =============================================================================

/// Opens (and immediately drops) a TCP connection to the mirror host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    /// `addr` is a `host:port` pair.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            addr: addr.into(),
            timeout,
        }
    }

    /// Derives `host:port` from an http(s) URL, defaulting the port by scheme.
    /// Returns `None` for URLs without a host.
    pub fn for_url(url: &str, timeout: Duration) -> Option<Self> {
        let parsed = reqwest::Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        let port = parsed.port_or_known_default()?;
        Some(TcpProbe::new(format!("{host}:{port}"), timeout))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_online(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(addr = %self.addr, error = %e, "Mirror unreachable");
                false
            }
            Err(_) => {
                debug!(addr = %self.addr, "Connectivity probe timed out");
                false
            }
        }
    }
}

// =============================================================================
// Static Probe
// =============================================================================

/// Fixed answer. Used for file mirrors (always reachable) and tests.
#[derive(Debug, Default)]
pub struct StaticProbe {
    online: AtomicBool,
}

impl StaticProbe {
    pub fn new(online: bool) -> Self {
        StaticProbe {
            online: AtomicBool::new(online),
        }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_static_probe() {
        let probe = StaticProbe::offline();
        assert!(!probe.is_online().await);
        probe.set_online(true);
        assert!(probe.is_online().await);
    }

    #[test]
    fn test_probe_for_url() {
        let timeout = Duration::from_secs(1);
        let probe = TcpProbe::for_url("https://mirror.example.com/rest/v1", timeout).unwrap();
        assert_eq!(probe.addr(), "mirror.example.com:443");

        let probe = TcpProbe::for_url("http://127.0.0.1:3000", timeout).unwrap();
        assert_eq!(probe.addr(), "127.0.0.1:3000");

        assert!(TcpProbe::for_url("not a url", timeout).is_none());
    }

    #[tokio::test]
    async fn test_tcp_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(probe.is_online().await);

        drop(listener);
        let closed = TcpProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(!closed.is_online().await);
    }
}
