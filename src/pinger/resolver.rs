//! Caching resolver for extinfo peer addresses
//!
//! Game servers answer extinfo queries on their game port + 1.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::error::PingerError;

struct CachedAddr {
    addr: SocketAddr,
    stale_after: Instant,
}

/// IPv4 resolver with a fixed-lifetime cache
pub struct Resolver {
    cache: RwLock<HashMap<String, CachedAddr>>,
    ttl: Duration,
}

impl Resolver {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Resolve the info address (`port + 1`) of the game server at `host:port`
    pub async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, PingerError> {
        let info_port = port.checked_add(1).ok_or_else(|| PingerError::Resolve {
            addr: format!("{}:{}", host, port),
            reason: "no info port above 65535".into(),
        })?;
        let key = format!("{}:{}", host, info_port);

        if let Some(cached) = self.cache.read().await.get(&key) {
            if Instant::now() < cached.stale_after {
                return Ok(cached.addr);
            }
        }

        let addr = tokio::net::lookup_host(key.as_str())
            .await
            .map_err(|e| PingerError::Resolve {
                addr: key.clone(),
                reason: e.to_string(),
            })?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| PingerError::Resolve {
                addr: key.clone(),
                reason: "no IPv4 address".into(),
            })?;

        tracing::debug!(host = %host, addr = %addr, "Resolved info address");

        self.cache.write().await.insert(
            key,
            CachedAddr {
                addr,
                stale_after: Instant::now() + self.ttl,
            },
        );

        Ok(addr)
    }

    /// Number of cached entries, stale ones included
    pub async fn cached(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_info_port() {
        let resolver = Resolver::new(Duration::from_secs(60));

        let addr = resolver.resolve("127.0.0.1", 28785).await.unwrap();
        assert_eq!(addr, "127.0.0.1:28786".parse().unwrap());
        assert_eq!(resolver.cached().await, 1);

        // cache hit
        let again = resolver.resolve("127.0.0.1", 28785).await.unwrap();
        assert_eq!(again, addr);
        assert_eq!(resolver.cached().await, 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refreshed() {
        let resolver = Resolver::new(Duration::ZERO);

        resolver.resolve("127.0.0.1", 1000).await.unwrap();
        let addr = resolver.resolve("127.0.0.1", 1000).await.unwrap();

        assert_eq!(addr.port(), 1001);
        assert_eq!(resolver.cached().await, 1);
    }

    #[tokio::test]
    async fn test_port_overflow() {
        let resolver = Resolver::new(Duration::from_secs(60));

        let result = resolver.resolve("127.0.0.1", u16::MAX).await;
        assert!(matches!(result, Err(PingerError::Resolve { .. })));
    }
}
