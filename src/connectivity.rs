use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Default probe target, the same host the geolocation requests go to.
pub const DEFAULT_PROBE_TARGET: &str = "us1.unwiredlabs.com:443";

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Fast local answer to whether the network is worth trying at all.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Checks connectivity by opening a TCP connection to a well-known
/// host and dropping it immediately.
pub struct TcpProbe {
    target: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TARGET)
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn is_online(&self) -> bool {
        match timeout(self.timeout, TcpStream::connect(&self.target)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("connectivity probe to {} failed: {e}", self.target);
                false
            }
            Err(_) => {
                debug!("connectivity probe to {} timed out", self.target);
                false
            }
        }
    }
}
