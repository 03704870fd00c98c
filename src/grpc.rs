//! gRPC utilities.

use std::time::Duration;

use tonic::transport::{Channel, Endpoint};

/// Build a lazily-connecting channel to a gRPC endpoint.
///
/// Accepts either a full URI (`http://host:port`) or a bare `host:port`.
/// The first call on the channel establishes the connection, so creating it
/// never blocks on the remote side being up.
pub fn lazy_channel(address: &str, timeout: Duration) -> Result<Channel, String> {
    let uri = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    let endpoint = Endpoint::from_shared(uri).map_err(|e| format!("Invalid URI: {}", e))?;
    Ok(endpoint.timeout(timeout).connect_lazy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_channel_accepts_bare_host_port() {
        assert!(lazy_channel("localhost:50001", Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_lazy_channel_accepts_full_uri() {
        assert!(lazy_channel("http://logger-service:50001", Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_lazy_channel_rejects_garbage() {
        assert!(lazy_channel("http://bad host", Duration::from_secs(1)).is_err());
    }
}
