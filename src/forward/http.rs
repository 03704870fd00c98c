//! HTTP forwarder.
//!
//! POSTs tab-indented JSON payloads to the logging service's `/log` endpoint.
//! Only `202 Accepted` counts as delivered; any other status is an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Ack, ForwardError, Forwarder};
use crate::payload::Payload;

/// HTTP forwarder configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpForwarderConfig {
    /// Logging service endpoint URL.
    pub endpoint: String,

    /// Request timeout, configured as `timeout_secs`.
    #[serde(rename = "timeout_secs", deserialize_with = "super::duration_from_secs")]
    pub timeout: Duration,
}

impl Default for HttpForwarderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://logger-service/log".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl HttpForwarderConfig {
    /// Set the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Forwards payloads with a JSON POST.
pub struct HttpForwarder {
    client: Client,
    config: HttpForwarderConfig,
}

impl HttpForwarder {
    /// Create a new HTTP forwarder with the given configuration.
    pub fn new(config: HttpForwarderConfig) -> Result<Self, ForwardError> {
        if config.endpoint.is_empty() {
            return Err(ForwardError::Config(
                "HTTP endpoint not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, payload: &Payload) -> Result<Ack, ForwardError> {
        let body = payload.to_indented_json()?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            debug!(
                endpoint = %self.config.endpoint,
                name = %payload.name,
                "Payload accepted"
            );
            return Ok(Ack::Accepted);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            endpoint = %self.config.endpoint,
            status = %status,
            body = %body,
            "Logging service rejected payload"
        );

        Err(ForwardError::UnexpectedStatus {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::post,
        Router,
    };

    #[derive(Clone)]
    struct Captured {
        status: AxumStatus,
        requests: Arc<Mutex<Vec<(Option<String>, String)>>>,
    }

    async fn capture(
        State(state): State<Captured>,
        headers: HeaderMap,
        body: String,
    ) -> (AxumStatus, &'static str) {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        state.requests.lock().unwrap().push((content_type, body));
        (state.status, "logged")
    }

    /// Serve `/log` answering every request with `status`.
    async fn serve(status: AxumStatus) -> (SocketAddr, Captured) {
        let captured = Captured {
            status,
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/log", post(capture))
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr, captured)
    }

    fn forwarder_for(addr: SocketAddr) -> HttpForwarder {
        HttpForwarder::new(
            HttpForwarderConfig::default().with_endpoint(format!("http://{}/log", addr)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_accepted_is_success_and_body_is_identical() {
        let (addr, captured) = serve(AxumStatus::ACCEPTED).await;
        let payload = Payload::new("event", "disk full");

        let ack = forwarder_for(addr).forward(&payload).await.unwrap();
        assert_eq!(ack, Ack::Accepted);

        let requests = captured.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (content_type, body) = &requests[0];
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(serde_json::from_str::<Payload>(body).unwrap(), payload);
        assert_eq!(body.as_bytes(), payload.to_indented_json().unwrap().as_slice());
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let (addr, _) = serve(AxumStatus::INTERNAL_SERVER_ERROR).await;

        let err = forwarder_for(addr)
            .forward(&Payload::new("event", "disk full"))
            .await
            .unwrap_err();

        match err {
            ForwardError::UnexpectedStatus { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "logged");
            }
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ok_instead_of_accepted_is_failure() {
        let (addr, _) = serve(AxumStatus::OK).await;

        let err = forwarder_for(addr)
            .forward(&Payload::new("log", "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, ForwardError::UnexpectedStatus { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = forwarder_for(addr)
            .forward(&Payload::new("log", "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, ForwardError::Http(_)));
    }

    #[test]
    fn test_config_defaults() {
        let config = HttpForwarderConfig::default();
        assert_eq!(config.endpoint, "http://logger-service/log");
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_sub_second_timeout_is_kept() {
        let config = HttpForwarderConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_slow_service_hits_sub_second_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/log",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                AxumStatus::ACCEPTED
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let forwarder = HttpForwarder::new(
            HttpForwarderConfig::default()
                .with_endpoint(format!("http://{}/log", addr))
                .with_timeout(Duration::from_millis(200)),
        )
        .unwrap();

        let err = forwarder
            .forward(&Payload::new("log", "x"))
            .await
            .unwrap_err();
        match err {
            ForwardError::Http(e) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_endpoint_fails() {
        let config = HttpForwarderConfig::default().with_endpoint("");
        assert!(HttpForwarder::new(config).is_err());
    }
}
