//! Per-message decoding and routing.
//!
//! The dispatcher turns a message body into a [`Payload`] and routes it by
//! `name`. Forwarding failures are logged and contained: a bad message never
//! reaches back into the consuming loop.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::forward::Forwarder;
use crate::payload::Payload;

pub mod pool;

pub use pool::{pump, DispatchPool};

/// Handling path selected by a payload's `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Forward to the logging service.
    Log,
    /// Reserved for authentication events; currently discarded.
    Auth,
}

impl Route {
    pub fn for_name(name: &str) -> Self {
        match name {
            "log" | "event" => Route::Log,
            "auth" => Route::Auth,
            // Unknown names, including the empty name of an undecodable
            // body, take the logging path as well.
            _ => Route::Log,
        }
    }
}

/// What to do with a body that is not a valid payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Dispatch an empty payload in its place.
    #[default]
    Lenient,
    /// Log and drop the message.
    Strict,
}

/// Dispatch configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on messages being handled at the same time.
    pub max_in_flight: usize,
    pub decode_policy: DecodePolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 64,
            decode_policy: DecodePolicy::Lenient,
        }
    }
}

/// Routes payloads to the configured forwarder.
pub struct Dispatcher {
    forwarder: Arc<dyn Forwarder>,
    decode_policy: DecodePolicy,
}

impl Dispatcher {
    pub fn new(forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            forwarder,
            decode_policy: DecodePolicy::default(),
        }
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    /// Decode a raw message body and dispatch it.
    pub async fn handle_body(&self, body: &[u8]) {
        let payload = match Payload::decode(body) {
            Ok(payload) => payload,
            Err(e) => match self.decode_policy {
                DecodePolicy::Lenient => {
                    warn!(error = %e, "Undecodable message body, dispatching empty payload");
                    Payload::default()
                }
                DecodePolicy::Strict => {
                    warn!(error = %e, "Undecodable message body, dropping");
                    return;
                }
            },
        };

        self.dispatch(payload).await;
    }

    /// Route a payload by name. Never fails.
    pub async fn dispatch(&self, payload: Payload) {
        match Route::for_name(&payload.name) {
            Route::Auth => {
                debug!("Auth payload received, nothing to do");
            }
            Route::Log => {
                if let Err(e) = self.forwarder.forward(&payload).await {
                    error!(
                        forwarder = %self.forwarder.name(),
                        name = %payload.name,
                        error = %e,
                        "Failed to forward payload"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::testing::RecordingForwarder;

    fn dispatcher(forwarder: &Arc<RecordingForwarder>) -> Dispatcher {
        Dispatcher::new(forwarder.clone())
    }

    #[test]
    fn test_route_for_name() {
        assert_eq!(Route::for_name("log"), Route::Log);
        assert_eq!(Route::for_name("event"), Route::Log);
        assert_eq!(Route::for_name("auth"), Route::Auth);
        assert_eq!(Route::for_name("metrics"), Route::Log);
        assert_eq!(Route::for_name(""), Route::Log);
        assert_eq!(Route::for_name("AUTH"), Route::Log);
    }

    #[tokio::test]
    async fn test_every_name_but_auth_forwards_exactly_once() {
        for name in ["log", "event", "mail", "", "Auth"] {
            let forwarder = Arc::new(RecordingForwarder::default());
            dispatcher(&forwarder)
                .dispatch(Payload::new(name, "data"))
                .await;

            assert_eq!(forwarder.count(), 1, "name {:?}", name);
            assert_eq!(forwarder.seen()[0], Payload::new(name, "data"));
        }
    }

    #[tokio::test]
    async fn test_auth_forwards_nothing() {
        let forwarder = Arc::new(RecordingForwarder::default());
        dispatcher(&forwarder)
            .dispatch(Payload::new("auth", "token"))
            .await;

        assert_eq!(forwarder.count(), 0);
    }

    #[tokio::test]
    async fn test_forward_failure_is_swallowed() {
        let forwarder = Arc::new(RecordingForwarder::failing());
        let dispatcher = dispatcher(&forwarder);

        dispatcher.dispatch(Payload::new("log", "a")).await;
        dispatcher.dispatch(Payload::new("log", "b")).await;

        assert_eq!(forwarder.count(), 2);
    }

    #[tokio::test]
    async fn test_lenient_decode_dispatches_empty_payload() {
        let forwarder = Arc::new(RecordingForwarder::default());
        dispatcher(&forwarder).handle_body(b"{broken").await;

        assert_eq!(forwarder.seen(), vec![Payload::default()]);
    }

    #[tokio::test]
    async fn test_strict_decode_drops_message() {
        let forwarder = Arc::new(RecordingForwarder::default());
        dispatcher(&forwarder)
            .with_decode_policy(DecodePolicy::Strict)
            .handle_body(b"{broken")
            .await;

        assert_eq!(forwarder.count(), 0);
    }

    #[tokio::test]
    async fn test_handle_body_decodes_and_routes() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let dispatcher = dispatcher(&forwarder);

        dispatcher
            .handle_body(br#"{"name":"event","data":"disk full"}"#)
            .await;
        dispatcher
            .handle_body(br#"{"name":"auth","data":"secret"}"#)
            .await;

        assert_eq!(forwarder.seen(), vec![Payload::new("event", "disk full")]);
    }
}
