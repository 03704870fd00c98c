//! Broker connection establishment with quadratic backoff.
//!
//! The broker is frequently still starting when the listener comes up, so the
//! first dial is retried on a `n²`-second schedule before the process gives up.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use lapin::{Connection, ConnectionProperties};
use tracing::{error, info, warn};

use super::AmqpConfig;
use crate::bus::{BusError, Result};
use crate::utils::retry::QuadraticBuilder;

/// Owns the single broker connection of a process.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    url: String,
    backoff: QuadraticBuilder,
}

impl ConnectionManager {
    pub fn new(config: &AmqpConfig) -> Self {
        Self {
            url: config.url.clone(),
            backoff: QuadraticBuilder::default().with_max_times(config.max_connect_retries),
        }
    }

    /// Override the retry schedule.
    pub fn with_backoff(mut self, backoff: QuadraticBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Dial the broker, retrying until the attempt budget is spent.
    ///
    /// The returned connection is meant to be held for the process lifetime
    /// and shared by every channel the process opens.
    pub async fn connect(&self) -> Result<Arc<Connection>> {
        let url = self.url.clone();
        let connection = connect_with_backoff("RabbitMQ", self.backoff, || {
            let url = url.clone();
            async move { Connection::connect(&url, ConnectionProperties::default()).await }
        })
        .await?;

        Ok(Arc::new(connection))
    }
}

/// Run `dial` until it succeeds or `backoff` is exhausted.
///
/// Sleeps between attempts follow the backoff schedule; the first attempt is
/// immediate and success returns without further delay.
pub async fn connect_with_backoff<T, E, F, Fut>(
    service_name: &str,
    backoff: QuadraticBuilder,
    dial: F,
) -> Result<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let retries = AtomicUsize::new(0);

    let result = dial
        .retry(backoff)
        .notify(|err: &E, delay: Duration| {
            let attempt = retries.fetch_add(1, Ordering::SeqCst) + 1;
            warn!(
                service = %service_name,
                attempt,
                error = %err,
                delay = ?delay,
                "Broker not ready yet, backing off"
            );
        })
        .await;

    match result {
        Ok(connection) => {
            info!(service = %service_name, "Connected to broker");
            Ok(connection)
        }
        Err(e) => {
            let attempts = retries.load(Ordering::SeqCst) + 1;
            error!(
                service = %service_name,
                attempts,
                error = %e,
                "Giving up on broker connection"
            );
            Err(BusError::Connection(format!(
                "{} unreachable after {} attempts: {}",
                service_name, attempts, e
            )))
        }
    }
}
