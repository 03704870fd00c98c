//! Bounded concurrent dispatch.
//!
//! Each message is handled on its own task, but at most `capacity` tasks run
//! at once. When the pool is full, [`DispatchPool::submit`] waits, which stops
//! the reader from pulling further deliveries off the stream. The AMQP consumer
//! acknowledges a delivery only when it is pulled and sets its prefetch to the
//! pool capacity, so a stalled pool also stops the broker from sending more.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::{watch, Semaphore};
use tracing::{error, info};

use super::Dispatcher;
use crate::utils::bootstrap::wait_for_shutdown;

/// Runs message handling tasks with a concurrency limit.
#[derive(Clone)]
pub struct DispatchPool {
    dispatcher: Arc<Dispatcher>,
    permits: Arc<Semaphore>,
    capacity: u32,
}

impl DispatchPool {
    pub fn new(dispatcher: Arc<Dispatcher>, capacity: usize) -> Self {
        let capacity = u32::try_from(capacity.clamp(1, Semaphore::MAX_PERMITS))
            .unwrap_or(u32::MAX);

        Self {
            dispatcher,
            permits: Arc::new(Semaphore::new(capacity as usize)),
            capacity,
        }
    }

    /// Hand a message body to a worker task, waiting for a free slot first.
    pub async fn submit(&self, body: Vec<u8>) {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Dispatch pool closed, dropping message");
                return;
            }
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            dispatcher.handle_body(&body).await;
            drop(permit);
        });
    }

    /// Maximum number of messages handled at once.
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Number of messages currently being handled.
    pub fn in_flight(&self) -> usize {
        self.capacity as usize - self.permits.available_permits()
    }

    /// Wait until every submitted message has been handled.
    pub async fn drain(&self) {
        match self.permits.acquire_many(self.capacity).await {
            Ok(all) => drop(all),
            Err(e) => error!(error = %e, "Dispatch pool closed while draining"),
        }
    }
}

/// Feed message bodies from `stream` into `pool` until the stream ends,
/// yields an error, or `shutdown` fires.
///
/// Shutdown is checked before each pull. In-flight messages are drained before
/// returning. Returns the number of messages received.
pub async fn pump<S, E>(
    stream: S,
    pool: &DispatchPool,
    shutdown: watch::Receiver<bool>,
) -> Result<usize, E>
where
    S: Stream<Item = Result<Vec<u8>, E>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut shutdown = std::pin::pin!(wait_for_shutdown(shutdown));
    let mut received = 0usize;

    let outcome = loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!(received, "Shutdown requested, stopping consumer");
                break Ok(received);
            }
            next = stream.next() => {
                match next {
                    Some(Ok(body)) => {
                        received += 1;
                        pool.submit(body).await;
                    }
                    Some(Err(e)) => break Err(e),
                    None => {
                        info!(received, "Message stream ended");
                        break Ok(received);
                    }
                }
            }
        }
    };

    pool.drain().await;
    outcome
}
