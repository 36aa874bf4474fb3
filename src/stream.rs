//! Queue consumption loop.
//!
//! [`StreamAdapter`] pulls messages off the inbound channel and runs the
//! handler on each under a concurrency bound. Handler failures are logged
//! and the stream keeps going; only channel closure or cancellation stops
//! it, and shutdown waits for in-flight messages to finish.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::handler::StatusHandler;
use crate::message::QueueMessage;

const DEFAULT_CONCURRENCY: usize = 10;

pub struct StreamAdapter {
    handler: Arc<StatusHandler>,
    concurrency: usize,
}

impl StreamAdapter {
    pub fn new(handler: Arc<StatusHandler>) -> Self {
        StreamAdapter {
            handler,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(handler: Arc<StatusHandler>, concurrency: usize) -> Self {
        StreamAdapter {
            handler,
            concurrency: concurrency.max(1),
        }
    }

    /// Consumes messages until the channel closes or `cancel` fires, then
    /// drains in-flight handlers before returning. When `forward` is set,
    /// every received message is also passed downstream, whether or not its
    /// handler succeeded.
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<QueueMessage>,
        forward: Option<mpsc::Sender<QueueMessage>>,
        cancel: CancellationToken,
    ) {
        let limiter = Arc::new(Semaphore::new(self.concurrency));

        loop {
            let msg = tokio::select! {
                () = cancel.cancelled() => {
                    info!("stream cancelled");
                    break;
                }
                msg = rx.recv() => match msg {
                    Some(msg) => msg,
                    None => {
                        info!("stream closed");
                        break;
                    }
                },
            };

            // The semaphore is never closed, so acquisition only fails if it
            // is dropped, which cannot happen while we hold a clone.
            let Ok(permit) = limiter.clone().acquire_owned().await else {
                break;
            };

            let handler = self.handler.clone();
            let forward = forward.clone();
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(err) = handler.handle(&msg).await {
                    error!(event_type = %msg.event_type, error = %err, "message handling failed");
                }
                // Forwarded whether or not the handler succeeded.
                if let Some(forward) = forward {
                    if forward.send(msg).await.is_err() {
                        debug!("forward channel closed");
                    }
                }
            });
        }

        // Reacquiring every permit proves all spawned handlers finished.
        let _ = limiter.acquire_many(self.concurrency as u32).await;
        info!("stream drained");
    }
}
