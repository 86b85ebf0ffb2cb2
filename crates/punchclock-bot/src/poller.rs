//! The inbound poll loop.
//!
//! One batch at a time, messages handled strictly in order, the transport
//! cursor acknowledged only after the whole batch. A bounded memory of
//! recent update ids keeps a redelivered batch from being handled twice.

use std::sync::Arc;
use std::time::Duration;

use punchclock_channels::{ChannelError, InboundMessage, MessageTransport, RecentUpdates};
use punchclock_core::panic_message;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::dispatcher::CommandDispatcher;

pub struct Poller {
    transport: Arc<dyn MessageTransport>,
    dispatcher: Arc<CommandDispatcher>,
    recent: RecentUpdates,
    error_backoff: Duration,
}

impl Poller {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        dispatcher: Arc<CommandDispatcher>,
        error_backoff: Duration,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            recent: RecentUpdates::default(),
            error_backoff,
        }
    }

    /// Fetch and handle one batch. Returns how many messages were dispatched.
    pub async fn poll_once(&mut self) -> Result<usize, ChannelError> {
        let batch = self.transport.receive_batch().await?;
        let Some(last) = batch.last().map(|m| m.update_id) else {
            return Ok(0);
        };

        let mut handled = 0;
        for msg in &batch {
            if !self.recent.insert(msg.update_id) {
                debug!(update_id = msg.update_id, "duplicate update skipped");
                continue;
            }
            self.dispatch(msg).await;
            handled += 1;
        }

        // A failed acknowledge means the batch comes back; the recent-id
        // guard then skips it.
        if let Err(e) = self.transport.acknowledge(last).await {
            warn!(transport = self.transport.name(), update_id = last, error = %e, "acknowledge failed");
        }
        Ok(handled)
    }

    /// Handle one message in its own task so that a panicking handler costs
    /// only that message.
    async fn dispatch(&self, msg: &InboundMessage) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let owned = msg.clone();
        let task = tokio::spawn(async move { dispatcher.handle(&owned).await });
        if let Err(join_err) = task.await {
            let message = match join_err.try_into_panic() {
                Ok(payload) => panic_message(payload),
                Err(e) => e.to_string(),
            };
            error!(
                update_id = msg.update_id,
                sender = %msg.sender_id,
                panic = %message,
                "message handler panicked; update dropped"
            );
        }
    }

    /// Poll until `shutdown` broadcasts `true`. Receive errors are logged and
    /// followed by a pause; they never end the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(transport = self.transport.name(), "poll loop started");
        loop {
            tokio::select! {
                result = self.poll_once() => {
                    if let Err(e) = result {
                        warn!(
                            transport = self.transport.name(),
                            error = %e,
                            backoff_secs = self.error_backoff.as_secs(),
                            "receive failed; backing off"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(self.error_backoff) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                }
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                info!("poll loop shutting down");
                break;
            }
        }
    }
}
