use async_trait::async_trait;

use crate::{
    error::ChannelError,
    types::{InboundMessage, OutboundMessage},
};

/// A pull-based chat transport.
///
/// The transport owns its read cursor: [`receive_batch`](Self::receive_batch)
/// returns everything past the cursor and [`acknowledge`](Self::acknowledge)
/// advances it. Until acknowledged, a batch may be delivered again.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Stable lowercase identifier (e.g. `"telegram"`), used in log fields.
    fn name(&self) -> &str;

    /// Deliver one message. Takes `&self` so replies can be sent while a
    /// batch is being processed.
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;

    /// Next batch of text messages, in `update_id` order. May block up to
    /// the transport's long-poll timeout and return an empty batch.
    async fn receive_batch(&self) -> Result<Vec<InboundMessage>, ChannelError>;

    /// Mark every update up to and including `update_id` as handled.
    async fn acknowledge(&self, update_id: i64) -> Result<(), ChannelError>;
}
