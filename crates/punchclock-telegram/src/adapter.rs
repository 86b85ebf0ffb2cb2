//! Telegram transport.
//!
//! Long polling via `getUpdates`; no public URL required. The transport owns
//! the update offset and only advances it when told to.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::AllowedUpdate;
use tracing::{debug, info, warn};

use punchclock_channels::{ChannelError, InboundMessage, MessageTransport, OutboundMessage};
use punchclock_core::config::TelegramConfig;

use crate::error::TelegramError;
use crate::handler::inbound_from_update;
use crate::send;

pub struct TelegramTransport {
    bot: Bot,
    allow_users: Vec<String>,
    poll_timeout_secs: u32,
    /// Next `getUpdates` offset: one past the last acknowledged update.
    offset: AtomicI64,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        if config.bot_token.trim().is_empty() {
            return Err(TelegramError::NoToken);
        }
        Ok(Self {
            bot: Bot::new(config.bot_token.trim()),
            allow_users: config.allow_users.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
            offset: AtomicI64::new(0),
        })
    }

    /// Check the token and log which bot we are running as.
    pub async fn identify(&self) -> Result<String, TelegramError> {
        let me = self.bot.get_me().await?;
        let name = me.user.username.clone().unwrap_or_default();
        info!(bot = %name, "Telegram: authenticated");
        Ok(name)
    }

    /// The stored offset as the `i32` that `getUpdates` takes.
    fn request_offset(&self) -> Result<i32, ChannelError> {
        let offset = self.offset.load(Ordering::SeqCst);
        i32::try_from(offset).map_err(|_| {
            ChannelError::ReceiveFailed(format!("update offset {offset} exceeds the getUpdates range"))
        })
    }

    fn advance_to(&self, next_offset: i64) {
        self.offset.fetch_max(next_offset, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageTransport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        send::send_text(&self.bot, &msg.chat_id, &msg.content)
            .await
            .map_err(ChannelError::from)
    }

    async fn receive_batch(&self) -> Result<Vec<InboundMessage>, ChannelError> {
        let offset = self.request_offset()?;
        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .timeout(self.poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message])
            .await
            .map_err(|e| ChannelError::ReceiveFailed(e.to_string()))?;

        let Some(last_id) = updates.iter().map(|u| i64::from(u.id.0)).max() else {
            return Ok(Vec::new());
        };

        let mut batch: Vec<InboundMessage> = updates
            .iter()
            .filter_map(|u| inbound_from_update(u, &self.allow_users))
            .collect();
        batch.sort_by_key(|m| m.update_id);

        debug!(fetched = updates.len(), dispatchable = batch.len(), "Telegram: batch received");

        // Nothing to hand out: skip past the filtered updates right away so
        // they are not fetched again.
        if batch.is_empty() {
            self.advance_to(last_id + 1);
        }
        Ok(batch)
    }

    async fn acknowledge(&self, update_id: i64) -> Result<(), ChannelError> {
        let current = self.offset.load(Ordering::SeqCst);
        if update_id + 1 < current {
            warn!(update_id, current, "Telegram: acknowledge behind cursor ignored");
            return Ok(());
        }
        self.advance_to(update_id + 1);
        Ok(())
    }
}
