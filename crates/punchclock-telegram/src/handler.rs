//! Turns raw Telegram updates into [`InboundMessage`]s.
//!
//! Runs for every fetched update. Drops:
//! 1. non-message updates (edits, callbacks, member changes)
//! 2. messages without a sender or without text
//! 3. messages from other bots
//! 4. senders not on the allowlist

use punchclock_channels::InboundMessage;
use teloxide::types::{Update, UpdateKind};
use tracing::debug;

use crate::allow;

/// Fields of a message that decide whether it is dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct Sender<'a> {
    pub user_id: String,
    pub username: Option<&'a str>,
    pub is_bot: bool,
}

/// `true` when a message from `sender` should reach the bot.
pub fn admit(sender: &Sender<'_>, allow_users: &[String]) -> bool {
    if sender.is_bot {
        return false;
    }
    if !allow::is_allowed(allow_users, sender.username, &sender.user_id) {
        debug!(user = %sender.user_id, "telegram: sender not on allowlist");
        return false;
    }
    true
}

/// Convert one update, or `None` if it is not for the bot.
pub fn inbound_from_update(update: &Update, allow_users: &[String]) -> Option<InboundMessage> {
    let UpdateKind::Message(msg) = &update.kind else {
        return None;
    };
    let from = msg.from.as_ref()?;
    let text = msg.text()?;

    let sender = Sender {
        user_id: from.id.0.to_string(),
        username: from.username.as_deref(),
        is_bot: from.is_bot,
    };
    if !admit(&sender, allow_users) {
        return None;
    }

    Some(InboundMessage {
        update_id: i64::from(update.id.0),
        chat_id: msg.chat.id.0.to_string(),
        sender_id: sender.user_id,
        sender_name: from.username.clone(),
        content: text.to_string(),
        timestamp: msg.date,
    })
}
