//! Scripted transport for dispatcher and poller tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use punchclock_channels::{ChannelError, InboundMessage, MessageTransport, OutboundMessage};

pub fn inbound(update_id: i64, sender: &str, text: &str) -> InboundMessage {
    InboundMessage {
        update_id,
        chat_id: sender.to_string(),
        sender_id: sender.to_string(),
        sender_name: None,
        content: text.to_string(),
        timestamp: Utc::now(),
    }
}

/// Either a batch to hand out or a receive failure.
pub enum Scripted {
    Batch(Vec<InboundMessage>),
    Fail,
}

#[derive(Default)]
struct State {
    script: VecDeque<Scripted>,
    sent: Vec<OutboundMessage>,
    acked: Vec<i64>,
    fail_sends: bool,
}

#[derive(Default)]
pub struct RecordingTransport {
    state: Mutex<State>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, step: Scripted) {
        self.state.lock().unwrap().script.push_back(step);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn acked(&self) -> Vec<i64> {
        self.state.lock().unwrap().acked.clone()
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let mut s = self.state.lock().unwrap();
        if s.fail_sends {
            return Err(ChannelError::SendFailed("scripted failure".into()));
        }
        s.sent.push(msg.clone());
        Ok(())
    }

    async fn receive_batch(&self) -> Result<Vec<InboundMessage>, ChannelError> {
        let next = self.state.lock().unwrap().script.pop_front();
        match next {
            Some(Scripted::Batch(batch)) => Ok(batch),
            Some(Scripted::Fail) => Err(ChannelError::ReceiveFailed("scripted failure".into())),
            None => {
                // Stand-in for the long-poll wait.
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn acknowledge(&self, update_id: i64) -> Result<(), ChannelError> {
        self.state.lock().unwrap().acked.push(update_id);
        Ok(())
    }
}
