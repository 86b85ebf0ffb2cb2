use punchclock_channels::ChannelError;

/// Errors produced by the Telegram transport.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("no bot token configured")]
    NoToken,

    #[error("invalid chat id: {0}")]
    InvalidChatId(String),
}

impl From<TelegramError> for ChannelError {
    fn from(e: TelegramError) -> Self {
        match e {
            TelegramError::NoToken => ChannelError::AuthFailed(e.to_string()),
            TelegramError::InvalidChatId(_) => ChannelError::SendFailed(e.to_string()),
            TelegramError::Teloxide(ref inner) => match inner {
                teloxide::RequestError::Network(_) => ChannelError::ConnectionFailed(e.to_string()),
                _ => ChannelError::SendFailed(e.to_string()),
            },
        }
    }
}
