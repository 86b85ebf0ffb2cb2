use thiserror::Error;

/// Errors that can occur within any message transport.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The transport could not reach the platform.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Fetching the next batch of updates failed.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The platform rejected the supplied credentials or token.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),
}
