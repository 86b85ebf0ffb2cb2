pub mod channel;
pub mod error;
pub mod recent;
pub mod types;

pub use channel::MessageTransport;
pub use error::ChannelError;
pub use recent::RecentUpdates;
pub use types::{InboundMessage, OutboundMessage};
