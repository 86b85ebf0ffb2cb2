pub mod adapter;
pub mod allow;
pub mod error;
pub mod handler;
pub mod send;

pub use adapter::TelegramTransport;
pub use error::TelegramError;
