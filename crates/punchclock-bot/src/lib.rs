//! `punchclock-bot`: the chat front end: command parsing, the `/config`
//! dialogue, reply texts and the inbound poll loop.

pub mod commands;
pub mod dispatcher;
pub mod poller;
pub mod replies;
#[cfg(test)]
mod testing;

pub use commands::Command;
pub use dispatcher::{BotSettings, CommandDispatcher};
pub use poller::Poller;
