//! Inbound message dispatch: resume a pending conversation or route to a command.
//!
//! Flow per message: look up the sender's pending continuation → if none,
//! run the first matching command → if the result asks for another turn,
//! park its continuation for the sender. A pending continuation is removed
//! before it runs, and the abort keyword cancels it without running it.

pub mod bot;
pub mod error;
pub mod runner;

pub use {
    bot::{ABORT_KEYWORD, Bot, BotConfig, DefaultBot},
    error::{Error, Result},
    runner::run_bot,
};
