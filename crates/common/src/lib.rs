//! Shared message types and error helpers used across all palaver crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::{BotType, Context, Input, Output, ReplyTarget, SenderKey},
};
