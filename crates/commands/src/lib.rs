//! Top-level command routing.
//!
//! Commands are kept in registration order and the first one whose predicate
//! accepts an input handles it. A handler may return a [`Continuation`] in its
//! [`Response`] to claim the sender's next message.

pub mod command;
pub mod error;
pub mod registry;
pub mod response;

pub use {
    command::{Command, CommandHelp, FnCommand},
    error::{Error, Result},
    registry::Commands,
    response::{Continuation, Response},
};
