//! Transport boundary.
//!
//! An [`Adapter`] connects a bot to one messaging platform: it turns platform
//! events into [`Input`](palaver_common::Input)s and delivers
//! [`Output`](palaver_common::Output)s. The bot never sees the wire protocol.

pub mod adapter;
pub mod error;
pub mod memory;

pub use {
    adapter::Adapter,
    error::{Error, Result},
    memory::{MemoryAdapter, MemoryHandle},
};
