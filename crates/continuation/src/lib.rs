//! Per-sender conversation state with time-based expiry.
//!
//! A handler that wants the sender's next message parks a continuation here,
//! keyed by [`SenderKey`](palaver_common::SenderKey). Entries expire `ttl`
//! after they are set; expiry is checked on every access and a background
//! sweeper removes abandoned entries on a fixed cadence.

pub mod cache;

pub use cache::{CacheConfig, ContinuationCache};
