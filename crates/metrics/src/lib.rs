//! Metrics collection and export for palaver.
//!
//! Crates record through the `metrics` facade using the names in this crate.
//! With the `prometheus` feature, [`init_metrics`] installs a Prometheus
//! recorder whose handle renders the text exposition format.
//!
//! ```rust,ignore
//! use palaver_metrics::{counter, conversation, labels};
//!
//! counter!(conversation::RESUMED_TOTAL, labels::BOT_TYPE => "console").increment(1);
//! ```

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
