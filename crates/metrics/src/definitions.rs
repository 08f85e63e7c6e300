//! Metric name and label definitions.
//!
//! Every metric recorded by palaver is named here so the exported set is
//! documented in one place.

/// Inbound message dispatch
pub mod bot {
    /// Messages passed to `respond`
    pub const DISPATCHES_TOTAL: &str = "palaver_bot_dispatches_total";
    /// Time spent in `respond`, including handler execution
    pub const DISPATCH_DURATION_SECONDS: &str = "palaver_bot_dispatch_duration_seconds";
    /// Responses delivered to the adapter
    pub const MESSAGES_SENT_TOTAL: &str = "palaver_bot_messages_sent_total";
    /// Fatal adapter errors that stopped the runner
    pub const ADAPTER_ERRORS_TOTAL: &str = "palaver_bot_adapter_errors_total";
}

/// Multi-turn conversation state
pub mod conversation {
    /// Conversations currently waiting for the sender's next message
    pub const PENDING: &str = "palaver_conversations_pending";
    /// Continuations armed after a handler asked for another turn
    pub const ARMED_TOTAL: &str = "palaver_conversations_armed_total";
    /// Continuations resumed by the sender's next message
    pub const RESUMED_TOTAL: &str = "palaver_conversations_resumed_total";
    /// Conversations cancelled with the abort keyword
    pub const ABORTED_TOTAL: &str = "palaver_conversations_aborted_total";
    /// Entries removed by the background sweep
    pub const EXPIRED_TOTAL: &str = "palaver_conversations_expired_total";
}

/// Command routing
pub mod commands {
    /// Registered commands
    pub const REGISTERED: &str = "palaver_commands_registered";
    /// Command executions (labelled by command identifier)
    pub const EXECUTIONS_TOTAL: &str = "palaver_command_executions_total";
    /// Inputs no command accepted
    pub const UNMATCHED_TOTAL: &str = "palaver_commands_unmatched_total";
    /// Handler failures (labelled by command identifier)
    pub const ERRORS_TOTAL: &str = "palaver_command_errors_total";
}

/// Common label keys used across metrics
pub mod labels {
    pub const BOT_TYPE: &str = "bot_type";
    pub const COMMAND: &str = "command";
}

/// Histogram buckets
pub mod buckets {
    /// Dispatch duration buckets (in seconds), 1ms to 2 minutes
    pub const DISPATCH_DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
    ];
}
