use std::sync::{Arc, PoisonError, RwLock};

use {
    palaver_common::{Context, Input},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use palaver_metrics::{commands as cmd_metrics, counter, gauge, labels};

use crate::{Command, CommandHelp, Error, Response, Result};

/// Ordered set of top-level commands. The first match wins.
pub struct Commands {
    commands: RwLock<Vec<Arc<dyn Command>>>,
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}

impl Commands {
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(Vec::new()),
        }
    }

    /// Add `command` after every command registered so far.
    pub fn append(&self, command: Arc<dyn Command>) {
        let mut commands = self.commands.write().unwrap_or_else(PoisonError::into_inner);
        if commands
            .iter()
            .any(|c| c.identifier() == command.identifier())
        {
            warn!(
                command = command.identifier(),
                "command identifier already registered; earlier registration matches first"
            );
        }
        debug!(command = command.identifier(), "registered command");
        commands.push(command);
        #[cfg(feature = "metrics")]
        gauge!(cmd_metrics::REGISTERED).set(commands.len() as f64);
    }

    /// Run the first command whose predicate accepts `input`.
    ///
    /// Only that command executes, even if it fails. Its error is returned
    /// as [`Error::Handler`]; no match yields [`Error::NoMatchingCommand`].
    pub async fn execute_first_matched(&self, ctx: Context, input: Input) -> Result<Response> {
        // Release the lock before running the handler.
        let matched = {
            let commands = self.commands.read().unwrap_or_else(PoisonError::into_inner);
            commands.iter().find(|c| c.matches(&input)).cloned()
        };

        let Some(command) = matched else {
            #[cfg(feature = "metrics")]
            counter!(cmd_metrics::UNMATCHED_TOTAL).increment(1);
            return Err(Error::NoMatchingCommand);
        };

        debug!(
            command = command.identifier(),
            sender = %input.sender_key(),
            "executing command"
        );
        #[cfg(feature = "metrics")]
        counter!(
            cmd_metrics::EXECUTIONS_TOTAL,
            labels::COMMAND => command.identifier().to_string()
        )
        .increment(1);

        command.execute(ctx, input).await.map_err(|err| {
            #[cfg(feature = "metrics")]
            counter!(
                cmd_metrics::ERRORS_TOTAL,
                labels::COMMAND => command.identifier().to_string()
            )
            .increment(1);
            Error::Handler(err)
        })
    }

    /// Help entries in registration order.
    pub fn helps(&self) -> Vec<CommandHelp> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|c| CommandHelp {
                identifier: c.identifier().to_string(),
                input_example: c.input_example().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
