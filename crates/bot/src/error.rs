use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Command routing or handler failure, passed through unchanged.
    #[error(transparent)]
    Command(#[from] palaver_commands::Error),

    #[error(transparent)]
    Channel(#[from] palaver_channels::Error),

    /// The adapter reported an unrecoverable error and stopped.
    #[error("adapter stopped: {0}")]
    Adapter(#[source] palaver_channels::Error),
}

impl Error {
    /// Whether no command accepted the input.
    pub fn is_no_matching_command(&self) -> bool {
        matches!(
            self,
            Self::Command(palaver_commands::Error::NoMatchingCommand)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
