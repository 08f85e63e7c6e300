pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by command routing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No registered command accepted the input.
    #[error("no matching command")]
    NoMatchingCommand,

    /// The matched command or continuation failed.
    #[error(transparent)]
    Handler(anyhow::Error),
}

impl Error {
    /// The handler error, if this is one.
    pub fn as_handler(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Handler(err) => Some(err),
            Self::NoMatchingCommand => None,
        }
    }
}
