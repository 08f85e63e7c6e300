use std::{fmt, future::Future};

use {
    futures::future::BoxFuture,
    palaver_common::{Context, Input},
};

type ResumeFn =
    Box<dyn FnOnce(Context, Input) -> BoxFuture<'static, anyhow::Result<Response>> + Send + Sync>;

/// Deferred handler for a sender's next message.
///
/// A continuation runs at most once: [`Continuation::resume`] consumes it.
pub struct Continuation {
    resume: ResumeFn,
}

impl Continuation {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Context, Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
    {
        Self {
            resume: Box::new(move |ctx, input| Box::pin(f(ctx, input))),
        }
    }

    /// Run the deferred handler against the sender's new message.
    pub async fn resume(self, ctx: Context, input: Input) -> anyhow::Result<Response> {
        (self.resume)(ctx, input).await
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation").finish_non_exhaustive()
    }
}

/// Result of running a command or continuation.
///
/// `next` set means the conversation continues with the sender's next
/// message; `None` ends it.
#[derive(Debug, Default)]
pub struct Response {
    pub content: Option<String>,
    pub next: Option<Continuation>,
}

impl Response {
    /// A response with nothing to send and no follow-up.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            next: None,
        }
    }

    #[must_use]
    pub fn with_next(mut self, next: Continuation) -> Self {
        self.next = Some(next);
        self
    }

    /// Whether the conversation continues after this response.
    pub fn continues(&self) -> bool {
        self.next.is_some()
    }
}
