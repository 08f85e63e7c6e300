use std::future::Future;

use {
    async_trait::async_trait,
    futures::future::BoxFuture,
    palaver_common::{Context, Input},
    serde::Serialize,
};

use crate::Response;

/// A top-level handler, tried when the sender has no conversation in progress.
#[async_trait]
pub trait Command: Send + Sync {
    /// Stable identifier (e.g. "echo").
    fn identifier(&self) -> &str;

    /// Example input shown in help listings.
    fn input_example(&self) -> &str {
        ""
    }

    /// Whether this command handles `input`.
    fn matches(&self, input: &Input) -> bool;

    async fn execute(&self, ctx: Context, input: Input) -> anyhow::Result<Response>;
}

/// Help line for one registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandHelp {
    pub identifier: String,
    pub input_example: String,
}

type MatchFn = Box<dyn Fn(&Input) -> bool + Send + Sync>;
type ExecuteFn =
    Box<dyn Fn(Context, Input) -> BoxFuture<'static, anyhow::Result<Response>> + Send + Sync>;

/// [`Command`] assembled from closures.
pub struct FnCommand {
    identifier: String,
    input_example: String,
    matcher: MatchFn,
    handler: ExecuteFn,
}

impl FnCommand {
    pub fn new<M, F, Fut>(identifier: impl Into<String>, matcher: M, handler: F) -> Self
    where
        M: Fn(&Input) -> bool + Send + Sync + 'static,
        F: Fn(Context, Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
    {
        Self {
            identifier: identifier.into(),
            input_example: String::new(),
            matcher: Box::new(matcher),
            handler: Box::new(move |ctx, input| Box::pin(handler(ctx, input))),
        }
    }

    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.input_example = example.into();
        self
    }
}

#[async_trait]
impl Command for FnCommand {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn input_example(&self) -> &str {
        &self.input_example
    }

    fn matches(&self, input: &Input) -> bool {
        (self.matcher)(input)
    }

    async fn execute(&self, ctx: Context, input: Input) -> anyhow::Result<Response> {
        (self.handler)(ctx, input).await
    }
}
