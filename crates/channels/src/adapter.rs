use {
    async_trait::async_trait,
    palaver_common::{BotType, Context, Input, Output},
    tokio::sync::mpsc,
};

use crate::{Error, Result};

/// Connection to a single messaging platform.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Platform identifier, also used to scope sender keys.
    fn bot_type(&self) -> BotType;

    /// Receive messages until `ctx` is cancelled.
    ///
    /// Each inbound message goes to `inputs`. An unrecoverable failure is
    /// reported on `errors`, after which the adapter stops.
    async fn run(&self, ctx: Context, inputs: mpsc::Sender<Input>, errors: mpsc::Sender<Error>);

    /// Deliver `output` to its destination.
    async fn send_message(&self, ctx: &Context, output: Output) -> Result<()>;
}
