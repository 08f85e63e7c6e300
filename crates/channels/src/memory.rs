//! In-process adapter backed by channels, for tests and embedding.

use std::sync::{Mutex, PoisonError};

use {
    async_trait::async_trait,
    chrono::Utc,
    palaver_common::{BotType, Context, Input, Output, ReplyTarget, SenderKey},
    tokio::sync::mpsc,
    tracing::debug,
};

use crate::{Adapter, Error, Result};

/// Adapter whose inbound side is driven by a [`MemoryHandle`].
pub struct MemoryAdapter {
    bot_type: BotType,
    receivers: Mutex<Option<(mpsc::Receiver<Input>, mpsc::Receiver<Error>)>>,
    sent: mpsc::UnboundedSender<Output>,
}

/// Test-side end of a [`MemoryAdapter`].
pub struct MemoryHandle {
    bot_type: BotType,
    inbound: mpsc::Sender<Input>,
    fatal: mpsc::Sender<Error>,
    sent: mpsc::UnboundedReceiver<Output>,
}

impl MemoryAdapter {
    pub fn new(bot_type: BotType) -> (Self, MemoryHandle) {
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let (fatal_tx, fatal_rx) = mpsc::channel(1);
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();

        let adapter = Self {
            bot_type: bot_type.clone(),
            receivers: Mutex::new(Some((inbound_rx, fatal_rx))),
            sent: sent_tx,
        };
        let handle = MemoryHandle {
            bot_type,
            inbound: inbound_tx,
            fatal: fatal_tx,
            sent: sent_rx,
        };
        (adapter, handle)
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn bot_type(&self) -> BotType {
        self.bot_type.clone()
    }

    async fn run(&self, ctx: Context, inputs: mpsc::Sender<Input>, errors: mpsc::Sender<Error>) {
        let taken = self
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some((mut inbound, mut fatal)) = taken else {
            let _ = errors
                .send(Error::unavailable("memory adapter is already running"))
                .await;
            return;
        };

        // Both senders live in the handle; inbound closing means it was dropped.
        let mut fatal_open = true;
        loop {
            tokio::select! {
                () = ctx.cancelled() => break,
                input = inbound.recv() => match input {
                    Some(input) => {
                        if inputs.send(input).await.is_err() {
                            break;
                        }
                    },
                    None => break,
                },
                err = fatal.recv(), if fatal_open => match err {
                    Some(err) => {
                        let _ = errors.send(err).await;
                        break;
                    },
                    None => fatal_open = false,
                },
            }
        }
        debug!(bot_type = %self.bot_type, "memory adapter stopped");
    }

    async fn send_message(&self, _ctx: &Context, output: Output) -> Result<()> {
        self.sent.send(output).map_err(|_| Error::Closed)
    }
}

impl MemoryHandle {
    /// Build an input from `sender_id`, replying to the same ID.
    pub fn input(&self, sender_id: &str, text: &str) -> Input {
        Input::new(
            SenderKey::new(&self.bot_type, sender_id),
            text,
            Utc::now(),
            ReplyTarget::new(sender_id),
        )
    }

    /// Feed a message from `sender_id` into the running adapter.
    pub async fn send(&self, sender_id: &str, text: &str) -> Result<()> {
        self.inbound
            .send(self.input(sender_id, text))
            .await
            .map_err(|_| Error::Closed)
    }

    /// Make the running adapter report a fatal error.
    pub async fn fail(&self, err: Error) -> Result<()> {
        self.fatal.send(err).await.map_err(|_| Error::Closed)
    }

    /// Next output the bot delivered, or `None` once the adapter is gone.
    pub async fn next_output(&mut self) -> Option<Output> {
        self.sent.recv().await
    }
}
