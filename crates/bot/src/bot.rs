use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    async_trait::async_trait,
    palaver_channels::Adapter,
    palaver_commands::{Command, CommandHelp, Commands, Continuation, Response},
    palaver_common::{BotType, Context, Input, Output},
    palaver_continuation::{CacheConfig, ContinuationCache},
    tokio::{sync::mpsc, task::JoinHandle},
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use palaver_metrics::{
    bot as bot_metrics, conversation as conv_metrics, counter, histogram, labels,
};

use crate::Result;

/// Message that cancels the sender's pending conversation.
pub const ABORT_KEYWORD: &str = ".abort";

/// Construction settings for [`DefaultBot`].
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    pub conversation: CacheConfig,
    /// Directory holding per-command configuration files.
    pub plugin_config_dir: Option<PathBuf>,
}

/// A chat bot bound to one adapter.
#[async_trait]
pub trait Bot: Send + Sync {
    fn bot_type(&self) -> BotType;

    /// Handle one inbound message.
    ///
    /// Returns `Ok(None)` when the message cancelled a pending conversation.
    /// If the handler asked for another turn, its continuation is parked for
    /// the sender and the returned response's `next` is empty.
    async fn respond(&self, ctx: Context, input: Input) -> Result<Option<Response>>;

    async fn send_message(&self, ctx: &Context, output: Output) -> Result<()>;

    fn append_command(&self, command: Arc<dyn Command>);

    /// Run the adapter until `ctx` is cancelled or it fails.
    async fn run(
        &self,
        ctx: Context,
        inputs: mpsc::Sender<Input>,
        errors: mpsc::Sender<palaver_channels::Error>,
    );

    fn plugin_config_dir(&self) -> Option<&Path>;

    fn helps(&self) -> Vec<CommandHelp>;
}

/// [`Bot`] with in-memory conversation state.
pub struct DefaultBot {
    adapter: Arc<dyn Adapter>,
    commands: Arc<Commands>,
    conversations: ContinuationCache<Continuation>,
    plugin_config_dir: Option<PathBuf>,
    sweeper: Option<JoinHandle<()>>,
}

impl DefaultBot {
    /// Build the bot and start sweeping expired conversations.
    ///
    /// The sweeper stops when `ctx` is cancelled or the bot is dropped.
    /// Must be called from within a tokio runtime.
    pub fn new(adapter: Arc<dyn Adapter>, config: BotConfig, ctx: &Context) -> Self {
        let conversations = ContinuationCache::new(config.conversation);
        let sweeper = conversations.spawn_sweeper(ctx.token().clone());
        info!(
            bot_type = %adapter.bot_type(),
            ttl_secs = config.conversation.ttl.as_secs(),
            sweep_interval_secs = config.conversation.sweep_interval.as_secs(),
            "bot created"
        );
        Self {
            adapter,
            commands: Arc::new(Commands::new()),
            conversations,
            plugin_config_dir: config.plugin_config_dir,
            sweeper,
        }
    }

    /// Shared handle to the command registry.
    pub fn commands(&self) -> Arc<Commands> {
        Arc::clone(&self.commands)
    }

    /// Whether `input`'s sender has a conversation waiting for a reply.
    pub fn is_waiting(&self, input: &Input) -> bool {
        self.conversations.contains(input.sender_key())
    }

    async fn dispatch(&self, ctx: Context, input: Input) -> Result<Option<Response>> {
        let sender = input.sender_key().clone();

        let Some(next) = self.conversations.take(&sender) else {
            let response = self.commands.execute_first_matched(ctx, input).await?;
            return Ok(Some(self.rearm(&sender, response)));
        };

        if input.message().trim() == ABORT_KEYWORD {
            debug!(sender = %sender, "conversation aborted");
            #[cfg(feature = "metrics")]
            counter!(
                conv_metrics::ABORTED_TOTAL,
                labels::BOT_TYPE => self.adapter.bot_type().to_string()
            )
            .increment(1);
            return Ok(None);
        }

        debug!(sender = %sender, "resuming conversation");
        #[cfg(feature = "metrics")]
        counter!(
            conv_metrics::RESUMED_TOTAL,
            labels::BOT_TYPE => self.adapter.bot_type().to_string()
        )
        .increment(1);

        let response = next
            .resume(ctx, input)
            .await
            .map_err(palaver_commands::Error::Handler)?;
        Ok(Some(self.rearm(&sender, response)))
    }

    fn rearm(&self, sender: &palaver_common::SenderKey, mut response: Response) -> Response {
        if let Some(next) = response.next.take() {
            debug!(sender = %sender, "waiting for sender's next message");
            self.conversations.set(sender.clone(), next);
            #[cfg(feature = "metrics")]
            counter!(
                conv_metrics::ARMED_TOTAL,
                labels::BOT_TYPE => self.adapter.bot_type().to_string()
            )
            .increment(1);
        }
        response
    }
}

impl Drop for DefaultBot {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

#[async_trait]
impl Bot for DefaultBot {
    fn bot_type(&self) -> BotType {
        self.adapter.bot_type()
    }

    async fn respond(&self, ctx: Context, input: Input) -> Result<Option<Response>> {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();
        #[cfg(feature = "metrics")]
        counter!(
            bot_metrics::DISPATCHES_TOTAL,
            labels::BOT_TYPE => self.adapter.bot_type().to_string()
        )
        .increment(1);

        let result = self.dispatch(ctx, input).await;

        #[cfg(feature = "metrics")]
        histogram!(
            bot_metrics::DISPATCH_DURATION_SECONDS,
            labels::BOT_TYPE => self.adapter.bot_type().to_string()
        )
        .record(start.elapsed().as_secs_f64());

        result
    }

    async fn send_message(&self, ctx: &Context, output: Output) -> Result<()> {
        self.adapter.send_message(ctx, output).await?;
        #[cfg(feature = "metrics")]
        counter!(
            bot_metrics::MESSAGES_SENT_TOTAL,
            labels::BOT_TYPE => self.adapter.bot_type().to_string()
        )
        .increment(1);
        Ok(())
    }

    fn append_command(&self, command: Arc<dyn Command>) {
        self.commands.append(command);
    }

    async fn run(
        &self,
        ctx: Context,
        inputs: mpsc::Sender<Input>,
        errors: mpsc::Sender<palaver_channels::Error>,
    ) {
        self.adapter.run(ctx, inputs, errors).await;
    }

    fn plugin_config_dir(&self) -> Option<&Path> {
        self.plugin_config_dir.as_deref()
    }

    fn helps(&self) -> Vec<CommandHelp> {
        self.commands.helps()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use {
        palaver_channels::{MemoryAdapter, MemoryHandle},
        palaver_commands::FnCommand,
        rstest::rstest,
    };

    use super::*;

    fn bot_with(config: BotConfig) -> (DefaultBot, MemoryHandle) {
        let (adapter, handle) = MemoryAdapter::new(BotType::new("test"));
        (DefaultBot::new(Arc::new(adapter), config, &Context::new()), handle)
    }

    fn bot() -> (DefaultBot, MemoryHandle) {
        bot_with(BotConfig::default())
    }

    /// Registers a catch-all command counting its calls; replies "routed".
    fn route_counter(bot: &DefaultBot) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bot.append_command(Arc::new(FnCommand::new(
            "fallback",
            |_| true,
            move |_ctx, _input| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Response::text("routed")) }
            },
        )));
        calls
    }

    /// Continuation that counts its calls and replies "resumed".
    fn counting_continuation(calls: &Arc<AtomicUsize>) -> Continuation {
        let calls = Arc::clone(calls);
        Continuation::new(move |_ctx, _input| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response::text("resumed"))
        })
    }

    #[tokio::test]
    async fn idle_sender_routes_through_commands() {
        let (bot, handle) = bot();
        let routed = route_counter(&bot);

        let res = bot
            .respond(Context::new(), handle.input("u1", "hello"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(res.content.as_deref(), Some("routed"));
        assert_eq!(routed.load(Ordering::SeqCst), 1);
        assert!(!bot.is_waiting(&handle.input("u1", "")));
    }

    #[tokio::test]
    async fn no_matching_command_propagates() {
        let (bot, handle) = bot();
        let err = bot
            .respond(Context::new(), handle.input("u1", "hello"))
            .await
            .unwrap_err();
        assert!(err.is_no_matching_command());
        assert_eq!(err.to_string(), "no matching command");
    }

    #[tokio::test]
    async fn pending_continuation_is_consumed_before_running() {
        let (bot, handle) = bot();
        let routed = route_counter(&bot);
        let resumed = Arc::new(AtomicUsize::new(0));

        let input = handle.input("u1", "answer");
        bot.conversations
            .set(input.sender_key().clone(), counting_continuation(&resumed));

        let res = bot.respond(Context::new(), input.clone()).await.unwrap().unwrap();
        assert_eq!(res.content.as_deref(), Some("resumed"));
        assert!(!bot.is_waiting(&input));

        // Next message goes back to command routing.
        bot.respond(Context::new(), input).await.unwrap();
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
        assert_eq!(routed.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[case(".abort")]
    #[case("  .abort  ")]
    #[case("\t.abort\n")]
    #[tokio::test]
    async fn abort_cancels_without_running(#[case] text: &str) {
        let (bot, handle) = bot();
        let routed = route_counter(&bot);
        let resumed = Arc::new(AtomicUsize::new(0));

        let input = handle.input("u1", text);
        bot.conversations
            .set(input.sender_key().clone(), counting_continuation(&resumed));

        assert!(bot.respond(Context::new(), input.clone()).await.unwrap().is_none());
        assert_eq!(resumed.load(Ordering::SeqCst), 0);
        assert!(!bot.is_waiting(&input));

        // With nothing pending, the abort keyword is just another message.
        let res = bot.respond(Context::new(), input).await.unwrap().unwrap();
        assert_eq!(res.content.as_deref(), Some("routed"));
        assert_eq!(routed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_continuation_is_not_rearmed() {
        let (bot, handle) = bot();
        route_counter(&bot);

        let input = handle.input("u1", "oops");
        bot.conversations.set(
            input.sender_key().clone(),
            Continuation::new(|_ctx, _input| async {
                Err(anyhow::anyhow!("unexpected reply"))
            }),
        );

        let err = bot.respond(Context::new(), input.clone()).await.unwrap_err();
        assert_eq!(err.to_string(), "unexpected reply");
        assert!(!bot.is_waiting(&input));
    }

    #[tokio::test]
    async fn command_continuation_arms_next_turn() {
        let (bot, handle) = bot();
        bot.append_command(Arc::new(FnCommand::new(
            "ask",
            |i| i.message() == "ask",
            |_ctx, _input| async {
                Ok(Response::text("name?").with_next(Continuation::new(
                    |_ctx, input: Input| async move {
                        Ok(Response::text(format!("hi {}", input.message())))
                    },
                )))
            },
        )));

        let first = bot
            .respond(Context::new(), handle.input("u1", "ask"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.content.as_deref(), Some("name?"));
        assert!(first.next.is_none());
        assert!(bot.is_waiting(&handle.input("u1", "")));
        // Other senders are unaffected.
        assert!(!bot.is_waiting(&handle.input("u2", "")));

        let second = bot
            .respond(Context::new(), handle.input("u1", "ann"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.content.as_deref(), Some("hi ann"));
        assert!(!bot.is_waiting(&handle.input("u1", "")));
    }

    #[tokio::test]
    async fn continuation_can_chain_turns() {
        let (bot, handle) = bot();
        let input = handle.input("u1", "step");
        bot.conversations.set(
            input.sender_key().clone(),
            Continuation::new(|_ctx, _input| async {
                Ok(Response::text("one").with_next(Continuation::new(|_ctx, _input| async {
                    Ok(Response::text("two"))
                })))
            }),
        );

        let one = bot.respond(Context::new(), input.clone()).await.unwrap().unwrap();
        assert_eq!(one.content.as_deref(), Some("one"));
        assert!(bot.is_waiting(&input));

        let two = bot.respond(Context::new(), input.clone()).await.unwrap().unwrap();
        assert_eq!(two.content.as_deref(), Some("two"));
        assert!(!bot.is_waiting(&input));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_conversation_falls_back_to_routing() {
        let (bot, handle) = bot_with(BotConfig {
            conversation: CacheConfig {
                ttl: Duration::from_secs(10),
                sweep_interval: Duration::from_secs(60),
            },
            plugin_config_dir: None,
        });
        let routed = route_counter(&bot);
        let resumed = Arc::new(AtomicUsize::new(0));

        let input = handle.input("u1", "late");
        bot.conversations
            .set(input.sender_key().clone(), counting_continuation(&resumed));

        tokio::time::advance(Duration::from_secs(11)).await;

        let res = bot.respond(Context::new(), input).await.unwrap().unwrap();
        assert_eq!(res.content.as_deref(), Some("routed"));
        assert_eq!(resumed.load(Ordering::SeqCst), 0);
        assert_eq!(routed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn duplicate_messages_resume_once() {
        let (bot, handle) = bot();
        let bot = Arc::new(bot);
        let routed = route_counter(&bot);
        let resumed = Arc::new(AtomicUsize::new(0));

        let input = handle.input("u1", "dup");
        bot.conversations
            .set(input.sender_key().clone(), counting_continuation(&resumed));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let bot = Arc::clone(&bot);
                let input = input.clone();
                tokio::spawn(async move { bot.respond(Context::new(), input).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(resumed.load(Ordering::SeqCst), 1);
        assert_eq!(routed.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn exposes_config_and_helps() {
        let (bot, _handle) = bot_with(BotConfig {
            plugin_config_dir: Some(PathBuf::from("/etc/palaver/plugins")),
            ..Default::default()
        });
        bot.append_command(Arc::new(
            FnCommand::new("echo", |_| false, |_ctx, _input| async {
                Ok(Response::empty())
            })
            .with_example(".echo hi"),
        ));

        assert_eq!(bot.bot_type(), BotType::new("test"));
        assert_eq!(
            bot.plugin_config_dir(),
            Some(Path::new("/etc/palaver/plugins"))
        );
        assert_eq!(bot.helps()[0].input_example, ".echo hi");
    }

    #[tokio::test]
    async fn send_message_goes_through_adapter() {
        let (bot, mut handle) = bot();
        bot.send_message(
            &Context::new(),
            Output::new(palaver_common::ReplyTarget::new("u1"), "hello"),
        )
        .await
        .unwrap();
        assert_eq!(handle.next_output().await.unwrap().content, "hello");
    }
}
