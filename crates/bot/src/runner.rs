use std::sync::Arc;

use {
    palaver_commands::Response,
    palaver_common::{Context, Input, Output},
    tokio::{sync::mpsc, task::JoinSet},
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use palaver_metrics::{bot as bot_metrics, counter, labels};

use crate::{Bot, Error, Result};

/// Inputs buffered between the adapter and the dispatcher.
const INPUT_BUFFER: usize = 256;

/// Drive `bot` until `ctx` is cancelled, the adapter finishes, or it fails.
///
/// Every inbound message is dispatched on its own task, so a slow handler
/// never holds up other senders. Messages from one sender are not ordered:
/// a reply sent before the previous response has armed its continuation
/// may be routed as a fresh command. Responses with content are sent back to
/// the input's reply target. Handler failures are logged and do not stop
/// the loop; a fatal adapter error does, and is returned.
pub async fn run_bot(bot: Arc<dyn Bot>, ctx: Context) -> Result<()> {
    let bot_type = bot.bot_type();
    let run_ctx = ctx.child();
    let (input_tx, mut input_rx) = mpsc::channel::<Input>(INPUT_BUFFER);
    let (error_tx, mut error_rx) = mpsc::channel(1);

    let adapter = tokio::spawn({
        let bot = Arc::clone(&bot);
        let ctx = run_ctx.clone();
        async move { bot.run(ctx, input_tx, error_tx).await }
    });
    info!(bot_type = %bot_type, "bot running");

    let mut in_flight = JoinSet::new();
    let outcome = loop {
        tokio::select! {
            () = run_ctx.cancelled() => {
                info!(bot_type = %bot_type, "bot stopping");
                break Ok(());
            },
            Some(err) = error_rx.recv() => break Err(err),
            received = input_rx.recv() => match received {
                Some(input) => {
                    in_flight.spawn(dispatch(Arc::clone(&bot), run_ctx.child(), input));
                },
                None => {
                    // The adapter returned; it may have reported why first.
                    match error_rx.try_recv() {
                        Ok(err) => break Err(err),
                        Err(_) => {
                            info!(bot_type = %bot_type, "adapter finished");
                            while in_flight.join_next().await.is_some() {}
                            break Ok(());
                        },
                    }
                },
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    warn!(bot_type = %bot_type, error = %e, "dispatch task failed");
                }
            },
        }
    };

    run_ctx.cancel();
    in_flight.shutdown().await;
    if let Err(e) = adapter.await {
        warn!(bot_type = %bot_type, error = %e, "adapter task failed");
    }

    outcome.map_err(|err| {
        error!(bot_type = %bot_type, error = %err, "adapter reported a fatal error");
        #[cfg(feature = "metrics")]
        counter!(
            bot_metrics::ADAPTER_ERRORS_TOTAL,
            labels::BOT_TYPE => bot_type.to_string()
        )
        .increment(1);
        Error::Adapter(err)
    })
}

async fn dispatch(bot: Arc<dyn Bot>, ctx: Context, input: Input) {
    let sender = input.sender_key().clone();
    let reply_to = input.reply_to().clone();

    match bot.respond(ctx.clone(), input).await {
        Ok(Some(Response {
            content: Some(content),
            ..
        })) => {
            let output = Output::new(reply_to, content);
            if let Err(e) = bot.send_message(&ctx, output).await {
                warn!(sender = %sender, error = %e, "failed to deliver response");
            }
        },
        Ok(_) => debug!(sender = %sender, "nothing to send"),
        Err(e) if e.is_no_matching_command() => {
            debug!(sender = %sender, "no command matched");
        },
        Err(e) => warn!(sender = %sender, error = %e, "failed to handle message"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use {
        palaver_channels::{MemoryAdapter, MemoryHandle},
        palaver_commands::FnCommand,
        palaver_common::BotType,
    };

    use {
        super::*,
        crate::{BotConfig, DefaultBot},
    };

    fn echo_bot(ctx: &Context) -> (Arc<DefaultBot>, MemoryHandle) {
        let (adapter, handle) = MemoryAdapter::new(BotType::new("test"));
        let bot = DefaultBot::new(Arc::new(adapter), BotConfig::default(), ctx);
        bot.append_command(Arc::new(FnCommand::new(
            "echo",
            |i| i.message().starts_with("echo "),
            |_ctx, input: Input| async move {
                Ok(Response::text(input.message().trim_start_matches("echo ")))
            },
        )));
        bot.append_command(Arc::new(FnCommand::new(
            "fail",
            |i| i.message() == "fail",
            |_ctx, _input| async { Err(anyhow::anyhow!("handler broke")) },
        )));
        (Arc::new(bot), handle)
    }

    #[tokio::test]
    async fn delivers_responses_to_reply_target() {
        let ctx = Context::new();
        let (bot, mut handle) = echo_bot(&ctx);
        let runner = tokio::spawn(run_bot(bot, ctx.clone()));

        handle.send("u1", "echo hello").await.unwrap();
        let out = handle.next_output().await.unwrap();
        assert_eq!(out.content, "hello");
        assert_eq!(out.destination.as_str(), "u1");

        ctx.cancel();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn handler_errors_do_not_stop_the_loop() {
        let ctx = Context::new();
        let (bot, mut handle) = echo_bot(&ctx);
        let runner = tokio::spawn(run_bot(bot, ctx.clone()));

        handle.send("u1", "fail").await.unwrap();
        handle.send("u1", "unmatched").await.unwrap();
        handle.send("u1", "echo still here").await.unwrap();
        let out = handle.next_output().await.unwrap();
        assert_eq!(out.content, "still here");

        ctx.cancel();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn fatal_adapter_error_is_returned() {
        let ctx = Context::new();
        let (bot, handle) = echo_bot(&ctx);
        let runner = tokio::spawn(run_bot(bot, ctx.clone()));

        handle
            .fail(palaver_channels::Error::unavailable("connection lost"))
            .await
            .unwrap();
        let err = tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, Error::Adapter(_)));
        assert!(err.to_string().contains("connection lost"));
    }

    #[tokio::test]
    async fn finishes_when_adapter_input_ends() {
        let ctx = Context::new();
        let (bot, mut handle) = echo_bot(&ctx);
        let runner = tokio::spawn(run_bot(bot, ctx.clone()));

        handle.send("u1", "echo last words").await.unwrap();
        let out = handle.next_output().await.unwrap();
        assert_eq!(out.content, "last words");

        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
