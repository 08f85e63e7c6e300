mod console;
mod demo;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    palaver_bot::{Bot, BotConfig, DefaultBot, run_bot},
    palaver_common::Context,
    palaver_config::PalaverConfig,
    palaver_continuation::CacheConfig,
    palaver_metrics::{MetricsRecorderConfig, init_metrics},
    tracing::{debug, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::console::ConsoleAdapter;

#[derive(Parser)]
#[command(name = "palaver", about = "Palaver: multi-turn command bot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./palaver.toml and the user config dir).
    #[arg(long, global = true, env = "PALAVER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the bot on stdin/stdout (default when no subcommand is provided).
    Console {
        /// Name identifying you as the sender.
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = match &cli.config {
        Some(path) => palaver_config::load_config(path)?,
        None => palaver_config::discover_and_load(),
    };

    match cli.command {
        None => run_console(config, "local".to_string()).await,
        Some(Commands::Console { user }) => run_console(config, user).await,
        Some(Commands::Config) => {
            print!("{}", palaver_config::to_toml_string(&config)?);
            Ok(())
        },
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // stderr keeps stdout free for the console conversation.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run_console(config: PalaverConfig, user: String) -> anyhow::Result<()> {
    let metrics = init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        global_labels: config.metrics.labels.clone().into_iter().collect(),
    })?;

    let ctx = Context::new();
    tokio::spawn({
        let ctx = ctx.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupt received, shutting down"),
                Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
            }
            ctx.cancel();
        }
    });

    let bot_config = BotConfig {
        conversation: CacheConfig {
            ttl: config.conversation.ttl(),
            sweep_interval: config.conversation.sweep_interval(),
        },
        plugin_config_dir: config.bot.plugin_config_dir,
    };
    let bot = DefaultBot::new(Arc::new(ConsoleAdapter::new(user)), bot_config, &ctx);
    bot.append_command(demo::help(&bot.commands()));
    bot.append_command(demo::echo());
    bot.append_command(demo::todo());

    println!("Type .help for commands. Ctrl-D to quit.");
    let result = run_bot(Arc::new(bot), ctx.clone()).await;
    ctx.cancel();

    let rendered = metrics.render();
    if !rendered.is_empty() {
        debug!(metrics = %rendered, "final metrics");
    }

    Ok(result?)
}
