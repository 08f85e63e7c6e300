//! Adapter that reads messages from stdin and writes replies to stdout.

use std::io::{self, BufRead};

use {
    async_trait::async_trait,
    chrono::Utc,
    palaver_channels::{Adapter, Error, Result},
    palaver_common::{BotType, Context, Input, Output, ReplyTarget, SenderKey},
    tokio::{
        io::AsyncWriteExt,
        sync::mpsc,
    },
    tracing::debug,
};

const BOT_TYPE: &str = "console";

/// Lines buffered between the reader thread and the adapter.
const LINE_BUFFER: usize = 16;

pub struct ConsoleAdapter {
    user: String,
}

impl ConsoleAdapter {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }

    fn input(&self, line: String) -> Input {
        Input::new(
            SenderKey::new(&self.bot_type(), &self.user),
            line,
            Utc::now(),
            ReplyTarget::new("stdout"),
        )
    }
}

#[async_trait]
impl Adapter for ConsoleAdapter {
    fn bot_type(&self) -> BotType {
        BotType::new(BOT_TYPE)
    }

    async fn run(&self, ctx: Context, inputs: mpsc::Sender<Input>, errors: mpsc::Sender<Error>) {
        let mut lines = match spawn_line_reader(io::BufReader::new(io::stdin())) {
            Ok(lines) => lines,
            Err(e) => {
                let _ = errors
                    .send(Error::external("starting stdin reader", e))
                    .await;
                return;
            },
        };

        loop {
            let line = tokio::select! {
                () = ctx.cancelled() => break,
                line = lines.recv() => line,
            };

            match line {
                Some(Ok(line)) if line.trim().is_empty() => continue,
                Some(Ok(line)) => {
                    if inputs.send(self.input(line)).await.is_err() {
                        break;
                    }
                },
                None => {
                    debug!("stdin closed");
                    break;
                },
                Some(Err(e)) => {
                    let _ = errors.send(Error::external("reading stdin", e)).await;
                    break;
                },
            }
        }
    }

    async fn send_message(&self, _ctx: &Context, output: Output) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{}\n", output.content).as_bytes())
            .await
            .map_err(|e| Error::external("writing stdout", e))?;
        stdout
            .flush()
            .await
            .map_err(|e| Error::external("flushing stdout", e))
    }
}

/// Read `reader` line by line on a detached thread.
///
/// The thread blocks in `read_line` and cannot be interrupted, so it is never
/// joined: shutdown does not wait for the next line. It exits once the
/// receiver is dropped and one more line (or EOF) arrives.
fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::Builder::new()
        .name("console-stdin".into())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}
