//! Built-in commands for the console bot.

use std::{
    fmt::Write as _,
    sync::{Arc, Weak},
};

use {
    palaver_bot::ABORT_KEYWORD,
    palaver_commands::{Command, Commands, Continuation, FnCommand, Response},
    palaver_common::Input,
};

/// `.help`: lists every registered command with its example input.
pub fn help(commands: &Arc<Commands>) -> Arc<dyn Command> {
    // Weak: the registry owns this command.
    let commands: Weak<Commands> = Arc::downgrade(commands);
    Arc::new(
        FnCommand::new(
            "help",
            |input| input.message().trim() == ".help",
            move |_ctx, _input| {
                let helps = commands.upgrade().map(|c| c.helps()).unwrap_or_default();
                async move {
                    let mut text = String::from("Commands:");
                    for help in helps {
                        let _ = write!(text, "\n  {:<8} {}", help.identifier, help.input_example);
                    }
                    let _ = write!(text, "\nSend {ABORT_KEYWORD} to cancel a conversation.");
                    Ok(Response::text(text))
                }
            },
        )
        .with_example(".help"),
    )
}

/// `.echo <text>`: replies with `<text>`.
pub fn echo() -> Arc<dyn Command> {
    Arc::new(
        FnCommand::new(
            "echo",
            |input| input.message().starts_with(".echo "),
            |_ctx, input: Input| async move {
                let text = input.message().trim_start_matches(".echo ").trim();
                Ok(Response::text(text))
            },
        )
        .with_example(".echo hello"),
    )
}

/// `.todo`: collects list items over several messages until `done`.
pub fn todo() -> Arc<dyn Command> {
    Arc::new(
        FnCommand::new(
            "todo",
            |input| input.message().trim() == ".todo",
            |_ctx, _input| async {
                Ok(Response::text("What should go on the list? Send `done` to finish.")
                    .with_next(collect_items(Vec::new())))
            },
        )
        .with_example(".todo"),
    )
}

fn collect_items(items: Vec<String>) -> Continuation {
    Continuation::new(move |_ctx, input: Input| async move {
        let mut items = items;
        let item = input.message().trim();
        if item.eq_ignore_ascii_case("done") {
            return Ok(Response::text(render_list(&items)));
        }

        items.push(item.to_string());
        let reply = format!("Added \"{item}\" ({} so far). Anything else?", items.len());
        Ok(Response::text(reply).with_next(collect_items(items)))
    })
}

fn render_list(items: &[String]) -> String {
    if items.is_empty() {
        return "Nothing on the list.".to_string();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {item}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
