use anyhow::Context;
use chatline::chat::{ExchangeOrchestrator, SubmitOutcome};
use chatline::config::Settings;
use chatline::credentials::{CredentialProvider, FileCredentialStore};
use chatline::types::{ChatMessage, Role};
use std::sync::Arc;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tokio::io::{AsyncBufReadExt, BufReader};

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

const HELP: &str = "Commands: /models, /model <id>, /key <api-key>, /forget-key, /clear, /help, /quit";

fn format_message_timestamp(timestamp: OffsetDateTime) -> String {
    let mut datetime = timestamp;
    if let Ok(offset) = UtcOffset::current_local_offset() {
        datetime = datetime.to_offset(offset);
    }
    datetime.format(MESSAGE_TIME_FORMAT).unwrap_or_default()
}

fn print_message(msg: &ChatMessage) {
    let who = match (msg.role(), msg.is_error()) {
        (Role::User, _) => "you",
        (Role::Assistant, false) => "assistant",
        (Role::Assistant, true) => "assistant !",
    };
    println!(
        "[{}] {who}: {}",
        format_message_timestamp(msg.created_at()),
        msg.content()
    );
}

/// Seed an empty store from `GEMINI_API_KEY` so first runs work without `/key`.
fn seed_credential(store: &FileCredentialStore) {
    if store.get().is_some() {
        return;
    }
    if let Ok(key) = std::env::var("GEMINI_API_KEY")
        && let Err(err) = store.set(&key)
    {
        tracing::warn!(error = %err, "ignoring GEMINI_API_KEY");
    }
}

fn handle_command(orch: &ExchangeOrchestrator, line: &str) -> bool {
    let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "/quit" | "/exit" => return false,
        "/help" => println!("{HELP}"),
        "/clear" => {
            orch.clear();
            println!("(conversation cleared)");
        }
        "/models" => {
            let active = orch.active_model();
            for model in orch.available_models() {
                let marker = if model.id == active.id() { "*" } else { " " };
                println!("{marker} {:<10} {}", model.id, model.label);
            }
        }
        "/model" => match orch.select_model(arg) {
            Some(choice) => println!("(model: {})", choice.id()),
            None => println!("usage: /model <id>"),
        },
        "/key" => match orch.save_credential(arg) {
            Ok(()) => println!("(API key saved)"),
            Err(err) => println!("{err}"),
        },
        "/forget-key" => match orch.clear_credential() {
            Ok(()) => println!("(API key removed)"),
            Err(err) => println!("{err}"),
        },
        other => println!("unknown command {other}. {HELP}"),
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chatline::logging::init();
    let settings = Settings::load().context("invalid configuration")?;

    let store = FileCredentialStore::from_settings(&settings);
    seed_credential(&store);

    let orch = ExchangeOrchestrator::with_gemini(Arc::new(store), settings)
        .context("failed to build HTTP client")?;
    tracing::info!(model = orch.active_model().id(), "chatline ready");

    if !orch.has_credential() {
        println!("No API key set. Use /key <api-key> or switch models with /model.");
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.starts_with('/') {
            if !handle_command(&orch, line) {
                break;
            }
            continue;
        }

        let seen = orch.messages().len();
        match orch.submit(line).await {
            SubmitOutcome::Ignored => continue,
            SubmitOutcome::Busy => println!("(still waiting for the previous reply)"),
            SubmitOutcome::Replied(_) | SubmitOutcome::Failed(_) | SubmitOutcome::Discarded => {}
        }
        for msg in orch.messages().iter().skip(seen) {
            print_message(msg);
        }
    }

    Ok(())
}
