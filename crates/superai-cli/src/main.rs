//! superai: send one message to SuperAI and print the JSON envelope.

use std::path::PathBuf;
use std::sync::Arc;

use superai_browser::ChromeLauncher;
use superai_core::{AutomationConfig, Envelope};
use superai_session::{Orchestrator, ThreadChoice};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "superai.json";

fn print_usage() {
    println!("superai: drive the SuperAI chat UI from the command line");
    println!();
    println!("Usage:");
    println!("  superai [--config FILE] <thread> <model> <message...>");
    println!("  superai [--config FILE] clear-chats");
    println!();
    println!("Arguments:");
    println!("  thread      \"new\" or the 1-based position of a recent chat");
    println!("  model       model key from the config (e.g. gemini, llama, chatgpt)");
    println!("  message     text to send; remaining arguments are joined by spaces");
    println!();
    println!("Environment:");
    println!("  SUPERAI_URL, SUPERAI_HEADLESS, SUPERAI_COOKIES_DIR, SUPERAI_COOKIES_FILE,");
    println!("  SUPERAI_CHROME, SUPERAI_ERROR_LOG, RUST_LOG");
}

fn emit(envelope: &Envelope) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path = PathBuf::from(DEFAULT_CONFIG);
    if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            eprintln!("--config needs a file argument");
            std::process::exit(1);
        }
        config_path = PathBuf::from(&args[1]);
        args.drain(..2);
    }

    match args.first().map(String::as_str) {
        None | Some("--help" | "-h" | "help") => {
            print_usage();
            return Ok(());
        }
        _ => {}
    }

    let config = AutomationConfig::from_env(&config_path)?;
    info!("Target: {}", config.url);
    let launcher = Arc::new(ChromeLauncher::new(config.browser.clone()));
    let mut orchestrator = Orchestrator::new(Arc::new(config), launcher);

    let envelope = if args[0] == "clear-chats" {
        orchestrator.clear_recent_chats().await
    } else {
        if args.len() < 3 {
            eprintln!("Usage: superai [--config FILE] <thread> <model> <message...>");
            std::process::exit(1);
        }
        let choice: ThreadChoice = match args[0].parse() {
            Ok(choice) => choice,
            Err(e) => {
                emit(&Envelope::from_error(None, &e).with_prompt(args[2..].join(" ")))?;
                std::process::exit(1);
            }
        };
        let message = args[2..].join(" ");
        orchestrator
            .send_message_and_get_response(choice, &args[1], &message)
            .await
    };

    emit(&envelope)?;
    std::process::exit(if envelope.success { 0 } else { 1 });
}
