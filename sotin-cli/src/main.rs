//! sotin-cli: terminal chat client for the SOTIN news & web assistant
//!
//! Sends each message to the chat backend, prints the answer with its
//! citations, and exports the conversation on request.
//!
//! # Subcommands
//! - `chat`                                   : interactive session (default)
//! - `ask <message> [--markdown P] [--pdf P]` : one exchange, optionally exported
//! - `formats`                                : list the export formats this build supports

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sotin_core::{
    ConversationController, ExportCapabilities, ExportFormat, ExportPipeline, HttpGateway,
    SessionStore, SotinConfig, SotinError, Turn, UuidGenerator,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

const SUGGESTIONS: [&str; 4] = [
    "Summarize today's top AI stories.",
    "What are the most important world headlines?",
    "Give me a short note of stock market news.",
    "What's new in technology and startups?",
];

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "sotin-cli",
    version,
    about = "SOTIN: Search On Tavily If Needed, a news & web assistant"
)]
struct Cli {
    /// Config file (TOML); missing files fall back to defaults
    #[arg(short, long, default_value = "sotin.toml")]
    config: String,

    /// Chat backend URL (overrides gateway.endpoint_url)
    #[arg(long, env = "NEWS_AGENT_API_URL")]
    endpoint: Option<String>,

    /// User id sent with every message (overrides client.user_id)
    #[arg(long, env = "SOTIN_USER_ID")]
    user_id: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat,

    /// Send a single message and print the answer
    Ask {
        /// Message to send
        message: String,

        /// Write the Markdown transcript here afterwards
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Write the PDF transcript here afterwards
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// List available export formats
    Formats,
}

// ============================================================================
// Interactive commands
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Send(String),
    Export {
        format: ExportFormat,
        path: Option<PathBuf>,
    },
    Reset,
    Session,
    Formats,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

fn parse_command(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }

    if let Ok(n) = trimmed.parse::<usize>() {
        if (1..=SUGGESTIONS.len()).contains(&n) {
            return ReplCommand::Send(SUGGESTIONS[n - 1].to_string());
        }
    }

    let Some(command) = trimmed.strip_prefix('/') else {
        return ReplCommand::Send(line.to_string());
    };

    let mut words = command.split_whitespace();
    match words.next().unwrap_or_default() {
        "export" => {
            let Some(format) = words.next().and_then(ExportFormat::parse) else {
                return ReplCommand::Invalid("usage: /export md|pdf [PATH]".to_string());
            };
            let path = words.next().map(PathBuf::from);
            ReplCommand::Export { format, path }
        }
        "reset" | "clear" => ReplCommand::Reset,
        "session" => ReplCommand::Session,
        "formats" => ReplCommand::Formats,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("unknown command: /{}", other)),
    }
}

// ============================================================================
// Console output
// ============================================================================

/// Answer text followed by a numbered citation list.
fn format_answer(turn: &Turn) -> String {
    let mut out = String::new();
    if turn.is_degraded() {
        out.push_str("(no answer)\n");
    } else {
        out.push_str(&turn.content);
        out.push('\n');
    }

    if !turn.citations.is_empty() {
        out.push_str("\nCitations:\n");
        for (i, citation) in turn.citations.iter().enumerate() {
            let label = citation.label().unwrap_or("(untitled)");
            out.push_str(&format!("  {}. {}", i + 1, label));
            if let (Some(title), Some(url)) = (&citation.title, &citation.url) {
                if title != url {
                    out.push_str(&format!(" <{}>", url));
                }
            }
            out.push('\n');
            if let Some(snippet) = &citation.snippet {
                out.push_str(&format!("     {}\n", snippet));
            }
        }
    }
    out
}

fn format_formats(pipeline: &ExportPipeline) -> String {
    let mut out = String::new();
    for format in pipeline.formats() {
        out.push_str(&format!(
            "  {:<9} {} ({})\n",
            format.to_string(),
            format.file_name(),
            format.mime_type()
        ));
    }
    if !pipeline.capabilities().document {
        out.push_str("PDF export disabled.\n");
    }
    out
}

fn print_help() {
    println!("Type a message, or a number to send one of the suggestions.");
    println!("  /export md|pdf [PATH]  save the conversation");
    println!("  /reset                 clear the chat and start a new session");
    println!("  /session               show session info");
    println!("  /formats               list export formats");
    println!("  /quit                  leave");
}

fn print_banner(session_id: &str) {
    println!("SOTIN Chat");
    println!("Session ID: {}", session_id);
    println!();
    println!("Try asking:");
    for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, suggestion);
    }
    println!("Type /help for commands.");
}

// ============================================================================
// Actions
// ============================================================================

async fn write_export(
    controller: &ConversationController,
    pipeline: &ExportPipeline,
    format: ExportFormat,
    path: Option<&Path>,
) -> Result<PathBuf, SotinError> {
    pipeline.save(format, &controller.snapshot(), path).await
}

/// Runs one cycle; Ctrl+C abandons the wait and the cycle records an empty answer.
async fn send_message(controller: &ConversationController, message: &str) -> bool {
    tokio::select! {
        result = controller.submit(message) => match result {
            Ok(exchange) => {
                print!("{}", format_answer(&exchange.assistant));
                true
            }
            Err(SotinError::Gateway(e)) => {
                eprintln!("sotin-cli: backend error: {}", e);
                false
            }
            Err(e) => {
                eprintln!("sotin-cli: {}", e);
                false
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("sotin-cli: request cancelled");
            false
        }
    }
}

async fn run_chat(
    controller: &ConversationController,
    pipeline: &ExportPipeline,
) -> anyhow::Result<()> {
    print_banner(&controller.session_id());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nyou> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Send(message) => {
                send_message(controller, &message).await;
            }
            ReplCommand::Export { format, path } => {
                match write_export(controller, pipeline, format, path.as_deref()).await {
                    Ok(target) => println!("Saved {}", target.display()),
                    Err(e) => eprintln!("sotin-cli: export failed: {}", e),
                }
            }
            ReplCommand::Reset => match controller.reset() {
                Ok(session_id) => println!("Chat cleared. New session: {}", session_id),
                Err(e) => eprintln!("sotin-cli: {}", e),
            },
            ReplCommand::Session => {
                let snapshot = controller.snapshot();
                println!("Session ID: {}", snapshot.session_id);
                println!("User ID:    {}", snapshot.user_id);
                println!(
                    "Started:    {}",
                    snapshot.started_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
                println!("Turns:      {}", snapshot.turns.len());
            }
            ReplCommand::Formats => print!("{}", format_formats(pipeline)),
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(message) => eprintln!("sotin-cli: {}", message),
        }
    }

    Ok(())
}

async fn run_ask(
    controller: &ConversationController,
    pipeline: &ExportPipeline,
    message: &str,
    markdown: Option<&Path>,
    pdf: Option<&Path>,
) -> anyhow::Result<bool> {
    let answered = send_message(controller, message).await;

    if let Some(path) = markdown {
        let target = write_export(controller, pipeline, ExportFormat::Markdown, Some(path))
            .await
            .with_context(|| format!("exporting to {}", path.display()))?;
        eprintln!("Saved {}", target.display());
    }
    if let Some(path) = pdf {
        let target = write_export(controller, pipeline, ExportFormat::Pdf, Some(path))
            .await
            .with_context(|| format!("exporting to {}", path.display()))?;
        eprintln!("Saved {}", target.display());
    }

    Ok(answered)
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience; production uses real env vars)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = SotinConfig::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config))?;
    if let Some(endpoint) = cli.endpoint {
        config.gateway.endpoint_url = endpoint;
    }
    if let Some(user_id) = cli.user_id {
        config.client.user_id = user_id;
    }

    init_logging(&config.client.log_level);

    let pipeline = ExportPipeline::new(ExportCapabilities::probe(), &config.export);

    if let Some(Commands::Formats) = cli.command {
        print!("{}", format_formats(&pipeline));
        return Ok(());
    }

    let gateway = HttpGateway::new(config.gateway_config()).context("creating backend gateway")?;
    tracing::info!(endpoint = %gateway.endpoint_url(), "Backend gateway ready");

    let store = SessionStore::new(config.client.user_id.clone(), Arc::new(UuidGenerator));
    let controller = ConversationController::new(store, Arc::new(gateway));

    match cli.command {
        Some(Commands::Ask {
            message,
            markdown,
            pdf,
        }) => {
            let answered =
                run_ask(&controller, &pipeline, &message, markdown.as_deref(), pdf.as_deref())
                    .await?;
            if !answered {
                std::process::exit(1);
            }
        }
        Some(Commands::Chat) | None => run_chat(&controller, &pipeline).await?,
        Some(Commands::Formats) => {}
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
