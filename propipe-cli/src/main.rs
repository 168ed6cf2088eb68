//! propipe CLI - talk to o1-pro / o3-pro with cost accounting.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

mod config;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use propipe::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Cost-annotating client for OpenAI's pro reasoning models
#[derive(Parser)]
#[command(name = "propipe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "PROPIPE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported models
    Models,

    /// Send a single prompt
    Ask(AskArgs),

    /// Start an interactive conversation
    Chat(ChatArgs),

    /// Price a usage without calling the API
    Cost(CostArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the ask command
#[derive(Args)]
struct AskArgs {
    /// Model id (o1-pro or o3-pro)
    model: String,

    /// Prompt text
    prompt: String,

    /// Optional system message
    #[arg(short, long)]
    system: Option<String>,
}

/// Arguments for the chat command
#[derive(Args)]
struct ChatArgs {
    /// Model id (o1-pro or o3-pro)
    model: String,

    /// Optional system message
    #[arg(short, long)]
    system: Option<String>,

    /// Prompt prefix
    #[arg(short, long, default_value = "You: ")]
    prompt: String,
}

/// Arguments for the cost command
#[derive(Args)]
struct CostArgs {
    /// Model id (o1-pro or o3-pro)
    model: String,

    /// Input tokens
    #[arg(long, default_value_t = 0)]
    input: u64,

    /// Visible output tokens
    #[arg(long, default_value_t = 0)]
    output: u64,

    /// Reasoning tokens
    #[arg(long, default_value_t = 0)]
    reasoning: u64,
}

/// Arguments for the config command
#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration with keys masked
    Show,
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "propipe={level},propipe_cli={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let path = cli.config.as_deref();
    match cli.command {
        Commands::Models => cmd_models(path).await,
        Commands::Ask(args) => cmd_ask(args, path).await,
        Commands::Chat(args) => cmd_chat(args, path).await,
        Commands::Cost(args) => cmd_cost(&args),
        Commands::Config(args) => cmd_config(args, path).await,
    }
}

async fn cmd_models(path: Option<&Path>) -> Result<()> {
    let pipe = Pipe::new(config::load(path).await?)?;
    for model in pipe.models() {
        println!("{:<8} {}", model.id, model.name);
    }
    Ok(())
}

fn opening_messages(system: Option<String>) -> Vec<Message> {
    system.map(Message::system).into_iter().collect()
}

async fn cmd_ask(args: AskArgs, path: Option<&Path>) -> Result<()> {
    let pipe = Pipe::new(config::load(path).await?)?;

    let mut messages = opening_messages(args.system);
    messages.push(Message::user(args.prompt));
    let request = TurnRequest::new(args.model, messages);

    let outcome = pipe.process_turn(&request, ConversationTotals::new()).await?;
    println!("{}", outcome.render());
    Ok(())
}

async fn cmd_chat(args: ChatArgs, path: Option<&Path>) -> Result<()> {
    let pipe = Pipe::new(config::load(path).await?)?;
    let model = pipe.resolve_model(&args.model)?;

    let mut messages = opening_messages(args.system);
    let mut totals = ConversationTotals::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("propipe chat with {model} | type 'exit' to quit\n");

    loop {
        print!("{}", args.prompt);
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        messages.push(Message::user(line));
        println!(
            "Processing with {model} (Message #{} in conversation)...\n",
            totals.next_message_number()
        );

        let request = TurnRequest::new(model.clone(), messages.clone());
        match pipe.process_turn(&request, totals).await {
            Ok(outcome) => {
                println!("{}\n", outcome.render());
                messages.push(Message::assistant(outcome.text));
                totals = outcome.totals;
            }
            Err(e) => {
                println!("Error: {e}\n");
                messages.pop();
            }
        }
    }

    if totals.message_count > 0 {
        println!(
            "Conversation ended: {} messages, {}",
            totals.message_count, totals.cost
        );
    }
    Ok(())
}

fn cmd_cost(args: &CostArgs) -> Result<()> {
    let accountant = UsageAccountant::new(
        PriceTable::default(),
        DisplayOptions {
            token_stats: true,
            cumulative_cost: false,
        },
    );
    let usage = UsageRecord::new(args.input, args.reasoning, args.output);
    let cost = accountant.compute_cost(&usage, args.model.trim())?;
    let (_, summary) = accountant.record_turn(ConversationTotals::new(), usage, cost);

    println!("{summary}");
    Ok(())
}

async fn cmd_config(args: ConfigArgs, path: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            let shown = path.map_or_else(config::config_path, Path::to_path_buf);
            println!("{}", shown.display());
        }
        ConfigCommands::Show => {
            let config = config::load(path).await?;
            print!("{}", config::render_masked(&config)?);
        }
        ConfigCommands::Validate => {
            let config = config::load(path).await?;
            config.validate()?;
            println!(
                "Configuration OK: {} key(s), effort {}, max {} output tokens, timeout {}s",
                config.api_keys.len(),
                config.thinking_effort,
                config.max_output_tokens,
                config.timeout_secs
            );
        }
    }
    Ok(())
}
