mod repl;

use clap::{Parser, Subcommand};
use imchat_agent::{ChatConfig, ChatController, HttpCompletionBackend};
use imchat_core::ImChatError;
use repl::{Input, LineBuffer, Outcome};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imchat", about = "imchat — terminal chat for ChatML completion endpoints")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "imchat.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session (default)
    Chat {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Send a single message and print the reply
    Ask {
        /// Message text
        text: String,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// List configured models
    Models,
}

#[derive(clap::Args, Default)]
struct Overrides {
    /// Model to start with (overrides config)
    #[arg(short, long)]
    model: Option<String>,
    /// Number of turns to keep (overrides config)
    #[arg(long)]
    history: Option<usize>,
    /// Sampling temperature (overrides config)
    #[arg(short, long)]
    temperature: Option<f32>,
}

impl Overrides {
    fn apply(self, config: &mut ChatConfig) {
        if let Some(model) = self.model {
            config.default_model = model;
        }
        if let Some(history) = self.history {
            config.default_history_turns = history;
        }
        if let Some(temperature) = self.temperature {
            config.default_temperature = temperature;
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let mut config = ChatConfig::load(&cli.config).await?;
    config.fill_api_key_from_env();

    match cli.command.unwrap_or(Commands::Chat {
        overrides: Overrides::default(),
    }) {
        Commands::Models => {
            config.validate()?;
            let catalog = config.catalog()?;
            println!("{}", repl::format_models(&catalog, &config.default_model));
        }
        Commands::Ask { text, overrides } => {
            overrides.apply(&mut config);
            let mut controller = build_controller(&config)?;
            let exchange = tokio::select! {
                result = controller.send(&text) => result?,
                _ = tokio::signal::ctrl_c() => return Err(ImChatError::Cancelled.into()),
            };
            println!("{}", exchange.reply);
        }
        Commands::Chat { overrides } => {
            overrides.apply(&mut config);
            let controller = build_controller(&config)?;
            run_chat(controller).await?;
        }
    }

    Ok(())
}

fn build_controller(config: &ChatConfig) -> anyhow::Result<ChatController> {
    if config.endpoint.api_key.trim().is_empty() {
        warn!(
            "No API key configured; set endpoint.api_key or {}",
            imchat_agent::config::API_KEY_ENV
        );
    }
    let backend = Arc::new(HttpCompletionBackend::new(config.endpoint.clone())?);
    Ok(ChatController::new(config, backend)?)
}

async fn run_chat(mut controller: ChatController) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "imchat — model {} | /help for commands, /quit to exit",
        controller.model()
    );
    info!(model = controller.model(), "Session started");

    loop {
        let Some(line) = read_logical_line(&mut lines).await? else {
            break;
        };

        match repl::parse_input(&line) {
            Ok(Input::Empty) => {}
            Ok(Input::Command(command)) => match repl::apply_command(&mut controller, command) {
                Outcome::Continue(text) => println!("{text}"),
                Outcome::Quit => break,
            },
            Ok(Input::Message(text)) => {
                println!("You: {text}");
                tokio::select! {
                    result = controller.send(&text) => match result {
                        Ok(exchange) => println!("{}", repl::format_exchange(&exchange)),
                        Err(e) => eprintln!("Error: {e}"),
                    },
                    _ = tokio::signal::ctrl_c() => eprintln!("Error: {}", ImChatError::Cancelled),
                }
            }
            Err(message) => eprintln!("{message}"),
        }
    }

    info!(totals = ?controller.buffer().usage(), "Session ended");
    Ok(())
}

/// Reads one message, joining lines that end in a backslash. Ctrl-C drops a
/// partially typed message and prompts again; Ctrl-C at an empty prompt or EOF
/// returns `None`.
async fn read_logical_line(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Option<String>> {
    let mut pending = LineBuffer::default();
    loop {
        print!("{}", pending.prompt());
        std::io::stdout().flush()?;

        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Some(message) = pending.push(&line) {
                        return Ok(Some(message));
                    }
                }
                None => return Ok(pending.finish()),
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                if !pending.interrupt() {
                    return Ok(None);
                }
            }
        }
    }
}
