//! Line parsing and rendering for the interactive session.
//!
//! Everything here is synchronous and free of terminal I/O so it can be
//! tested without a tty; `main.rs` owns the read/print loop.

use imchat_agent::{ChatController, Exchange, ModelCatalog};
use imchat_session::UsageTotals;

pub const HELP: &str = "\
Commands:
  /model NAME         switch model
  /models             list configured models
  /history N          keep the last N turns (0 keeps none)
  /temperature T      sampling temperature in [0, 1]
  /system TEXT        replace the system message
  /prefix [TEXT]      prepend TEXT to every new message (empty clears)
  /prompt             show the prompt as it would be sent now
  /clear              forget the conversation (usage totals are kept)
  /reset-usage        zero the token and price totals
  /usage              show token and price totals
  /help               show this help
  /quit               exit
Lines starting with // are sent with a single leading slash.
End a line with \\ to continue the message on the next line.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Model(String),
    Models,
    History(usize),
    Temperature(f32),
    System(String),
    Prefix(String),
    Prompt,
    Clear,
    ResetUsage,
    Usage,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Empty,
    Message(String),
    Command(Command),
}

/// Classifies one logical input line.
pub fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(Input::Empty);
    }
    if let Some(escaped) = line.strip_prefix("//") {
        return Ok(Input::Message(format!("/{escaped}")));
    }
    match line.strip_prefix('/') {
        Some(rest) => parse_command(rest).map(Input::Command),
        None => Ok(Input::Message(line.to_string())),
    }
}

fn parse_command(rest: &str) -> Result<Command, String> {
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let require_arg = |usage: &str| {
        if arg.is_empty() {
            Err(format!("usage: {usage}"))
        } else {
            Ok(arg.to_string())
        }
    };

    match name {
        "model" => require_arg("/model NAME").map(Command::Model),
        "models" => Ok(Command::Models),
        "history" => require_arg("/history N")?
            .parse()
            .map(Command::History)
            .map_err(|_| format!("not a turn count: {arg}")),
        "temperature" | "temp" => require_arg("/temperature T")?
            .parse()
            .map(Command::Temperature)
            .map_err(|_| format!("not a number: {arg}")),
        "system" => require_arg("/system TEXT").map(Command::System),
        "prefix" => Ok(Command::Prefix(arg.to_string())),
        "prompt" => Ok(Command::Prompt),
        "clear" => Ok(Command::Clear),
        "reset-usage" => Ok(Command::ResetUsage),
        "usage" => Ok(Command::Usage),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command /{other}, try /help")),
    }
}

/// Whether the line asks for the message to continue on the next line.
/// Returns the line without the trailing backslash.
pub fn continuation(line: &str) -> Option<&str> {
    line.trim_end_matches(['\r', '\n']).strip_suffix('\\')
}

/// Joins backslash-continued lines into one message.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn prompt(&self) -> &'static str {
        if self.pending.is_empty() {
            "> "
        } else {
            ". "
        }
    }

    /// Feeds one physical line. Returns the message once it is complete.
    pub fn push(&mut self, line: &str) -> Option<String> {
        match continuation(line) {
            Some(head) => {
                self.pending.push_str(head);
                self.pending.push('\n');
                None
            }
            None => {
                self.pending.push_str(line.trim_end_matches(['\r', '\n']));
                Some(std::mem::take(&mut self.pending))
            }
        }
    }

    /// End of input: whatever was typed so far is still sent.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    /// Drops a partially typed message. Returns false if there was none.
    pub fn interrupt(&mut self) -> bool {
        let had_pending = !self.pending.is_empty();
        self.pending.clear();
        had_pending
    }
}

pub enum Outcome {
    Continue(String),
    Quit,
}

/// Applies a command to the controller and returns the text to print.
pub fn apply_command(controller: &mut ChatController, command: Command) -> Outcome {
    let text = match command {
        Command::Model(name) => match controller.select_model(&name) {
            Ok(()) => format!("Model: {name}"),
            Err(e) => format!("Error: {e}"),
        },
        Command::Models => format_models(controller.catalog(), controller.model()),
        Command::History(turns) => {
            controller.set_history_limit(turns);
            format!(
                "History: {turns} turn(s), {} message(s) kept",
                controller.buffer().len()
            )
        }
        Command::Temperature(t) => match controller.set_temperature(t) {
            Ok(()) => format!("Temperature: {t}"),
            Err(e) => format!("Error: {e}"),
        },
        Command::System(text) => {
            controller.set_system_message(text);
            "System message updated".to_string()
        }
        Command::Prefix(text) => {
            let cleared = text.trim().is_empty();
            controller.set_prefix_message(text);
            if cleared {
                "Prefix cleared".to_string()
            } else {
                "Prefix updated".to_string()
            }
        }
        Command::Prompt => controller.buffer().build_prompt(),
        Command::Clear => {
            controller.clear_history();
            "History cleared".to_string()
        }
        Command::ResetUsage => {
            controller.reset_usage();
            "Usage totals reset".to_string()
        }
        Command::Usage => format_totals(controller.buffer().usage()),
        Command::Help => HELP.to_string(),
        Command::Quit => return Outcome::Quit,
    };
    Outcome::Continue(text)
}

pub fn format_exchange(exchange: &Exchange) -> String {
    format!(
        "AI: {}\n----\nTokens: {} (${:.6}) | {}",
        exchange.reply,
        exchange.turn.tokens,
        exchange.turn.price,
        format_totals(exchange.totals)
    )
}

pub fn format_totals(totals: UsageTotals) -> String {
    format!("Total: {} tokens (${:.6})", totals.tokens, totals.price)
}

pub fn format_models(catalog: &ModelCatalog, current: &str) -> String {
    catalog
        .iter()
        .map(|m| {
            let marker = if m.name == current { '*' } else { ' ' };
            format!(
                "{marker} {:<24} ${:.4}/1k tokens  {:?}",
                m.name, m.price_per_1k_tokens, m.tokenizer
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
