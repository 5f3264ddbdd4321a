mod app;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tracing_subscriber::EnvFilter;

use app::{App, Flow, UiMode};
use quill_core::session::SessionState;
use quill_infrastructure::DirAgentStore;
use quill_interaction::{
    CompletionClient, DEFAULT_TEMPERATURE, ProviderRegistry, load_config, resolve_secrets,
};

const COMMANDS: &[&str] = &[
    "/fork", "/subfork", "/switch", "/delete", "/list", "/models", "/model", "/provider",
    "/status", "/quiet", "/normal", "/help", "/exit",
];

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Interactive multi-agent chat sessions against LLM completion endpoints.
#[derive(Parser)]
#[command(name = "quill", version, about)]
struct Cli {
    /// Start in quiet mode (bare output, automation friendly)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ===== Backend Initialization =====
    let config = load_config();
    let secrets = resolve_secrets();
    let registry = ProviderRegistry::builtin(&secrets);

    let (mut provider, mut model) = registry.default_selection();
    if let Some(wanted) = config.default_provider.as_deref() {
        if registry.get(wanted).is_some() {
            provider = wanted.to_string();
            model = registry.first_model(wanted).unwrap_or_default().to_string();
        } else {
            tracing::warn!("config default_provider '{wanted}' is not a known provider");
        }
    }
    if let Some(wanted) = config.default_model.as_deref() {
        if registry.has_model(&provider, wanted) {
            model = wanted.to_string();
        } else {
            tracing::warn!("config default_model '{wanted}' is not a model of '{provider}'");
        }
    }

    let store = Arc::new(DirAgentStore::default_location()?);
    let session = SessionState::open(store, provider, model).await;
    let client = CompletionClient::new(registry)
        .with_temperature(config.temperature.unwrap_or(DEFAULT_TEMPERATURE));

    let mode = if cli.quiet || config.quiet.unwrap_or(false) {
        UiMode::Quiet
    } else {
        UiMode::Normal
    };
    let mut app = App::new(session, client, mode);

    // ===== REPL Setup =====
    let helper = CliHelper::new();
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    if app.mode() == UiMode::Normal {
        println!("{}", "=== quill ===".bright_magenta().bold());
        println!(
            "{}",
            "Type '/help' for commands, '/exit' to save and quit.".bright_black()
        );
        println!();
    }

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(&line);
                }
                match app.handle_line(&line).await {
                    Flow::Continue => {}
                    Flow::Exit => break,
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/exit' to quit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    app.shutdown().await;

    Ok(())
}
