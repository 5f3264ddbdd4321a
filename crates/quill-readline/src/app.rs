//! Command dispatch and rendering for the REPL.
//!
//! `App` owns the session, the completion client, and the UI mode. Each
//! input line is classified once and routed to a session operation or a chat
//! round. The mode only decides what gets displayed; every state transition
//! behaves identically in quiet and normal mode.

use colored::Colorize;
use quill_core::command::{Command, HELP_TEXT, ParsedLine, parse_line};
use quill_core::session::{SessionOutcome, SessionState};
use quill_interaction::CompletionClient;

/// Output verbosity. Orthogonal to all state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    /// Colored prefixes and diagnostics.
    Normal,
    /// Bare output for automation; non-essential messages suppressed.
    Quiet,
}

/// Whether the read loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct App {
    session: SessionState,
    client: CompletionClient,
    mode: UiMode,
}

impl App {
    pub fn new(session: SessionState, client: CompletionClient, mode: UiMode) -> Self {
        Self {
            session,
            client,
            mode,
        }
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Handles one line of user input.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        match parse_line(line) {
            ParsedLine::Empty => Flow::Continue,
            ParsedLine::MissingArgument { usage } => {
                self.report_error(&format!("usage: {usage}"));
                Flow::Continue
            }
            ParsedLine::Unknown(token) => {
                self.report_error(&format!("unknown command: {token} (try /help)"));
                Flow::Continue
            }
            ParsedLine::Command(command) => self.run_command(command).await,
            ParsedLine::Chat(text) => {
                self.chat(&text).await;
                Flow::Continue
            }
        }
    }

    /// Flushes the active history and says goodbye. The only exit path.
    pub async fn shutdown(&mut self) {
        if !self.session.flush().await {
            self.warn(&format!(
                "could not save agent '{}' on exit",
                self.session.active()
            ));
        }
        if self.mode == UiMode::Normal {
            println!("{}", "Goodbye!".bright_green());
        }
    }

    async fn run_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Fork(id) => {
                let result = self.session.fork(&id).await;
                self.report_session_result(result);
            }
            Command::Subfork(id) => {
                let result = self.session.subfork(&id).await;
                self.report_session_result(result);
            }
            Command::Switch(id) => {
                let result = self.session.switch(&id).await;
                self.report_session_result(result);
            }
            Command::Delete(id) => {
                let result = self.session.delete(&id).await;
                self.report_session_result(result);
            }
            Command::List => self.show_agents(),
            Command::Models => self.show_models(),
            Command::Model(name) => self.select_model(&name),
            Command::Provider(name) => self.select_provider(&name),
            Command::Status => self.show_status(),
            Command::Quiet => {
                self.mode = UiMode::Quiet;
            }
            Command::Normal => {
                self.mode = UiMode::Normal;
                self.notice("verbose output on");
            }
            Command::Help => println!("{HELP_TEXT}"),
            Command::Exit => return Flow::Exit,
        }
        Flow::Continue
    }

    async fn chat(&mut self, text: &str) {
        let before = self.selection();
        let result = self.client.complete(&mut self.session, text).await;
        let after = self.selection();
        if before != after {
            self.notice(&format!(
                "provider degraded to {} / {} for the rest of the session",
                after.0, after.1
            ));
        }

        match result {
            Some(content) => {
                self.session.record_round(text, &content);
                self.say_assistant(&content);
            }
            // Nothing is recorded for a failed round; no partial turns.
            None => self.report_error("no response from provider; nothing recorded"),
        }
    }

    fn selection(&self) -> (String, String) {
        (
            self.session.provider().to_string(),
            self.session.model().to_string(),
        )
    }

    fn report_session_result(&mut self, result: quill_core::Result<SessionOutcome>) {
        match result {
            Ok(outcome) => self.report_outcome(&outcome),
            Err(err) => self.report_error(&err.to_string()),
        }
    }

    fn report_outcome(&self, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Forked { id, flush_ok } => {
                self.notice(&format!("forked '{id}' and switched to it"));
                if !flush_ok {
                    self.warn("could not save the previous agent's history");
                }
            }
            SessionOutcome::Subforked {
                id,
                flush_ok,
                copy_saved,
            } => {
                self.notice(&format!("subforked '{id}' with a copy of the history"));
                if !flush_ok {
                    self.warn("could not save the previous agent's history");
                }
                if !copy_saved {
                    self.warn(&format!("could not persist the copy for '{id}'"));
                }
            }
            SessionOutcome::Switched {
                id,
                flush_ok,
                load_ok,
            } => {
                self.notice(&format!("switched to '{id}'"));
                if !flush_ok {
                    self.warn("could not save the previous agent's history");
                }
                if !load_ok {
                    self.warn(&format!("could not load '{id}', starting empty"));
                }
            }
            SessionOutcome::Deleted { id } => {
                self.notice(&format!("deleted '{id}'"));
            }
            SessionOutcome::DeletedActive { id, load_ok } => {
                self.notice(&format!(
                    "deleted active agent '{id}', switched back to 'main'"
                ));
                if !load_ok {
                    self.warn("could not load 'main', starting empty");
                }
            }
        }
    }

    fn show_agents(&self) {
        let active = self.session.active().clone();
        for id in self.session.list_agents() {
            if self.mode == UiMode::Normal {
                if id == active {
                    println!("{}", format!("* {id}").bright_cyan());
                } else {
                    println!("  {id}");
                }
            } else {
                println!("{id}");
            }
        }
    }

    fn show_models(&self) {
        let provider = self.session.provider().to_string();
        let Some(config) = self.client.registry().get(&provider) else {
            self.report_error(&format!("unknown provider '{provider}'"));
            return;
        };
        for spec in &config.models {
            if self.mode == UiMode::Normal {
                let marker = if spec.key == self.session.model() {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {} {}",
                    marker,
                    spec.key.bright_cyan(),
                    format!("({})", spec.remote_name).bright_black()
                );
            } else {
                println!("{}", spec.key);
            }
        }
    }

    fn select_model(&mut self, name: &str) {
        let provider = self.session.provider().to_string();
        if self.client.registry().has_model(&provider, name) {
            self.session.set_model(name);
            self.notice(&format!("model set to '{name}'"));
        } else {
            self.report_error(&format!("provider '{provider}' has no model '{name}'"));
        }
    }

    fn select_provider(&mut self, name: &str) {
        let registry = self.client.registry();
        if registry.get(name).is_none() {
            self.report_error(&format!(
                "unknown provider '{name}' (known: {})",
                registry.provider_keys().join(", ")
            ));
            return;
        }
        // Selecting a provider resets the model to that provider's default.
        let model = registry.first_model(name).unwrap_or_default().to_string();
        self.session.set_selection(name, &model);
        self.notice(&format!("provider set to '{name}', model '{model}'"));
    }

    fn show_status(&self) {
        let status = self.session.status();
        if self.mode == UiMode::Normal {
            println!("{} {}", "provider:".bright_black(), status.provider);
            println!("{} {}", "model:".bright_black(), status.model);
            println!("{} {}", "agent:".bright_black(), status.active);
            println!("{} {}", "messages:".bright_black(), status.message_count);
        } else {
            println!(
                "{} {} {} {}",
                status.provider, status.model, status.active, status.message_count
            );
        }
    }

    fn say_assistant(&self, content: &str) {
        if self.mode == UiMode::Normal {
            for line in content.lines() {
                println!("{}", line.bright_blue());
            }
        } else {
            println!("{content}");
        }
    }

    /// Session-management notices; suppressed in quiet mode.
    fn notice(&self, message: &str) {
        if self.mode == UiMode::Normal {
            println!("{}", message.bright_black());
        }
    }

    /// Persistence warnings; suppressed in quiet mode.
    fn warn(&self, message: &str) {
        if self.mode == UiMode::Normal {
            eprintln!("{}", format!("warning: {message}").yellow());
        }
    }

    /// Rejections and failed rounds; always reported, never fatal.
    fn report_error(&self, message: &str) {
        if self.mode == UiMode::Normal {
            eprintln!("{}", format!("error: {message}").red());
        } else {
            eprintln!("error: {message}");
        }
    }
}
