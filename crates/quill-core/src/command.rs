//! Command line parsing for the single-line interactive protocol.
//!
//! A line is either blank (no-op), a recognized `/command`, an unknown
//! `/command`, or a chat turn addressed to the active agent.

/// A recognized session-management command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fork(String),
    Subfork(String),
    Switch(String),
    Delete(String),
    List,
    Models,
    Model(String),
    Provider(String),
    Status,
    Quiet,
    Normal,
    Help,
    Exit,
}

/// The dispatch classification of one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Blank input; nothing to do.
    Empty,
    /// A recognized command with its argument already extracted.
    Command(Command),
    /// A recognized command that requires an argument, given without one.
    MissingArgument { usage: &'static str },
    /// A `/`-prefixed token that matches no known command.
    Unknown(String),
    /// Anything else: a chat turn for the active agent.
    Chat(String),
}

/// Parses one line of user input.
///
/// Whitespace is trimmed; for commands taking an argument, the remainder
/// after the command token is trimmed and used verbatim.
pub fn parse_line(input: &str) -> ParsedLine {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ParsedLine::Empty;
    }
    if !trimmed.starts_with('/') {
        return ParsedLine::Chat(trimmed.to_string());
    }

    let (token, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (trimmed, ""),
    };

    match token {
        "/fork" => with_argument(rest, "/fork <id>", Command::Fork),
        "/subfork" => with_argument(rest, "/subfork <id>", Command::Subfork),
        "/switch" => with_argument(rest, "/switch <id>", Command::Switch),
        "/delete" => with_argument(rest, "/delete <id>", Command::Delete),
        "/model" => with_argument(rest, "/model <name>", Command::Model),
        "/provider" => with_argument(rest, "/provider <name>", Command::Provider),
        "/list" => ParsedLine::Command(Command::List),
        "/models" => ParsedLine::Command(Command::Models),
        "/status" => ParsedLine::Command(Command::Status),
        "/quiet" => ParsedLine::Command(Command::Quiet),
        "/normal" => ParsedLine::Command(Command::Normal),
        "/help" => ParsedLine::Command(Command::Help),
        "/exit" => ParsedLine::Command(Command::Exit),
        _ => ParsedLine::Unknown(token.to_string()),
    }
}

fn with_argument(
    rest: &str,
    usage: &'static str,
    build: impl FnOnce(String) -> Command,
) -> ParsedLine {
    if rest.is_empty() {
        ParsedLine::MissingArgument { usage }
    } else {
        ParsedLine::Command(build(rest.to_string()))
    }
}

/// The `/help` command table.
pub const HELP_TEXT: &str = "\
/fork <id>        start a fresh agent and switch to it
/subfork <id>     branch the current conversation into a new agent
/switch <id>      switch to an existing agent
/delete <id>      delete an agent (main cannot be deleted)
/list             list all agents
/models           list the selected provider's models
/model <name>     select a model of the current provider
/provider <name>  select a provider (resets the model to its default)
/status           show provider, model, active agent and history size
/quiet            minimal output mode
/normal           verbose output mode
/help             this text
/exit             save and quit
anything else     chat with the active agent";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_no_ops() {
        assert_eq!(parse_line(""), ParsedLine::Empty);
        assert_eq!(parse_line("   \t "), ParsedLine::Empty);
    }

    #[test]
    fn non_command_lines_are_chat_turns() {
        assert_eq!(
            parse_line("  hello there  "),
            ParsedLine::Chat("hello there".to_string())
        );
        // Only a leading slash marks a command.
        assert_eq!(
            parse_line("what does /fork do?"),
            ParsedLine::Chat("what does /fork do?".to_string())
        );
    }

    #[test]
    fn commands_with_arguments_parse() {
        assert_eq!(
            parse_line("/fork work"),
            ParsedLine::Command(Command::Fork("work".to_string()))
        );
        assert_eq!(
            parse_line("/subfork  branch "),
            ParsedLine::Command(Command::Subfork("branch".to_string()))
        );
        assert_eq!(
            parse_line("/switch main"),
            ParsedLine::Command(Command::Switch("main".to_string()))
        );
        assert_eq!(
            parse_line("/delete old"),
            ParsedLine::Command(Command::Delete("old".to_string()))
        );
        assert_eq!(
            parse_line("/model gpt-5-mini"),
            ParsedLine::Command(Command::Model("gpt-5-mini".to_string()))
        );
        assert_eq!(
            parse_line("/provider openrouter"),
            ParsedLine::Command(Command::Provider("openrouter".to_string()))
        );
    }

    #[test]
    fn missing_arguments_yield_usage() {
        assert_eq!(
            parse_line("/fork"),
            ParsedLine::MissingArgument {
                usage: "/fork <id>"
            }
        );
        assert_eq!(
            parse_line("/model   "),
            ParsedLine::MissingArgument {
                usage: "/model <name>"
            }
        );
    }

    #[test]
    fn bare_commands_parse() {
        assert_eq!(parse_line("/list"), ParsedLine::Command(Command::List));
        assert_eq!(parse_line("/models"), ParsedLine::Command(Command::Models));
        assert_eq!(parse_line("/status"), ParsedLine::Command(Command::Status));
        assert_eq!(parse_line("/quiet"), ParsedLine::Command(Command::Quiet));
        assert_eq!(parse_line("/normal"), ParsedLine::Command(Command::Normal));
        assert_eq!(parse_line("/help"), ParsedLine::Command(Command::Help));
        assert_eq!(parse_line("/exit"), ParsedLine::Command(Command::Exit));
    }

    #[test]
    fn unknown_slash_commands_are_reported() {
        assert_eq!(
            parse_line("/frok work"),
            ParsedLine::Unknown("/frok".to_string())
        );
        assert_eq!(parse_line("/"), ParsedLine::Unknown("/".to_string()));
    }
}
