// ABOUTME: Generic command parsing for chat bot commands
// ABOUTME: Platform-agnostic !command handling mapped onto relay operations

/// Represents a parsed command from a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The command name (without prefix)
    pub name: String,
    /// Parsed arguments (handles quoted strings)
    pub args: Vec<String>,
    /// The raw argument string after the command name
    pub raw_args: String,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>, raw_args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args,
            raw_args: raw_args.into(),
        }
    }

    /// Map a parsed command onto the relay operation set
    pub fn as_relay(&self) -> RelayCommand {
        match self.name.as_str() {
            // A bare prefix with nothing after it reads as a help request
            "" | "help" | "h" => RelayCommand::Help,
            "status" | "s" => RelayCommand::Status,
            "reconnect" | "rc" => RelayCommand::Reconnect,
            "identity" | "character" | "char" => {
                let name = self.raw_args.trim();
                if name.is_empty() {
                    RelayCommand::Status
                } else {
                    // Quoted single argument wins over the raw string so
                    // names with surrounding whitespace survive
                    let name = match self.args.as_slice() {
                        [only] => only.clone(),
                        _ => name.to_string(),
                    };
                    RelayCommand::Identity(name)
                }
            }
            other => RelayCommand::Unknown(other.to_string()),
        }
    }
}

/// The command set exposed over chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCommand {
    Reconnect,
    Identity(String),
    Status,
    Help,
    Unknown(String),
}

/// Result of parsing a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// A command was recognized
    Command(Command),
    /// A regular message to relay
    Message(String),
    /// Message should be ignored (empty, escape remainder empty)
    Ignore,
}

impl ParseResult {
    pub fn is_command(&self) -> bool {
        matches!(self, ParseResult::Command(_))
    }

    pub fn is_message(&self) -> bool {
        matches!(self, ParseResult::Message(_))
    }

    pub fn as_command(&self) -> Option<&Command> {
        match self {
            ParseResult::Command(cmd) => Some(cmd),
            _ => None,
        }
    }
}

/// Parse arguments from a string, respecting quoted strings
fn parse_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '"';

    for c in input.chars() {
        match c {
            '"' | '\'' if !in_quotes => {
                in_quotes = true;
                quote_char = c;
            }
            c if c == quote_char && in_quotes => {
                in_quotes = false;
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Parse a chat message to determine if it's a command.
///
/// Recognizes `!command` and `{bot_prefix} command` forms. Messages starting
/// with `!!` are escaped back to regular messages; empty messages are
/// ignored.
pub fn parse_message(body: &str, bot_prefix: &str) -> ParseResult {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return ParseResult::Ignore;
    }

    // Escape sequence: !! at start means treat as regular message
    if let Some(rest) = trimmed.strip_prefix("!!") {
        let escaped = rest.trim();
        if escaped.is_empty() {
            return ParseResult::Ignore;
        }
        return ParseResult::Message(escaped.to_string());
    }

    // Bot prefix style: "!tavern status". The comparison is ASCII
    // case-insensitive on the raw bytes; indexing a lowercased copy could
    // split a char boundary when lowercasing changes byte lengths.
    let prefix_len = bot_prefix.len();
    if trimmed.len() > prefix_len
        && trimmed.is_char_boundary(prefix_len)
        && trimmed[..prefix_len].eq_ignore_ascii_case(bot_prefix)
        && trimmed[prefix_len..].starts_with(char::is_whitespace)
    {
        let remainder = trimmed[prefix_len..].trim();
        if remainder.is_empty() {
            return ParseResult::Command(Command::new("", Vec::new(), ""));
        }
        return parse_command_from_text(remainder);
    }

    // Simple !command style
    if trimmed.starts_with('!') && trimmed.len() > 1 {
        let after_bang = &trimmed[1..];
        if after_bang.chars().next().is_some_and(|c| c.is_alphabetic()) {
            return parse_command_from_text(after_bang);
        }
    }

    ParseResult::Message(trimmed.to_string())
}

fn parse_command_from_text(text: &str) -> ParseResult {
    let text = text.trim();
    if text.is_empty() {
        return ParseResult::Command(Command::new("", Vec::new(), ""));
    }

    let parts: Vec<&str> = text.splitn(2, char::is_whitespace).collect();
    let name = parts[0].to_lowercase();
    let raw_args = parts.get(1).map(|s| s.trim()).unwrap_or("").to_string();
    let args = parse_args(&raw_args);

    ParseResult::Command(Command::new(name, args, raw_args))
}
