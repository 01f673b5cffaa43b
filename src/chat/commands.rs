//! Slash command parsing for the console.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the session, settings, directory browser and
//! attachments without sending a query to the backend.

use crate::types::AgentType;

/// A parsed console command.
///
/// These commands control the console and are not sent as queries.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start over with a fresh session.
    NewSession,

    /// Clear the session's history on the backend and locally.
    Clear,

    /// Reload the log from the backend's history.
    History,

    /// Show metadata for the current session.
    SessionInfo,

    /// List every session the backend holds.
    ListSessions,

    /// Delete the current session.
    DeleteSession,

    /// Check backend readiness.
    Health,

    /// Reload and show the backend settings.
    ShowSettings,

    /// Stage a model, or list the available ones when `None`.
    Model(Option<String>),

    /// Stage a project root.
    ProjectRoot(String),

    /// Push staged settings to the backend.
    SaveSettings,

    /// Drop staged settings.
    DiscardSettings,

    /// List a directory on the backend (home when `None`).
    Browse(Option<String>),

    /// List the parent directory.
    Up,

    /// List a subdirectory, by 1-based index or name.
    Enter(String),

    /// Stage the browsed directory as the project root.
    SelectDirectory,

    /// Stage files for the next query.
    Attach(Vec<String>),

    /// Drop a staged file by 1-based position.
    Detach(usize),

    /// List staged files.
    ListFiles,

    /// Show or hide the agent's steps.
    Details(bool),

    /// Request reviews or not.
    Review(bool),

    /// Stream responses or wait for them whole.
    Streaming(bool),

    /// Change the agent that handles queries.
    Agent(AgentType),

    /// Show the full thought process of the last response.
    Steps,

    /// Save the conversation log to a file.
    SaveTranscript(String),

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the console.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a query.
///
/// # Examples
///
/// ```
/// # use devconsole::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/agent devops").is_some());
/// assert!(parse_command("Add a /health endpoint").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::NewSession,
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "session" => ChatCommand::SessionInfo,
        "sessions" => ChatCommand::ListSessions,
        "delete" => ChatCommand::DeleteSession,
        "health" => ChatCommand::Health,
        "settings" => ChatCommand::ShowSettings,
        "model" => ChatCommand::Model(argument.map(str::to_string)),
        "root" => match argument {
            Some(path) => ChatCommand::ProjectRoot(path.to_string()),
            None => ChatCommand::Invalid("/root requires a directory path".to_string()),
        },
        "save-settings" => ChatCommand::SaveSettings,
        "discard" => ChatCommand::DiscardSettings,
        "browse" | "ls" => ChatCommand::Browse(argument.map(str::to_string)),
        "up" => ChatCommand::Up,
        "cd" => match argument {
            Some("..") => ChatCommand::Up,
            Some(target) => ChatCommand::Enter(target.to_string()),
            None => ChatCommand::Invalid("/cd requires a number or directory name".to_string()),
        },
        "select" => ChatCommand::SelectDirectory,
        "attach" => match argument {
            Some(paths) => {
                ChatCommand::Attach(paths.split_whitespace().map(str::to_string).collect())
            }
            None => ChatCommand::Invalid("/attach requires one or more file paths".to_string()),
        },
        "detach" => match argument.map(str::parse::<usize>) {
            Some(Ok(index)) if index > 0 => ChatCommand::Detach(index),
            Some(_) => ChatCommand::Invalid("/detach expects a file number from /files".to_string()),
            None => ChatCommand::Invalid("/detach requires a file number".to_string()),
        },
        "files" => ChatCommand::ListFiles,
        "details" => parse_toggle(argument, ChatCommand::Details, "/details"),
        "review" => parse_toggle(argument, ChatCommand::Review, "/review"),
        "stream" => parse_toggle(argument, ChatCommand::Streaming, "/stream"),
        "agent" => match argument {
            Some(name) => match name.parse::<AgentType>() {
                Ok(agent) => ChatCommand::Agent(agent),
                Err(err) => ChatCommand::Invalid(err),
            },
            None => ChatCommand::Invalid("/agent requires an agent type".to_string()),
        },
        "steps" => ChatCommand::Steps,
        "save" => match argument {
            Some(path) => ChatCommand::SaveTranscript(path.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "config" => ChatCommand::ShowConfig,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_toggle<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(bool) -> ChatCommand,
{
    match argument.and_then(parse_on_off) {
        Some(value) => constructor(value),
        None => ChatCommand::Invalid(format!("{name} expects 'on' or 'off'")),
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a fresh session
  /clear                 Clear this session's history
  /history               Reload the conversation from the backend
  /session               Show this session's details
  /sessions              List all sessions on the backend
  /delete                Delete this session
  /health                Check the backend
  /settings              Show backend settings and staged edits
  /model [name]          Stage a model (no argument lists models)
  /root <path>           Stage a project root
  /save-settings         Apply staged settings
  /discard               Drop staged settings
  /browse [path]         Browse directories on the backend host
  /up                    Go to the parent directory
  /cd <n|name>           Enter a listed directory
  /select                Stage the browsed directory as project root
  /attach <files...>     Attach files to the next query
  /detach <n>            Remove an attached file
  /files                 List attached files
  /details on|off        Show or hide the agent's steps
  /review on|off         Request a review of each response
  /stream on|off         Stream responses or wait for them
  /agent <type>          developer, devops or cloud_architect
  /steps                 Show the last response's steps
  /save <file>           Save the conversation to a JSON file
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit"#
}
