//! Configuration types for the console.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! profile holding defaults, and the resolved [`ChatConfig`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client_logger::JsonLinesLogger;
use crate::session::QueryOptions;
use crate::types::AgentType;
use crate::{DevAssistant, Error, Result};

/// Command-line arguments for the devconsole tools.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(
        optional,
        "Backend URL (default: $DEVCONSOLE_URL or http://localhost:8000/)",
        "URL"
    )]
    pub url: Option<String>,

    /// Agent that handles queries.
    #[arrrg(optional, "Agent: developer, devops or cloud_architect", "AGENT")]
    pub agent: Option<String>,

    /// YAML file with defaults for every other option.
    #[arrrg(optional, "YAML profile with default settings", "FILE")]
    pub profile: Option<String>,

    /// Timeout for non-streaming requests.
    #[arrrg(optional, "Request timeout in seconds (default: 600)", "SECS")]
    pub timeout: Option<u64>,

    /// How long a stream may go without data.
    #[arrrg(optional, "Stream idle timeout in seconds (default: 300)", "SECS")]
    pub idle_timeout: Option<u64>,

    /// File to append responses and stream events to.
    #[arrrg(optional, "Append every response and stream event to FILE", "FILE")]
    pub log_file: Option<String>,

    /// Do not request or show the agent's steps.
    #[arrrg(flag, "Hide the agent's thought process")]
    pub no_details: bool,

    /// Do not request a review.
    #[arrrg(flag, "Skip the review of each response")]
    pub no_review: bool,

    /// Use the non-streaming endpoint.
    #[arrrg(flag, "Wait for whole responses instead of streaming")]
    pub no_stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Defaults read from a YAML profile. Every field is optional.
///
/// ```yaml
/// url: http://assistant.internal:8000/
/// agent_type: devops
/// show_details: false
/// timeout_secs: 120
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatProfile {
    pub url: Option<String>,
    pub agent_type: Option<AgentType>,
    pub show_details: Option<bool>,
    pub enable_review: Option<bool>,
    pub streaming: Option<bool>,
    pub color: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl ChatProfile {
    /// Reads a profile from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            Error::io(format!("failed to read profile {}", path.display()), err)
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Configuration for a console session.
///
/// This struct holds the resolved configuration values after layering
/// command-line arguments over a profile over the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Backend base URL; `None` defers to the environment.
    pub base_url: Option<String>,

    /// Agent that handles queries.
    pub agent_type: AgentType,

    /// Request and show the agent's steps.
    pub show_details: bool,

    /// Request a review of each response.
    pub enable_review: bool,

    /// Use `/query/stream` rather than `/query`.
    pub streaming: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Timeout for non-streaming requests.
    pub timeout: Option<Duration>,

    /// Idle timeout for streams.
    pub idle_timeout: Option<Duration>,

    /// Where to log responses and stream events.
    pub log_file: Option<PathBuf>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Agent: developer
    /// - Details, review, streaming and color: enabled
    /// - Timeouts: the client's defaults
    pub fn new() -> Self {
        Self {
            base_url: None,
            agent_type: AgentType::Developer,
            show_details: true,
            enable_review: true,
            streaming: true,
            use_color: true,
            timeout: None,
            idle_timeout: None,
            log_file: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_agent_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = agent_type;
        self
    }

    pub fn with_details(mut self, show_details: bool) -> Self {
        self.show_details = show_details;
        self
    }

    pub fn with_review(mut self, enable_review: bool) -> Self {
        self.enable_review = enable_review;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    /// Layer a profile's values over this configuration.
    pub fn with_profile(self, profile: ChatProfile) -> Self {
        Self {
            base_url: profile.url.or(self.base_url),
            agent_type: profile.agent_type.unwrap_or(self.agent_type),
            show_details: profile.show_details.unwrap_or(self.show_details),
            enable_review: profile.enable_review.unwrap_or(self.enable_review),
            streaming: profile.streaming.unwrap_or(self.streaming),
            use_color: profile.color.unwrap_or(self.use_color),
            timeout: profile.timeout_secs.map(Duration::from_secs).or(self.timeout),
            idle_timeout: profile
                .idle_timeout_secs
                .map(Duration::from_secs)
                .or(self.idle_timeout),
            log_file: profile.log_file.or(self.log_file),
        }
    }

    /// Resolve command-line arguments, reading `--profile` if one was given.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let base = match &args.profile {
            Some(path) => ChatConfig::new().with_profile(ChatProfile::from_file(path)?),
            None => ChatConfig::new(),
        };
        let agent_type = match args.agent {
            Some(agent) => agent
                .parse::<AgentType>()
                .map_err(|err| Error::validation(err, Some("agent".to_string())))?,
            None => base.agent_type,
        };
        Ok(ChatConfig {
            base_url: args.url.or(base.base_url),
            agent_type,
            show_details: base.show_details && !args.no_details,
            enable_review: base.enable_review && !args.no_review,
            streaming: base.streaming && !args.no_stream,
            use_color: base.use_color && !args.no_color,
            timeout: args.timeout.map(Duration::from_secs).or(base.timeout),
            idle_timeout: args.idle_timeout.map(Duration::from_secs).or(base.idle_timeout),
            log_file: args.log_file.map(PathBuf::from).or(base.log_file),
        })
    }

    /// The per-query options this configuration starts with.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            show_details: self.show_details,
            enable_review: self.enable_review,
            agent_type: self.agent_type,
        }
    }

    /// Build the HTTP client this configuration describes.
    pub fn client(&self) -> Result<DevAssistant> {
        let client =
            DevAssistant::with_options(self.base_url.clone(), self.timeout, self.idle_timeout)?;
        match &self.log_file {
            Some(path) => Ok(client.with_logger(Arc::new(JsonLinesLogger::open(path)?))),
            None => Ok(client),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        ChatConfig::from_args(args)
    }
}
