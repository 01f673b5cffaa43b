//! Command-line tool for sending a single query to the developer assistant.
//!
//! The query is sent to the non-streaming `/query` endpoint in a fresh
//! session and the whole response is printed.
//!
//! # Usage
//!
//! ```bash
//! # Ask the developer agent
//! devconsole-query "Add input validation to app.py"
//!
//! # Attach files and get JSON output
//! devconsole-query --attach src/app.py,README.md --format json "Review these"
//!
//! # Use the cloud architect, reading the query from a file
//! devconsole-query --agent cloud_architect --query-file design.md
//! ```

use std::sync::Arc;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use devconsole::chat::PlainTextRenderer;
use devconsole::{
    AgentType, AssistantBackend, Message, PendingAttachments, QueryOptions, Renderer, Session,
    TurnStatus,
};

/// Output format for displaying the response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum OutputFormat {
    /// Plain text format (default) - human-readable output.
    #[default]
    Text,
    /// JSON format - the conversation log as JSON.
    Json,
    /// YAML format - the conversation log as YAML.
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Invalid output format: {s}. Valid options: text, json, yaml"
            )),
        }
    }
}

/// Command-line arguments for the devconsole-query tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "Backend URL (default: $DEVCONSOLE_URL or http://localhost:8000/)", "URL")]
    url: Option<String>,

    #[arrrg(optional, "Agent: developer, devops or cloud_architect", "AGENT")]
    agent: Option<String>,

    #[arrrg(optional, "Output format: text, json, yaml", "FORMAT")]
    format: Option<String>,

    #[arrrg(optional, "Comma-separated files to attach", "FILES")]
    attach: Option<String>,

    #[arrrg(optional, "Read the query from FILE", "FILE")]
    query_file: Option<String>,

    #[arrrg(optional, "Request timeout in seconds (default: 600)", "SECS")]
    timeout: Option<u64>,

    #[arrrg(flag, "Skip the review")]
    no_review: bool,

    #[arrrg(flag, "Do not request the agent's thought process")]
    no_details: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, words) = Args::from_command_line_relaxed("devconsole-query [OPTIONS] <QUERY>...");

    let query = match &args.query_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => words.join(" "),
    };
    if query.trim().is_empty() {
        eprintln!("Error: Must specify a query or --query-file");
        std::process::exit(1);
    }

    let output_format: OutputFormat = match &args.format {
        Some(format) => format.parse().map_err(|e| format!("Invalid format: {e}"))?,
        None => OutputFormat::Text,
    };
    let agent_type: AgentType = match &args.agent {
        Some(agent) => agent.parse()?,
        None => AgentType::Developer,
    };
    let options = QueryOptions {
        show_details: !args.no_details,
        enable_review: !args.no_review,
        agent_type,
    };

    let mut attachments = PendingAttachments::new();
    if let Some(files) = &args.attach {
        let selection = attachments.select(
            files
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty()),
        );
        for rejected in &selection.rejected {
            eprintln!("Warning: {rejected}");
        }
    }

    let client = devconsole::DevAssistant::with_options(
        args.url.clone(),
        args.timeout.map(std::time::Duration::from_secs),
        None,
    )?;
    let backend: Arc<dyn AssistantBackend> = Arc::new(client);
    let mut session = Session::new(backend);
    session.create().await?;

    let text_output = output_format == OutputFormat::Text;
    let mut renderer = PlainTextRenderer::with_color(false);
    let mut quiet = Quiet;
    let renderer: &mut dyn Renderer = if text_output {
        &mut renderer
    } else {
        &mut quiet
    };
    let status = session
        .send_blocking(&query, &mut attachments, &options, renderer)
        .await?;

    match output_format {
        OutputFormat::Text => {}
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(session.messages())?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(session.messages())?),
    }

    let failed = status != TurnStatus::Finished
        || matches!(session.messages().last(), Some(Message::Error { .. }));
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Renders nothing; used when the log is printed as structured output.
struct Quiet;

impl Renderer for Quiet {
    fn print_message(&mut self, _: &Message, _: bool) {}
    fn print_step(&mut self, _: Option<u32>, _: &devconsole::ThoughtStep) {}
    fn print_thought_process(&mut self, _: &[devconsole::ThoughtStep]) {}
    fn print_error(&mut self, error: &str) {
        eprintln!("Error: {error}");
    }
    fn print_warning(&mut self, warning: &str) {
        eprintln!("Warning: {warning}");
    }
    fn print_info(&mut self, _: &str) {}
    fn finish_response(&mut self) {}
}
