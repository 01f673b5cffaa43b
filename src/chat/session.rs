//! The interactive console session.
//!
//! [`ChatSession`] ties the state holders together and maps each
//! [`ChatCommand`] onto them, reporting results through a [`Renderer`].

use std::path::Path;
use std::sync::Arc;

use time::macros::format_description;

use crate::attachments::PendingAttachments;
use crate::backend::AssistantBackend;
use crate::chat::commands::{ChatCommand, help_text};
use crate::chat::config::ChatConfig;
use crate::conversation::TurnStatus;
use crate::directory::DirectoryBrowser;
use crate::render::Renderer;
use crate::session::{QueryOptions, Session};
use crate::settings::SettingsState;
use crate::types::{DirectoryListing, Message, SessionInfo};
use crate::{Error, Result};

/// What the REPL should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Quit,
}

/// Everything the console knows about the backend and the operator's choices.
pub struct ChatSession {
    session: Session,
    settings: SettingsState,
    browser: DirectoryBrowser,
    attachments: PendingAttachments,
    options: QueryOptions,
    streaming: bool,
    config: ChatConfig,
}

impl ChatSession {
    /// Creates a console session over `backend`; nothing is fetched until
    /// [`start`](Self::start).
    pub fn new(backend: Arc<dyn AssistantBackend>, config: ChatConfig) -> Self {
        Self {
            session: Session::new(backend),
            settings: SettingsState::new(),
            browser: DirectoryBrowser::new(),
            attachments: PendingAttachments::new(),
            options: config.query_options(),
            streaming: config.streaming,
            config,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &SettingsState {
        &self.settings
    }

    pub fn attachments(&self) -> &PendingAttachments {
        &self.attachments
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Check the backend, load its settings and open a session.
    ///
    /// Only a failure to open the session is fatal.
    pub async fn start(&mut self, renderer: &mut dyn Renderer) -> Result<()> {
        match self.session.health().await {
            Ok(health) if health.ready => {}
            Ok(health) => {
                renderer.print_warning(&format!("Backend not ready: {}", health.message));
                for issue in &health.issues {
                    renderer.print_warning(issue);
                }
            }
            Err(err) => renderer.print_warning(&format!("Health check failed: {err}")),
        }
        if let Err(err) = self.settings.load(self.session.backend().as_ref()).await {
            renderer.print_warning(&format!("Could not load settings: {}", err.user_message()));
        }
        let session_id = self.session.create().await?;
        renderer.print_info(&format!("Session {session_id}"));
        if let (Some(root), Some(model)) = (self.settings.project_root(), self.settings.model_name())
        {
            renderer.print_info(&format!("Project root: {root}  Model: {model}"));
        }
        Ok(())
    }

    /// Send a query with the staged attachments.
    pub async fn send(&mut self, query: &str, renderer: &mut dyn Renderer) -> Result<TurnStatus> {
        if self.streaming {
            self.session
                .send(query, &mut self.attachments, &self.options, renderer)
                .await
        } else {
            self.session
                .send_blocking(query, &mut self.attachments, &self.options, renderer)
                .await
        }
    }

    /// Carry out one command.
    pub async fn execute(
        &mut self,
        command: ChatCommand,
        renderer: &mut dyn Renderer,
    ) -> CommandOutcome {
        if let Err(err) = self.dispatch(command.clone(), renderer).await {
            renderer.print_error(&err.user_message());
        }
        if command == ChatCommand::Quit {
            CommandOutcome::Quit
        } else {
            CommandOutcome::Continue
        }
    }

    async fn dispatch(&mut self, command: ChatCommand, renderer: &mut dyn Renderer) -> Result<()> {
        let backend = Arc::clone(self.session.backend());
        match command {
            ChatCommand::Quit => {}
            ChatCommand::Help => {
                for line in help_text().lines() {
                    renderer.print_info(&format!("    {line}"));
                }
            }
            ChatCommand::Invalid(message) => renderer.print_error(&message),
            ChatCommand::NewSession => {
                let id = self.session.new_session().await?;
                renderer.print_info(&format!("Started session {id}"));
            }
            ChatCommand::Clear => {
                self.session.clear().await?;
                renderer.print_info("Conversation cleared.");
            }
            ChatCommand::History => {
                let count = self.session.load_history().await?;
                renderer.print_info(&format!("Loaded {count} messages."));
                for message in self.session.messages() {
                    renderer.print_message(message, self.options.show_details);
                }
            }
            ChatCommand::SessionInfo => {
                let info = self.session.info().await?;
                renderer.print_info(&describe_session(&info));
            }
            ChatCommand::ListSessions => {
                let list = self.session.list().await?;
                renderer.print_info(&format!("{} active sessions", list.active_sessions));
                let current = self.session.session_id();
                for info in &list.sessions {
                    let marker = if Some(info.session_id.as_str()) == current {
                        "*"
                    } else {
                        " "
                    };
                    renderer.print_info(&format!("  {marker} {}", describe_session(info)));
                }
            }
            ChatCommand::DeleteSession => {
                self.session.delete().await?;
                renderer.print_info("Session deleted. Use /new to start another.");
            }
            ChatCommand::Health => {
                let health = self.session.health().await?;
                renderer.print_info(&format!(
                    "Backend {}: {}",
                    if health.ready { "ready" } else { "not ready" },
                    health.message
                ));
                for issue in &health.issues {
                    renderer.print_warning(issue);
                }
                for warning in &health.warnings {
                    renderer.print_warning(warning);
                }
            }
            ChatCommand::ShowSettings => {
                let dirty = self.settings.is_dirty();
                if dirty {
                    renderer.print_info("Unsaved edits (use /save-settings or /discard):");
                } else {
                    self.settings.load(backend.as_ref()).await?;
                }
                self.print_settings(renderer);
            }
            ChatCommand::Model(None) => {
                let current = self.settings.model_name().unwrap_or_default().to_string();
                for model in self.settings.available_models() {
                    let marker = if *model == current { "*" } else { " " };
                    renderer.print_info(&format!("  {marker} {model}"));
                }
            }
            ChatCommand::Model(Some(model)) => {
                self.settings.stage_model(model.clone())?;
                renderer.print_info(&format!("Model {model} staged; /save-settings to apply."));
            }
            ChatCommand::ProjectRoot(path) => {
                self.settings.stage_project_root(path.clone())?;
                renderer.print_info(&format!(
                    "Project root {path} staged; /save-settings to apply."
                ));
            }
            ChatCommand::SaveSettings => {
                let message = self.settings.save(backend.as_ref()).await?;
                renderer.print_info(&message);
            }
            ChatCommand::DiscardSettings => {
                self.settings.discard();
                renderer.print_info("Staged settings discarded.");
            }
            ChatCommand::Browse(path) => {
                let listing = self.browser.browse(backend.as_ref(), path.as_deref()).await?;
                print_listing(listing, renderer);
            }
            ChatCommand::Up => {
                let listing = self.browser.up(backend.as_ref()).await?;
                print_listing(listing, renderer);
            }
            ChatCommand::Enter(target) => {
                let listing = self.browser.enter(backend.as_ref(), &target).await?;
                print_listing(listing, renderer);
            }
            ChatCommand::SelectDirectory => {
                let path = self.browser.select(&mut self.settings)?;
                renderer.print_info(&format!(
                    "Project root {path} staged; /save-settings to apply."
                ));
            }
            ChatCommand::Attach(paths) => {
                let selection = self.attachments.select(paths);
                for rejected in &selection.rejected {
                    renderer.print_warning(&rejected.to_string());
                }
                if selection.accepted > 0 {
                    renderer.print_info(&format!(
                        "{} file(s) attached; {} pending.",
                        selection.accepted,
                        self.attachments.len()
                    ));
                }
            }
            ChatCommand::Detach(index) => match self.attachments.remove(index - 1) {
                Some(path) => renderer.print_info(&format!("Removed {}", path.display())),
                None => {
                    return Err(Error::validation(
                        format!("no attached file #{index}"),
                        Some("index".to_string()),
                    ));
                }
            },
            ChatCommand::ListFiles => {
                if self.attachments.is_empty() {
                    renderer.print_info("No files attached.");
                }
                for (i, path) in self.attachments.paths().enumerate() {
                    renderer.print_info(&format!("  {}. {}", i + 1, path.display()));
                }
            }
            ChatCommand::Details(on) => {
                self.options.show_details = on;
                renderer.print_info(if on {
                    "Thought process shown."
                } else {
                    "Thought process hidden."
                });
            }
            ChatCommand::Review(on) => {
                self.options.enable_review = on;
                if on && !self.options.agent_type.has_reviewer() {
                    renderer.print_warning(&format!(
                        "The {} agent is never reviewed.",
                        self.options.agent_type
                    ));
                }
                renderer.print_info(if on { "Review enabled." } else { "Review disabled." });
            }
            ChatCommand::Streaming(on) => {
                self.streaming = on;
                renderer.print_info(if on {
                    "Responses will stream."
                } else {
                    "Responses will arrive whole."
                });
            }
            ChatCommand::Agent(agent) => {
                self.options.agent_type = agent;
                renderer.print_info(&format!("Agent set to {agent}."));
            }
            ChatCommand::Steps => {
                let last = self.session.messages().iter().rev().find_map(|m| match m {
                    Message::Assistant {
                        thought_process, ..
                    } => Some(thought_process.as_slice()),
                    _ => None,
                });
                match last {
                    Some(steps) => renderer.print_thought_process(steps),
                    None => renderer.print_info("No response yet."),
                }
            }
            ChatCommand::SaveTranscript(path) => {
                self.session.save_transcript_to(Path::new(&path))?;
                renderer.print_info(&format!("Transcript saved to {path}"));
            }
            ChatCommand::ShowConfig => self.print_config(renderer),
        }
        Ok(())
    }

    fn print_settings(&self, renderer: &mut dyn Renderer) {
        renderer.print_info("    Backend Settings:");
        renderer.print_info(&format!(
            "      Project root: {}",
            self.settings.project_root().unwrap_or("(unknown)")
        ));
        renderer.print_info(&format!(
            "      Model: {}",
            self.settings.model_name().unwrap_or("(unknown)")
        ));
        let models = self.settings.available_models();
        if !models.is_empty() {
            renderer.print_info(&format!("      Available: {}", models.join(", ")));
        }
    }

    fn print_config(&self, renderer: &mut dyn Renderer) {
        let on_off = |on: bool| if on { "on" } else { "off" };
        renderer.print_info("    Current Configuration:");
        renderer.print_info(&format!(
            "      Session: {}",
            self.session.session_id().unwrap_or("(none)")
        ));
        renderer.print_info(&format!("      Agent: {}", self.options.agent_type));
        renderer.print_info(&format!("      Details: {}", on_off(self.options.show_details)));
        renderer.print_info(&format!("      Review: {}", on_off(self.options.enable_review)));
        renderer.print_info(&format!("      Streaming: {}", on_off(self.streaming)));
        renderer.print_info(&format!("      Color: {}", on_off(self.config.use_color)));
        match &self.config.log_file {
            Some(path) => renderer.print_info(&format!("      Log file: {}", path.display())),
            None => renderer.print_info("      Log file: (disabled)"),
        }
        renderer.print_info(&format!("      Attached files: {}", self.attachments.len()));
    }
}

fn describe_session(info: &SessionInfo) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    let stamp = |t: time::OffsetDateTime| t.format(&format).unwrap_or_else(|_| t.to_string());
    format!(
        "{}  created {}  last active {}  {} messages",
        info.session_id,
        stamp(info.created_at),
        stamp(info.last_accessed),
        info.message_count
    )
}

fn print_listing(listing: &DirectoryListing, renderer: &mut dyn Renderer) {
    renderer.print_info(&listing.current_path);
    if listing.items.is_empty() {
        renderer.print_info("  (no subdirectories)");
    }
    for (i, item) in listing.items.iter().enumerate() {
        renderer.print_info(&format!("  {:>3}. {}/", i + 1, item.name));
    }
}
