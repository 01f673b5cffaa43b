//! The backend settings form: project root and model.
//!
//! Edits are staged locally and only reach the backend on [`SettingsState::save`].

use crate::backend::AssistantBackend;
use crate::types::{Settings, SettingsUpdate};
use crate::{Error, Result};

/// Reported after a successful save.
pub const SAVED_MESSAGE: &str = "Settings saved. The backend has reinitialized its agents.";

/// Loaded settings plus any staged, unsaved edits.
#[derive(Debug, Clone, Default)]
pub struct SettingsState {
    loaded: Option<Settings>,
    staged_project_root: Option<String>,
    staged_model: Option<String>,
    error: Option<String>,
}

impl SettingsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the backend's current settings, discarding staged edits.
    pub async fn load(&mut self, backend: &dyn AssistantBackend) -> Result<&Settings> {
        match backend.settings().await {
            Ok(settings) => {
                self.error = None;
                self.staged_project_root = None;
                self.staged_model = None;
                Ok(&*self.loaded.insert(settings))
            }
            Err(err) => {
                self.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// The settings as last loaded or saved.
    pub fn loaded(&self) -> Option<&Settings> {
        self.loaded.as_ref()
    }

    /// The error from the last failed load or save.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Models the backend accepts, once known.
    pub fn available_models(&self) -> &[String] {
        self.loaded
            .as_ref()
            .map(|s| s.available_models.as_slice())
            .unwrap_or_default()
    }

    /// The project root that a save would send.
    pub fn project_root(&self) -> Option<&str> {
        self.staged_project_root
            .as_deref()
            .or_else(|| self.loaded.as_ref().map(|s| s.project_root.as_str()))
    }

    /// The model that a save would send.
    pub fn model_name(&self) -> Option<&str> {
        self.staged_model
            .as_deref()
            .or_else(|| self.loaded.as_ref().map(|s| s.model_name.as_str()))
    }

    /// Whether anything is staged.
    pub fn is_dirty(&self) -> bool {
        self.staged_project_root.is_some() || self.staged_model.is_some()
    }

    pub fn stage_project_root(&mut self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(Error::validation(
                "project root must not be empty",
                Some("project_root".to_string()),
            ));
        }
        self.staged_project_root = Some(trimmed.to_string());
        Ok(())
    }

    /// Stage a model, rejecting one the backend does not list.
    pub fn stage_model(&mut self, model: impl Into<String>) -> Result<()> {
        let model = model.into();
        let models = self.available_models();
        if !models.is_empty() && !models.iter().any(|m| *m == model) {
            return Err(Error::validation(
                format!("unknown model {model}; available: {}", models.join(", ")),
                Some("model_name".to_string()),
            ));
        }
        self.staged_model = Some(model);
        Ok(())
    }

    /// Drop staged edits.
    pub fn discard(&mut self) {
        self.staged_project_root = None;
        self.staged_model = None;
    }

    /// Push the form's project root and model to the backend.
    ///
    /// Staged edits win over the loaded values; with nothing staged the
    /// loaded values are re-applied. On success the echoed values become the
    /// loaded settings and the returned text tells the operator the agents
    /// were reinitialized. On failure staged edits are kept so they can be
    /// corrected.
    pub async fn save(&mut self, backend: &dyn AssistantBackend) -> Result<String> {
        let update = SettingsUpdate {
            project_root: self.project_root().map(str::to_string),
            model_name: self.model_name().map(str::to_string),
        };
        if update.is_empty() {
            return Err(Error::validation(
                "settings have not been loaded and nothing is staged",
                None,
            ));
        }
        match backend.update_settings(&update).await {
            Ok(response) => {
                let settings = self.loaded.get_or_insert_with(Settings::default);
                settings.project_root = response.project_root;
                settings.model_name = response.model_name;
                self.discard();
                self.error = None;
                Ok(SAVED_MESSAGE.to_string())
            }
            Err(err) => {
                self.error = Some(err.user_message());
                Err(err)
            }
        }
    }
}
