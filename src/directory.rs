//! Picking a project root by browsing the backend's filesystem.

use crate::backend::AssistantBackend;
use crate::settings::SettingsState;
use crate::types::{DirectoryItem, DirectoryListing};
use crate::{Error, Result};

/// The directory currently shown and how to move from it.
#[derive(Debug, Clone, Default)]
pub struct DirectoryBrowser {
    listing: Option<DirectoryListing>,
    error: Option<String>,
}

impl DirectoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last listing fetched.
    pub fn listing(&self) -> Option<&DirectoryListing> {
        self.listing.as_ref()
    }

    pub fn current_path(&self) -> Option<&str> {
        self.listing.as_ref().map(|l| l.current_path.as_str())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// List `path`, or the backend user's home directory when `None`.
    ///
    /// On failure the previous listing stays in place.
    pub async fn browse(
        &mut self,
        backend: &dyn AssistantBackend,
        path: Option<&str>,
    ) -> Result<&DirectoryListing> {
        match backend.browse_directory(path).await {
            Ok(listing) => {
                self.error = None;
                Ok(&*self.listing.insert(listing))
            }
            Err(err) => {
                self.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// List the parent of the current directory.
    pub async fn up(&mut self, backend: &dyn AssistantBackend) -> Result<&DirectoryListing> {
        let parent = self
            .listing
            .as_ref()
            .ok_or_else(|| Error::validation("nothing browsed yet; use /browse", None))?
            .parent_path
            .clone()
            .ok_or_else(|| Error::validation("already at the filesystem root", None))?;
        self.browse(backend, Some(&parent)).await
    }

    /// Find an entry by its 1-based position or by name.
    pub fn find(&self, target: &str) -> Result<&DirectoryItem> {
        let listing = self
            .listing
            .as_ref()
            .ok_or_else(|| Error::validation("nothing browsed yet; use /browse", None))?;
        let target = target.trim();
        let by_index = target
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| listing.items.get(i));
        by_index
            .or_else(|| listing.items.iter().find(|item| item.name == target))
            .ok_or_else(|| {
                Error::validation(format!("no directory {target} here"), Some("path".into()))
            })
    }

    /// List a subdirectory of the current directory.
    pub async fn enter(
        &mut self,
        backend: &dyn AssistantBackend,
        target: &str,
    ) -> Result<&DirectoryListing> {
        let path = self.find(target)?.path.clone();
        self.browse(backend, Some(&path)).await
    }

    /// Stage the current directory as the project root.
    pub fn select(&self, settings: &mut SettingsState) -> Result<String> {
        let path = self
            .current_path()
            .ok_or_else(|| Error::validation("nothing browsed yet; use /browse", None))?
            .to_string();
        settings.stage_project_root(path.clone())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndjson::EventStream;
    use crate::types::{
        CreateSessionResponse, HealthStatus, QueryRequest, QueryResponse, SessionHistory,
        SessionInfo, SessionList, Settings, SettingsUpdate, SettingsUpdateResponse,
        StatusResponse,
    };

    /// A tiny tree: `/`, `/home`, `/home/dev`.
    struct TreeBackend;

    fn item(name: &str, path: &str) -> DirectoryItem {
        DirectoryItem {
            name: name.to_string(),
            path: path.to_string(),
            kind: "directory".to_string(),
        }
    }

    #[async_trait::async_trait]
    impl AssistantBackend for TreeBackend {
        async fn browse_directory(&self, path: Option<&str>) -> Result<DirectoryListing> {
            match path.unwrap_or("/home/dev") {
                "/" => Ok(DirectoryListing {
                    current_path: "/".to_string(),
                    parent_path: None,
                    items: vec![item("home", "/home")],
                }),
                "/home" => Ok(DirectoryListing {
                    current_path: "/home".to_string(),
                    parent_path: Some("/".to_string()),
                    items: vec![item("dev", "/home/dev")],
                }),
                "/home/dev" => Ok(DirectoryListing {
                    current_path: "/home/dev".to_string(),
                    parent_path: Some("/home".to_string()),
                    items: Vec::new(),
                }),
                other => Err(Error::not_found(
                    format!("Path does not exist: {other}"),
                    None,
                )),
            }
        }

        async fn health(&self) -> Result<HealthStatus> {
            unimplemented!()
        }
        async fn create_session(&self) -> Result<CreateSessionResponse> {
            unimplemented!()
        }
        async fn session_info(&self, _: &str) -> Result<SessionInfo> {
            unimplemented!()
        }
        async fn session_history(&self, _: &str) -> Result<SessionHistory> {
            unimplemented!()
        }
        async fn clear_session(&self, _: &str) -> Result<StatusResponse> {
            unimplemented!()
        }
        async fn delete_session(&self, _: &str) -> Result<StatusResponse> {
            unimplemented!()
        }
        async fn list_sessions(&self) -> Result<SessionList> {
            unimplemented!()
        }
        async fn query(&self, _: QueryRequest) -> Result<QueryResponse> {
            unimplemented!()
        }
        async fn query_stream(&self, _: QueryRequest) -> Result<EventStream> {
            unimplemented!()
        }
        async fn settings(&self) -> Result<Settings> {
            unimplemented!()
        }
        async fn update_settings(&self, _: &SettingsUpdate) -> Result<SettingsUpdateResponse> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn walk_up_and_down() {
        let mut browser = DirectoryBrowser::new();
        browser.browse(&TreeBackend, None).await.unwrap();
        assert_eq!(browser.current_path(), Some("/home/dev"));

        browser.up(&TreeBackend).await.unwrap();
        browser.up(&TreeBackend).await.unwrap();
        assert_eq!(browser.current_path(), Some("/"));
        assert!(browser.up(&TreeBackend).await.unwrap_err().is_validation());

        browser.enter(&TreeBackend, "1").await.unwrap();
        assert_eq!(browser.current_path(), Some("/home"));
        browser.enter(&TreeBackend, "dev").await.unwrap();
        assert_eq!(browser.current_path(), Some("/home/dev"));
        assert!(browser.enter(&TreeBackend, "missing").await.is_err());
    }

    #[tokio::test]
    async fn failed_browse_keeps_listing() {
        let mut browser = DirectoryBrowser::new();
        browser.browse(&TreeBackend, Some("/")).await.unwrap();
        let err = browser.browse(&TreeBackend, Some("/nope")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(browser.current_path(), Some("/"));
        assert_eq!(browser.error(), Some("Path does not exist: /nope"));
    }

    #[tokio::test]
    async fn select_stages_project_root() {
        let mut settings = SettingsState::new();
        let mut browser = DirectoryBrowser::new();
        assert!(browser.select(&mut settings).is_err());
        browser.browse(&TreeBackend, Some("/home")).await.unwrap();
        assert_eq!(browser.select(&mut settings).unwrap(), "/home");
        assert_eq!(settings.project_root(), Some("/home"));
        assert!(settings.is_dirty());
    }
}
