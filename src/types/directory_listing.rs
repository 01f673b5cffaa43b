use serde::{Deserialize, Serialize};

/// Response of `GET /browse-directory`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// The directory that was listed.
    pub current_path: String,

    /// Its parent, or `None` at the filesystem root.
    #[serde(default)]
    pub parent_path: Option<String>,

    /// Subdirectories, sorted by name.
    #[serde(default)]
    pub items: Vec<DirectoryItem>,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryItem {
    pub name: String,
    pub path: String,
    /// Always `directory` today.
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_root_listing() {
        let json = r#"{
            "current_path": "/",
            "parent_path": null,
            "items": [{"name": "home", "path": "/home", "type": "directory"}]
        }"#;
        let listing: DirectoryListing = serde_json::from_str(json).unwrap();
        assert!(listing.parent_path.is_none());
        assert_eq!(listing.items[0].kind, "directory");
    }
}
