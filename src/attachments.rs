//! Files staged for the next query.
//!
//! Files are filtered by extension when selected and only read when the
//! query is sent, at which point each becomes an [`AttachedFileData`] with a
//! base64 payload.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::Error;
use crate::observability::{ATTACHMENT_READ_ERRORS, ATTACHMENTS_REJECTED};
use crate::types::AttachedFileData;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "py", "js", "jsx", "ts", "tsx", "json", "md", "yaml", "yml", "xml", "html", "css",
    "java", "c", "cpp", "h", "go", "rs", "sh", "bash", "sql", "env", "config", "ini", "toml",
    "log",
];

/// How a file is read before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    /// Read as text; invalid UTF-8 is replaced.
    Text,
    /// Read as raw bytes.
    Image,
    /// Read as raw bytes.
    Pdf,
}

impl FileCategory {
    /// Classify a file by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        let extension = extension.as_str();
        if IMAGE_EXTENSIONS.contains(&extension) {
            Some(FileCategory::Image)
        } else if extension == "pdf" {
            Some(FileCategory::Pdf)
        } else if TEXT_EXTENSIONS.contains(&extension) {
            Some(FileCategory::Text)
        } else {
            None
        }
    }

    /// Whether the file's bytes are encoded as-is.
    pub fn is_binary(self) -> bool {
        matches!(self, FileCategory::Image | FileCategory::Pdf)
    }
}

/// The result of [`PendingAttachments::select`].
#[derive(Debug, Default)]
pub struct Selection {
    /// How many files were added.
    pub accepted: usize,
    /// One [`Error::UnsupportedFile`] per file left out.
    pub rejected: Vec<Error>,
}

/// The ordered set of files waiting to be sent.
#[derive(Debug, Clone, Default)]
pub struct PendingAttachments {
    files: Vec<(PathBuf, FileCategory)>,
}

impl PendingAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the supported files among `paths`; the rest are reported back
    /// and left out.
    pub fn select<I, P>(&mut self, paths: I) -> Selection
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut selection = Selection::default();
        for path in paths {
            let path = path.into();
            match FileCategory::from_path(&path) {
                Some(category) => {
                    self.files.push((path, category));
                    selection.accepted += 1;
                }
                None => {
                    ATTACHMENTS_REJECTED.click();
                    let extension = path
                        .extension()
                        .map(|ext| ext.to_string_lossy().into_owned());
                    selection
                        .rejected
                        .push(Error::unsupported_file(file_name(&path), extension));
                }
            }
        }
        selection
    }

    /// Drop the file at `index`, returning it if there was one.
    pub fn remove(&mut self, index: usize) -> Option<PathBuf> {
        if index < self.files.len() {
            Some(self.files.remove(index).0)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The pending paths in selection order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|(path, _)| path.as_path())
    }

    /// The pending file names in selection order.
    pub fn names(&self) -> Vec<String> {
        self.files.iter().map(|(path, _)| file_name(path)).collect()
    }

    /// Read and encode every pending file, in order.
    ///
    /// A file that cannot be read is still sent, with a payload describing
    /// the failure.
    pub async fn encode_all(&self) -> Vec<AttachedFileData> {
        let mut encoded = Vec::with_capacity(self.files.len());
        for (path, category) in &self.files {
            encoded.push(encode_file(path, *category).await);
        }
        encoded
    }
}

/// Read one file and base64-encode its contents.
pub async fn encode_file(path: &Path, category: FileCategory) -> AttachedFileData {
    let payload = match tokio::fs::read(path).await {
        Ok(bytes) if category.is_binary() => STANDARD.encode(&bytes),
        Ok(bytes) => STANDARD.encode(String::from_utf8_lossy(&bytes).as_bytes()),
        Err(err) => {
            ATTACHMENT_READ_ERRORS.click();
            STANDARD.encode(format!("[Error reading file: {err}]"))
        }
    };
    AttachedFileData::new(file_name(path), payload)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "devconsole-attachments-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn select_filters_by_extension() {
        let mut pending = PendingAttachments::new();
        let selection = pending.select(["a.py", "b.exe", "c.png"]);
        assert_eq!(selection.accepted, 2);
        assert_eq!(selection.rejected.len(), 1);
        assert_eq!(
            selection.rejected[0].to_string(),
            "File type .exe is not supported: b.exe"
        );
        assert_eq!(pending.names(), vec!["a.py", "c.png"]);
    }

    #[test]
    fn categories() {
        assert_eq!(
            FileCategory::from_path(Path::new("Shot.PNG")),
            Some(FileCategory::Image)
        );
        assert_eq!(
            FileCategory::from_path(Path::new("design.pdf")),
            Some(FileCategory::Pdf)
        );
        assert_eq!(
            FileCategory::from_path(Path::new("src/main.rs")),
            Some(FileCategory::Text)
        );
        assert_eq!(FileCategory::from_path(Path::new("Makefile")), None);
        assert_eq!(FileCategory::from_path(Path::new("archive.zip")), None);
    }

    #[test]
    fn remove_by_position() {
        let mut pending = PendingAttachments::new();
        pending.select(["a.py", "b.md", "c.png"]);
        assert_eq!(pending.remove(1), Some(PathBuf::from("b.md")));
        assert_eq!(pending.remove(5), None);
        assert_eq!(pending.names(), vec!["a.py", "c.png"]);
        pending.clear();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn text_file_round_trips() {
        let dir = scratch_dir("text");
        let path = dir.join("hello.txt");
        std::fs::write(&path, "hello\n").unwrap();

        let mut pending = PendingAttachments::new();
        pending.select([path.clone()]);
        let encoded = pending.encode_all().await;
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded[0].filename, "hello.txt");
        let decoded = STANDARD.decode(&encoded[0].content).unwrap();
        assert_eq!(decoded, b"hello\n");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn image_payload_is_bare_base64() {
        let dir = scratch_dir("image");
        let path = dir.join("pixel.png");
        let bytes = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff, 0x00];
        std::fs::write(&path, bytes).unwrap();

        let encoded = encode_file(&path, FileCategory::Image).await;
        assert!(!encoded.content.starts_with("data:"));
        assert!(!encoded.content.contains(','));
        assert_eq!(STANDARD.decode(&encoded.content).unwrap(), bytes);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unreadable_file_gets_placeholder() {
        let dir = scratch_dir("missing");
        let mut pending = PendingAttachments::new();
        pending.select([dir.join("gone.py"), dir.join("also-gone.md")]);
        let encoded = pending.encode_all().await;
        assert_eq!(encoded.len(), 2);
        let text = String::from_utf8(STANDARD.decode(&encoded[0].content).unwrap()).unwrap();
        assert!(text.starts_with("[Error reading file: "));
        assert_eq!(encoded[1].filename, "also-gone.md");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
