//! Reference file library.
//!
//! Every reference document identifier names a markdown file
//! (`{root}/{identifier}.md`) holding the full parsed reference table. The
//! similarity store only holds chunks of these files; the chat layer attaches
//! the whole file for each retrieved identifier.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{RagError, Result};

const EXTENSION: &str = "md";

/// A directory of reference markdown files keyed by identifier.
#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    root: PathBuf,
}

/// One reference file loaded from the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFile {
    /// Identifier of the file (its stem).
    pub document_id: String,
    /// Full file text.
    pub text: String,
}

impl ReferenceLibrary {
    /// Create a library rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The library's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // Identifiers come from store rows and must name one file under the root.
    fn path_for(&self, document_id: &str) -> Result<PathBuf> {
        let mut components = Path::new(document_id).components();
        let single_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_name || document_id.contains(['/', '\\']) {
            warn!(document.id = document_id, "rejected reference identifier");
            return Err(RagError::InvalidIdentifier(document_id.to_string()));
        }
        Ok(self.root.join(format!("{document_id}.{EXTENSION}")))
    }

    /// Read the full text for `document_id`.
    ///
    /// A blank identifier or a missing file yields an empty string; a missing
    /// file is logged as a warning.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidIdentifier`] if `document_id` holds a path
    /// separator or a `.`/`..` component, and [`RagError::IoError`] if an
    /// existing file cannot be read.
    pub async fn read(&self, document_id: &str) -> Result<String> {
        if document_id.trim().is_empty() {
            return Ok(String::new());
        }

        let path = self.path_for(document_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "missing reference file");
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List identifiers of all reference files, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IoError`] if the root directory cannot be read.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }

        ids.sort();
        debug!(root = %self.root.display(), count = ids.len(), "listed reference files");
        Ok(ids)
    }

    /// Load every reference file in the library, sorted by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IoError`] on the first unreadable file.
    pub async fn load_all(&self) -> Result<Vec<ReferenceFile>> {
        let mut files = Vec::new();
        for document_id in self.list().await? {
            let text = tokio::fs::read_to_string(self.path_for(&document_id)?).await?;
            files.push(ReferenceFile { document_id, text });
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_existing_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("IFI_100.md"), "| size | pitch |").unwrap();
        let library = ReferenceLibrary::new(dir.path());

        assert_eq!(library.read("IFI_100").await.unwrap(), "| size | pitch |");
        assert_eq!(library.read("IFI_404").await.unwrap(), "");
        assert_eq!(library.read("  ").await.unwrap(), "");
    }

    #[tokio::test]
    async fn lists_only_markdown_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "b").unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();
        std::fs::create_dir(dir.path().join("nested.md")).unwrap();
        let library = ReferenceLibrary::new(dir.path());

        assert_eq!(library.list().await.unwrap(), vec!["a", "b"]);

        let files = library.load_all().await.unwrap();
        assert_eq!(files[0], ReferenceFile { document_id: "a".into(), text: "a".into() });
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn identifiers_cannot_leave_the_root() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("refs");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(parent.path().join("secret.md"), "outside").unwrap();
        std::fs::create_dir(root.join("a")).unwrap();
        std::fs::write(root.join("a").join("b.md"), "nested").unwrap();
        let library = ReferenceLibrary::new(&root);

        for id in ["../secret", "a/b", "a\\b", "..", ".", "/etc/passwd"] {
            let result = library.read(id).await;
            assert!(
                matches!(result, Err(RagError::InvalidIdentifier(ref bad)) if bad == id),
                "{id} was accepted"
            );
        }
        assert_eq!(library.read("IFI_1.v2").await.unwrap(), "");
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let library = ReferenceLibrary::new("/definitely/not/a/reference/dir");
        assert!(library.list().await.is_err());
    }
}
