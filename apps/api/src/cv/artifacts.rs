//! Permanent storage for compiled PDFs.
//!
//! A compile writes into a scratch directory; `commit` is the only way output
//! becomes visible here. Files are staged under a hidden `.partial` name and
//! renamed into place, so readers never observe a half-copied PDF.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

const ARTIFACT_PREFIX: &str = "resume_";
const ARTIFACT_EXT: &str = ".pdf";
const MAX_NAME_ATTEMPTS: usize = 4;

#[derive(Debug, Clone)]
pub struct ArtifactStorage {
    dir: PathBuf,
}

impl ArtifactStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Copies `source` into storage under a fresh `resume_<hex>.pdf` name and
    /// returns that name.
    pub async fn commit(&self, source: &Path) -> io::Result<String> {
        let name = self.fresh_name().await?;
        self.commit_as(source, name).await
    }

    /// Copies `source` into storage under the fixed `name`, replacing any
    /// earlier file of that name.
    pub async fn commit_as(&self, source: &Path, name: impl Into<String>) -> io::Result<String> {
        let name = name.into();
        if !is_plain_name(&name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{name}' is not a plain artifact name"),
            ));
        }
        let staged = self.dir.join(format!(".{name}.partial"));
        let target = self.dir.join(&name);

        if let Err(e) = tokio::fs::copy(source, &staged).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&staged, &target).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e);
        }

        debug!("Committed artifact {}", target.display());
        Ok(name)
    }

    /// Returns the on-disk path for `name` if it is a plain artifact name and
    /// the file exists.
    pub async fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !is_plain_name(name) {
            return None;
        }
        let path = self.dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    async fn fresh_name(&self) -> io::Result<String> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let hex = Uuid::new_v4().simple().to_string();
            let name = format!("{ARTIFACT_PREFIX}{}{ARTIFACT_EXT}", &hex[..8]);
            if !tokio::fs::try_exists(self.dir.join(&name)).await? {
                return Ok(name);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not allocate a unique artifact name",
        ))
    }
}

/// Accepts names made of ASCII alphanumerics, `-`, `_` and `.`, not starting with a dot.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names() {
        assert!(is_plain_name("resume_1a2b3c4d.pdf"));
        assert!(is_plain_name("Jane_Doe_CV.pdf"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name("../secret.pdf"));
        assert!(!is_plain_name("a/b.pdf"));
        assert!(!is_plain_name(".resume_1a2b3c4d.pdf.partial"));
        assert!(!is_plain_name("resume 1.pdf"));
    }

    #[tokio::test]
    async fn test_commit_then_resolve() {
        let scratch = tempfile::tempdir().unwrap();
        let store_dir = tempfile::tempdir().unwrap();
        let pdf = scratch.path().join("resume.pdf");
        std::fs::write(&pdf, b"%PDF-1.5 test").unwrap();

        let storage = ArtifactStorage::new(store_dir.path());
        let name = storage.commit(&pdf).await.unwrap();

        assert!(name.starts_with("resume_") && name.ends_with(".pdf"));
        assert_eq!(name.len(), "resume_".len() + 8 + ".pdf".len());
        let resolved = storage.resolve(&name).await.unwrap();
        assert_eq!(std::fs::read(resolved).unwrap(), b"%PDF-1.5 test");

        // No staging leftovers.
        let entries: Vec<_> = std::fs::read_dir(store_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_missing_source_leaves_nothing() {
        let store_dir = tempfile::tempdir().unwrap();
        let storage = ArtifactStorage::new(store_dir.path());

        assert!(storage
            .commit(&store_dir.path().join("nope.pdf"))
            .await
            .is_err());
        assert_eq!(std::fs::read_dir(store_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_commit_as_replaces_in_place() {
        let scratch = tempfile::tempdir().unwrap();
        let store_dir = tempfile::tempdir().unwrap();
        let storage = ArtifactStorage::new(store_dir.path());
        let pdf = scratch.path().join("static.pdf");

        std::fs::write(&pdf, b"first").unwrap();
        let name = storage.commit_as(&pdf, "static_cv.pdf").await.unwrap();
        std::fs::write(&pdf, b"second").unwrap();
        let again = storage.commit_as(&pdf, "static_cv.pdf").await.unwrap();
        assert_eq!(again, name);

        assert_eq!(std::fs::read_dir(store_dir.path()).unwrap().count(), 1);
        let resolved = storage.resolve(&name).await.unwrap();
        assert_eq!(std::fs::read(resolved).unwrap(), b"second");

        assert!(storage.commit_as(&pdf, "../escape.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_rejects_missing_and_traversal() {
        let store_dir = tempfile::tempdir().unwrap();
        let pdf_dir = store_dir.path().join("pdf");
        std::fs::create_dir_all(&pdf_dir).unwrap();
        let storage = ArtifactStorage::new(&pdf_dir);
        std::fs::write(store_dir.path().join("outside.pdf"), b"x").unwrap();

        assert!(storage.resolve("resume_deadbeef.pdf").await.is_none());
        assert!(storage.resolve("../outside.pdf").await.is_none());
    }
}
