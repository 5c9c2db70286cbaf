use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// On-disk layout: one `.tex` per document under `source/`, compiled PDFs under `pdf/`.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub source_dir: PathBuf,
    pub pdf_dir: PathBuf,
}

impl StorageLayout {
    pub fn under(root: &Path) -> Self {
        Self {
            source_dir: root.join("source"),
            pdf_dir: root.join("pdf"),
        }
    }
}

/// Creates the storage directories if they are missing.
pub async fn prepare_storage(root: &Path) -> Result<StorageLayout> {
    info!("Preparing CV storage under {}", root.display());

    let layout = StorageLayout::under(root);
    for dir in [&layout.source_dir, &layout.pdf_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
    }

    info!("CV storage ready");
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prepare_storage_creates_both_dirs() {
        let root = tempfile::tempdir().unwrap();
        let layout = prepare_storage(&root.path().join("cv")).await.unwrap();
        assert!(layout.source_dir.is_dir());
        assert!(layout.pdf_dir.is_dir());

        // Second call on existing directories is a no-op.
        prepare_storage(&root.path().join("cv")).await.unwrap();
    }
}
