//! In-process store for CV documents.
//!
//! # Invariants
//! - At most one document has `is_active = true`, and `active_id` names it.
//! - `version` grows by exactly one per source replacement.
//! - A document's backing `.tex` file is written before the record changes,
//!   so an I/O failure leaves the record as it was.
//!
//! Every operation runs inside a single `tokio::sync::Mutex` critical section,
//! file writes included.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::cv::CvDocument;

pub const DEFAULT_DOCUMENT_NAME: &str = "Resume";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("source file I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Partial update applied by [`DocumentStore::update`]. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default, alias = "latex_source")]
    pub source_text: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Default)]
struct StoreInner {
    documents: HashMap<Uuid, CvDocument>,
    /// Creation order, for stable listings.
    order: Vec<Uuid>,
    active_id: Option<Uuid>,
}

impl StoreInner {
    /// Makes `id` the only active document. Siblings that flip are touched.
    fn activate(&mut self, id: Uuid) {
        for (doc_id, doc) in self.documents.iter_mut() {
            let should_be_active = *doc_id == id;
            if doc.is_active != should_be_active {
                doc.set_active(should_be_active);
                doc.touch();
            }
        }
        self.active_id = Some(id);
    }

    fn deactivate(&mut self, id: Uuid) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.set_active(false);
        }
        if self.active_id == Some(id) {
            self.active_id = None;
        }
    }

    fn active(&self) -> Option<&CvDocument> {
        self.active_id.and_then(|id| self.documents.get(&id))
    }
}

pub struct DocumentStore {
    source_dir: PathBuf,
    default_source: String,
    inner: Mutex<StoreInner>,
}

impl DocumentStore {
    /// `default_source` seeds the document materialised by [`get_active`](Self::get_active).
    pub fn new(source_dir: impl Into<PathBuf>, default_source: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            default_source: default_source.into(),
            inner: Mutex::new(StoreInner::default()),
        }
    }

    pub async fn create(
        &self,
        source_text: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<CvDocument, StoreError> {
        let mut inner = self.inner.lock().await;
        let doc = CvDocument::new(name, source_text);
        self.insert(&mut inner, doc.clone()).await?;
        info!("Created CV document {} ({})", doc.id, doc.name);
        Ok(doc)
    }

    pub async fn get(&self, id: Uuid) -> Option<CvDocument> {
        self.inner.lock().await.documents.get(&id).cloned()
    }

    /// All documents in creation order, plus the active id.
    pub async fn list(&self) -> (Vec<CvDocument>, Option<Uuid>) {
        let inner = self.inner.lock().await;
        let documents = inner
            .order
            .iter()
            .filter_map(|id| inner.documents.get(id).cloned())
            .collect();
        (documents, inner.active_id)
    }

    /// The active document, without materialising a default.
    pub async fn active(&self) -> Option<CvDocument> {
        self.inner.lock().await.active().cloned()
    }

    /// Returns the active document. When none is active, a document is created
    /// from the default template and activated first.
    pub async fn get_active(&self) -> Result<CvDocument, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(doc) = inner.active() {
            return Ok(doc.clone());
        }

        let mut doc = CvDocument::new(DEFAULT_DOCUMENT_NAME, self.default_source.clone());
        doc.set_active(true);
        self.insert(&mut inner, doc.clone()).await?;
        inner.activate(doc.id);
        info!("No active CV; materialised default document {}", doc.id);
        Ok(doc)
    }

    /// Applies `update` to document `id`. Returns `Ok(None)` for an unknown id.
    pub async fn update(
        &self,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Option<CvDocument>, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.documents.contains_key(&id) {
            return Ok(None);
        }

        if let Some(source_text) = &update.source_text {
            self.write_source(id, source_text).await?;
        }

        match update.is_active {
            Some(true) => inner.activate(id),
            Some(false) => inner.deactivate(id),
            None => {}
        }

        let Some(doc) = inner.documents.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(source_text) = update.source_text {
            doc.source_text = source_text;
            doc.version += 1;
        }
        if let Some(name) = update.name {
            doc.name = name;
        }
        doc.touch();

        debug!("Updated CV document {} (version {})", doc.id, doc.version);
        Ok(Some(doc.clone()))
    }

    pub async fn activate(&self, id: Uuid) -> Result<Option<CvDocument>, StoreError> {
        self.update(
            id,
            DocumentUpdate {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    /// Removes document `id` and its source file. Returns `false` for an unknown id.
    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.documents.contains_key(&id) {
            return Ok(false);
        }

        match tokio::fs::remove_file(self.source_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        inner.documents.remove(&id);
        inner.order.retain(|doc_id| *doc_id != id);
        if inner.active_id == Some(id) {
            inner.active_id = None;
            info!("Deleted active CV document {id}; no document is active now");
        } else {
            info!("Deleted CV document {id}");
        }
        Ok(true)
    }

    /// Records a compiled artifact on document `id`.
    pub async fn register_artifact(&self, id: Uuid, artifact: String) -> Option<CvDocument> {
        let mut inner = self.inner.lock().await;
        let doc = inner.documents.get_mut(&id)?;
        doc.artifact = Some(artifact);
        doc.touch();
        Some(doc.clone())
    }

    /// Replaces the active document's source, creating and activating a
    /// document when none is active. `artifact`, when given, is registered in
    /// the same critical section.
    pub async fn commit_active_source(
        &self,
        source_text: String,
        name: Option<String>,
        artifact: Option<String>,
    ) -> Result<CvDocument, StoreError> {
        let mut inner = self.inner.lock().await;

        if let Some(id) = inner.active_id {
            if let Some(doc) = inner.documents.get_mut(&id) {
                self.write_source(id, &source_text).await?;
                doc.source_text = source_text;
                doc.version += 1;
                if let Some(name) = name {
                    doc.name = name;
                }
                if artifact.is_some() {
                    doc.artifact = artifact;
                }
                doc.touch();
                debug!(
                    "Replaced source of active CV {} (version {})",
                    id, doc.version
                );
                return Ok(doc.clone());
            }
        }

        let mut doc = CvDocument::new(
            name.unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string()),
            source_text,
        );
        doc.artifact = artifact;
        doc.set_active(true);
        self.insert(&mut inner, doc.clone()).await?;
        inner.activate(doc.id);
        info!("Created and activated CV document {}", doc.id);
        Ok(doc)
    }

    /// Publishes a pre-built artifact as the active document. Only acts on an
    /// empty store; returns `None` otherwise.
    pub async fn seed_published(
        &self,
        name: impl Into<String>,
        artifact: String,
    ) -> Result<Option<CvDocument>, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.documents.is_empty() {
            return Ok(None);
        }

        let mut doc = CvDocument::new(name, String::new());
        doc.artifact = Some(artifact);
        doc.set_active(true);
        self.insert(&mut inner, doc.clone()).await?;
        inner.activate(doc.id);
        info!("Seeded published CV {} from pre-built artifact", doc.id);
        Ok(Some(doc))
    }

    fn source_path(&self, id: Uuid) -> PathBuf {
        source_file(&self.source_dir, id)
    }

    async fn write_source(&self, id: Uuid, source_text: &str) -> io::Result<()> {
        tokio::fs::write(self.source_path(id), source_text).await
    }

    /// Writes the backing file, then makes `doc` visible.
    async fn insert(&self, inner: &mut StoreInner, doc: CvDocument) -> Result<(), StoreError> {
        self.write_source(doc.id, &doc.source_text).await?;
        inner.order.push(doc.id);
        inner.documents.insert(doc.id, doc);
        Ok(())
    }
}

fn source_file(dir: &Path, id: Uuid) -> PathBuf {
    dir.join(format!("{id}.tex"))
}
