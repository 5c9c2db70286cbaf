use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publication state of a CV document. Exactly the active document is `Published`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CvStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvDocument {
    pub id: Uuid,
    pub name: String,
    pub source_text: String,
    /// File name of the last successful compile inside artifact storage.
    pub artifact: Option<String>,
    pub is_active: bool,
    pub status: CvStatus,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CvDocument {
    pub fn new(name: impl Into<String>, source_text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source_text: source_text.into(),
            artifact: None,
            is_active: false,
            status: CvStatus::Draft,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Flips the active flag and keeps `status` in step with it.
    pub(crate) fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.status = if active {
            CvStatus::Published
        } else {
            CvStatus::Draft
        };
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CvTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub preview_image: Option<String>,
    pub source_text: String,
}

/// Outcome of one compile call. Never persisted on its own.
///
/// `success` holds iff `artifact` is set, and then `errors` is empty.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompilationResult {
    pub success: bool,
    pub artifact: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

impl CompilationResult {
    pub fn succeeded(artifact: String, warnings: Vec<String>, elapsed_ms: u64) -> Self {
        Self {
            success: true,
            artifact: Some(artifact),
            errors: Vec::new(),
            warnings,
            elapsed_ms,
        }
    }

    pub fn failed(errors: Vec<String>, warnings: Vec<String>, elapsed_ms: u64) -> Self {
        Self {
            success: false,
            artifact: None,
            errors,
            warnings,
            elapsed_ms,
        }
    }
}
