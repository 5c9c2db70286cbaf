//! Axum route handlers for the CV API.

use std::path::Path as FsPath;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cv::store::{DocumentUpdate, DEFAULT_DOCUMENT_NAME};
use crate::errors::AppError;
use crate::models::cv::{CompilationResult, CvDocument, CvStatus, CvTemplate};
use crate::state::AppState;

pub const ARTIFACT_ROUTE: &str = "/api/cv/pdf";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SourceRequest {
    #[serde(alias = "latex_source")]
    pub source_text: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    #[serde(alias = "latex_source")]
    pub source_text: String,
    #[serde(default)]
    pub save: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CvResponse {
    pub id: Uuid,
    pub name: String,
    pub artifact_url: Option<String>,
    pub is_active: bool,
    pub status: CvStatus,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CvDocument> for CvResponse {
    fn from(doc: CvDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            artifact_url: doc.artifact.as_deref().map(artifact_url),
            is_active: doc.is_active,
            status: doc.status,
            version: doc.version,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CvSourceResponse {
    pub id: Uuid,
    pub name: String,
    pub source_text: String,
    pub is_active: bool,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<CvDocument> for CvSourceResponse {
    fn from(doc: CvDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            source_text: doc.source_text,
            is_active: doc.is_active,
            version: doc.version,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CvListResponse {
    pub documents: Vec<CvResponse>,
    pub active_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CompileResponse {
    pub success: bool,
    pub artifact_url: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

impl From<CompilationResult> for CompileResponse {
    fn from(result: CompilationResult) -> Self {
        Self {
            success: result.success,
            artifact_url: result.artifact.as_deref().map(artifact_url),
            errors: result.errors,
            warnings: result.warnings,
            elapsed_ms: result.elapsed_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub preview_image: Option<String>,
}

impl From<&CvTemplate> for TemplateSummary {
    fn from(t: &CvTemplate) -> Self {
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
            category: t.category,
            preview_image: t.preview_image.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

pub fn artifact_url(artifact: &str) -> String {
    format!("{ARTIFACT_ROUTE}/{artifact}")
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/cv
pub async fn handle_get_active(
    State(state): State<AppState>,
) -> Result<Json<CvResponse>, AppError> {
    let doc = state.store.get_active().await?;
    Ok(Json(doc.into()))
}

/// GET /api/cv/list
pub async fn handle_list(State(state): State<AppState>) -> Json<CvListResponse> {
    let (documents, active_id) = state.store.list().await;
    Json(CvListResponse {
        documents: documents.into_iter().map(CvResponse::from).collect(),
        active_id,
    })
}

/// GET /api/cv/source
pub async fn handle_get_active_source(
    State(state): State<AppState>,
) -> Result<Json<CvSourceResponse>, AppError> {
    let doc = state.store.get_active().await?;
    Ok(Json(doc.into()))
}

/// GET /api/cv/source/:id
pub async fn handle_get_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CvSourceResponse>, AppError> {
    let id = parse_document_id(&id)?;
    let doc = state.store.get(id).await.ok_or_else(|| cv_not_found(id))?;
    Ok(Json(doc.into()))
}

/// PUT /api/cv/source
///
/// Replaces the active document's source, creating the document if none is active.
pub async fn handle_put_active_source(
    State(state): State<AppState>,
    Json(request): Json<SourceRequest>,
) -> Result<Json<CvSourceResponse>, AppError> {
    require_source(&request.source_text)?;
    let doc = state
        .store
        .commit_active_source(request.source_text, request.name, None)
        .await?;
    Ok(Json(doc.into()))
}

/// POST /api/cv/compile
///
/// Compiles arbitrary source. With `save`, a successful compile becomes the
/// active document's new source and artifact.
pub async fn handle_compile(
    State(state): State<AppState>,
    Json(request): Json<CompileRequest>,
) -> Result<Json<CompileResponse>, AppError> {
    require_source(&request.source_text)?;

    let result = state.compiler.compile(&request.source_text).await;

    if request.save && result.success {
        let doc = state
            .store
            .commit_active_source(request.source_text, request.name, result.artifact.clone())
            .await?;
        tracing::info!(
            "Saved compiled source to CV {} (version {})",
            doc.id,
            doc.version
        );
    }

    Ok(Json(result.into()))
}

/// POST /api/cv/:id/compile
///
/// Compiles a stored document and records the artifact on it.
pub async fn handle_compile_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CompileResponse>, AppError> {
    let id = parse_document_id(&id)?;
    let doc = state.store.get(id).await.ok_or_else(|| cv_not_found(id))?;

    let result = state.compiler.compile(&doc.source_text).await;

    if let Some(artifact) = &result.artifact {
        // The document may have been deleted while compiling; the artifact stays addressable.
        if state.store.register_artifact(id, artifact.clone()).await.is_none() {
            tracing::warn!(
                "CV {id} disappeared during compilation; artifact {artifact} not recorded"
            );
        }
    }

    Ok(Json(result.into()))
}

/// GET /api/cv/pdf/:filename
pub async fn handle_get_pdf(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let path = state
        .artifacts
        .resolve(&filename)
        .await
        .ok_or_else(|| AppError::NotFound("PDF not found".to_string()))?;
    serve_pdf(&path, &filename).await
}

/// GET /api/cv/download
///
/// Serves the active document's artifact as `<Name>_CV.pdf`. Read-only: no
/// document is materialised when none is active.
pub async fn handle_download(State(state): State<AppState>) -> Result<Response, AppError> {
    let doc = state
        .store
        .active()
        .await
        .ok_or_else(|| AppError::NotFound("No active CV".to_string()))?;
    let artifact = doc
        .artifact
        .as_deref()
        .ok_or_else(|| AppError::NotFound("No compiled CV available".to_string()))?;
    let path = state
        .artifacts
        .resolve(artifact)
        .await
        .ok_or_else(|| AppError::NotFound("PDF file not found".to_string()))?;

    serve_pdf(&path, &download_name(&doc.name)).await
}

/// GET /api/cv/templates
pub async fn handle_list_templates(State(state): State<AppState>) -> Json<Vec<TemplateSummary>> {
    Json(
        state
            .templates
            .list()
            .iter()
            .map(TemplateSummary::from)
            .collect(),
    )
}

/// GET /api/cv/templates/:id
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CvTemplate>, AppError> {
    state
        .templates
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))
}

/// POST /api/cv
pub async fn handle_create(
    State(state): State<AppState>,
    Json(request): Json<SourceRequest>,
) -> Result<(StatusCode, Json<CvResponse>), AppError> {
    require_source(&request.source_text)?;
    let name = request
        .name
        .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string());
    let doc = state.store.create(request.source_text, name).await?;
    Ok((StatusCode::CREATED, Json(doc.into())))
}

/// PUT /api/cv/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<DocumentUpdate>,
) -> Result<Json<CvResponse>, AppError> {
    let id = parse_document_id(&id)?;
    if let Some(source_text) = &update.source_text {
        require_source(source_text)?;
    }
    let doc = state
        .store
        .update(id, update)
        .await?
        .ok_or_else(|| cv_not_found(id))?;
    Ok(Json(doc.into()))
}

/// DELETE /api/cv/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_document_id(&id)?;
    if !state.store.delete(id).await? {
        return Err(cv_not_found(id));
    }
    Ok(Json(MessageResponse {
        success: true,
        message: "CV deleted successfully".to_string(),
    }))
}

/// POST /api/cv/:id/activate
pub async fn handle_activate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_document_id(&id)?;
    state
        .store
        .activate(id)
        .await?
        .ok_or_else(|| cv_not_found(id))?;
    Ok(Json(MessageResponse {
        success: true,
        message: "CV activated successfully".to_string(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Malformed ids cannot name a stored document, so they are reported as not found.
fn parse_document_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("CV {raw} not found")))
}

fn cv_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("CV {id} not found"))
}

fn require_source(source_text: &str) -> Result<(), AppError> {
    if source_text.trim().is_empty() {
        return Err(AppError::Validation(
            "source_text cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// `Jane Doe` → `Jane_Doe_CV.pdf`, restricted to header-safe characters.
fn download_name(doc_name: &str) -> String {
    let stem: String = doc_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "Resume".to_string() } else { stem };
    format!("{stem}_CV.pdf")
}

async fn serve_pdf(path: &FsPath, filename: &str) -> Result<Response, AppError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("PDF not found".to_string()));
        }
        Err(e) => return Err(AppError::Internal(e.into())),
    };

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/pdf"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
