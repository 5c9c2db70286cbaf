use std::sync::Arc;

use crate::config::Config;
use crate::cv::artifacts::ArtifactStorage;
use crate::cv::compiler::Compiler;
use crate::cv::store::DocumentStore;
use crate::cv::templates::TemplateCatalog;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Sole owner of CV documents and the active-document pointer.
    pub store: Arc<DocumentStore>,
    /// Pluggable compiler. Default: LatexCompiler driving `LATEX_BIN`.
    pub compiler: Arc<dyn Compiler>,
    pub templates: Arc<TemplateCatalog>,
    pub artifacts: ArtifactStorage,
}
