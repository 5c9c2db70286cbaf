use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and the configured LaTeX toolchain.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "folio-api",
        "latex": {
            "program": state.config.latex.program,
            "passes": state.config.latex.passes,
            "timeout_secs": state.config.latex.timeout.as_secs(),
        }
    }))
}
