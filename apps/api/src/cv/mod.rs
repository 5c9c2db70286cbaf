// CV Document & Compilation Manager
// Implements: document store with a single active CV, LaTeX compilation,
// artifact storage, template catalog and their HTTP handlers.
// Compilation failures are data (CompilationResult), never AppError.

pub mod artifacts;
pub mod compiler;
pub mod diagnostics;
pub mod handlers;
pub mod store;
pub mod templates;
