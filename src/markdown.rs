//! Markdown processing for artifact references.
//!
//! Image scanning over raw source, the bidirectional `disk::` / proxy URL
//! rewriter built on it, and an HTML render pass using comrak with GFM
//! extensions.

mod images;
mod renderer;
mod rewriter;

pub use renderer::MarkdownRenderer;
pub use rewriter::PathRewriter;
