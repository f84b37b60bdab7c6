//! Rendering of the operator-supplied help document.

use pulldown_cmark::{html, Options, Parser};
use std::path::Path;
use tokio::fs;

use crate::error::{AppError, AppResult};

/// Convert Markdown to an HTML fragment.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Read and render the help file. Read on every request so edits show up
/// without a restart.
pub async fn render_help_file(path: &Path) -> AppResult<String> {
    let markdown = fs::read_to_string(path).await.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Help file could not be read");
        AppError::InternalError("Could not load the help file".to_string())
    })?;
    Ok(render_markdown(&markdown))
}
