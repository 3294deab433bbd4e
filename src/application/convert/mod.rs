//! Conversions between the native rich markup (HTML) and Markdown.
//!
//! Both directions are delegated to parsers from the ecosystem: comrak reads
//! Markdown, html5ever reads HTML. The controller only sees the two traits.

mod autop;
mod html;
mod markdown;

pub use autop::autop;
pub use html::{HeadingStyle, Html5everMarkdown};
pub use markdown::ComrakMarkdown;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("html conversion failed: {message}")]
    Html { message: String },
}

/// Markdown to native markup.
pub trait MarkdownRenderer: Send + Sync {
    fn to_html(&self, markdown: &str) -> Result<String, ConvertError>;
}

/// Native markup to Markdown.
pub trait HtmlToMarkdown: Send + Sync {
    fn to_markdown(&self, html: &str) -> Result<String, ConvertError>;
}
