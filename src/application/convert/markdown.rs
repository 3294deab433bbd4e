use ammonia::Builder as AmmoniaBuilder;
use comrak::{Arena, format_html, options::Options, parse_document};

use super::{ConvertError, MarkdownRenderer};

/// Comrak-based renderer with the "extra" feature set: tables, footnotes,
/// definition lists, strikethrough, autolinks and task lists. Raw HTML in the
/// source passes through unless sanitization is requested.
pub struct ComrakMarkdown {
    options: Options<'static>,
    sanitizer: Option<AmmoniaBuilder<'static>>,
}

impl ComrakMarkdown {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: None,
        }
    }

    /// Clean rendered HTML with ammonia's default allow-list.
    pub fn sanitized() -> Self {
        Self {
            options: default_options(),
            sanitizer: Some(AmmoniaBuilder::default()),
        }
    }
}

impl Default for ComrakMarkdown {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer for ComrakMarkdown {
    fn to_html(&self, markdown: &str) -> Result<String, ConvertError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| ConvertError::Markdown {
            message: err.to_string(),
        })?;

        Ok(match &self.sanitizer {
            Some(sanitizer) => sanitizer.clean(&html).to_string(),
            None => html,
        })
    }
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.description_lists = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_emphasis() {
        let html = ComrakMarkdown::new()
            .to_html("# Title\n\nSome *emphasis* and **strong** text.\n")
            .expect("render succeeds");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains("<strong>strong</strong>"));
    }

    #[test]
    fn renders_tables_and_footnotes() {
        let source = "| a | b |\n|---|---|\n| 1 | 2 |\n\nNote[^1].\n\n[^1]: Footnote body.\n";
        let html = ComrakMarkdown::new().to_html(source).expect("render succeeds");
        assert!(html.contains("<table>"));
        assert!(html.contains("footnote"));
    }

    #[test]
    fn raw_html_passes_through_unless_sanitized() {
        let source = "<span onclick=\"x()\">hi</span>\n";

        let raw = ComrakMarkdown::new().to_html(source).expect("render succeeds");
        assert!(raw.contains("onclick"));

        let clean = ComrakMarkdown::sanitized()
            .to_html(source)
            .expect("render succeeds");
        assert!(!clean.contains("onclick"));
        assert!(clean.contains("hi"));
    }
}
