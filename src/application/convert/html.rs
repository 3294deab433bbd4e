//! HTML to Markdown over an html5ever DOM.
//!
//! Elements with a Markdown equivalent are rewritten; elements without one
//! (tables, embeds, ...) are kept as raw HTML, which Markdown allows inline.

use html5ever::{
    ParseOpts, parse_document, serialize,
    serialize::{SerializeOpts, TraversalScope},
    tendril::TendrilSink,
};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use serde::Deserialize;

use super::{ConvertError, HtmlToMarkdown};

const RAW_BLOCK_TAGS: &[&str] = &[
    "table", "iframe", "video", "audio", "figure", "form", "object", "embed", "dl", "details",
    "canvas", "svg",
];
const RAW_INLINE_TAGS: &[&str] = &[
    "sup", "sub", "u", "mark", "abbr", "kbd", "small", "cite", "q", "ins",
];
const CONTAINER_TAGS: &[&str] = &[
    "div", "section", "article", "header", "footer", "main", "aside", "nav", "center", "address",
    "body", "html",
];
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "head", "noscript", "template", "title", "meta", "link",
];
const LOOSE_ITEM_TAGS: &[&str] = &["p", "pre", "blockquote", "div", "table"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingStyle {
    /// `## Heading`
    #[default]
    Atx,
    /// Underlined with `=` or `-`. Levels three and below fall back to ATX.
    Setext,
}

#[derive(Debug, Clone, Default)]
pub struct Html5everMarkdown {
    heading_style: HeadingStyle,
}

impl Html5everMarkdown {
    pub fn new(heading_style: HeadingStyle) -> Self {
        Self { heading_style }
    }
}

impl HtmlToMarkdown for Html5everMarkdown {
    fn to_markdown(&self, html: &str) -> Result<String, ConvertError> {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        let root = find_element(&dom.document, "body").unwrap_or_else(|| dom.document.clone());

        let writer = Writer {
            heading_style: self.heading_style,
        };
        let markdown = writer.children(&root)?;
        Ok(tidy(&markdown))
    }
}

struct Writer {
    heading_style: HeadingStyle,
}

impl Writer {
    fn children(&self, node: &Handle) -> Result<String, ConvertError> {
        let mut out = String::new();
        for child in node.children.borrow().iter() {
            let piece = self.node(child)?;
            push_piece(&mut out, &piece);
        }
        Ok(out)
    }

    fn node(&self, node: &Handle) -> Result<String, ConvertError> {
        match &node.data {
            NodeData::Text { contents } => {
                Ok(escape_text(&collapse_whitespace(&contents.borrow())))
            }
            NodeData::Element { name, .. } => self.element(node, &name.local),
            _ => Ok(String::new()),
        }
    }

    fn element(&self, node: &Handle, tag: &str) -> Result<String, ConvertError> {
        let markdown = match tag {
            "p" => block(&escape_line_starts(self.children(node)?.trim())),
            "br" => "  \n".to_string(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<usize>().unwrap_or(1);
                self.heading(level, &self.children(node)?)
            }
            "strong" | "b" => wrap_inline(&self.children(node)?, "**"),
            "em" | "i" => wrap_inline(&self.children(node)?, "*"),
            "del" | "s" | "strike" => wrap_inline(&self.children(node)?, "~~"),
            "code" => inline_code(&text_content(node)),
            "pre" => fenced_code(node),
            "a" => self.link(node)?,
            "img" => image(node),
            "hr" => block("---"),
            "blockquote" => quote(&self.children(node)?),
            "ul" => self.list(node, false)?,
            "ol" => self.list(node, true)?,
            tag if DROPPED_TAGS.contains(&tag) => String::new(),
            tag if RAW_BLOCK_TAGS.contains(&tag) => block(&outer_html(node)?),
            tag if RAW_INLINE_TAGS.contains(&tag) => outer_html(node)?,
            tag if CONTAINER_TAGS.contains(&tag) => block(self.children(node)?.trim()),
            _ => self.children(node)?,
        };
        Ok(markdown)
    }

    fn heading(&self, level: usize, content: &str) -> String {
        let text = content.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return String::new();
        }

        match (self.heading_style, level) {
            (HeadingStyle::Setext, 1 | 2) => {
                let underline = if level == 1 { "=" } else { "-" };
                let width = text.chars().count().max(3);
                block(&format!("{text}\n{}", underline.repeat(width)))
            }
            _ => block(&format!("{} {text}", "#".repeat(level))),
        }
    }

    fn link(&self, node: &Handle) -> Result<String, ConvertError> {
        let content = self.children(node)?;
        let Some(href) = attribute(node, "href").filter(|href| !href.trim().is_empty()) else {
            return Ok(content);
        };

        let text = content.trim();
        let (lead, trail) = edge_whitespace(&content);
        let is_autolink = text == href
            && ["http://", "https://", "mailto:"]
                .iter()
                .any(|scheme| href.starts_with(scheme));

        let link = if is_autolink {
            format!("<{href}>")
        } else {
            let title = attribute(node, "title")
                .map(|title| format!(" \"{}\"", title.replace('"', "\\\"")))
                .unwrap_or_default();
            format!("[{text}]({}{title})", link_destination(&href))
        };

        Ok(format!("{lead}{link}{trail}"))
    }

    fn list(&self, node: &Handle, ordered: bool) -> Result<String, ConvertError> {
        let start = attribute(node, "start")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(1);

        let mut items = Vec::new();
        let mut loose = false;
        for item in node
            .children
            .borrow()
            .iter()
            .filter(|child| element_name(child).as_deref() == Some("li"))
        {
            let marker = if ordered {
                format!("{}.", start + items.len())
            } else {
                "-".to_string()
            };

            let item_loose = has_child_element(item, LOOSE_ITEM_TAGS);
            loose |= item_loose;

            let content = tidy(&self.children(item)?);
            let lines: Vec<&str> = if item_loose {
                content.split('\n').collect()
            } else {
                content
                    .split('\n')
                    .filter(|line| !line.trim().is_empty())
                    .collect()
            };

            items.push(indent_item(&marker, &lines));
        }

        let separator = if loose { "\n\n" } else { "\n" };
        Ok(block(&items.join(separator)))
    }
}

fn indent_item(marker: &str, lines: &[&str]) -> String {
    let indent = " ".repeat(marker.len() + 1);
    let mut out = String::from(marker);
    for (index, line) in lines.iter().enumerate() {
        if index == 0 {
            out.push(' ');
            out.push_str(line);
        } else if line.is_empty() {
            out.push('\n');
        } else {
            out.push('\n');
            out.push_str(&indent);
            out.push_str(line);
        }
    }
    out
}

fn fenced_code(node: &Handle) -> String {
    let code = node
        .children
        .borrow()
        .iter()
        .find(|child| element_name(child).as_deref() == Some("code"))
        .cloned();

    let language = code
        .as_ref()
        .and_then(|code| attribute(code, "class"))
        .or_else(|| attribute(node, "class"))
        .and_then(|class| {
            class.split_whitespace().find_map(|name| {
                name.strip_prefix("language-")
                    .or_else(|| name.strip_prefix("lang-"))
                    .map(str::to_string)
            })
        })
        .unwrap_or_default();

    let text = text_content(node);
    let text = text.strip_suffix('\n').unwrap_or(&text);
    let fence = "`".repeat(longest_run(text, '`').max(2) + 1);

    format!("\n\n{fence}{language}\n{text}\n{fence}\n\n")
}

fn inline_code(text: &str) -> String {
    let text = text.replace('\n', " ");
    if text.is_empty() {
        return String::new();
    }

    let fence = "`".repeat(longest_run(&text, '`') + 1);
    let pad = if text.starts_with('`') || text.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{fence}{pad}{text}{pad}{fence}")
}

fn image(node: &Handle) -> String {
    let Some(src) = attribute(node, "src") else {
        return String::new();
    };
    let alt = attribute(node, "alt")
        .map(|alt| alt.replace('[', "\\[").replace(']', "\\]"))
        .unwrap_or_default();
    let title = attribute(node, "title")
        .map(|title| format!(" \"{}\"", title.replace('"', "\\\"")))
        .unwrap_or_default();
    format!("![{alt}]({}{title})", link_destination(&src))
}

fn quote(content: &str) -> String {
    let inner = tidy(content);
    if inner.is_empty() {
        return String::new();
    }

    let quoted = inner
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    block(&quoted)
}

fn wrap_inline(content: &str, marker: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_string();
    }
    let (lead, trail) = edge_whitespace(content);
    format!("{lead}{marker}{trimmed}{marker}{trail}")
}

fn edge_whitespace(content: &str) -> (&'static str, &'static str) {
    let lead = if content.starts_with(char::is_whitespace) {
        " "
    } else {
        ""
    };
    let trail = if content.ends_with(char::is_whitespace) {
        " "
    } else {
        ""
    };
    (lead, trail)
}

fn link_destination(url: &str) -> String {
    if url.contains([' ', '(', ')']) {
        format!("<{url}>")
    } else {
        url.to_string()
    }
}

fn block(content: &str) -> String {
    if content.trim().is_empty() {
        String::new()
    } else {
        format!("\n\n{content}\n\n")
    }
}

/// Append `piece`, keeping collapsed whitespace from doubling up at joins.
fn push_piece(out: &mut String, piece: &str) {
    if piece.is_empty() {
        return;
    }

    if piece.starts_with('\n') {
        while out.ends_with(' ') {
            out.pop();
        }
    }

    if piece.starts_with(' ') && (out.is_empty() || out.ends_with(char::is_whitespace)) {
        out.push_str(piece.trim_start_matches(' '));
    } else {
        out.push_str(piece);
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (at, ch) in text.char_indices() {
        let escape = match ch {
            '\\' | '*' | '_' | '`' | '[' | ']' | '<' => true,
            '&' => looks_like_entity(&text[at + 1..]),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Whether the text after an `&` would be read back as a character reference
/// (`copy;`, `#169;`, `#xA9;`).
fn looks_like_entity(rest: &str) -> bool {
    let Some(end) = rest.find(';') else {
        return false;
    };
    let name = &rest[..end];
    match name.strip_prefix('#') {
        Some(number) => match number.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|ch| ch.is_ascii_hexdigit()),
            None => !number.is_empty() && number.chars().all(|ch| ch.is_ascii_digit()),
        },
        None => {
            name.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic())
                && name.chars().all(|ch| ch.is_ascii_alphanumeric())
        }
    }
}

fn escape_line_starts(text: &str) -> String {
    text.split('\n')
        .map(escape_line_start)
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line_start(line: &str) -> String {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];

    match body.chars().next() {
        Some('#' | '>' | '+' | '-' | '=') => format!("{indent}\\{body}"),
        Some(first) if first.is_ascii_digit() => {
            let digits = body.bytes().take_while(u8::is_ascii_digit).count();
            match body.as_bytes().get(digits) {
                Some(b'.' | b')') => {
                    format!("{indent}{}\\{}", &body[..digits], &body[digits..])
                }
                _ => line.to_string(),
            }
        }
        _ => line.to_string(),
    }
}

/// Normalize blank lines outside fenced code: whitespace-only lines become
/// empty, runs of blank lines collapse to one, and the edges are trimmed.
fn tidy(markdown: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut fence: Option<String> = None;
    let mut previous_blank = true;

    for line in markdown.split('\n') {
        let trimmed = line.trim_start();

        if let Some(marker) = &fence {
            lines.push(line);
            if trimmed.trim_end() == marker.as_str() {
                fence = None;
            }
            continue;
        }

        if trimmed.starts_with("```") {
            fence = Some(trimmed.chars().take_while(|ch| *ch == '`').collect());
            lines.push(line);
            previous_blank = false;
            continue;
        }

        if line.trim().is_empty() {
            if !previous_blank {
                lines.push("");
                previous_blank = true;
            }
            continue;
        }

        lines.push(line);
        previous_blank = false;
    }

    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines.join("\n")
}

fn longest_run(text: &str, needle: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == needle {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn outer_html(node: &Handle) -> Result<String, ConvertError> {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    let serializable = SerializableHandle::from(node.clone());
    serialize(&mut output, &serializable, opts).map_err(|err| ConvertError::Html {
        message: format!("serialization failed: {err}"),
    })?;

    String::from_utf8(output).map_err(|err| ConvertError::Html {
        message: format!("serialized html is not utf-8: {err}"),
    })
}

fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { name, .. } if &*name.local == "br" => out.push('\n'),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

fn element_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attribute(node: &Handle, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == key)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn has_child_element(node: &Handle, tags: &[&str]) -> bool {
    node.children.borrow().iter().any(|child| {
        element_name(child)
            .as_deref()
            .is_some_and(|name| tags.contains(&name))
    })
}

fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    if element_name(node).as_deref() == Some(tag) {
        return Some(node.clone());
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::convert::MarkdownRenderer;

    fn convert(html: &str) -> String {
        Html5everMarkdown::default()
            .to_markdown(html)
            .expect("conversion succeeds")
    }

    #[test]
    fn headings_use_atx_by_default() {
        assert_eq!(convert("<h2>Section  title</h2>"), "## Section title");
    }

    #[test]
    fn setext_headings_underline_top_levels_only() {
        let converter = Html5everMarkdown::new(HeadingStyle::Setext);
        let markdown = converter
            .to_markdown("<h1>Top</h1><h3>Deep</h3>")
            .expect("conversion succeeds");
        assert_eq!(markdown, "Top\n===\n\n### Deep");
    }

    #[test]
    fn paragraphs_and_inline_formatting() {
        let markdown = convert(
            "<p>Hello <strong>bold</strong> and <em>soft</em> <code>x_y</code>.</p><p>Next</p>",
        );
        assert_eq!(markdown, "Hello **bold** and *soft* `x_y`.\n\nNext");
    }

    #[test]
    fn text_escapes_markdown_syntax() {
        assert_eq!(
            convert("<p>snake_case *star* [x]</p>"),
            "snake\\_case \\*star\\* \\[x\\]"
        );
        assert_eq!(convert("<p># not a heading</p>"), "\\# not a heading");
        assert_eq!(convert("<p>1. not a list</p>"), "1\\. not a list");
    }

    #[test]
    fn literal_entity_text_stays_literal() {
        assert_eq!(
            convert("<p>&amp;copy; &amp;#169; &amp;#xA9;</p>"),
            "\\&copy; \\&#169; \\&#xA9;"
        );
        assert_eq!(convert("<p>Tom &amp; Jerry &amp;c</p>"), "Tom & Jerry &c");

        let rendered = crate::application::convert::ComrakMarkdown::new()
            .to_html(&convert("<p>&amp;copy;</p>"))
            .expect("render succeeds");
        assert_eq!(rendered.trim(), "<p>&amp;copy;</p>");
    }

    #[test]
    fn links_and_images() {
        assert_eq!(
            convert(r#"<p><a href="https://example.com" title="Ex">site</a></p>"#),
            r#"[site](https://example.com "Ex")"#
        );
        assert_eq!(
            convert(r#"<p><a href="https://example.com">https://example.com</a></p>"#),
            "<https://example.com>"
        );
        assert_eq!(
            convert(r#"<p><img src="/a.png" alt="Alt"></p>"#),
            "![Alt](/a.png)"
        );
    }

    #[test]
    fn nested_lists_stay_tight() {
        let markdown = convert("<ul><li>One<ul><li>Inner</li></ul></li><li>Two</li></ul>");
        assert_eq!(markdown, "- One\n  - Inner\n- Two");
    }

    #[test]
    fn ordered_lists_honor_start() {
        assert_eq!(
            convert(r#"<ol start="3"><li>c</li><li>d</li></ol>"#),
            "3. c\n4. d"
        );
    }

    #[test]
    fn code_blocks_keep_language_and_blank_lines() {
        let markdown = convert(
            "<pre><code class=\"language-rust\">fn main() {\n\n\n    let x = 1;\n}\n</code></pre>",
        );
        assert_eq!(markdown, "```rust\nfn main() {\n\n\n    let x = 1;\n}\n```");
    }

    #[test]
    fn blockquotes_prefix_every_line() {
        assert_eq!(
            convert("<blockquote><p>One</p><p>Two</p></blockquote>"),
            "> One\n>\n> Two"
        );
    }

    #[test]
    fn unsupported_elements_are_kept_as_html() {
        let markdown = convert("<table><tbody><tr><td>1</td></tr></tbody></table>");
        assert!(markdown.starts_with("<table>"));
        assert!(markdown.contains("<td>1</td>"));
    }

    #[test]
    fn scripts_are_dropped() {
        assert_eq!(convert("<p>Keep</p><script>alert(1)</script>"), "Keep");
    }

    #[test]
    fn line_breaks_become_hard_breaks() {
        assert_eq!(convert("<p>one<br>two</p>"), "one  \ntwo");
    }
}
