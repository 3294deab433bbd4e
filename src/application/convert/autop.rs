//! Paragraph normalization applied to stored bodies before HTML to Markdown
//! conversion. Bodies written in the classic editor keep bare paragraphs
//! separated by blank lines; the converter only understands explicit markup.

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "details", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "iframe", "li", "main", "nav", "ol", "p", "pre", "script", "section", "style", "table", "ul",
    "video",
];

/// Wrap blank-line separated chunks in `<p>` unless they already open with a
/// block-level tag. Single newlines inside a wrapped chunk become `<br />`.
/// Blank lines inside `<pre>` do not split a chunk.
pub fn autop(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let paragraphs: Vec<String> = split_chunks(&normalized)
        .iter()
        .map(|chunk| chunk.trim())
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            if opens_with_block_tag(chunk) {
                chunk.to_string()
            } else {
                let lines: Vec<&str> = chunk.split('\n').map(str::trim_end).collect();
                format!("<p>{}</p>", lines.join("<br />\n"))
            }
        })
        .collect();

    if paragraphs.is_empty() {
        return String::new();
    }
    let mut out = paragraphs.join("\n\n");
    out.push('\n');
    out
}

fn split_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut open_pre = 0usize;

    for line in text.split('\n') {
        if line.trim().is_empty() && open_pre == 0 {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            continue;
        }

        let lower = line.to_ascii_lowercase();
        open_pre += lower.matches("<pre").count();
        open_pre = open_pre.saturating_sub(lower.matches("</pre>").count());

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn opens_with_block_tag(chunk: &str) -> bool {
    if chunk.starts_with("<!--") {
        return true;
    }
    let Some(rest) = chunk.strip_prefix('<') else {
        return false;
    };
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let name: String = rest
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}
