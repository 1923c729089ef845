use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BOLD: Regex = Regex::new(r"\*\*([^*]+)\*\*").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*([^*]+)\*").unwrap();
}

/// Renders the constrained markdown subset to HTML.
///
/// All raw text is HTML-escaped first, so markup injected into the result
/// can never pass through; only the substitutions below produce tags.
/// Supported: `#`/`##`/`###` headers, `**bold**`, `*italic*`, line breaks.
pub(super) fn render_markdown(text: &str) -> String {
    let escaped = escape_html(text);
    let mut lines = Vec::new();
    for line in escaped.lines() {
        if let Some(rest) = line.strip_prefix("### ") {
            lines.push(format!("<h3>{}</h3>", inline(rest)));
        } else if let Some(rest) = line.strip_prefix("## ") {
            lines.push(format!("<h2>{}</h2>", inline(rest)));
        } else if let Some(rest) = line.strip_prefix("# ") {
            lines.push(format!("<h1>{}</h1>", inline(rest)));
        } else if line.is_empty() {
            lines.push(String::new());
        } else {
            lines.push(format!("{}<br>", inline(line)));
        }
    }
    lines.join("\n")
}

/// Bold before italic, so `**` pairs are not consumed as two `*`.
fn inline(line: &str) -> String {
    let bolded = BOLD.replace_all(line, "<strong>$1</strong>");
    ITALIC.replace_all(&bolded, "<em>$1</em>").into_owned()
}

pub(super) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_and_emphasis() {
        let html = render_markdown("# Title\nplain **bold** and *soft*");
        assert_eq!(
            html,
            "<h1>Title</h1>\nplain <strong>bold</strong> and <em>soft</em><br>"
        );
    }

    #[test]
    fn raw_html_never_passes_through() {
        let html = render_markdown("<script>alert('x')</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
