//! Agent-supplied HTML documents.
//!
//! The document is never interpreted by this process. It is kept as an
//! isolated `srcdoc` with a scripts-only sandbox, and the terminal shows a
//! plain-text preview of it.

use serde_json::Value;

pub const DEFAULT_TITLE: &str = "Dynamic HTML Content";
/// Scripts may run; same-origin access, top navigation and forms stay off.
pub const SANDBOX: &str = "allow-scripts";

const BLOCK_TAGS: [&str; 16] = [
    "p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "table", "ul", "ol", "section", "hr",
];

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedDocument {
    pub title: String,
    pub srcdoc: String,
}

impl EmbeddedDocument {
    /// `None` when `content` is missing, empty or not a string.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let srcdoc = payload
            .get("content")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())?
            .to_string();
        let title = payload
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();
        Some(Self { title, srcdoc })
    }

    pub fn sandbox(&self) -> &'static str {
        SANDBOX
    }

    /// Markup for embedding the document in a browser.
    pub fn iframe_markup(&self) -> String {
        format!(
            "<iframe sandbox=\"{}\" title=\"{}\" srcdoc=\"{}\" style=\"width:100%;height:100%;border:none\"></iframe>",
            SANDBOX,
            escape_attribute(&self.title),
            escape_attribute(&self.srcdoc)
        )
    }

    pub fn text_preview(&self) -> String {
        html_to_text(&self.srcdoc)
    }
}

fn escape_attribute(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip tags, drop script and style bodies, decode common entities and
/// break lines at block elements.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::new();
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            // Unterminated tag: keep the remainder as text.
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };

        let tag = &after[..close];
        let name = tag_name(tag);
        rest = &after[close + 1..];

        if !tag.starts_with('/') && (name == "script" || name == "style") {
            let end = format!("</{}", name);
            rest = match rest.to_ascii_lowercase().find(&end) {
                Some(pos) => rest[pos..].find('>').map_or("", |gt| &rest[pos + gt + 1..]),
                None => "",
            };
            continue;
        }

        if BLOCK_TAGS.contains(&name.as_str()) && !out.ends_with('\n') && !out.is_empty() {
            out.push('\n');
        }
    }
    out.push_str(rest);

    decode_entities(&out)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').filter(|&semi| semi <= 8).and_then(|semi| {
            let entity = &after[..semi];
            decode_entity(entity).map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_defaults_title() {
        let doc = EmbeddedDocument::from_payload(&json!({"content": "<p>hi</p>"})).unwrap();
        assert_eq!(doc.title, DEFAULT_TITLE);
        assert_eq!(doc.sandbox(), "allow-scripts");
    }

    #[test]
    fn test_from_payload_rejects_missing_content() {
        assert!(EmbeddedDocument::from_payload(&json!({"title": "x"})).is_none());
        assert!(EmbeddedDocument::from_payload(&json!({"content": 5})).is_none());
        assert!(EmbeddedDocument::from_payload(&json!({"content": ""})).is_none());
    }

    #[test]
    fn test_iframe_markup_is_sandboxed_and_escaped() {
        let doc = EmbeddedDocument {
            title: "Calls \"today\"".to_string(),
            srcdoc: "<b class=\"x\">A & B</b>".to_string(),
        };
        let markup = doc.iframe_markup();
        assert!(markup.starts_with("<iframe sandbox=\"allow-scripts\""));
        assert!(!markup.contains("allow-same-origin"));
        assert!(markup.contains("title=\"Calls &quot;today&quot;\""));
        assert!(markup.contains("srcdoc=\"&lt;b class=&quot;x&quot;&gt;A &amp; B&lt;/b&gt;\""));
    }

    #[test]
    fn test_preview_strips_scripts_and_styles() {
        let text = html_to_text(
            "<style>p{color:red}</style><h1>Report</h1><script>alert('x')</script><p>Total: 5</p>",
        );
        assert_eq!(text, "Report\nTotal: 5");
    }

    #[test]
    fn test_preview_decodes_entities() {
        assert_eq!(html_to_text("<p>Tom &amp; Jerry &lt;3 &#65;&#x42;</p>"), "Tom & Jerry <3 AB");
        assert_eq!(html_to_text("a &unknown; b"), "a &unknown; b");
    }

    #[test]
    fn test_preview_list_items_on_own_lines() {
        assert_eq!(html_to_text("<ul><li>one</li><li>two</li></ul>"), "one\ntwo");
    }
}
