//! Markdown parsing and rendering for the content region.
//!
//! Converts a title and markdown body to styled ratatui Lines.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Colors for markdown elements
const CODE_BG: Color = Color::Rgb(40, 44, 52);
const CODE_FG: Color = Color::Rgb(171, 178, 191);
const CODE_FRAME: Color = Color::Rgb(60, 60, 60);
const HEADING_COLOR: Color = Color::Rgb(97, 175, 239);
const BOLD_COLOR: Color = Color::Rgb(224, 208, 183);
const ITALIC_COLOR: Color = Color::Rgb(152, 195, 121);
const LINK_COLOR: Color = Color::Rgb(86, 182, 194);
const LIST_BULLET_COLOR: Color = Color::Rgb(198, 120, 221);
const BLOCKQUOTE_COLOR: Color = Color::Rgb(128, 128, 128);
const RULE_COLOR: Color = Color::Rgb(80, 80, 80);

pub const NO_CONTENT: &str = "No specific content provided.";

/// Parsed markdown element
#[derive(Debug, Clone, PartialEq)]
pub enum MarkdownElement {
    Text(String),
    Bold(String),
    Italic(String),
    BoldItalic(String),
    Code(String),
    CodeBlock { language: Option<String>, code: String },
    Heading { level: u8, text: String },
    Link { text: String, url: String },
    ListItem { indent: usize, text: String },
    BlockQuote(String),
    HorizontalRule,
    Newline,
}

/// Drop the body's first line when it repeats the title.
///
/// Both sides are compared without leading `#` markers and
/// case-insensitively; blank lines after a dropped heading go with it.
pub fn strip_duplicate_heading(title: &str, body: &str) -> String {
    let body = body.trim();
    let normalized_title = strip_heading_markers(title.trim()).to_lowercase();
    if normalized_title.is_empty() {
        return body.to_string();
    }

    let mut lines = body.lines();
    let first = lines.next().unwrap_or("").trim();
    if strip_heading_markers(first).to_lowercase() != normalized_title {
        return body.to_string();
    }

    lines
        .skip_while(|line| line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_heading_markers(line: &str) -> &str {
    line.trim_start_matches('#').trim_start()
}

/// Build the element list for a markdown display: title first, then body.
///
/// A title that is already markdown (starts with `#`) is parsed as such;
/// otherwise it becomes a level-2 heading.
pub fn compose(title: Option<&str>, content: Option<&str>) -> Vec<MarkdownElement> {
    let title = title.map(str::trim).filter(|t| !t.is_empty());
    let content = content.map(str::trim).filter(|c| !c.is_empty());

    let mut elements = Vec::new();
    if let Some(title) = title {
        if title.starts_with('#') {
            elements.extend(parse_markdown(title));
        } else {
            elements.push(MarkdownElement::Heading {
                level: 2,
                text: title.to_string(),
            });
        }
        elements.push(MarkdownElement::Newline);
    }

    match content {
        Some(body) => {
            let body = match title {
                Some(title) => strip_duplicate_heading(title, body),
                None => body.to_string(),
            };
            if !body.trim().is_empty() {
                elements.extend(parse_markdown(&body));
            }
        }
        None if title.is_none() => {
            elements.push(MarkdownElement::Italic(NO_CONTENT.to_string()));
        }
        None => {}
    }

    elements
}

/// Parse markdown text into elements
pub fn parse_markdown(text: &str) -> Vec<MarkdownElement> {
    let mut elements = Vec::new();
    let mut fence: Option<(Option<String>, Vec<&str>)> = None;

    for line in text.lines() {
        if line.starts_with("```") {
            match fence.take() {
                Some((language, body)) => elements.push(MarkdownElement::CodeBlock {
                    language,
                    code: body.join("\n").trim_end().to_string(),
                }),
                None => {
                    let lang = line.trim_start_matches('`').trim();
                    fence = Some(((!lang.is_empty()).then(|| lang.to_string()), Vec::new()));
                }
            }
            continue;
        }

        if let Some((_, body)) = fence.as_mut() {
            body.push(line);
            continue;
        }

        let trimmed = line.trim();
        if matches!(trimmed, "---" | "***" | "___") {
            elements.push(MarkdownElement::HorizontalRule);
        } else if let Some(heading) = parse_heading(line) {
            elements.push(heading);
        } else if let Some(quote) = line.strip_prefix('>') {
            elements.push(MarkdownElement::BlockQuote(quote.trim().to_string()));
        } else if let Some(item) = parse_list_item(line) {
            elements.push(item);
        } else if trimmed.is_empty() {
            elements.push(MarkdownElement::Newline);
        } else {
            parse_inline(line, &mut elements);
            elements.push(MarkdownElement::Newline);
        }
    }

    // An unterminated fence still shows its code.
    if let Some((language, body)) = fence {
        if !body.is_empty() {
            elements.push(MarkdownElement::CodeBlock {
                language,
                code: body.join("\n"),
            });
        }
    }

    elements
}

fn parse_heading(line: &str) -> Option<MarkdownElement> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    Some(MarkdownElement::Heading {
        level: level as u8,
        text: trimmed[level..].trim().to_string(),
    })
}

fn parse_list_item(line: &str) -> Option<MarkdownElement> {
    let indent = line.len() - line.trim_start().len();
    let trimmed = line.trim_start();

    for bullet in ["- ", "* ", "+ "] {
        if let Some(text) = trimmed.strip_prefix(bullet) {
            return Some(MarkdownElement::ListItem {
                indent,
                text: text.to_string(),
            });
        }
    }

    let (number, text) = trimmed.split_once(". ")?;
    if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
        return Some(MarkdownElement::ListItem {
            indent,
            text: text.to_string(),
        });
    }
    None
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

fn flush_text(text: &mut String, elements: &mut Vec<MarkdownElement>) {
    if !text.is_empty() {
        elements.push(MarkdownElement::Text(std::mem::take(text)));
    }
}

fn parse_inline(line: &str, elements: &mut Vec<MarkdownElement>) {
    let chars: Vec<char> = line.chars().collect();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '`' => {
                if let Some(end) = find_char(&chars, i + 1, '`') {
                    flush_text(&mut text, elements);
                    let code: String = chars[i + 1..end].iter().collect();
                    if !code.is_empty() {
                        elements.push(MarkdownElement::Code(code));
                    }
                    i = end + 1;
                    continue;
                }
                text.push(c);
            }
            '*' | '_' => {
                // snake_case words keep their underscores
                let prev_is_word = text.chars().last().map_or(false, is_word_char);
                if c == '_' && prev_is_word {
                    text.push(c);
                    i += 1;
                    continue;
                }

                let run = chars[i..].iter().take(3).take_while(|&&m| m == c).count();
                if run == 1 && c == '_' && !chars.get(i + 1).map_or(false, |&n| is_word_char(n)) {
                    text.push(c);
                    i += 1;
                    continue;
                }

                match find_closing(&chars, i + run, c, run) {
                    Some(end) if end > i + run => {
                        flush_text(&mut text, elements);
                        let inner: String = chars[i + run..end].iter().collect();
                        elements.push(match run {
                            1 => MarkdownElement::Italic(inner),
                            2 => MarkdownElement::Bold(inner),
                            _ => MarkdownElement::BoldItalic(inner),
                        });
                        i = end + run;
                        continue;
                    }
                    _ => {
                        text.extend(std::iter::repeat(c).take(run));
                        i += run;
                        continue;
                    }
                }
            }
            '[' => {
                if let Some((label, url, next)) = parse_link(&chars, i) {
                    flush_text(&mut text, elements);
                    elements.push(MarkdownElement::Link { text: label, url });
                    i = next;
                    continue;
                }
                text.push(c);
            }
            _ => text.push(c),
        }
        i += 1;
    }

    flush_text(&mut text, elements);
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    (from..chars.len()).find(|&j| chars[j] == target)
}

/// Position of the first run of `count` markers closing an emphasis span.
fn find_closing(chars: &[char], from: usize, marker: char, count: usize) -> Option<usize> {
    let mut j = from;
    while j + count <= chars.len() {
        if chars[j..j + count].iter().all(|&m| m == marker) {
            // Underscores inside a word do not close.
            let inside_word = marker == '_'
                && j > 0
                && is_word_char(chars[j - 1])
                && chars.get(j + count).map_or(false, |&n| is_word_char(n));
            if !inside_word {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

fn parse_link(chars: &[char], start: usize) -> Option<(String, String, usize)> {
    let close = find_char(chars, start + 1, ']')?;
    if chars.get(close + 1) != Some(&'(') {
        return None;
    }
    let paren = find_char(chars, close + 2, ')')?;
    Some((
        chars[start + 1..close].iter().collect(),
        chars[close + 2..paren].iter().collect(),
        paren + 1,
    ))
}

/// Render markdown elements to styled ratatui Lines
pub fn render_markdown(elements: &[MarkdownElement], width: usize) -> Vec<Line<'static>> {
    let mut out = LineBuilder::default();

    for element in elements {
        match element {
            MarkdownElement::Text(text) => out.inline(Span::raw(text.clone())),
            MarkdownElement::Bold(text) => out.inline(Span::styled(
                text.clone(),
                Style::default().fg(BOLD_COLOR).add_modifier(Modifier::BOLD),
            )),
            MarkdownElement::Italic(text) => out.inline(Span::styled(
                text.clone(),
                Style::default().fg(ITALIC_COLOR).add_modifier(Modifier::ITALIC),
            )),
            MarkdownElement::BoldItalic(text) => out.inline(Span::styled(
                text.clone(),
                Style::default()
                    .fg(BOLD_COLOR)
                    .add_modifier(Modifier::BOLD | Modifier::ITALIC),
            )),
            MarkdownElement::Code(code) => out.inline(Span::styled(
                format!(" {} ", code),
                Style::default().fg(CODE_FG).bg(CODE_BG),
            )),
            MarkdownElement::Link { text, .. } => out.inline(Span::styled(
                text.clone(),
                Style::default().fg(LINK_COLOR).add_modifier(Modifier::UNDERLINED),
            )),
            MarkdownElement::CodeBlock { language, code } => {
                let lang = language.as_deref().unwrap_or("code");
                out.block(Line::from(vec![
                    Span::styled(format!("┌─ {} ", lang), Style::default().fg(CODE_FG)),
                    Span::styled(
                        "─".repeat(width.saturating_sub(lang.len() + 4)),
                        Style::default().fg(CODE_FRAME),
                    ),
                ]));
                for code_line in code.lines() {
                    out.block(Line::from(vec![
                        Span::styled("│ ", Style::default().fg(CODE_FRAME)),
                        Span::styled(code_line.to_string(), Style::default().fg(CODE_FG).bg(CODE_BG)),
                    ]));
                }
                out.block(Line::from(Span::styled(
                    format!("└{}┘", "─".repeat(width.saturating_sub(2))),
                    Style::default().fg(CODE_FRAME),
                )));
            }
            MarkdownElement::Heading { level, text } => {
                let modifier = match level {
                    1 => Modifier::BOLD | Modifier::UNDERLINED,
                    2 => Modifier::BOLD,
                    _ => Modifier::BOLD | Modifier::DIM,
                };
                out.block(Line::from(Span::styled(
                    text.clone(),
                    Style::default().fg(HEADING_COLOR).add_modifier(modifier),
                )));
                if *level == 1 {
                    out.block(Line::from(Span::styled(
                        "─".repeat(text.chars().count().min(width)),
                        Style::default().fg(Color::Rgb(70, 85, 110)),
                    )));
                }
            }
            MarkdownElement::ListItem { indent, text } => {
                out.block(Line::from(vec![
                    Span::raw(" ".repeat(*indent)),
                    Span::styled("• ", Style::default().fg(LIST_BULLET_COLOR)),
                    Span::raw(text.clone()),
                ]));
            }
            MarkdownElement::BlockQuote(text) => {
                out.block(Line::from(vec![
                    Span::styled("│ ", Style::default().fg(BLOCKQUOTE_COLOR)),
                    Span::styled(
                        text.clone(),
                        Style::default().fg(BLOCKQUOTE_COLOR).add_modifier(Modifier::ITALIC),
                    ),
                ]));
            }
            MarkdownElement::HorizontalRule => {
                out.block(Line::from(Span::styled("─".repeat(width), Style::default().fg(RULE_COLOR))));
            }
            MarkdownElement::Newline => out.newline(),
        }
    }

    out.finish()
}

/// Accumulates inline spans into the current line; block elements and
/// newlines close it.
#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
}

impl LineBuilder {
    fn inline(&mut self, span: Span<'static>) {
        self.current.push(span);
    }

    fn flush(&mut self) -> bool {
        if self.current.is_empty() {
            return false;
        }
        self.lines.push(Line::from(std::mem::take(&mut self.current)));
        true
    }

    fn block(&mut self, line: Line<'static>) {
        self.flush();
        self.lines.push(line);
    }

    fn newline(&mut self) {
        if self.flush() {
            return;
        }
        // Blank lines separate blocks; never stack more than one.
        let last_blank = self.lines.last().map_or(true, |l| l.spans.is_empty());
        if !last_blank {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().map_or(false, |l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Plain text of rendered lines.
#[cfg(test)]
pub fn lines_to_text(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headings(elements: &[MarkdownElement]) -> Vec<String> {
        elements
            .iter()
            .filter_map(|e| match e {
                MarkdownElement::Heading { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_duplicate_title_heading_is_dropped() {
        let elements = compose(Some("Report"), Some("# Report\n\nBody text"));
        assert_eq!(headings(&elements), vec!["Report".to_string()]);
        assert!(elements.iter().any(|e| matches!(e, MarkdownElement::Text(t) if t == "Body text")));
    }

    #[test]
    fn test_distinct_body_keeps_title_and_body() {
        let elements = compose(Some("Report"), Some("Body text"));
        assert_eq!(headings(&elements), vec!["Report".to_string()]);
        assert!(elements.iter().any(|e| matches!(e, MarkdownElement::Text(t) if t == "Body text")));
    }

    #[test]
    fn test_duplicate_check_is_case_insensitive() {
        assert_eq!(strip_duplicate_heading("## Sales", "### SALES\n\n\nQ3 numbers"), "Q3 numbers");
        assert_eq!(strip_duplicate_heading("Sales", "Sales figures\nmore"), "Sales figures\nmore");
    }

    #[test]
    fn test_markdown_title_is_parsed() {
        let elements = compose(Some("# Weekly"), None);
        assert!(matches!(
            &elements[0],
            MarkdownElement::Heading { level: 1, text } if text == "Weekly"
        ));
    }

    #[test]
    fn test_plain_title_becomes_level_two() {
        let elements = compose(Some("Weekly"), None);
        assert!(matches!(
            &elements[0],
            MarkdownElement::Heading { level: 2, text } if text == "Weekly"
        ));
    }

    #[test]
    fn test_empty_payload_shows_placeholder() {
        let elements = compose(Some("  "), Some(""));
        assert_eq!(elements, vec![MarkdownElement::Italic(NO_CONTENT.to_string())]);
    }

    #[test]
    fn test_parse_heading() {
        let elements = parse_markdown("### Heading 3");
        assert!(matches!(&elements[0], MarkdownElement::Heading { level: 3, text } if text == "Heading 3"));
    }

    #[test]
    fn test_parse_emphasis_variants() {
        let elements = parse_markdown("**bold** *italic* ***both*** __b2__ _i2_");
        let bold = elements.iter().filter(|e| matches!(e, MarkdownElement::Bold(_))).count();
        let italic = elements.iter().filter(|e| matches!(e, MarkdownElement::Italic(_))).count();
        assert_eq!(bold, 2);
        assert_eq!(italic, 2);
        assert!(elements.iter().any(|e| matches!(e, MarkdownElement::BoldItalic(t) if t == "both")));
    }

    #[test]
    fn test_underscore_in_word() {
        let elements = parse_markdown("snake_case_variable");
        assert!(elements.iter().any(|e| matches!(e, MarkdownElement::Text(t) if t == "snake_case_variable")));
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        let elements = parse_markdown("5 * 3 = 15");
        assert!(elements.iter().any(|e| matches!(e, MarkdownElement::Text(t) if t == "5 * 3 = 15")));
    }

    #[test]
    fn test_parse_code_and_link() {
        let elements = parse_markdown("Use `jobs` from [dashboard](https://example.com/calls)");
        assert!(elements.iter().any(|e| matches!(e, MarkdownElement::Code(t) if t == "jobs")));
        assert!(elements.iter().any(|e| matches!(
            e,
            MarkdownElement::Link { text, url } if text == "dashboard" && url == "https://example.com/calls"
        )));
    }

    #[test]
    fn test_parse_code_block() {
        let elements = parse_markdown("```json\n{\"a\": 1}\n```");
        assert!(elements.iter().any(|e| matches!(
            e,
            MarkdownElement::CodeBlock { language: Some(lang), code } if lang == "json" && code == "{\"a\": 1}"
        )));
    }

    #[test]
    fn test_parse_lists_quotes_rules() {
        let elements = parse_markdown("- one\n2. two\n> quoted\n---");
        let items = elements.iter().filter(|e| matches!(e, MarkdownElement::ListItem { .. })).count();
        assert_eq!(items, 2);
        assert!(elements.iter().any(|e| matches!(e, MarkdownElement::BlockQuote(t) if t == "quoted")));
        assert!(elements.iter().any(|e| matches!(e, MarkdownElement::HorizontalRule)));
    }

    #[test]
    fn test_render_report_without_duplicate_heading() {
        let lines = render_markdown(&compose(Some("Report"), Some("# Report\n\nBody text")), 80);
        let text = lines_to_text(&lines);
        assert_eq!(text.matches("Report").count(), 1);
        assert!(text.contains("Body text"));
    }

    #[test]
    fn test_render_h1_has_underline() {
        let lines = render_markdown(&[MarkdownElement::Heading { level: 1, text: "Title".to_string() }], 80);
        assert_eq!(lines.len(), 2);
        assert!(lines_to_text(&lines[1..]).contains('─'));
    }
}
