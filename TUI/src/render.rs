//! Builds displayable content from display frames.
//!
//! Rendering never fails outward: every [`RenderError`] becomes an inline
//! error block that occupies the content region like any other content.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::chart::{ChartError, ChartSpec, GraphKind};
use crate::html::EmbeddedDocument;
use crate::markdown::{self, MarkdownElement};
use crate::protocol::DisplayKind;

const CHART_ERROR_MESSAGE: &str =
    "There was an error rendering the chart. The data or options provided by the assistant might be invalid.";

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("Unknown graph type: {0}")]
    UnknownGraphKind(String),
    #[error("chart could not be built: {0}")]
    InvalidChart(#[from] ChartError),
    #[error("HTML content was missing or invalid.")]
    MissingHtml,
}

impl RenderError {
    pub fn heading(&self) -> &'static str {
        match self {
            RenderError::UnknownGraphKind(_) => "Error",
            RenderError::InvalidChart(_) => "Graph Error",
            RenderError::MissingHtml => "Display Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineError {
    pub heading: String,
    pub message: String,
    /// Underlying error text, shown as a code block.
    pub detail: Option<String>,
}

impl From<RenderError> for InlineError {
    fn from(err: RenderError) -> Self {
        let (message, detail) = match &err {
            RenderError::InvalidChart(cause) => (CHART_ERROR_MESSAGE.to_string(), Some(cause.to_string())),
            other => (other.to_string(), None),
        };
        Self {
            heading: err.heading().to_string(),
            message,
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownDoc {
    pub title: Option<String>,
    pub source: String,
    pub elements: Vec<MarkdownElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Markdown(MarkdownDoc),
    Chart(ChartSpec),
    Html(EmbeddedDocument),
    Error(InlineError),
}

impl Content {
    /// Source text for copying: markdown source, chart config JSON or the
    /// raw HTML document.
    pub fn source_text(&self) -> String {
        match self {
            Content::Markdown(doc) => match &doc.title {
                Some(title) => format!("{}\n\n{}", title, doc.source),
                None => doc.source.clone(),
            },
            Content::Chart(spec) => serde_json::to_string_pretty(&spec.to_config_json()).unwrap_or_default(),
            Content::Html(doc) => doc.srcdoc.clone(),
            Content::Error(err) => match &err.detail {
                Some(detail) => format!("{}: {}\n{}", err.heading, err.message, detail),
                None => format!("{}: {}", err.heading, err.message),
            },
        }
    }

    pub fn is_chart(&self) -> bool {
        matches!(self, Content::Chart(_))
    }
}

pub fn render(kind: &DisplayKind, payload: &Value) -> Content {
    let result = match kind {
        DisplayKind::Markdown => Ok(render_markdown(payload)),
        DisplayKind::Graph(graph_type) => render_graph(graph_type, payload),
        DisplayKind::Html => render_html(payload),
    };

    result.unwrap_or_else(|err| {
        match &err {
            RenderError::UnknownGraphKind(kind) => warn!(kind = %kind, "unknown graph type"),
            other => error!(error = %other, "render failed"),
        }
        Content::Error(err.into())
    })
}

fn render_markdown(payload: &Value) -> Content {
    let title = payload.get("title").and_then(Value::as_str);
    let body = payload.get("content").and_then(Value::as_str);
    Content::Markdown(MarkdownDoc {
        title: title.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string),
        source: body.unwrap_or_default().to_string(),
        elements: markdown::compose(title, body),
    })
}

fn render_graph(graph_type: &str, payload: &Value) -> Result<Content, RenderError> {
    let kind = GraphKind::from_type(graph_type).ok_or_else(|| RenderError::UnknownGraphKind(graph_type.to_string()))?;
    Ok(Content::Chart(ChartSpec::build(kind, payload)?))
}

fn render_html(payload: &Value) -> Result<Content, RenderError> {
    let doc = EmbeddedDocument::from_payload(payload).ok_or(RenderError::MissingHtml)?;
    debug!(title = %doc.title, markup = %doc.iframe_markup(), "embedded document");
    Ok(Content::Html(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_graph_kind_renders_inline_error() {
        let content = render(&DisplayKind::Graph("graph_heatmap".to_string()), &json!({}));
        match content {
            Content::Error(err) => {
                assert_eq!(err.heading, "Error");
                assert_eq!(err.message, "Unknown graph type: graph_heatmap");
            }
            other => panic!("expected inline error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_chart_renders_graph_error() {
        let content = render(&DisplayKind::Graph("graph_bar".to_string()), &json!({"labels": ["a"]}));
        match content {
            Content::Error(err) => {
                assert_eq!(err.heading, "Graph Error");
                assert_eq!(err.detail.as_deref(), Some("chart payload has no datasets"));
            }
            other => panic!("expected graph error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_chart() {
        let content = render(
            &DisplayKind::Graph("graph_line".to_string()),
            &json!({"title": "Calls", "labels": ["a", "b"], "datasets": [{"label": "n", "values": [1, 2]}]}),
        );
        assert!(content.is_chart());
        assert!(content.source_text().contains("\"type\": \"line\""));
    }

    #[test]
    fn test_missing_html_content() {
        let content = render(&DisplayKind::Html, &json!({"title": "x"}));
        match content {
            Content::Error(err) => {
                assert_eq!(err.heading, "Display Error");
                assert_eq!(err.message, "HTML content was missing or invalid.");
            }
            other => panic!("expected display error, got {:?}", other),
        }
    }

    #[test]
    fn test_markdown_source_text() {
        let content = render(&DisplayKind::Markdown, &json!({"title": "Report", "content": "Body"}));
        assert_eq!(content.source_text(), "Report\n\nBody");
    }
}
