//! Chart configuration built from `graph_*` payloads.
//!
//! [`ChartSpec::build`] produces the full chart description (datasets with
//! their styling defaults, scales, legend, tooltip and animation settings).
//! The terminal draws a projection of it; see `ui::draw_chart`.

use std::collections::BTreeMap;

use ratatui::style::Color;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Per-dataset properties copied verbatim from the payload.
pub const PASSTHROUGH_PROPS: [&str; 16] = [
    "backgroundColor",
    "borderColor",
    "borderWidth",
    "fill",
    "tension",
    "pointStyle",
    "pointRadius",
    "pointBackgroundColor",
    "pointBorderColor",
    "pointHoverBackgroundColor",
    "pointHoverBorderColor",
    "yAxisID",
    "xAxisID",
    "stack",
    "barPercentage",
    "categoryPercentage",
];

pub const RADIAL_PALETTE: [&str; 12] = [
    "#3b82f6", "#60a5fa", "#93c5fd", "#bfdbfe", "#dbeafe", "#eff6ff", "#ef4444", "#f87171",
    "#fca5a5", "#10b981", "#34d399", "#6ee7b7",
];

const RADIAL_BORDER: &str = "#100f24";
const SERIES_FILL: &str = "rgba(59, 130, 246, 0.3)";
const SERIES_STROKE: &str = "rgba(59, 130, 246, 1)";
const POINT_HIGHLIGHT: &str = "#fff";

const AXIS_TITLE_COLOR: &str = "#d1d5db";
const GRID_COLOR: &str = "#21204b";
const TICK_COLOR: &str = "#9ca3af";

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("chart payload must be an object")]
    NotAnObject,
    #[error("chart payload has no datasets")]
    MissingDatasets,
    #[error("chart labels must be an array")]
    InvalidLabels,
    #[error("{kind} chart requires labels")]
    MissingLabels { kind: &'static str },
    #[error("dataset {index} is not an object")]
    InvalidDataset { index: usize },
    #[error("dataset {index} has no values")]
    MissingValues { index: usize },
    #[error("dataset {dataset} value {index} is not numeric")]
    NonNumericValue { dataset: usize, index: usize },
    #[error("unknown dataset chartType '{0}'")]
    UnknownSeriesType(String),
    #[error("options.scales must be an object")]
    MalformedScales,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    Bar,
    Line,
    Pie,
    Doughnut,
    Radar,
    Polar,
    Scatter,
    Bubble,
    Mixed,
}

impl GraphKind {
    pub fn from_type(kind: &str) -> Option<Self> {
        let kind = match kind.strip_prefix("graph_")? {
            "bar" => GraphKind::Bar,
            "line" => GraphKind::Line,
            "pie" => GraphKind::Pie,
            "doughnut" => GraphKind::Doughnut,
            "radar" => GraphKind::Radar,
            "polar" => GraphKind::Polar,
            "scatter" => GraphKind::Scatter,
            "bubble" => GraphKind::Bubble,
            "mixed" => GraphKind::Mixed,
            _ => return None,
        };
        Some(kind)
    }

    /// Chart type name of the container; mixed charts default to bar.
    pub fn chart_type(self) -> &'static str {
        match self {
            GraphKind::Bar | GraphKind::Mixed => "bar",
            GraphKind::Line => "line",
            GraphKind::Pie => "pie",
            GraphKind::Doughnut => "doughnut",
            GraphKind::Radar => "radar",
            GraphKind::Polar => "polarArea",
            GraphKind::Scatter => "scatter",
            GraphKind::Bubble => "bubble",
        }
    }

    /// Pie, doughnut and polar colour each value rather than each series.
    pub fn is_radial(self) -> bool {
        matches!(self, GraphKind::Pie | GraphKind::Doughnut | GraphKind::Polar)
    }

    pub fn has_axes(self) -> bool {
        !self.is_radial() && self != GraphKind::Radar
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesType {
    Bar,
    Line,
    Scatter,
    Bubble,
    Radar,
    Pie,
    Doughnut,
    PolarArea,
}

impl SeriesType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "bar" => Some(SeriesType::Bar),
            "line" => Some(SeriesType::Line),
            "scatter" => Some(SeriesType::Scatter),
            "bubble" => Some(SeriesType::Bubble),
            "radar" => Some(SeriesType::Radar),
            "pie" => Some(SeriesType::Pie),
            "doughnut" => Some(SeriesType::Doughnut),
            "polarArea" => Some(SeriesType::PolarArea),
            _ => None,
        }
    }

    fn of_kind(kind: GraphKind) -> Self {
        match kind {
            GraphKind::Bar | GraphKind::Mixed => SeriesType::Bar,
            GraphKind::Line => SeriesType::Line,
            GraphKind::Pie => SeriesType::Pie,
            GraphKind::Doughnut => SeriesType::Doughnut,
            GraphKind::Radar => SeriesType::Radar,
            GraphKind::Polar => SeriesType::PolarArea,
            GraphKind::Scatter => SeriesType::Scatter,
            GraphKind::Bubble => SeriesType::Bubble,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataPoint {
    Value(f64),
    Point { x: f64, y: f64, r: Option<f64> },
    Gap,
}

impl DataPoint {
    fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(DataPoint::Gap),
            Value::Number(n) => n.as_f64().map(DataPoint::Value),
            Value::Object(obj) => {
                let x = obj.get("x")?.as_f64()?;
                let y = obj.get("y")?.as_f64()?;
                let r = obj.get("r").and_then(Value::as_f64);
                Some(DataPoint::Point { x, y, r })
            }
            _ => None,
        }
    }

    /// The plotted value: the number itself, or the y of a point.
    pub fn value(&self) -> Option<f64> {
        match self {
            DataPoint::Value(v) => Some(*v),
            DataPoint::Point { y, .. } => Some(*y),
            DataPoint::Gap => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: Option<String>,
    pub data: Vec<DataPoint>,
    /// Series type; only differs from the container's for mixed charts.
    pub series: SeriesType,
    /// Declared `chartType`, kept on the config for mixed charts.
    pub declared_type: Option<String>,
    /// Styling: passthrough properties plus filled-in defaults.
    pub style: Map<String, Value>,
}

impl Dataset {
    fn build(index: usize, raw: &Value, kind: GraphKind) -> Result<Self, ChartError> {
        let Value::Object(raw) = raw else {
            return Err(ChartError::InvalidDataset { index });
        };

        let values = match raw.get("values") {
            Some(Value::Array(values)) => values,
            _ => return Err(ChartError::MissingValues { index }),
        };
        let data = values
            .iter()
            .enumerate()
            .map(|(i, v)| DataPoint::parse(v).ok_or(ChartError::NonNumericValue { dataset: index, index: i }))
            .collect::<Result<Vec<_>, _>>()?;

        let chart_type = raw.get("chartType").and_then(Value::as_str);
        let (series, declared_type) = match (kind, chart_type) {
            (GraphKind::Mixed, Some(name)) => {
                let series = SeriesType::parse(name).ok_or_else(|| ChartError::UnknownSeriesType(name.to_string()))?;
                (series, Some(name.to_string()))
            }
            _ => (SeriesType::of_kind(kind), None),
        };

        let mut style = Map::new();
        for prop in PASSTHROUGH_PROPS {
            if let Some(value) = raw.get(prop) {
                style.insert(prop.to_string(), value.clone());
            }
        }

        if kind.is_radial() {
            let palette: Vec<Value> = RADIAL_PALETTE
                .iter()
                .take(data.len())
                .map(|c| Value::from(*c))
                .collect();
            insert_default(&mut style, "backgroundColor", Value::Array(palette));
            insert_default(&mut style, "borderColor", Value::from(RADIAL_BORDER));
            insert_default(&mut style, "borderWidth", json!(2));
        } else {
            insert_default(&mut style, "backgroundColor", Value::from(SERIES_FILL));
            insert_default(&mut style, "borderColor", Value::from(SERIES_STROKE));
            insert_default(&mut style, "borderWidth", json!(1.5));
        }

        if kind == GraphKind::Line || chart_type == Some("line") {
            let border = style.get("borderColor").cloned().unwrap_or(Value::Null);
            insert_default(&mut style, "tension", json!(0.3));
            insert_default(&mut style, "pointBackgroundColor", border.clone());
            insert_default(&mut style, "pointBorderColor", Value::from(POINT_HIGHLIGHT));
            insert_default(&mut style, "pointHoverBackgroundColor", Value::from(POINT_HIGHLIGHT));
            insert_default(&mut style, "pointHoverBorderColor", border);
        }

        Ok(Self {
            label: raw.get("label").and_then(value_as_label),
            data,
            series,
            declared_type,
            style,
        })
    }

    pub fn values(&self) -> Vec<f64> {
        self.data.iter().filter_map(DataPoint::value).collect()
    }

    /// Terminal colour for the series as a whole.
    pub fn color(&self) -> Color {
        ["borderColor", "backgroundColor"]
            .iter()
            .filter_map(|key| self.style.get(*key))
            .find_map(first_css_color)
            .and_then(|c| parse_css_color(&c))
            .unwrap_or(Color::Rgb(59, 130, 246))
    }

    /// Terminal colour for one value, for charts that colour by value.
    pub fn value_color(&self, index: usize) -> Color {
        match self.style.get("backgroundColor") {
            Some(Value::Array(colors)) if !colors.is_empty() => colors
                .get(index % colors.len())
                .and_then(Value::as_str)
                .and_then(parse_css_color)
                .unwrap_or_else(|| self.color()),
            Some(Value::String(c)) => parse_css_color(c).unwrap_or_else(|| self.color()),
            _ => self.color(),
        }
    }
}

fn insert_default(style: &mut Map<String, Value>, key: &str, value: Value) {
    style.entry(key.to_string()).or_insert(value);
}

fn first_css_color(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn value_as_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Tooltip styling plus templated callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub style: Map<String, Value>,
    pub callbacks: BTreeMap<String, String>,
}

impl Tooltip {
    fn build(overrides: Option<&Value>) -> Self {
        let mut style = match json!({
            "backgroundColor": "rgba(31, 29, 61, 0.9)",
            "titleColor": "#f0f0ff",
            "bodyColor": "#d0d0f0",
            "padding": 12,
            "cornerRadius": 3,
            "titleFont": { "weight": "bold", "size": 14 },
            "bodyFont": { "size": 13 },
            "boxPadding": 5
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut callbacks = BTreeMap::new();
        if let Some(Value::Object(overrides)) = overrides {
            for (key, value) in overrides {
                if key == "callbacks" {
                    if let Value::Object(templates) = value {
                        for (name, template) in templates {
                            if let Some(template) = template.as_str() {
                                callbacks.insert(name.clone(), template.to_string());
                            }
                        }
                    }
                } else {
                    style.insert(key.clone(), value.clone());
                }
            }
        }

        Self { style, callbacks }
    }

    /// Expand the named callback template for one data point.
    pub fn format(&self, callback: &str, value: &str, label: Option<&str>, dataset: Option<&str>) -> Option<String> {
        self.callbacks
            .get(callback)
            .map(|template| expand_template(template, value, label, dataset))
    }
}

/// Substitute `${value}`, `${label}` and `${dataset}`; a placeholder with no
/// value available is left as written.
pub fn expand_template(template: &str, value: &str, label: Option<&str>, dataset: Option<&str>) -> String {
    let mut out = template.replace("${value}", value);
    if let Some(label) = label {
        out = out.replace("${label}", label);
    }
    if let Some(dataset) = dataset {
        out = out.replace("${dataset}", dataset);
    }
    out
}

/// Y-axis tick text: millions as `M`, thousands as `K`.
pub fn abbreviate_tick(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{}M", format_number(value / 1_000_000.0))
    } else if value >= 1000.0 {
        format!("{}K", format_number(value / 1000.0))
    } else {
        format_number(value)
    }
}

fn format_number(value: f64) -> String {
    // Trim float noise such as 1.2000000000000002
    let rounded = (value * 1e6).round() / 1e6;
    format!("{}", rounded)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: GraphKind,
    pub title: Option<String>,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub scales: Map<String, Value>,
    pub legend: Map<String, Value>,
    pub tooltip: Tooltip,
    pub animation: Value,
}

impl ChartSpec {
    pub fn build(kind: GraphKind, payload: &Value) -> Result<Self, ChartError> {
        let Value::Object(payload) = payload else {
            return Err(ChartError::NotAnObject);
        };
        let options = payload.get("options").and_then(Value::as_object);
        let option = |key: &str| options.and_then(|o| o.get(key)).filter(|v| !v.is_null());

        let raw_datasets = match payload.get("datasets") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => return Err(ChartError::MissingDatasets),
        };

        let labels: Vec<String> = match payload.get("labels") {
            Some(Value::Array(items)) => items.iter().map(|v| value_as_label(v).unwrap_or_default()).collect(),
            None | Some(Value::Null) if kind.is_radial() => {
                return Err(ChartError::MissingLabels { kind: kind.chart_type() })
            }
            None | Some(Value::Null) => Vec::new(),
            Some(_) => return Err(ChartError::InvalidLabels),
        };

        let datasets = raw_datasets
            .iter()
            .enumerate()
            .map(|(i, raw)| Dataset::build(i, raw, kind))
            .collect::<Result<Vec<_>, _>>()?;

        let scales = match option("scales") {
            Some(Value::Object(custom)) => custom.clone(),
            Some(_) => return Err(ChartError::MalformedScales),
            None if kind.has_axes() => default_scales(
                option("x_axis_label").and_then(Value::as_str),
                option("y_axis_label").and_then(Value::as_str),
            ),
            None => Map::new(),
        };

        let legend_visible = if kind.is_radial() {
            labels.len() > 1
        } else {
            datasets.len() > 1
        };
        let mut legend = Map::new();
        legend.insert("position".to_string(), Value::from("bottom"));
        legend.insert("display".to_string(), Value::from(legend_visible));
        legend.insert(
            "labels".to_string(),
            json!({ "color": AXIS_TITLE_COLOR, "padding": 15, "font": { "size": 13 } }),
        );
        if let Some(Value::Object(overrides)) = option("legend") {
            for (key, value) in overrides {
                legend.insert(key.clone(), value.clone());
            }
        }

        let animation = match (option("animation"), options.and_then(|o| o.get("animated"))) {
            (Some(animation), _) if is_truthy(animation) => animation.clone(),
            (_, Some(animated)) => animated.clone(),
            _ => json!({ "duration": 800, "easing": "easeInOutQuart" }),
        };

        Ok(Self {
            kind,
            title: payload
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            labels,
            datasets,
            scales,
            legend,
            tooltip: Tooltip::build(option("tooltip")),
            animation,
        })
    }

    pub fn chart_type(&self) -> &'static str {
        self.kind.chart_type()
    }

    pub fn legend_visible(&self) -> bool {
        self.legend.get("display").map_or(false, is_truthy)
    }

    pub fn legend_position(&self) -> &str {
        self.legend.get("position").and_then(Value::as_str).unwrap_or("bottom")
    }

    pub fn axis_title(&self, axis: &str) -> Option<&str> {
        let title = self.scales.get(axis)?.get("title")?;
        if !title.get("display").map_or(true, is_truthy) {
            return None;
        }
        title.get("text").and_then(Value::as_str)
    }

    pub fn begins_at_zero(&self) -> bool {
        self.scales
            .get("y")
            .and_then(|y| y.get("beginAtZero"))
            .map_or(false, is_truthy)
    }

    /// Value range over every dataset, widened to include zero when the
    /// y axis begins at zero.
    pub fn y_bounds(&self) -> [f64; 2] {
        let values = self.datasets.iter().flat_map(|d| d.values());
        let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !lo.is_finite() || !hi.is_finite() {
            return [0.0, 1.0];
        }
        if self.begins_at_zero() {
            lo = lo.min(0.0);
            hi = hi.max(0.0);
        }
        if (hi - lo).abs() < f64::EPSILON {
            hi = lo + 1.0;
        }
        [lo, hi]
    }

    /// Points for a cartesian plot: explicit x for scatter/bubble points,
    /// otherwise the label index.
    pub fn points(&self, dataset: &Dataset) -> Vec<(f64, f64)> {
        dataset
            .data
            .iter()
            .enumerate()
            .filter_map(|(i, point)| match point {
                DataPoint::Point { x, y, .. } => Some((*x, *y)),
                DataPoint::Value(v) => Some((i as f64, *v)),
                DataPoint::Gap => None,
            })
            .collect()
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        let xs = self.datasets.iter().flat_map(|d| self.points(d)).map(|(x, _)| x);
        let (lo, hi) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
        if !lo.is_finite() || !hi.is_finite() || (hi - lo).abs() < f64::EPSILON {
            return [0.0, (self.labels.len().max(2) - 1) as f64];
        }
        [lo, hi]
    }

    /// Text shown when the chart source is copied.
    pub fn to_config_json(&self) -> Value {
        let datasets: Vec<Value> = self
            .datasets
            .iter()
            .map(|d| {
                let mut entry = d.style.clone();
                entry.insert("label".to_string(), d.label.clone().map_or(Value::Null, Value::from));
                entry.insert(
                    "data".to_string(),
                    Value::Array(
                        d.data
                            .iter()
                            .map(|p| match p {
                                DataPoint::Value(v) => json!(v),
                                DataPoint::Point { x, y, r: Some(r) } => json!({ "x": x, "y": y, "r": r }),
                                DataPoint::Point { x, y, r: None } => json!({ "x": x, "y": y }),
                                DataPoint::Gap => Value::Null,
                            })
                            .collect(),
                    ),
                );
                if let Some(declared) = &d.declared_type {
                    entry.insert("type".to_string(), Value::from(declared.as_str()));
                }
                Value::Object(entry)
            })
            .collect();

        json!({
            "type": self.chart_type(),
            "data": { "labels": self.labels, "datasets": datasets },
            "options": {
                "animation": self.animation,
                "scales": self.scales,
                "plugins": {
                    "title": { "display": false },
                    "legend": self.legend,
                    "tooltip": self.tooltip.style,
                }
            }
        })
    }
}

fn default_scales(x_label: Option<&str>, y_label: Option<&str>) -> Map<String, Value> {
    let axis_title = |label: Option<&str>| {
        json!({
            "display": label.map_or(false, |l| !l.is_empty()),
            "text": label,
            "color": AXIS_TITLE_COLOR,
            "font": { "size": 13, "weight": "500" }
        })
    };

    let mut scales = Map::new();
    scales.insert(
        "x".to_string(),
        json!({
            "title": axis_title(x_label),
            "grid": { "color": GRID_COLOR, "drawBorder": false },
            "ticks": { "color": TICK_COLOR, "font": { "size": 12 } }
        }),
    );
    scales.insert(
        "y".to_string(),
        json!({
            "title": axis_title(y_label),
            "beginAtZero": true,
            "grid": { "color": GRID_COLOR, "drawBorder": false },
            "ticks": { "color": TICK_COLOR, "font": { "size": 12 }, "abbreviate": true }
        }),
    );
    scales
}

/// Parse a CSS colour (`#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()` or a
/// few common names) into a terminal colour. Alpha is ignored.
pub fn parse_css_color(css: &str) -> Option<Color> {
    let css = css.trim();
    if let Some(hex) = css.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        return match hex.len() {
            3 | 4 => {
                let mut it = hex.chars().map(|c| u8::from_str_radix(&c.to_string(), 16).ok().map(|v| v * 17));
                Some(Color::Rgb(it.next()??, it.next()??, it.next()??))
            }
            6 | 8 => Some(Color::Rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            _ => None,
        };
    }

    let lower = css.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let mut parts = args.split(',').map(|p| p.trim().parse::<f64>().ok());
        let mut channel = || parts.next().flatten().map(|v| v.clamp(0.0, 255.0).round() as u8);
        return Some(Color::Rgb(channel()?, channel()?, channel()?));
    }

    match lower.as_str() {
        "white" => Some(Color::Rgb(255, 255, 255)),
        "black" => Some(Color::Rgb(0, 0, 0)),
        "red" => Some(Color::Rgb(255, 0, 0)),
        "green" => Some(Color::Rgb(0, 128, 0)),
        "blue" => Some(Color::Rgb(0, 0, 255)),
        "yellow" => Some(Color::Rgb(255, 255, 0)),
        "orange" => Some(Color::Rgb(255, 165, 0)),
        "purple" => Some(Color::Rgb(128, 0, 128)),
        "gray" | "grey" => Some(Color::Rgb(128, 128, 128)),
        _ => None,
    }
}
