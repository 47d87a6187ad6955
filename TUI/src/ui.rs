use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, BorderType, Borders, Chart, Clear, Dataset as ChartDataset,
        GraphType, Paragraph, Wrap,
    },
    Frame,
};
use std::time::Instant;

use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::chart::{abbreviate_tick, ChartSpec, DataPoint, GraphKind, SeriesType};
use crate::connection::{ConnectionState, StatusIndicator};
use crate::idle::{IdleScreen, IDLE_TITLE};
use crate::markdown;
use crate::notify::BannerKind;
use crate::render::{Content, InlineError};
use crate::thinking::{Inline, ThinkingOverlay, THINKING_FOOTER, THINKING_HEADER};
use crate::ui_state::Stage;

// Copper Sapphire Morning color palette
const BG_DARK: Color = Color::Rgb(12, 12, 16);           // Deep background
const BG_PANEL: Color = Color::Rgb(18, 18, 24);          // Slightly lighter for panels

// Sapphire blues
const SAPPHIRE: Color = Color::Rgb(101, 150, 243);       // #6596F3 - Primary accent
const SAPPHIRE_DARK: Color = Color::Rgb(84, 112, 156);   // #54709C - Darker blue
const CYAN_LIGHT: Color = Color::Rgb(178, 220, 226);     // #B2DCE2 - Light cyan

// Copper/warm tones
const COPPER: Color = Color::Rgb(138, 72, 38);           // #8A4826 - Copper
const PALE_YELLOW: Color = Color::Rgb(234, 208, 148);    // #EAD094 - Pale yellow

// Accent colors
const BURGUNDY: Color = Color::Rgb(204, 92, 68);         // #CC5C44 - Warnings/errors
const OLIVE: Color = Color::Rgb(131, 179, 102);          // #83B366 - Success/green
const LAVENDER: Color = Color::Rgb(211, 164, 234);       // #D3A4EA - Purple accent

// Text colors
const TEXT_PRIMARY: Color = Color::Rgb(240, 240, 245);   // Near white
const TEXT_SECONDARY: Color = Color::Rgb(180, 180, 190); // Light gray
const TEXT_MUTED: Color = Color::Rgb(105, 116, 133);     // #697485 - Medium gray

// Border colors (subtle)
const BORDER_DIM: Color = Color::Rgb(45, 50, 60);        // Dim border
const BORDER_ACCENT: Color = Color::Rgb(70, 85, 110);    // Accent border

// Chart axes
const AXIS_COLOR: Color = Color::Rgb(156, 163, 175);     // #9ca3af

const LOGO: [&str; 7] = [
    "    ▄▄████▄▄    ",
    "  ▄██▀▀  ▀▀██▄  ",
    " ██▀  ▄██▄  ▀██ ",
    " ██  ██████  ██ ",
    " ██▄  ▀██▀  ▄██ ",
    "  ▀██▄▄  ▄▄██▀  ",
    "    ▀▀████▀▀    ",
];

pub fn draw(frame: &mut Frame, app: &App) {
    // Fill entire background
    let bg = Block::default().style(Style::default().bg(BG_DARK));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(1), // Banner
            Constraint::Min(5),    // Content region
            Constraint::Length(1), // Hints
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_banner(frame, app, chunks[1]);
    draw_region(frame, app, chunks[2]);
    draw_keyboard_hints(frame, app, chunks[3]);

    if app.thinking.is_visible() {
        draw_thinking(frame, &app.thinking, app.animation_frame, chunks[2]);
    }
    draw_call_alert(frame, app, chunks[2]);
}

fn indicator_style(indicator: StatusIndicator) -> (Color, &'static str) {
    match indicator {
        StatusIndicator::Connecting => (PALE_YELLOW, "connecting"),
        StatusIndicator::Connected => (OLIVE, "connected"),
        StatusIndicator::Disconnected => (TEXT_MUTED, "disconnected"),
        StatusIndicator::Error => (BURGUNDY, "error"),
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let (dot_color, label) = indicator_style(app.connection.indicator());
    let mode = if app.offline { " offline " } else { "" };
    let retry = app
        .reconnect_countdown(Instant::now())
        .map(|secs| format!(" · retrying in {}s", secs))
        .unwrap_or_default();

    let left = Line::from(vec![
        Span::styled(" ● ", Style::default().fg(dot_color)),
        Span::styled(label, Style::default().fg(TEXT_SECONDARY)),
        Span::styled(retry, Style::default().fg(TEXT_MUTED)),
        Span::styled(mode, Style::default().fg(COPPER).add_modifier(Modifier::BOLD)),
    ]);
    frame.render_widget(Paragraph::new(left), area);

    let right = Line::from(Span::styled(
        format!("{} ", app.connection.endpoint()),
        Style::default().fg(TEXT_MUTED),
    ));
    frame.render_widget(Paragraph::new(right).alignment(Alignment::Right), area);
}

fn draw_banner(frame: &mut Frame, app: &App, area: Rect) {
    let Some(banner) = app.notices.banner() else {
        return;
    };
    let (fg, bg) = match banner.kind {
        BannerKind::Connected => (BG_DARK, OLIVE),
        BannerKind::Disconnected => (TEXT_PRIMARY, SAPPHIRE_DARK),
        BannerKind::Error => (TEXT_PRIMARY, BURGUNDY),
        BannerKind::Info => (BG_DARK, SAPPHIRE),
    };
    let text = format!(" {}  {} ", banner.shown_at.format("%H:%M:%S"), banner.message);
    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(fg).bg(bg));
    frame.render_widget(widget, area);
}

fn draw_glass_border(frame: &mut Frame, area: Rect, title: &str, anim_frame: usize, glow: bool) -> Rect {
    // Animated border - cycles between sapphire and copper
    let border_color = if glow {
        let t = (anim_frame as f64 / 120.0).sin() * 0.5 + 0.5;
        let r = (84.0 + (138.0 - 84.0) * t) as u8;
        let g = (112.0 + (72.0 - 112.0) * t) as u8;
        let b = (156.0 + (38.0 - 156.0) * t) as u8;
        Color::Rgb(r, g, b)
    } else {
        BORDER_DIM
    };

    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}

fn draw_region(frame: &mut Frame, app: &App, area: Rect) {
    match app.region.stage() {
        Stage::Idle(screen) => {
            draw_background_pattern(frame, area, app.animation_frame);
            draw_idle(frame, app, screen, area);
        }
        Stage::Active(content) => {
            let inner = draw_glass_border(frame, area, content_title(content), app.animation_frame, false);
            draw_content(frame, content, app.region.scroll_offset(), inner, false);
        }
        Stage::FadingOut { leaving, .. } => {
            let title = leaving.as_ref().map_or("", content_title);
            let inner = draw_glass_border(frame, area, title, app.animation_frame, false);
            if let Some(content) = leaving {
                draw_content(frame, content, app.region.scroll_offset(), inner, true);
            }
        }
    }
}

fn content_title(content: &Content) -> &str {
    match content {
        Content::Markdown(_) => "Document",
        Content::Chart(spec) => spec.chart_type(),
        Content::Html(doc) => doc.title.as_str(),
        Content::Error(err) => err.heading.as_str(),
    }
}

fn draw_background_pattern(frame: &mut Frame, area: Rect, anim_frame: usize) {
    let pattern_offset = (anim_frame / 30) % 4;

    // Sparse twinkling dots behind the idle screen
    let lines: Vec<Line> = (0..area.height as usize)
        .map(|y| {
            let spans: Vec<Span> = (0..area.width as usize)
                .map(|x| {
                    if (x + pattern_offset) % 12 == 0 && (y + pattern_offset) % 6 == 0 {
                        let brightness = 25 + ((anim_frame as f64 / 60.0 + (x as f64 / 12.0)).sin().abs() * 15.0) as u8;
                        Span::styled(".", Style::default().fg(Color::Rgb(brightness, brightness + 2, brightness + 5)))
                    } else {
                        Span::raw(" ")
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(BG_DARK)), area);
}

fn draw_idle(frame: &mut Frame, app: &App, screen: &IdleScreen, area: Rect) {
    let logo_height = LOGO.len() as u16;
    let block_height = logo_height + 4;
    let top = area.y + area.height.saturating_sub(block_height) / 2;

    // Float of ±5 logo pixels maps to at most one terminal row.
    let float_rows = (screen.logo.offset() / 5.0).round() as i16;
    let logo_y = (top as i16 + 1 + float_rows).max(area.y as i16) as u16;
    let logo_area = Rect {
        x: area.x,
        y: logo_y,
        width: area.width,
        height: logo_height.min(area.bottom().saturating_sub(logo_y)),
    };
    draw_animated_logo(frame, logo_area, screen.logo.frames() as usize, screen.logo.intensity());

    let text_y = top + logo_height + 2;
    if text_y + 2 > area.bottom() {
        return;
    }

    let title = Paragraph::new(IDLE_TITLE)
        .alignment(Alignment::Center)
        .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD));
    frame.render_widget(title, Rect { x: area.x, y: text_y, width: area.width, height: 1 });

    let status_color = if app.connection.state() == ConnectionState::Disconnected {
        BURGUNDY
    } else {
        TEXT_SECONDARY
    };
    let status = Paragraph::new(app.status_line())
        .alignment(Alignment::Center)
        .style(Style::default().fg(status_color));
    frame.render_widget(status, Rect { x: area.x, y: text_y + 1, width: area.width, height: 1 });
}

fn draw_animated_logo(frame: &mut Frame, area: Rect, anim_frame: usize, intensity: f64) {
    // Brightness follows the pulse
    let glow = 0.75 + 0.25 * intensity;

    let lines: Vec<Line> = LOGO
        .iter()
        .enumerate()
        .map(|(line_idx, logo_line)| {
            let spans: Vec<Span> = logo_line
                .chars()
                .enumerate()
                .map(|(char_idx, ch)| {
                    // Wave effect with sapphire-cyan gradient
                    let wave_offset = (anim_frame as f64 / 25.0) + (char_idx as f64 / 6.0) - (line_idx as f64 / 2.0);
                    let t = wave_offset.sin() * 0.5 + 0.5;
                    let r = ((101.0 + (178.0 - 101.0) * t) * glow) as u8;
                    let g = ((150.0 + (220.0 - 150.0) * t) * glow) as u8;
                    let b = ((243.0 + (226.0 - 243.0) * t) * glow) as u8;
                    Span::styled(ch.to_string(), Style::default().fg(Color::Rgb(r, g, b)))
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_content(frame: &mut Frame, content: &Content, scroll: usize, area: Rect, fading: bool) {
    let width = area.width.saturating_sub(2) as usize;
    let lines = match content {
        Content::Markdown(doc) => markdown::render_markdown(&doc.elements, width),
        Content::Html(doc) => html_lines(&doc.text_preview(), doc.sandbox()),
        Content::Error(err) => error_lines(err),
        Content::Chart(spec) => {
            draw_chart(frame, spec, area);
            return;
        }
    };

    let max_scroll = lines.len().saturating_sub(area.height as usize);
    let scroll = scroll.min(max_scroll) as u16;
    let mut widget = Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((scroll, 0));
    if fading {
        widget = widget.style(Style::default().fg(TEXT_MUTED).add_modifier(Modifier::DIM));
    }
    frame.render_widget(widget, area);
}

fn html_lines(preview: &str, sandbox: &str) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = preview
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(TEXT_PRIMARY))))
        .collect();
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        format!("embedded document · sandbox: {} · c copies the source", sandbox),
        Style::default().fg(TEXT_MUTED).add_modifier(Modifier::ITALIC),
    )));
    lines
}

fn error_lines(err: &InlineError) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            err.heading.clone(),
            Style::default().fg(BURGUNDY).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(err.message.clone(), Style::default().fg(TEXT_PRIMARY))),
    ];
    if let Some(detail) = &err.detail {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            detail.clone(),
            Style::default().fg(Color::Rgb(171, 178, 191)).bg(Color::Rgb(40, 44, 52)),
        )));
    }
    lines
}

fn draw_chart(frame: &mut Frame, spec: &ChartSpec, area: Rect) {
    let legend_rows = if spec.legend_visible() { 1 } else { 0 };
    let title_rows = if spec.title.is_some() { 2 } else { 0 };
    let legend_on_top = spec.legend_position() == "top";

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(title_rows),
            Constraint::Length(if legend_on_top { legend_rows } else { 0 }),
            Constraint::Min(3),
            Constraint::Length(if legend_on_top { 0 } else { legend_rows }),
        ])
        .split(area);

    if let Some(title) = &spec.title {
        let widget = Paragraph::new(title.as_str())
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD));
        frame.render_widget(widget, chunks[0]);
    }

    match spec.kind {
        GraphKind::Pie | GraphKind::Doughnut | GraphKind::Polar => draw_proportions(frame, spec, chunks[2]),
        GraphKind::Bar => draw_bars(frame, spec, chunks[2]),
        _ => draw_plot(frame, spec, chunks[2]),
    }

    if spec.legend_visible() {
        let legend_area = if legend_on_top { chunks[1] } else { chunks[3] };
        frame.render_widget(Paragraph::new(legend_line(spec)).alignment(Alignment::Center), legend_area);
    }
}

fn legend_line(spec: &ChartSpec) -> Line<'static> {
    let mut spans = Vec::new();
    if spec.kind.is_radial() {
        if let Some(dataset) = spec.datasets.first() {
            for (i, label) in spec.labels.iter().enumerate() {
                spans.push(Span::styled("■ ", Style::default().fg(dataset.value_color(i))));
                spans.push(Span::styled(format!("{}   ", label), Style::default().fg(TEXT_SECONDARY)));
            }
        }
    } else {
        for (i, dataset) in spec.datasets.iter().enumerate() {
            let label = dataset.label.clone().unwrap_or_else(|| format!("Series {}", i + 1));
            spans.push(Span::styled("■ ", Style::default().fg(dataset.color())));
            spans.push(Span::styled(format!("{}   ", label), Style::default().fg(TEXT_SECONDARY)));
        }
    }
    Line::from(spans)
}

/// Pie, doughnut and polar charts as one proportion bar per label.
fn draw_proportions(frame: &mut Frame, spec: &ChartSpec, area: Rect) {
    let label_width = spec.labels.iter().map(|l| l.width()).max().unwrap_or(0).min(24);
    let bar_width = (area.width as usize).saturating_sub(label_width + 24).max(4);

    let mut lines: Vec<Line> = Vec::new();
    for dataset in &spec.datasets {
        if spec.datasets.len() > 1 {
            let name = dataset.label.clone().unwrap_or_default();
            lines.push(Line::from(Span::styled(name, Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD))));
        }

        let values = dataset.data.iter().map(|p| p.value().unwrap_or(0.0).max(0.0)).collect::<Vec<_>>();
        let total: f64 = values.iter().sum();
        for (i, value) in values.iter().enumerate() {
            let share = if total > 0.0 { value / total } else { 0.0 };
            let filled = (share * bar_width as f64).round() as usize;
            let label = spec.labels.get(i).cloned().unwrap_or_default();
            let value_text = abbreviate_tick(*value);
            let detail = spec
                .tooltip
                .format("label", &value_text, Some(label.as_str()), dataset.label.as_deref())
                .unwrap_or_else(|| format!("{:.1}%  ({})", share * 100.0, value_text));

            lines.push(Line::from(vec![
                Span::styled(format!("{:>width$} ", label, width = label_width), Style::default().fg(TEXT_SECONDARY)),
                Span::styled("█".repeat(filled), Style::default().fg(dataset.value_color(i))),
                Span::styled("░".repeat(bar_width - filled.min(bar_width)), Style::default().fg(BORDER_DIM)),
                Span::styled(format!(" {}", detail), Style::default().fg(TEXT_PRIMARY)),
            ]));
        }
        lines.push(Line::default());
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_bars(frame: &mut Frame, spec: &ChartSpec, area: Rect) {
    let group_count = spec
        .labels
        .len()
        .max(spec.datasets.iter().map(|d| d.data.len()).max().unwrap_or(0))
        .max(1);
    let series = spec.datasets.len().max(1);
    let bar_width = ((area.width as usize).saturating_sub(group_count * 2) / (group_count * series)).clamp(1, 9) as u16;

    let max = spec.y_bounds()[1].max(f64::EPSILON);
    let mut chart = BarChart::default()
        .bar_width(bar_width)
        .bar_gap(0)
        .group_gap(2)
        .label_style(Style::default().fg(AXIS_COLOR))
        .value_style(Style::default().fg(TEXT_PRIMARY));

    for index in 0..group_count {
        let bars: Vec<Bar> = spec
            .datasets
            .iter()
            .map(|dataset| {
                let value = dataset.data.get(index).and_then(DataPoint::value).unwrap_or(0.0);
                Bar::default()
                    // Scaled so fractional values still get visible height.
                    .value((value.max(0.0) / max * 1000.0).round() as u64)
                    .text_value(abbreviate_tick(value))
                    .style(Style::default().fg(dataset.value_color(index)))
            })
            .collect();
        let label = spec.labels.get(index).cloned().unwrap_or_else(|| (index + 1).to_string());
        chart = chart.data(BarGroup::default().label(Line::from(label)).bars(&bars));
    }

    frame.render_widget(chart, area);
}

/// Line, scatter, bubble, radar and mixed charts on one plot.
fn draw_plot(frame: &mut Frame, spec: &ChartSpec, area: Rect) {
    let points: Vec<Vec<(f64, f64)>> = spec.datasets.iter().map(|d| spec.points(d)).collect();

    let datasets: Vec<ChartDataset> = spec
        .datasets
        .iter()
        .zip(points.iter())
        .map(|(dataset, data)| {
            let graph_type = match dataset.series {
                SeriesType::Line | SeriesType::Radar => GraphType::Line,
                SeriesType::Bar => GraphType::Bar,
                _ => GraphType::Scatter,
            };
            let marker = match dataset.series {
                SeriesType::Bubble => symbols::Marker::Dot,
                SeriesType::Bar => symbols::Marker::HalfBlock,
                _ => symbols::Marker::Braille,
            };
            ChartDataset::default()
                .marker(marker)
                .graph_type(graph_type)
                .style(Style::default().fg(dataset.color()))
                .data(data)
        })
        .collect();

    let [x_lo, x_hi] = spec.x_bounds();
    let [y_lo, y_hi] = spec.y_bounds();

    let x_labels: Vec<String> = if spec.labels.is_empty() {
        vec![abbreviate_tick(x_lo), abbreviate_tick(x_hi)]
    } else {
        let mut labels = vec![spec.labels[0].clone()];
        if spec.labels.len() > 2 {
            labels.push(spec.labels[spec.labels.len() / 2].clone());
        }
        if spec.labels.len() > 1 {
            labels.push(spec.labels[spec.labels.len() - 1].clone());
        }
        labels
    };
    let y_labels = vec![
        abbreviate_tick(y_lo),
        abbreviate_tick((y_lo + y_hi) / 2.0),
        abbreviate_tick(y_hi),
    ];

    let mut x_axis = Axis::default()
        .style(Style::default().fg(AXIS_COLOR))
        .bounds([x_lo, x_hi])
        .labels(x_labels);
    if let Some(title) = spec.axis_title("x") {
        x_axis = x_axis.title(title.to_string());
    }
    let mut y_axis = Axis::default()
        .style(Style::default().fg(AXIS_COLOR))
        .bounds([y_lo, y_hi])
        .labels(y_labels);
    if let Some(title) = spec.axis_title("y") {
        y_axis = y_axis.title(title.to_string());
    }

    let chart = Chart::new(datasets)
        .x_axis(x_axis)
        .y_axis(y_axis)
        .style(Style::default().bg(BG_DARK));
    frame.render_widget(chart, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_thinking(frame: &mut Frame, overlay: &ThinkingOverlay, anim_frame: usize, area: Rect) {
    let popup = centered_rect(area.width.saturating_sub(8).min(90), area.height.saturating_sub(4).min(18), area);
    frame.render_widget(Clear, popup);

    let (border, text_modifier) = if overlay.is_closing() {
        (BORDER_DIM, Modifier::DIM)
    } else {
        (LAVENDER, Modifier::empty())
    };
    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", THINKING_HEADER),
            Style::default().fg(LAVENDER).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(Span::styled(
            format!(" {} ", THINKING_FOOTER),
            Style::default().fg(TEXT_MUTED),
        )))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(BG_PANEL));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let lines: Vec<Line> = match overlay.rendered() {
        Some(rendered) => rendered
            .iter()
            .map(|line| {
                Line::from(
                    line.iter()
                        .map(|inline| match inline {
                            Inline::Text(t) => Span::styled(t.clone(), Style::default().fg(TEXT_SECONDARY)),
                            Inline::Strong(t) => Span::styled(
                                t.clone(),
                                Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
                            ),
                            Inline::Emphasis(t) => Span::styled(
                                t.clone(),
                                Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::ITALIC),
                            ),
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect(),
        None => vec![pulsing_dots(anim_frame)],
    };

    // Keep the newest text in view.
    let overflow = lines.len().saturating_sub(inner.height as usize) as u16;
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((overflow, 0))
        .style(Style::default().add_modifier(text_modifier));
    frame.render_widget(widget, inner);
}

fn pulsing_dots(anim_frame: usize) -> Line<'static> {
    let spans: Vec<Span> = (0..3)
        .map(|i| {
            let phase = (anim_frame as f64 / 15.0) - i as f64 * 0.6;
            let t = phase.sin() * 0.5 + 0.5;
            let level = (90.0 + 150.0 * t) as u8;
            Span::styled("● ", Style::default().fg(Color::Rgb(level, level, 255)))
        })
        .collect();
    Line::from(spans)
}

fn draw_call_alert(frame: &mut Frame, app: &App, area: Rect) {
    let Some(alert) = app.notices.call_alert() else {
        return;
    };
    let headline = alert.headline();
    let width = (headline.width().max(alert.summary.width()) as u16 + 4).clamp(30, 60).min(area.width);
    let popup = Rect {
        x: area.right().saturating_sub(width + 1),
        y: area.y + 1,
        width,
        height: 5.min(area.height),
    };
    frame.render_widget(Clear, popup);

    let received = app
        .notices
        .call_alert_received_at()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", headline),
            Style::default().fg(PALE_YELLOW).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(Span::styled(format!(" {} ", received), Style::default().fg(TEXT_MUTED))))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACCENT))
        .style(Style::default().bg(BG_PANEL));

    let summary = Paragraph::new(alert.summary.as_str())
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(TEXT_PRIMARY))
        .block(block);
    frame.render_widget(summary, popup);
}

fn draw_keyboard_hints(frame: &mut Frame, app: &App, area: Rect) {
    let hints = [("q", "quit"), ("↑↓", "scroll"), ("c", "copy"), ("x", "dismiss"), ("r", "reconnect")];
    let mut spans = vec![Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(key, Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD)));
        spans.push(Span::styled(format!(" {}  ", label), Style::default().fg(TEXT_MUTED)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    if let Some(status) = &app.status_message {
        let widget = Paragraph::new(format!("{} ", status))
            .alignment(Alignment::Right)
            .style(Style::default().fg(OLIVE));
        frame.render_widget(widget, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Duration;
    use url::Url;

    fn render_app(app: &App) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> App {
        App::new(Config::default(), Url::parse("ws://localhost:8000/ws").unwrap())
    }

    #[test]
    fn test_idle_screen_shows_title_and_status() {
        let screen = render_app(&app());
        assert!(screen.contains(IDLE_TITLE));
        assert!(screen.contains("Display service disconnected. Attempting to reconnect..."));
    }

    #[test]
    fn test_markdown_content_drawn() {
        let now = Instant::now();
        let mut app = app();
        app.start(now);
        app.handle_transport(crate::backend::TransportEvent::Opened { attempt: 1 }, now);
        app.handle_frame(r#"{"type":"connection_status","status":{"connection":"connected"}}"#, now);
        app.handle_frame(r#"{"type":"markdown","payload":{"title":"Weekly","content":"All calls done"}}"#, now);
        app.tick(now + Duration::from_millis(700));

        let screen = render_app(&app);
        assert!(screen.contains("Weekly"));
        assert!(screen.contains("All calls done"));
    }

    #[test]
    fn test_charts_draw_without_panicking() {
        let now = Instant::now();
        let mut app = app();
        app.start(now);
        app.handle_transport(crate::backend::TransportEvent::Opened { attempt: 1 }, now);
        app.handle_frame(r#"{"type":"connection_status","status":{"connection":"connected"}}"#, now);

        let frames = [
            r#"{"type":"graph_bar","payload":{"title":"Calls","labels":["Mon","Tue"],"datasets":[{"label":"A","values":[3,1500]},{"label":"B","values":[2,0.5]}]}}"#,
            r#"{"type":"graph_pie","payload":{"labels":["Yes","No"],"datasets":[{"values":[3,1]}]}}"#,
            r#"{"type":"graph_mixed","payload":{"labels":["a","b","c"],"datasets":[{"values":[1,2,3]},{"chartType":"line","values":[3,2,1]}]}}"#,
            r#"{"type":"graph_scatter","payload":{"datasets":[{"values":[{"x":1,"y":2}]}]}}"#,
        ];
        for (i, frame) in frames.iter().enumerate() {
            let at = now + Duration::from_secs(i as u64 + 1);
            app.handle_frame(frame, at);
            app.tick(at + Duration::from_millis(700));
            assert!(app.region.chart().is_some());
            render_app(&app);
        }
    }

    #[test]
    fn test_thinking_overlay_drawn() {
        let now = Instant::now();
        let mut app = app();
        app.handle_frame(r#"{"type":"thinking_start"}"#, now);
        let screen = render_app(&app);
        assert!(screen.contains(THINKING_HEADER));
        assert!(screen.contains(THINKING_FOOTER));
    }
}
