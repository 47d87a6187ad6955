//! Overlay showing the agent's streamed reasoning while it works.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::timer::{CoalescingBuffer, Timer};

pub const THINKING_HEADER: &str = "I am working on the task...";
pub const THINKING_FOOTER: &str = "Please wait while I process your request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
    Emphasis(String),
}

impl Inline {
    pub fn text(&self) -> &str {
        match self {
            Inline::Text(s) | Inline::Strong(s) | Inline::Emphasis(s) => s,
        }
    }

    fn with_text(&self, text: String) -> Inline {
        match self {
            Inline::Text(_) => Inline::Text(text),
            Inline::Strong(_) => Inline::Strong(text),
            Inline::Emphasis(_) => Inline::Emphasis(text),
        }
    }
}

pub type ThinkingLine = Vec<Inline>;

/// Convert buffered thinking text to display lines: `**x**` becomes strong,
/// then `*x*` in the remaining text becomes emphasis, and every newline
/// starts a new line. Markers may enclose a newline.
pub fn format_thinking(text: &str) -> Vec<ThinkingLine> {
    let mut strong_pass = Vec::new();
    split_pairs(text, "**", Inline::Strong, &mut strong_pass);

    let mut inlines = Vec::new();
    for inline in strong_pass {
        match inline {
            Inline::Text(plain) => split_pairs(&plain, "*", Inline::Emphasis, &mut inlines),
            other => inlines.push(other),
        }
    }

    let mut lines: Vec<ThinkingLine> = vec![Vec::new()];
    for inline in inlines {
        let mut pieces = inline.text().split('\n');
        if let Some(first) = pieces.next() {
            push_piece(&mut lines, &inline, first);
        }
        for piece in pieces {
            lines.push(Vec::new());
            push_piece(&mut lines, &inline, piece);
        }
    }
    lines
}

fn push_piece(lines: &mut [ThinkingLine], inline: &Inline, piece: &str) {
    if piece.is_empty() {
        return;
    }
    if let Some(line) = lines.last_mut() {
        line.push(inline.with_text(piece.to_string()));
    }
}

/// Leftmost, shortest matching of `marker ... marker`.
fn split_pairs(text: &str, marker: &str, wrap: fn(String) -> Inline, out: &mut Vec<Inline>) {
    let mut rest = text;
    while let Some(open) = rest.find(marker) {
        let after = &rest[open + marker.len()..];
        let Some(close) = after.find(marker) else {
            break;
        };
        if open > 0 {
            out.push(Inline::Text(rest[..open].to_string()));
        }
        out.push(wrap(after[..close].to_string()));
        rest = &after[close + marker.len()..];
    }
    if !rest.is_empty() {
        out.push(Inline::Text(rest.to_string()));
    }
}

/// Plain text of formatted lines, joined with newlines.
#[cfg(test)]
pub fn plain_text(lines: &[ThinkingLine]) -> String {
    lines
        .iter()
        .map(|line| line.iter().map(Inline::text).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Closed,
    Open,
    Closing,
}

pub struct ThinkingOverlay {
    phase: Phase,
    buffer: CoalescingBuffer,
    /// `None` until the first flush; the overlay shows pulsing dots meanwhile.
    rendered: Option<Vec<ThinkingLine>>,
    fade: Timer,
    fade_duration: Duration,
}

impl ThinkingOverlay {
    pub fn new(flush_delay: Duration, fade_duration: Duration) -> Self {
        Self {
            phase: Phase::Closed,
            buffer: CoalescingBuffer::new(flush_delay),
            rendered: None,
            fade: Timer::new(),
            fade_duration,
        }
    }

    /// Open the overlay. When already open only the buffer is reset.
    pub fn start(&mut self) {
        match self.phase {
            Phase::Open => {
                debug!("thinking overlay already open; resetting buffer");
                self.buffer.clear();
            }
            Phase::Closed | Phase::Closing => {
                self.fade.cancel();
                self.buffer.clear();
                self.rendered = None;
                self.phase = Phase::Open;
            }
        }
    }

    /// Buffer a streamed fragment. Ignored unless the overlay is open.
    pub fn delta(&mut self, chunk: &str, now: Instant) -> bool {
        if self.phase != Phase::Open || chunk.is_empty() {
            return false;
        }
        self.buffer.push(chunk, now);
        true
    }

    /// Begin the fade-out; the overlay is removed when it completes.
    pub fn finish(&mut self, now: Instant) {
        if self.phase != Phase::Open {
            return;
        }
        self.buffer.cancel_flush();
        self.phase = Phase::Closing;
        self.fade.arm(now, self.fade_duration);
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(text) = self.buffer.poll(now) {
            debug!(chars = text.len(), "thinking overlay redraw");
            self.rendered = Some(format_thinking(text));
        }
        if self.fade.fire(now) {
            self.phase = Phase::Closed;
            self.buffer.clear();
            self.rendered = None;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.phase != Phase::Closed
    }

    pub fn is_closing(&self) -> bool {
        self.phase == Phase::Closing
    }

    pub fn rendered(&self) -> Option<&[ThinkingLine]> {
        self.rendered.as_deref()
    }

    #[cfg(test)]
    pub fn buffered(&self) -> &str {
        self.buffer.contents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay() -> ThinkingOverlay {
        ThinkingOverlay::new(Duration::from_millis(100), Duration::from_millis(300))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_format_strong_and_emphasis() {
        let lines = format_thinking("Check **totals** and *dates*");
        assert_eq!(
            lines,
            vec![vec![
                Inline::Text("Check ".to_string()),
                Inline::Strong("totals".to_string()),
                Inline::Text(" and ".to_string()),
                Inline::Emphasis("dates".to_string()),
            ]]
        );
    }

    #[test]
    fn test_format_newlines_become_lines() {
        let lines = format_thinking("one\ntwo\n\nfour");
        assert_eq!(plain_text(&lines), "one\ntwo\n\nfour");
        assert_eq!(lines.len(), 4);
        assert!(lines[2].is_empty());
    }

    #[test]
    fn test_format_strong_spanning_newline() {
        let lines = format_thinking("**a\nb** c");
        assert_eq!(lines[0], vec![Inline::Strong("a".to_string())]);
        assert_eq!(
            lines[1],
            vec![Inline::Strong("b".to_string()), Inline::Text(" c".to_string())]
        );
    }

    #[test]
    fn test_format_unmatched_marker_kept() {
        let lines = format_thinking("cost is 5 * 3");
        assert_eq!(plain_text(&lines), "cost is 5 * 3");
    }

    #[test]
    fn test_deltas_concatenate_in_order() {
        let start = Instant::now();
        let mut overlay = overlay();
        overlay.start();

        let deltas = ["Look", "ing up **Ana", "**\nfound *3* calls", "\ndone"];
        for (i, d) in deltas.iter().enumerate() {
            overlay.delta(d, start + ms(i as u64 * 10));
        }
        overlay.tick(start + ms(200));

        let rendered = overlay.rendered().unwrap();
        assert_eq!(plain_text(rendered), "Looking up Ana\nfound 3 calls\ndone");
        assert_eq!(rendered[0][1], Inline::Strong("Ana".to_string()));
        assert_eq!(rendered[1][1], Inline::Emphasis("3".to_string()));
    }

    #[test]
    fn test_rapid_deltas_coalesce() {
        let start = Instant::now();
        let mut overlay = overlay();
        overlay.start();
        overlay.delta("a", start);
        overlay.tick(start + ms(50));
        overlay.delta("b", start + ms(60));
        overlay.tick(start + ms(120));

        assert!(overlay.rendered().is_none(), "still inside the debounce window");
        overlay.tick(start + ms(160));
        assert_eq!(plain_text(overlay.rendered().unwrap()), "ab");
    }

    #[test]
    fn test_delta_ignored_when_closed() {
        let mut overlay = overlay();
        assert!(!overlay.delta("lost", Instant::now()));
        assert!(overlay.buffered().is_empty());
    }

    #[test]
    fn test_second_start_resets_buffer() {
        let start = Instant::now();
        let mut overlay = overlay();
        overlay.start();
        overlay.delta("old", start);
        overlay.start();

        assert!(overlay.is_visible());
        assert!(overlay.buffered().is_empty());
    }

    #[test]
    fn test_finish_fades_then_clears() {
        let start = Instant::now();
        let mut overlay = overlay();
        overlay.start();
        overlay.delta("text", start);
        overlay.finish(start + ms(10));

        // The pending flush was cancelled.
        overlay.tick(start + ms(200));
        assert!(overlay.rendered().is_none());
        assert!(overlay.is_closing());

        overlay.tick(start + ms(310));
        assert!(!overlay.is_visible());
        assert!(overlay.buffered().is_empty());
    }

    #[test]
    fn test_start_during_fade_reopens() {
        let start = Instant::now();
        let mut overlay = overlay();
        overlay.start();
        overlay.finish(start);
        overlay.start();
        overlay.tick(start + ms(400));

        assert!(overlay.is_visible());
        assert!(!overlay.is_closing());
    }
}
