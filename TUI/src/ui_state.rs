use std::mem;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::chart::ChartSpec;
use crate::idle::IdleScreen;
use crate::render::Content;
use crate::timer::Timer;

/// What replaces the region once the fade-out completes.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending {
    Idle,
    Content(Content),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Idle(IdleScreen),
    Active(Content),
    /// Previous content fading out. Charts are destroyed at teardown, so a
    /// leaving chart shows as an empty region.
    FadingOut { leaving: Option<Content>, next: Pending },
}

/// The single content region: idle screen, or exactly one rendered item.
pub struct ContentRegion {
    stage: Stage,
    fade: Timer,
    fade_duration: Duration,
    inactivity: Timer,
    idle_timeout: Duration,
    scroll_offset: usize,
}

impl ContentRegion {
    pub fn new(fade_duration: Duration, idle_timeout: Duration) -> Self {
        Self {
            stage: Stage::Idle(IdleScreen::new()),
            fade: Timer::new(),
            fade_duration,
            inactivity: Timer::new(),
            idle_timeout,
            scroll_offset: 0,
        }
    }

    /// Tear down whatever is shown and insert `content` after the fade.
    pub fn show(&mut self, content: Content, now: Instant) {
        self.teardown(Pending::Content(content), now);
    }

    /// Revert to the idle screen through the same teardown.
    pub fn show_idle(&mut self, now: Instant) {
        if matches!(self.stage, Stage::Idle(_)) {
            return;
        }
        self.teardown(Pending::Idle, now);
    }

    fn teardown(&mut self, next: Pending, now: Instant) {
        self.inactivity.cancel();

        let placeholder = Stage::FadingOut {
            leaving: None,
            next: Pending::Idle,
        };
        let leaving = match mem::replace(&mut self.stage, placeholder) {
            // Dropping the idle screen stops its animation.
            Stage::Idle(_) => None,
            Stage::Active(content) if content.is_chart() => {
                debug!("destroying chart");
                None
            }
            Stage::Active(content) => Some(content),
            Stage::FadingOut { leaving, next: superseded } => {
                if let Pending::Content(_) = superseded {
                    debug!("pending render superseded");
                }
                leaving
            }
        };

        self.stage = Stage::FadingOut { leaving, next };
        self.fade.arm(now, self.fade_duration);
    }

    pub fn tick(&mut self, now: Instant) {
        if let Stage::Idle(screen) = &mut self.stage {
            screen.logo.step();
        }

        if self.fade.fire(now) {
            let placeholder = Stage::Idle(IdleScreen::new());
            if let Stage::FadingOut { next, .. } = mem::replace(&mut self.stage, placeholder) {
                self.scroll_offset = 0;
                if let Pending::Content(content) = next {
                    self.inactivity.arm(now, self.idle_timeout);
                    self.stage = Stage::Active(content);
                }
            }
        }

        if self.inactivity.fire(now) {
            info!(
                timeout_secs = self.idle_timeout.as_secs(),
                "content inactive; returning to idle screen"
            );
            self.show_idle(now);
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        matches!(self.stage, Stage::Idle(_))
    }

    #[cfg(test)]
    pub fn is_fading(&self) -> bool {
        matches!(self.stage, Stage::FadingOut { .. })
    }

    pub fn active(&self) -> Option<&Content> {
        match &self.stage {
            Stage::Active(content) => Some(content),
            _ => None,
        }
    }

    pub fn chart(&self) -> Option<&ChartSpec> {
        match self.active() {
            Some(Content::Chart(spec)) => Some(spec),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn idle_screen(&self) -> Option<&IdleScreen> {
        match &self.stage {
            Stage::Idle(screen) => Some(screen),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn inactivity_due(&self) -> Option<Instant> {
        self.inactivity.due()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// The renderer clamps the offset to the content height.
    pub fn scroll_down(&mut self, lines: usize) {
        if self.active().is_some() {
            self.scroll_offset = self.scroll_offset.saturating_add(lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DisplayKind;
    use crate::render::render;
    use serde_json::json;

    const FADE: Duration = Duration::from_millis(700);
    const IDLE: Duration = Duration::from_secs(300);

    fn region() -> ContentRegion {
        ContentRegion::new(FADE, IDLE)
    }

    fn markdown(text: &str) -> Content {
        render(&DisplayKind::Markdown, &json!({ "content": text }))
    }

    fn chart() -> Content {
        render(
            &DisplayKind::Graph("graph_bar".to_string()),
            &json!({"labels": ["a"], "datasets": [{"values": [1]}]}),
        )
    }

    #[test]
    fn test_starts_idle() {
        let region = region();
        assert!(region.is_idle());
        assert!(region.inactivity_due().is_none());
    }

    #[test]
    fn test_content_inserted_after_fade() {
        let start = Instant::now();
        let mut region = region();
        region.show(markdown("hello"), start);

        region.tick(start + Duration::from_millis(699));
        assert!(region.is_fading());

        region.tick(start + FADE);
        assert_eq!(region.active(), Some(&markdown("hello")));
        assert_eq!(region.inactivity_due(), Some(start + FADE + IDLE));
    }

    #[test]
    fn test_inactivity_reverts_to_idle() {
        let start = Instant::now();
        let mut region = region();
        region.show(markdown("hello"), start);
        region.tick(start + FADE);

        let expiry = start + FADE + IDLE;
        region.tick(expiry);
        assert!(region.is_fading(), "reversion goes through the teardown fade");

        region.tick(expiry + FADE);
        assert!(region.is_idle());
        assert!(region.inactivity_due().is_none());
    }

    #[test]
    fn test_new_render_cancels_inactivity() {
        let start = Instant::now();
        let mut region = region();
        region.show(markdown("one"), start);
        region.tick(start + FADE);

        let second = start + Duration::from_secs(200);
        region.show(markdown("two"), second);
        assert!(region.inactivity_due().is_none());
        region.tick(second + FADE);

        // The first content's deadline passes without effect.
        region.tick(start + FADE + IDLE);
        assert_eq!(region.active(), Some(&markdown("two")));
        assert_eq!(region.inactivity_due(), Some(second + FADE + IDLE));
    }

    #[test]
    fn test_render_during_fade_supersedes_pending() {
        let start = Instant::now();
        let mut region = region();
        region.show(markdown("first"), start);
        region.show(markdown("second"), start + Duration::from_millis(100));

        region.tick(start + FADE);
        assert!(region.is_fading());
        region.tick(start + Duration::from_millis(800));
        assert_eq!(region.active(), Some(&markdown("second")));
    }

    #[test]
    fn test_chart_destroyed_on_teardown() {
        let start = Instant::now();
        let mut region = region();
        region.show(chart(), start);
        region.tick(start + FADE);
        assert!(region.chart().is_some());

        region.show(markdown("next"), start + Duration::from_secs(1));
        assert!(region.chart().is_none());
        assert!(matches!(region.stage(), Stage::FadingOut { leaving: None, .. }));
    }

    #[test]
    fn test_inline_error_arms_inactivity() {
        let start = Instant::now();
        let mut region = region();
        let error = render(&DisplayKind::Graph("graph_heatmap".to_string()), &json!({}));
        region.show(error, start);
        region.tick(start + FADE);
        assert!(region.inactivity_due().is_some());
    }

    #[test]
    fn test_logo_steps_only_while_idle() {
        let start = Instant::now();
        let mut region = region();
        region.tick(start);
        region.tick(start);
        assert_eq!(region.idle_screen().map(|s| s.logo.frames()), Some(2));

        region.show(markdown("x"), start);
        region.tick(start + Duration::from_millis(10));
        assert!(region.idle_screen().is_none());
    }

    #[test]
    fn test_scroll_resets_on_insert() {
        let start = Instant::now();
        let mut region = region();
        region.show(markdown("x"), start);
        region.tick(start + FADE);
        region.scroll_down(6);
        region.scroll_up(2);
        assert_eq!(region.scroll_offset(), 4);

        region.show(markdown("y"), start + Duration::from_secs(1));
        region.tick(start + Duration::from_secs(1) + FADE);
        assert_eq!(region.scroll_offset(), 0);
    }
}
