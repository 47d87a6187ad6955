use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use url::Url;

use crate::action::Action;
use crate::backend::{TransportCommand, TransportEvent};
use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::idle;
use crate::notify::{BannerKind, CallAlert, Notifications};
use crate::protocol::{self, AgentStatus, Inbound, ProtocolError};
use crate::render::{self, Content};
use crate::thinking::ThinkingOverlay;
use crate::timer::Timer;
use crate::ui_state::ContentRegion;

/// Lines moved by PgUp/PgDn
const PAGE_LINES: usize = 12;
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// One client session: connection, notifications, thinking overlay and the
/// content region. Only the UI loop touches it.
pub struct App {
    pub config: Config,
    pub connection: ConnectionManager,
    pub notices: Notifications,
    pub thinking: ThinkingOverlay,
    pub region: ContentRegion,
    pub offline: bool,
    pub should_quit: bool,
    pub animation_frame: usize,
    pub status_message: Option<String>,
    status_timer: Timer,
}

impl App {
    pub fn new(config: Config, endpoint: Url) -> Self {
        Self {
            connection: ConnectionManager::new(endpoint, config.reconnect_delay),
            notices: Notifications::new(config.banner_timeout, config.call_alert_timeout),
            thinking: ThinkingOverlay::new(config.thinking_flush_delay, config.thinking_fade),
            region: ContentRegion::new(config.content_fade, config.idle_timeout),
            config,
            offline: false,
            should_quit: false,
            animation_frame: 0,
            status_message: None,
            status_timer: Timer::new(),
        }
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// First connection attempt; nothing is sent in offline mode.
    pub fn start(&mut self, now: Instant) -> Option<TransportCommand> {
        if self.offline {
            info!("offline mode; not connecting to display service");
            return None;
        }
        self.connection.connect(&mut self.notices, now)
    }

    pub fn handle_transport(&mut self, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::Opened { attempt } => self.connection.on_open(attempt, &mut self.notices, now),
            TransportEvent::Frame { attempt, text } => {
                if attempt != self.connection.attempt() {
                    debug!(attempt, "dropping frame from stale attempt");
                    return;
                }
                self.handle_frame(&text, now);
            }
            TransportEvent::Error { attempt, message } => {
                self.connection.on_error(attempt, &message, &mut self.notices, now)
            }
            TransportEvent::Closed { attempt, code, reason } => {
                self.connection.on_close(attempt, code, &reason, &mut self.notices, now)
            }
        }
    }

    /// Route one inbound frame. Control kinds always apply; display kinds
    /// only while the agent is ready.
    pub fn handle_frame(&mut self, text: &str, now: Instant) {
        let inbound = match protocol::decode(text) {
            Ok(inbound) => inbound,
            Err(err @ ProtocolError::InvalidPayload { .. }) => {
                warn!(error = %err, "ignoring frame");
                return;
            }
            Err(err) => {
                error!(error = %err, "invalid frame");
                return;
            }
        };

        match inbound {
            Inbound::ConnectionStatus(status) => self.apply_agent_status(status, now),
            Inbound::CallUpdate(update) => {
                if update.contact_name.is_empty() || update.status_summary.is_empty() {
                    warn!("call update without contact or summary");
                    return;
                }
                let job_id = update.job_label();
                self.notices.show_call_alert(
                    CallAlert {
                        contact_name: update.contact_name,
                        summary: update.status_summary,
                        job_id,
                    },
                    now,
                );
            }
            Inbound::ThinkingStart => self.thinking.start(),
            Inbound::ThinkingDelta(chunk) => {
                if !self.thinking.delta(&chunk, now) {
                    debug!("thinking delta without open overlay");
                }
            }
            Inbound::ThinkingEnd => self.thinking.finish(now),
            Inbound::ThinkingError(err) => {
                self.thinking.finish(now);
                if let Some(err) = err {
                    error!(error = %err, "thinking error");
                    self.notices
                        .show_banner(format!("Thinking process error: {}", err), BannerKind::Error, now);
                }
            }
            Inbound::Display { kind, payload } => {
                if !self.connection.agent_ready() {
                    warn!(?kind, "agent not connected; ignoring display message");
                    return;
                }
                let Some(payload) = payload else {
                    error!(?kind, "display message without payload");
                    return;
                };
                let content = render::render(&kind, &payload);
                self.region.show(content, now);
            }
            Inbound::Unknown(kind) => warn!(%kind, "unhandled message type"),
        }
    }

    fn apply_agent_status(&mut self, status: AgentStatus, now: Instant) {
        if status.is_connected() {
            self.connection.set_agent_ready(true);
            let message = status.message.unwrap_or_else(|| "Agent ready.".to_string());
            self.notices.show_banner(message, BannerKind::Connected, now);
        } else {
            self.connection.set_agent_ready(false);
            let kind = if status.is_disconnected() {
                BannerKind::Disconnected
            } else {
                BannerKind::Error
            };
            let message = status
                .message
                .unwrap_or_else(|| "Agent connection issue.".to_string());
            self.notices.show_banner(message, kind, now);
        }
        info!(agent_ready = self.connection.agent_ready(), "agent status");
    }

    /// Advance every timer; returns a connect command when a reconnect fires.
    pub fn tick(&mut self, now: Instant) -> Option<TransportCommand> {
        self.animation_frame = (self.animation_frame + 1) % 360;

        self.notices.tick(now);
        self.thinking.tick(now);
        self.region.tick(now);
        if self.status_timer.fire(now) {
            self.status_message = None;
        }

        if self.offline {
            return None;
        }
        self.connection.tick(&mut self.notices, now)
    }

    pub fn apply(&mut self, action: Action, now: Instant) -> Option<TransportCommand> {
        match action {
            Action::Quit => self.should_quit = true,
            Action::ScrollUp => self.region.scroll_up(self.config.scroll_step),
            Action::ScrollDown => self.region.scroll_down(self.config.scroll_step),
            Action::PageUp => self.region.scroll_up(PAGE_LINES),
            Action::PageDown => self.region.scroll_down(PAGE_LINES),
            Action::DismissNotifications => self.notices.dismiss_all(),
            // Clipboard access is done by the caller via content_source().
            Action::CopyContent => {}
            Action::Reconnect => {
                if self.offline {
                    self.set_status("Offline mode: not connecting", now);
                    return None;
                }
                return self.connection.reconnect_now(&mut self.notices, now);
            }
        }
        None
    }

    pub fn set_status(&mut self, message: impl Into<String>, now: Instant) {
        self.status_message = Some(message.into());
        self.status_timer.arm(now, STATUS_TIMEOUT);
    }

    pub fn status_line(&self) -> &'static str {
        idle::status_line(self.connection.state(), self.connection.agent_ready())
    }

    /// Whole seconds until the pending reconnect, rounded up.
    pub fn reconnect_countdown(&self, now: Instant) -> Option<u64> {
        let remaining = self.connection.reconnect_due()?.saturating_duration_since(now);
        Some(remaining.as_millis().div_ceil(1000) as u64)
    }

    pub fn content_source(&self) -> Option<String> {
        self.region.active().map(Content::source_text)
    }
}
