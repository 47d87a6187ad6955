//! Connection lifecycle for the display socket.
//!
//! `ConnectionManager` owns the connection state and the reconnect timer.
//! The socket itself lives in the transport task (`backend.rs`); the manager
//! only decides when an attempt starts and reacts to what the task reports.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use url::Url;

use crate::backend::TransportCommand;
use crate::notify::{BannerKind, Notifications};
use crate::timer::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// Colour of the header status dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

pub struct ConnectionManager {
    endpoint: Url,
    state: ConnectionState,
    agent_ready: bool,
    indicator: StatusIndicator,
    attempt: u64,
    reconnect: Timer,
    reconnect_delay: Duration,
}

impl ConnectionManager {
    pub fn new(endpoint: Url, reconnect_delay: Duration) -> Self {
        Self {
            endpoint,
            state: ConnectionState::Disconnected,
            agent_ready: false,
            indicator: StatusIndicator::Disconnected,
            attempt: 0,
            reconnect: Timer::new(),
            reconnect_delay,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn agent_ready(&self) -> bool {
        self.agent_ready
    }

    pub fn indicator(&self) -> StatusIndicator {
        self.indicator
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    #[cfg(test)]
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_pending()
    }

    pub fn reconnect_due(&self) -> Option<Instant> {
        self.reconnect.due()
    }

    /// Start a new connection attempt unless one is already open or in flight.
    pub fn connect(&mut self, notices: &mut Notifications, now: Instant) -> Option<TransportCommand> {
        if matches!(self.state, ConnectionState::Open | ConnectionState::Connecting) {
            debug!(state = ?self.state, "connect ignored");
            return None;
        }

        self.reconnect.cancel();
        self.attempt += 1;
        self.state = ConnectionState::Connecting;
        self.agent_ready = false;
        self.indicator = StatusIndicator::Connecting;
        notices.show_banner("Connecting to display service...", BannerKind::Info, now);
        info!(attempt = self.attempt, endpoint = %self.endpoint, "connecting to display service");

        Some(TransportCommand::Connect {
            attempt: self.attempt,
            endpoint: self.endpoint.clone(),
        })
    }

    fn is_current(&self, attempt: u64) -> bool {
        if attempt != self.attempt {
            debug!(attempt, current = self.attempt, "ignoring event from stale attempt");
            return false;
        }
        true
    }

    pub fn on_open(&mut self, attempt: u64, notices: &mut Notifications, now: Instant) {
        if !self.is_current(attempt) {
            return;
        }
        info!(attempt, "display service connected");
        self.state = ConnectionState::Open;
        self.agent_ready = false;
        self.indicator = StatusIndicator::Connected;
        notices.show_banner("Display service connected.", BannerKind::Connected, now);
    }

    pub fn on_error(&mut self, attempt: u64, message: &str, notices: &mut Notifications, now: Instant) {
        if !self.is_current(attempt) {
            return;
        }
        warn!(attempt, %message, "display service transport error");
        self.state = ConnectionState::Disconnected;
        self.agent_ready = false;
        self.indicator = StatusIndicator::Error;
        notices.show_banner(
            "Error connecting to display service. Retrying...",
            BannerKind::Error,
            now,
        );
        self.schedule_reconnect(now);
    }

    pub fn on_close(
        &mut self,
        attempt: u64,
        code: Option<u16>,
        reason: &str,
        notices: &mut Notifications,
        now: Instant,
    ) {
        if !self.is_current(attempt) {
            return;
        }
        info!(attempt, ?code, %reason, "display service closed");
        self.state = ConnectionState::Disconnected;
        self.agent_ready = false;
        self.indicator = StatusIndicator::Disconnected;
        // An error banner from the same outage stays in place.
        if !notices.banner_is_error() {
            notices.show_banner(
                "Display service disconnected. Attempting to reconnect...",
                BannerKind::Disconnected,
                now,
            );
        }
        self.schedule_reconnect(now);
    }

    fn schedule_reconnect(&mut self, now: Instant) {
        if self.reconnect.arm_if_idle(now, self.reconnect_delay) {
            debug!(delay_ms = self.reconnect_delay.as_millis() as u64, "reconnect scheduled");
        }
    }

    /// Record the upstream agent's readiness. Only an open transport can
    /// carry a ready agent; returns the effective flag.
    pub fn set_agent_ready(&mut self, ready: bool) -> bool {
        self.agent_ready = ready && self.state == ConnectionState::Open;
        self.indicator = if self.agent_ready {
            StatusIndicator::Connected
        } else {
            StatusIndicator::Disconnected
        };
        self.agent_ready
    }

    /// Skip the remaining reconnect delay.
    pub fn reconnect_now(&mut self, notices: &mut Notifications, now: Instant) -> Option<TransportCommand> {
        if self.state != ConnectionState::Disconnected {
            return None;
        }
        self.connect(notices, now)
    }

    pub fn tick(&mut self, notices: &mut Notifications, now: Instant) -> Option<TransportCommand> {
        if self.reconnect.fire(now) {
            return self.connect(notices, now);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ConnectionManager, Notifications, Instant) {
        let endpoint = Url::parse("ws://localhost:8000/ws").unwrap();
        (
            ConnectionManager::new(endpoint, Duration::from_millis(5000)),
            Notifications::new(Duration::from_millis(4000), Duration::from_millis(20_000)),
            Instant::now(),
        )
    }

    #[test]
    fn test_connect_is_idempotent_while_connecting() {
        let (mut conn, mut notices, now) = setup();

        assert!(conn.connect(&mut notices, now).is_some());
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(conn.connect(&mut notices, now).is_none());
        assert_eq!(conn.attempt(), 1);
    }

    #[test]
    fn test_connect_is_idempotent_while_open() {
        let (mut conn, mut notices, now) = setup();
        conn.connect(&mut notices, now);
        conn.on_open(1, &mut notices, now);

        assert!(conn.connect(&mut notices, now).is_none());
        assert_eq!(conn.state(), ConnectionState::Open);
    }

    #[test]
    fn test_open_resets_agent_flag_and_shows_banner() {
        let (mut conn, mut notices, now) = setup();
        conn.connect(&mut notices, now);
        conn.on_open(1, &mut notices, now);

        assert!(!conn.agent_ready());
        assert_eq!(notices.banner().unwrap().kind, BannerKind::Connected);
        assert_eq!(conn.indicator(), StatusIndicator::Connected);
    }

    #[test]
    fn test_close_schedules_exactly_one_reconnect() {
        let (mut conn, mut notices, now) = setup();
        conn.connect(&mut notices, now);
        conn.on_open(1, &mut notices, now);
        conn.on_close(1, Some(1006), "", &mut notices, now);

        assert!(conn.reconnect_pending());
        assert!(conn.tick(&mut notices, now + Duration::from_millis(4999)).is_none());
        let cmd = conn.tick(&mut notices, now + Duration::from_millis(5000));
        assert!(matches!(cmd, Some(TransportCommand::Connect { attempt: 2, .. })));
        assert!(conn.tick(&mut notices, now + Duration::from_millis(20_000)).is_none());
    }

    #[test]
    fn test_error_then_close_schedules_one_reconnect() {
        let (mut conn, mut notices, now) = setup();
        conn.connect(&mut notices, now);
        conn.on_error(1, "refused", &mut notices, now);
        conn.on_close(1, None, "", &mut notices, now + Duration::from_millis(10));

        // The deadline comes from the error, not pushed back by the close.
        assert_eq!(conn.reconnect_due(), Some(now + Duration::from_millis(5000)));
        assert!(conn.tick(&mut notices, now + Duration::from_millis(5000)).is_some());
        assert_eq!(conn.attempt(), 2);
        assert!(!conn.reconnect_pending());
    }

    #[test]
    fn test_close_keeps_error_banner() {
        let (mut conn, mut notices, now) = setup();
        conn.connect(&mut notices, now);
        conn.on_error(1, "boom", &mut notices, now);
        conn.on_close(1, None, "", &mut notices, now);

        assert!(notices.banner_is_error());
        assert_eq!(conn.indicator(), StatusIndicator::Disconnected);
    }

    #[test]
    fn test_close_without_error_shows_disconnected_banner() {
        let (mut conn, mut notices, now) = setup();
        conn.connect(&mut notices, now);
        conn.on_open(1, &mut notices, now);
        conn.on_close(1, Some(1000), "bye", &mut notices, now);

        assert_eq!(notices.banner().unwrap().kind, BannerKind::Disconnected);
    }

    #[test]
    fn test_stale_attempt_events_are_ignored() {
        let (mut conn, mut notices, now) = setup();
        conn.connect(&mut notices, now);
        conn.on_error(1, "refused", &mut notices, now);
        conn.tick(&mut notices, now + Duration::from_secs(5));
        assert_eq!(conn.attempt(), 2);

        // A late close from attempt 1 must not disturb attempt 2.
        conn.on_close(1, None, "", &mut notices, now + Duration::from_secs(5));
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(!conn.reconnect_pending());
    }

    #[test]
    fn test_agent_flag_requires_open_transport() {
        let (mut conn, mut notices, now) = setup();
        assert!(!conn.set_agent_ready(true));

        conn.connect(&mut notices, now);
        conn.on_open(1, &mut notices, now);
        assert!(conn.set_agent_ready(true));

        conn.on_close(1, None, "", &mut notices, now);
        assert!(!conn.agent_ready());
    }

    #[test]
    fn test_reconnect_now_cancels_timer() {
        let (mut conn, mut notices, now) = setup();
        conn.connect(&mut notices, now);
        conn.on_close(1, None, "", &mut notices, now);

        assert!(conn.reconnect_now(&mut notices, now).is_some());
        assert!(!conn.reconnect_pending());
        assert!(conn.tick(&mut notices, now + Duration::from_secs(10)).is_none());
    }
}
