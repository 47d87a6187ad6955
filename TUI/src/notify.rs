//! Transient banners shown above the content region.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::timer::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Connected,
    Disconnected,
    Error,
    Info,
}

impl BannerKind {
    /// Error banners stay up until another banner replaces them.
    pub fn auto_dismisses(self) -> bool {
        !matches!(self, BannerKind::Error)
    }
}

#[derive(Debug, Clone)]
pub struct Banner {
    pub message: String,
    pub kind: BannerKind,
    pub shown_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallAlert {
    pub contact_name: String,
    pub summary: String,
    pub job_id: Option<String>,
}

impl CallAlert {
    pub fn headline(&self) -> String {
        match &self.job_id {
            Some(job) => format!("Call Update (Job {}): {}", job, self.contact_name),
            None => format!("Call Update: {}", self.contact_name),
        }
    }
}

pub struct Notifications {
    banner: Option<Banner>,
    banner_timer: Timer,
    banner_timeout: Duration,
    call_alert: Option<(CallAlert, DateTime<Local>)>,
    call_timer: Timer,
    call_timeout: Duration,
}

impl Notifications {
    pub fn new(banner_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            banner: None,
            banner_timer: Timer::new(),
            banner_timeout,
            call_alert: None,
            call_timer: Timer::new(),
            call_timeout,
        }
    }

    /// Replace the connection banner, cancelling the previous dismiss timer.
    pub fn show_banner(&mut self, message: impl Into<String>, kind: BannerKind, now: Instant) {
        let message = message.into();
        debug!(?kind, %message, "banner");

        self.banner_timer.cancel();
        if kind.auto_dismisses() {
            self.banner_timer.arm(now, self.banner_timeout);
        }
        self.banner = Some(Banner {
            message,
            kind,
            shown_at: Local::now(),
        });
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn banner_is_error(&self) -> bool {
        matches!(&self.banner, Some(b) if b.kind == BannerKind::Error)
    }

    /// Show a call update, superseding any earlier one and its timer.
    pub fn show_call_alert(&mut self, alert: CallAlert, now: Instant) {
        self.call_timer.arm(now, self.call_timeout);
        self.call_alert = Some((alert, Local::now()));
    }

    pub fn call_alert(&self) -> Option<&CallAlert> {
        self.call_alert.as_ref().map(|(alert, _)| alert)
    }

    pub fn call_alert_received_at(&self) -> Option<DateTime<Local>> {
        self.call_alert.as_ref().map(|(_, at)| *at)
    }

    pub fn dismiss_all(&mut self) {
        self.banner = None;
        self.banner_timer.cancel();
        self.call_alert = None;
        self.call_timer.cancel();
    }

    pub fn tick(&mut self, now: Instant) {
        if self.banner_timer.fire(now) {
            self.banner = None;
        }
        if self.call_timer.fire(now) {
            self.call_alert = None;
        }
    }
}
