//! Idle screen: the resting view with a floating logo and a status line.

use crate::connection::ConnectionState;

pub const IDLE_TITLE: &str = "Ready to assist";

const SCALE_MIN: f64 = 0.98;
const SCALE_MAX: f64 = 1.02;
const SCALE_STEP: f64 = 0.0005;
const FLOAT_MAX: f64 = 5.0;
const FLOAT_STEP: f64 = 0.1;

/// Gentle pulse and float of the idle logo, advanced once per frame.
/// Both components reverse direction when they leave their bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoPulse {
    scale: f64,
    scale_step: f64,
    offset: f64,
    offset_step: f64,
    frames: u64,
}

impl Default for LogoPulse {
    fn default() -> Self {
        Self {
            scale: 1.0,
            scale_step: SCALE_STEP,
            offset: 0.0,
            offset_step: FLOAT_STEP,
            frames: 0,
        }
    }
}

impl LogoPulse {
    pub fn step(&mut self) {
        self.frames += 1;

        self.scale += self.scale_step;
        if self.scale > SCALE_MAX || self.scale < SCALE_MIN {
            self.scale_step = -self.scale_step;
            self.scale = self.scale.clamp(SCALE_MIN, SCALE_MAX);
        }

        self.offset += self.offset_step;
        if self.offset > FLOAT_MAX || self.offset < -FLOAT_MAX {
            self.offset_step = -self.offset_step;
            self.offset = self.offset.clamp(-FLOAT_MAX, FLOAT_MAX);
        }
    }

    #[cfg(test)]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Vertical offset in logo pixels, within [-5, 5].
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Frames stepped since the idle screen appeared; drives the logo wave.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 0.0 at the smallest scale, 1.0 at the largest.
    pub fn intensity(&self) -> f64 {
        (self.scale - SCALE_MIN) / (SCALE_MAX - SCALE_MIN)
    }
}

/// The idle view. Its logo animation lives and dies with it, so replacing
/// the screen is what cancels the animation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdleScreen {
    pub logo: LogoPulse,
}

impl IdleScreen {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn status_line(state: ConnectionState, agent_ready: bool) -> &'static str {
    match state {
        ConnectionState::Disconnected => "Display service disconnected. Attempting to reconnect...",
        ConnectionState::Connecting => "Connecting to display service...",
        ConnectionState::Open if agent_ready => "Agent ready. Waiting for your command.",
        ConnectionState::Open => "Display service connected. Waiting for agent status...",
    }
}
