//! Connection lifecycle of the AI link
//!
//! ```text
//!  Disconnected ──ConnectStarted──▶ Connecting ──ConnectSucceeded──▶ Connected
//!       ▲                               │                               │
//!       │                         fault │                         fault │
//!       │                               ▼                               │
//!       └──────ResetComplete────── NeedsReset ◀────────────────────────┘
//! ```
//!
//! A fault is any of `ConnectFailed`, `TransportError`, `RemoteClosed`,
//! `IdleTimeout`, `ConfigChanged` or `GoAway`. Events that do not apply to
//! the current phase leave it unchanged.

use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkPhase {
    Disconnected,
    Connecting,
    Connected,
    /// The link must be torn down before anything else happens
    NeedsReset,
}

impl fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::NeedsReset => "needs-reset",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEvent {
    ConnectStarted,
    ConnectSucceeded,
    ConnectFailed,
    TransportError,
    RemoteClosed,
    IdleTimeout,
    ConfigChanged,
    GoAway,
    ResetComplete,
}

impl LinkEvent {
    fn is_fault(self) -> bool {
        matches!(
            self,
            Self::ConnectFailed
                | Self::TransportError
                | Self::RemoteClosed
                | Self::IdleTimeout
                | Self::ConfigChanged
                | Self::GoAway
        )
    }
}

impl LinkPhase {
    /// Phase after `event`
    pub fn on(self, event: LinkEvent) -> LinkPhase {
        use LinkEvent::*;
        use LinkPhase::*;

        match (self, event) {
            (Disconnected, ConnectStarted) => Connecting,
            (Connecting, ConnectSucceeded) => Connected,
            (Connecting | Connected, e) if e.is_fault() => NeedsReset,
            (NeedsReset, ResetComplete) => Disconnected,
            (phase, _) => phase,
        }
    }
}

/// Exponential reconnect delay: doubles per failure up to a ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl ReconnectBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the following call returns double, capped.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Delay the next call to [`next_delay`](Self::next_delay) will return
    pub fn peek(&self) -> Duration {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Phase plus the timers the driver consults
#[derive(Debug, Clone)]
pub struct ConnectionState {
    phase: LinkPhase,
    last_activity: Instant,
    last_send: Instant,
    greeting_sent: bool,
    next_attempt: Instant,
    backoff: ReconnectBackoff,
}

impl ConnectionState {
    pub fn new(backoff: ReconnectBackoff, now: Instant) -> Self {
        Self {
            phase: LinkPhase::Disconnected,
            last_activity: now,
            last_send: now,
            greeting_sent: false,
            next_attempt: now,
            backoff,
        }
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    /// Apply an event and return the resulting phase.
    ///
    /// A successful connect restarts the timers and the backoff. Completing a
    /// reset schedules the next attempt one backoff step out.
    pub fn apply(&mut self, event: LinkEvent, now: Instant) -> LinkPhase {
        let next = self.phase.on(event);
        if next == self.phase {
            return next;
        }

        match next {
            LinkPhase::Connected => {
                self.last_activity = now;
                self.last_send = now;
                self.greeting_sent = false;
                self.backoff.reset();
            }
            LinkPhase::Disconnected => {
                self.greeting_sent = false;
                self.next_attempt = now + self.backoff.next_delay();
            }
            LinkPhase::Connecting | LinkPhase::NeedsReset => {}
        }
        self.phase = next;
        next
    }

    /// Force the phase, bypassing the transition table. Used on shutdown.
    pub fn force(&mut self, phase: LinkPhase) {
        self.phase = phase;
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.last_send = now;
        self.last_activity = now;
    }

    pub fn mark_greeting_sent(&mut self, now: Instant) {
        self.greeting_sent = true;
        self.mark_sent(now);
    }

    pub fn greeting_sent(&self) -> bool {
        self.greeting_sent
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn since_last_send(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_send)
    }

    /// Disconnected and the backoff has elapsed
    pub fn should_connect(&self, now: Instant) -> bool {
        self.phase == LinkPhase::Disconnected && now >= self.next_attempt
    }

    pub fn next_attempt(&self) -> Instant {
        self.next_attempt
    }
}
