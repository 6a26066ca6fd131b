//! The call in progress
//!
//! A [`Call`] is created from an INVITE's offer and lives until BYE, a
//! replacing INVITE, or controller shutdown. It owns the call's media
//! session and, in AI mode, a handle to the bridge attached to it.

use crate::errors::Result;
use ai_bridge::{BridgeStats, LinkPhase, LiveBridge};
use media_core::{MediaSession, MediaStats};
use rand::Rng;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Where a call is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Idle,
    /// INVITE received, media bound
    OfferReceived,
    /// 200 OK sent, waiting for ACK
    Answered,
    /// ACK received, media flowing
    Active,
    Terminated,
}

impl CallState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, CallState::Terminated)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Idle => "Idle",
            CallState::OfferReceived => "OfferReceived",
            CallState::Answered => "Answered",
            CallState::Active => "Active",
            CallState::Terminated => "Terminated",
        };
        f.write_str(name)
    }
}

/// A fresh 10-hex-digit tag for the To header
pub fn new_tag() -> String {
    format!("{:010x}", rand::thread_rng().gen_range(0..1u64 << 40))
}

/// One answered call
pub struct Call {
    call_id: String,
    tag: String,
    state: CallState,
    offered_endpoint: SocketAddr,
    media: MediaSession,
    bridge: Option<Arc<LiveBridge>>,
    created_at: Instant,
    active_since: Option<Instant>,
}

impl Call {
    /// Wrap a bound (not yet started) media session for the call `call_id`.
    pub fn new(call_id: impl Into<String>, media: MediaSession, bridge: Option<Arc<LiveBridge>>) -> Self {
        Self {
            call_id: call_id.into(),
            tag: new_tag(),
            state: CallState::OfferReceived,
            offered_endpoint: media.remote_endpoint(),
            media,
            bridge,
            created_at: Instant::now(),
            active_since: None,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn media(&self) -> &MediaSession {
        &self.media
    }

    pub fn bridge(&self) -> Option<&Arc<LiveBridge>> {
        self.bridge.as_ref()
    }

    pub(crate) fn set_state(&mut self, state: CallState) {
        self.state = state;
    }

    /// Start media on ACK and mark the call active.
    pub(crate) fn activate(&mut self) -> Result<()> {
        self.media.start()?;
        self.state = CallState::Active;
        self.active_since = Some(Instant::now());
        info!(
            call_id = %self.call_id,
            local = %self.media.local_addr(),
            remote = %self.media.remote_endpoint(),
            "Call active"
        );
        Ok(())
    }

    /// Dispose the media session (and with it the bridge).
    pub(crate) async fn terminate(&mut self) {
        if self.state.is_terminated() {
            return;
        }
        self.media.dispose().await;
        self.state = CallState::Terminated;
        let talk_time = self.active_since.map(|t| t.elapsed()).unwrap_or(Duration::ZERO);
        let stats = self.media.stats();
        info!(
            call_id = %self.call_id,
            talk_time_ms = talk_time.as_millis() as u64,
            packets_sent = stats.packets_sent,
            packets_received = stats.packets_received,
            "Call terminated"
        );
    }

    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            call_id: self.call_id.clone(),
            tag: self.tag.clone(),
            state: self.state,
            offered_endpoint: self.offered_endpoint,
            remote_endpoint: self.media.remote_endpoint(),
            local_endpoint: self.media.local_addr(),
            ssrc: self.media.ssrc(),
            media_running: self.media.is_running(),
            media: self.media.stats(),
            ai_phase: self.bridge.as_ref().map(|bridge| bridge.phase()),
            ai: self.bridge.as_ref().map(|bridge| bridge.stats()),
            age: self.created_at.elapsed(),
        }
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("call_id", &self.call_id)
            .field("tag", &self.tag)
            .field("state", &self.state)
            .field("local", &self.media.local_addr())
            .field("remote", &self.media.remote_endpoint())
            .field("ai", &self.bridge.is_some())
            .finish()
    }
}

/// Point-in-time view of the current call
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub call_id: String,
    pub tag: String,
    pub state: CallState,
    /// Endpoint from the SDP offer
    pub offered_endpoint: SocketAddr,
    /// Endpoint media is sent to; follows the caller's actual source address
    pub remote_endpoint: SocketAddr,
    pub local_endpoint: SocketAddr,
    pub ssrc: u32,
    pub media_running: bool,
    pub media: MediaStats,
    /// `None` unless the call is bridged to the AI service
    pub ai_phase: Option<LinkPhase>,
    pub ai: Option<BridgeStats>,
    pub age: Duration,
}
