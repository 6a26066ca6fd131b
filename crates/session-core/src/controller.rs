//! Request handling for the single call slot

use crate::call::{Call, CallSnapshot, CallState};
use crate::config::GatewayConfig;
use crate::errors::{Result, SessionError};
use ai_bridge::{AiConfig, LiveBridge, LiveConnector, WebSocketConnector};
use futures::FutureExt;
use media_core::MediaSession;
use parking_lot::Mutex;
use sip_core::sdp::{SDP_CONTENT_TYPE, build_answer, parse_offer};
use sip_core::{HeaderName, Method, SipRequest, SipResponse, StatusCode};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Methods the gateway answers; sent in `Allow` with every 405
pub const ALLOWED_METHODS: &str = "INVITE, ACK, BYE";

/// Owns the current call and answers SIP requests for it
pub struct CallController {
    config: Mutex<GatewayConfig>,
    connector: Arc<dyn LiveConnector>,
    call: tokio::sync::Mutex<Option<Call>>,
}

impl CallController {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector::new()))
    }

    /// Controller whose AI bridges open sessions through `connector`
    pub fn with_connector(config: GatewayConfig, connector: Arc<dyn LiveConnector>) -> Self {
        Self {
            config: Mutex::new(config),
            connector,
            call: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> GatewayConfig {
        self.config.lock().clone()
    }

    /// Answer one request. Never fails: errors and panics become a 500,
    /// except on ACK, which is never answered.
    pub async fn handle_request(&self, request: &SipRequest) -> Vec<SipResponse> {
        match AssertUnwindSafe(self.dispatch(request)).catch_unwind().await {
            Ok(Ok(responses)) => responses,
            Ok(Err(e)) => {
                error!(method = %request.method, call_id = request.call_id().unwrap_or("-"), "Request failed: {}", e);
                server_error(request)
            }
            Err(panic) => {
                error!(
                    method = %request.method,
                    call_id = request.call_id().unwrap_or("-"),
                    "Request handler panicked: {}",
                    panic_message(panic.as_ref())
                );
                server_error(request)
            }
        }
    }

    async fn dispatch(&self, request: &SipRequest) -> Result<Vec<SipResponse>> {
        match request.method {
            Method::Invite => self.on_invite(request).await,
            Method::Ack => {
                self.on_ack(request).await;
                Ok(Vec::new())
            }
            Method::Bye => self.on_bye(request).await,
            _ => {
                debug!(method = %request.method, "Rejecting unsupported method");
                Ok(vec![
                    SipResponse::for_request(request, StatusCode::MethodNotAllowed)
                        .with_header(HeaderName::Allow, ALLOWED_METHODS),
                ])
            }
        }
    }

    async fn on_invite(&self, request: &SipRequest) -> Result<Vec<SipResponse>> {
        let call_id = request
            .call_id()
            .ok_or(sip_core::Error::MissingHeader(HeaderName::CallId))?;

        let offer = match request.body_str().map(parse_offer) {
            Some(Ok(offer)) => offer,
            Some(Err(e)) => {
                warn!(call_id, "Rejecting INVITE: {}", e);
                return Ok(vec![SipResponse::for_request(request, StatusCode::BadRequest)]);
            }
            None => {
                warn!(call_id, "Rejecting INVITE: body is not text");
                return Ok(vec![SipResponse::for_request(request, StatusCode::BadRequest)]);
            }
        };
        let remote = match offer.rtp_endpoint() {
            Ok(remote) => remote,
            Err(e) => {
                warn!(call_id, "Rejecting INVITE: {}", e);
                return Ok(vec![SipResponse::for_request(request, StatusCode::BadRequest)]);
            }
        };
        if !offer.offers_pcmu() {
            warn!(call_id, payload_types = ?offer.payload_types, "Offer lacks PCMU; answering with PCMU anyway");
        }
        info!(call_id, remote = %remote, "Incoming call");

        let config = self.config();
        let mut slot = self.call.lock().await;
        if let Some(mut previous) = slot.take() {
            info!(previous = previous.call_id(), call_id, "New INVITE replaces the current call");
            previous.terminate().await;
        }

        let mut media = MediaSession::new(config.media.clone(), remote)?;
        let bridge = if config.ai_enabled() {
            let bridge = Arc::new(LiveBridge::with_connector(config.ai.clone(), self.connector.clone()));
            media.attach_bridge(bridge.clone())?;
            Some(bridge)
        } else {
            if !config.media.loopback {
                warn!("No Gemini API key configured; the caller will hear silence");
            }
            None
        };

        let mut call = Call::new(call_id, media, bridge);
        let answer = build_answer(config.local_ip, call.media().local_addr().port());
        let trying = SipResponse::for_request(request, StatusCode::Trying);
        let ok = SipResponse::for_request(request, StatusCode::Ok)
            .with_to_tag(call.tag())
            .with_contact(&config.contact_uri())
            .with_body(SDP_CONTENT_TYPE, answer);
        call.set_state(CallState::Answered);
        debug!(call_id, local = %call.media().local_addr(), tag = call.tag(), "Answered");

        *slot = Some(call);
        Ok(vec![trying, ok])
    }

    /// Start media for the answered call. Failures are logged only; the
    /// caller can still hang up with BYE.
    async fn on_ack(&self, request: &SipRequest) {
        let mut slot = self.call.lock().await;
        let call = match slot.as_mut() {
            Some(call) if request.call_id() == Some(call.call_id()) => call,
            _ => {
                debug!(call_id = request.call_id().unwrap_or("-"), "Ignoring ACK for unknown call");
                return;
            }
        };
        if call.state() != CallState::Answered {
            debug!(call_id = call.call_id(), state = %call.state(), "Ignoring repeated ACK");
            return;
        }
        match call.activate() {
            Ok(()) | Err(SessionError::Media(media_core::Error::AlreadyStarted)) => {}
            Err(e) => error!(call_id = call.call_id(), "Failed to start media on ACK: {}", e),
        }
    }

    async fn on_bye(&self, request: &SipRequest) -> Result<Vec<SipResponse>> {
        let ended = {
            let mut slot = self.call.lock().await;
            slot.take_if(|call| request.call_id() == Some(call.call_id()))
        };
        match ended {
            Some(mut call) => {
                info!(call_id = call.call_id(), "Caller hung up");
                call.terminate().await;
                Ok(vec![SipResponse::for_request(request, StatusCode::Ok)])
            }
            None => {
                debug!(call_id = request.call_id().unwrap_or("-"), "BYE for unknown call");
                Ok(vec![SipResponse::for_request(
                    request,
                    StatusCode::CallOrTransactionDoesNotExist,
                )])
            }
        }
    }

    /// View of the current call, if any
    pub async fn current_call(&self) -> Option<CallSnapshot> {
        self.call.lock().await.as_ref().map(Call::snapshot)
    }

    /// Use new AI settings for future calls and hand them to the active
    /// call's bridge, which reconnects if the session-defining settings
    /// changed.
    pub async fn apply_ai_config(&self, ai: AiConfig) {
        self.config.lock().ai = ai.clone();
        let slot = self.call.lock().await;
        if let Some(bridge) = slot.as_ref().and_then(|call| call.bridge()) {
            bridge.apply_config(ai);
        }
    }

    /// End the current call, if any.
    pub async fn shutdown(&self) {
        let call = self.call.lock().await.take();
        if let Some(mut call) = call {
            info!(call_id = call.call_id(), "Ending call for shutdown");
            call.terminate().await;
        }
    }
}

impl std::fmt::Debug for CallController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallController")
            .field("config", &*self.config.lock())
            .finish_non_exhaustive()
    }
}

fn server_error(request: &SipRequest) -> Vec<SipResponse> {
    if request.method == Method::Ack {
        return Vec::new();
    }
    vec![SipResponse::for_request(request, StatusCode::ServerInternalError)]
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_bridge::{BridgeError, LinkPhase, LiveConnection};
    use async_trait::async_trait;
    use media_core::MediaConfig;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RefusingConnector {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl LiveConnector for RefusingConnector {
        async fn connect(&self, _config: &AiConfig) -> ai_bridge::Result<LiveConnection> {
            self.attempts.fetch_add(1, Ordering::Relaxed);
            Err(BridgeError::Connect("refused".into()))
        }
    }

    fn config(loopback: bool, api_key: &str) -> GatewayConfig {
        let mut config = GatewayConfig {
            local_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            media: MediaConfig {
                bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
                rtp_port: 0,
                loopback,
                ..MediaConfig::default()
            },
            ..GatewayConfig::default()
        };
        config.ai.api_key = api_key.to_string();
        config
    }

    fn invite(call_id: &str, sdp: &str) -> SipRequest {
        SipRequest::new(Method::Invite, "sip:ai@127.0.0.1:5070")
            .with_header(HeaderName::Via, "SIP/2.0/UDP 127.0.0.1:5060;branch=z9hG4bK-1")
            .with_header(HeaderName::From, "<sip:alice@127.0.0.1>;tag=caller")
            .with_header(HeaderName::To, "<sip:ai@127.0.0.1>")
            .with_header(HeaderName::CallId, call_id)
            .with_header(HeaderName::CSeq, "1 INVITE")
            .with_body(SDP_CONTENT_TYPE, sdp.to_string())
    }

    fn in_dialog(method: Method, call_id: &str) -> SipRequest {
        SipRequest::new(method.clone(), "sip:ai@127.0.0.1:5070")
            .with_header(HeaderName::Via, "SIP/2.0/UDP 127.0.0.1:5060;branch=z9hG4bK-2")
            .with_header(HeaderName::From, "<sip:alice@127.0.0.1>;tag=caller")
            .with_header(HeaderName::To, "<sip:ai@127.0.0.1>")
            .with_header(HeaderName::CallId, call_id)
            .with_header(HeaderName::CSeq, format!("2 {}", method))
    }

    const OFFER: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=-\r\nc=IN IP4 127.0.0.1\r\nt=0 0\r\nm=audio 9 RTP/AVP 0 101\r\n";

    #[tokio::test]
    async fn test_ack_for_unknown_call_is_ignored() {
        let controller = CallController::new(config(true, ""));
        assert!(controller.handle_request(&in_dialog(Method::Ack, "nope")).await.is_empty());
        assert!(controller.current_call().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_media_start_on_ack_is_not_answered() {
        let controller = CallController::new(config(true, ""));
        let mut media = MediaSession::new(
            controller.config().media,
            "127.0.0.1:9".parse().unwrap(),
        )
        .unwrap();
        media.dispose().await;
        let mut call = Call::new("dead-media", media, None);
        call.set_state(CallState::Answered);
        *controller.call.lock().await = Some(call);

        let responses = controller.handle_request(&in_dialog(Method::Ack, "dead-media")).await;
        assert!(responses.is_empty());
        assert_eq!(controller.current_call().await.unwrap().state, CallState::Answered);

        let responses = controller.handle_request(&in_dialog(Method::Bye, "dead-media")).await;
        assert_eq!(responses[0].status, StatusCode::Ok);
    }

    #[tokio::test]
    async fn test_invite_without_body_is_bad_request() {
        let controller = CallController::new(config(true, ""));
        let request = in_dialog(Method::Invite, "c1");
        let responses = controller.handle_request(&request).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status, StatusCode::BadRequest);
        assert!(controller.current_call().await.is_none());
    }

    #[tokio::test]
    async fn test_invite_without_call_id_is_server_error() {
        let controller = CallController::new(config(true, ""));
        let request = SipRequest::new(Method::Invite, "sip:ai@127.0.0.1")
            .with_header(HeaderName::CSeq, "1 INVITE")
            .with_body(SDP_CONTENT_TYPE, OFFER.to_string());
        let responses = controller.handle_request(&request).await;
        assert_eq!(responses[0].status, StatusCode::ServerInternalError);
    }

    #[tokio::test]
    async fn test_ai_mode_attaches_bridge() {
        let connector = Arc::new(RefusingConnector {
            attempts: AtomicUsize::new(0),
        });
        let controller = CallController::with_connector(config(false, "test-key"), connector.clone());

        let responses = controller.handle_request(&invite("ai-call", OFFER)).await;
        assert_eq!(responses[1].status, StatusCode::Ok);
        let snapshot = controller.current_call().await.unwrap();
        assert_eq!(snapshot.ai_phase, Some(LinkPhase::Disconnected));

        controller.handle_request(&in_dialog(Method::Ack, "ai-call")).await;
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while connector.attempts.load(Ordering::Relaxed) == 0 && std::time::Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(connector.attempts.load(Ordering::Relaxed) >= 1);
        assert_eq!(controller.current_call().await.unwrap().state, CallState::Active);

        controller.shutdown().await;
        assert!(controller.current_call().await.is_none());
    }

    #[tokio::test]
    async fn test_keyless_call_has_no_bridge() {
        let controller = CallController::new(config(false, ""));
        if controller.config().ai_enabled() {
            // A key in the environment turns AI mode on.
            return;
        }
        controller.handle_request(&invite("plain", OFFER)).await;
        assert!(controller.current_call().await.unwrap().ai_phase.is_none());
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_apply_ai_config_reaches_active_bridge() {
        let connector = Arc::new(RefusingConnector {
            attempts: AtomicUsize::new(0),
        });
        let controller = CallController::with_connector(config(false, "test-key"), connector);
        controller.handle_request(&invite("voice", OFFER)).await;

        let mut ai = controller.config().ai;
        ai.voice = "Kore".into();
        controller.apply_ai_config(ai).await;

        assert_eq!(controller.config().ai.voice, "Kore");
        controller.shutdown().await;
    }

    #[test]
    fn test_panic_message() {
        let text: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(text.as_ref()), "boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(owned.as_ref()), "bang");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
