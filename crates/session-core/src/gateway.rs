//! SIP over UDP
//!
//! One socket, one loop: every datagram is parsed, requests go to the
//! [`CallController`], and its responses are sent back to the datagram's
//! source address. Responses from peers are not expected and are dropped.

use crate::controller::CallController;
use crate::errors::Result;
use infra_common::LogThrottle;
use sip_core::SipMessage;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Largest datagram accepted
const MAX_DATAGRAM: usize = 65_535;

/// Bound on repeated parse and socket warnings
const WARN_INTERVAL: Duration = Duration::from_secs(5);

/// UDP transport in front of a [`CallController`]
pub struct SipGateway {
    socket: UdpSocket,
    local_addr: SocketAddr,
    controller: Arc<CallController>,
    parse_warnings: LogThrottle,
    socket_warnings: LogThrottle,
}

impl SipGateway {
    /// Bind the configured SIP address.
    pub async fn bind(controller: Arc<CallController>) -> Result<Self> {
        let addr = controller.config().sip_bind_addr();
        Self::bind_to(addr, controller).await
    }

    /// Bind an explicit address; port 0 picks an ephemeral port.
    pub async fn bind_to(addr: SocketAddr, controller: Arc<CallController>) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        info!("SIP UDP transport bound to {}", local_addr);
        Ok(Self {
            socket,
            local_addr,
            controller,
            parse_warnings: LogThrottle::new(WARN_INTERVAL),
            socket_warnings: LogThrottle::new(WARN_INTERVAL),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn controller(&self) -> &Arc<CallController> {
        &self.controller
    }

    /// Serve requests until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        info!(contact = %self.controller.config().contact_uri(), "Waiting for calls");

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };
            match received {
                Ok((len, source)) => self.handle_datagram(&buf[..len], source).await,
                // ICMP port-unreachable from an earlier send surfaces here on
                // some platforms.
                Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                    trace!("Ignoring connection reset on SIP socket");
                }
                Err(e) => {
                    if self.socket_warnings.should_log() {
                        warn!("Error receiving SIP datagram: {}", e);
                    }
                }
            }
        }

        info!("SIP transport stopped");
        Ok(())
    }

    async fn handle_datagram(&self, data: &[u8], source: SocketAddr) {
        // CRLF keep-alives
        if data.iter().all(u8::is_ascii_whitespace) {
            trace!("Keep-alive from {}", source);
            return;
        }

        let request = match SipMessage::parse(data) {
            Ok(SipMessage::Request(request)) => request,
            Ok(SipMessage::Response(response)) => {
                debug!(status = %response.status, "Ignoring response from {}", source);
                return;
            }
            Err(e) => {
                if self.parse_warnings.should_log() {
                    warn!(
                        suppressed = self.parse_warnings.take_suppressed(),
                        "Dropping unparseable datagram of {} bytes from {}: {}",
                        data.len(),
                        source,
                        e
                    );
                }
                return;
            }
        };

        debug!(
            method = %request.method,
            call_id = request.call_id().unwrap_or("-"),
            "Received request from {}",
            source
        );
        for response in self.controller.handle_request(&request).await {
            debug!(status = %response.status, "Sending response to {}", source);
            if let Err(e) = self.socket.send_to(&response.to_bytes(), source).await {
                if self.socket_warnings.should_log() {
                    warn!("Failed to send {} to {}: {}", response.status, source, e);
                }
            }
        }
    }
}

impl std::fmt::Debug for SipGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SipGateway")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}
