//! Gateway configuration

use crate::errors::{Result, SessionError};
use ai_bridge::AiConfig;
use media_core::MediaConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Everything the gateway needs, usually loaded from a TOML file
///
/// ```toml
/// local_ip = "192.0.2.10"
/// sip_port = 5070
///
/// [media]
/// rtp_port = 40000
///
/// [ai]
/// voice = "Kore"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the SIP socket binds to
    pub bind_ip: IpAddr,
    /// Address advertised to callers in Contact and the SDP answer
    pub local_ip: IpAddr,
    pub sip_port: u16,
    /// User part of the Contact URI
    pub contact_user: String,
    pub media: MediaConfig,
    pub ai: AiConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            local_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 88, 254)),
            sip_port: 5070,
            contact_user: "ai".to_string(),
            media: MediaConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn sip_bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.sip_port)
    }

    /// `sip:<user>@<local ip>:<sip port>`
    pub fn contact_uri(&self) -> String {
        format!("sip:{}@{}:{}", self.contact_user, self.local_ip, self.sip_port)
    }

    /// Calls are bridged to the AI service unless looping back or keyless.
    pub fn ai_enabled(&self) -> bool {
        !self.media.loopback && self.ai.is_enabled()
    }

    pub fn validate(&self) -> Result<()> {
        if self.contact_user.trim().is_empty() {
            return Err(SessionError::InvalidConfig("contact user must not be empty".into()));
        }
        if self.local_ip.is_unspecified() {
            return Err(SessionError::InvalidConfig(format!(
                "local IP {} cannot be advertised to callers",
                self.local_ip
            )));
        }
        self.media.validate()?;
        self.ai
            .validate()
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.sip_bind_addr(), "0.0.0.0:5070".parse().unwrap());
        assert_eq!(config.contact_uri(), "sip:ai@192.168.88.254:5070");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_loopback_disables_ai() {
        let mut config = GatewayConfig::default();
        config.ai.api_key = "key".into();
        assert!(config.ai_enabled());
        config.media.loopback = true;
        assert!(!config.ai_enabled());
    }

    #[test]
    fn test_validate_rejects_unspecified_local_ip() {
        let config = GatewayConfig {
            local_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ..GatewayConfig::default()
        };
        assert!(matches!(config.validate(), Err(SessionError::InvalidConfig(_))));
    }

    #[test]
    fn test_nested_sections_from_toml() {
        let config: GatewayConfig = infra_common::config::from_toml_str(
            r#"
            local_ip = "10.1.2.3"
            sip_port = 5080

            [media]
            rtp_port = 41000
            loopback = true

            [ai]
            voice = "Kore"
            "#,
        )
        .unwrap();
        assert_eq!(config.contact_uri(), "sip:ai@10.1.2.3:5080");
        assert_eq!(config.media.rtp_port, 41_000);
        assert!(config.media.loopback);
        assert_eq!(config.media.echo_delay_frames, 50);
        assert_eq!(config.ai.voice, "Kore");
        assert_eq!(config.ai.reconnect_initial_ms, 2_000);
    }
}
