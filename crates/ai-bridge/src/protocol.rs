//! Gemini Live wire messages
//!
//! Every frame is one JSON object with a single top-level key naming the
//! message. Audio travels base64-encoded: 16 kHz little-endian PCM up,
//! 24 kHz down.

use crate::config::AiConfig;
use crate::error::{BridgeError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// MIME type of uplink audio chunks
pub const UPLINK_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Messages sent to the service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

/// A turn: a role and its parts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

/// Inline binary data, base64 in `data`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl ClientMessage {
    /// Session setup: audio responses in the configured voice
    pub fn setup(config: &AiConfig) -> Self {
        Self::Setup(Setup {
            model: config.model_name(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: config.voice_name().to_string(),
                        },
                    },
                },
            },
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: Some(config.system_instruction().to_string()),
                    inline_data: None,
                }],
            }),
        })
    }

    /// One chunk of 16 kHz little-endian PCM
    pub fn audio(pcm: &[u8]) -> Self {
        Self::RealtimeInput(RealtimeInput {
            media_chunks: vec![Blob {
                mime_type: UPLINK_MIME_TYPE.to_string(),
                data: STANDARD.encode(pcm),
            }],
        })
    }

    /// A complete user text turn
    pub fn text_turn(text: &str) -> Self {
        Self::ClientContent(ClientContent {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(text.to_string()),
                    inline_data: None,
                }],
            }],
            turn_complete: true,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decoded audio bytes of a realtime input message
    pub fn audio_payload(&self) -> Option<Vec<u8>> {
        match self {
            Self::RealtimeInput(input) => input
                .media_chunks
                .first()
                .and_then(|chunk| STANDARD.decode(&chunk.data).ok()),
            _ => None,
        }
    }
}

/// Raw server frame. Unknown keys (tool calls, usage metadata) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
    pub go_away: Option<GoAway>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub model_turn: Option<Content>,
    pub interrupted: bool,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoAway {
    pub time_left: Option<String>,
}

/// What the bridge acts on
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SetupComplete,
    /// 24 kHz little-endian PCM
    Audio(Vec<u8>),
    Text(String),
    /// The caller barged in; queued playback is stale
    Interrupted,
    TurnComplete,
    /// The service will close the session soon
    GoAway { time_left: Option<String> },
}

/// Parse one server frame into the events it carries, in order.
pub fn parse_server_message(frame: &str) -> Result<Vec<ServerEvent>> {
    let message: ServerMessage = serde_json::from_str(frame)?;
    let mut events = Vec::new();

    if message.setup_complete.is_some() {
        events.push(ServerEvent::SetupComplete);
    }

    if let Some(content) = message.server_content {
        // Audio from an interrupted turn is already stale, so the flush
        // comes first.
        if content.interrupted {
            events.push(ServerEvent::Interrupted);
        }
        for part in content.model_turn.into_iter().flat_map(|turn| turn.parts) {
            if let Some(blob) = part.inline_data {
                if !blob.mime_type.starts_with("audio/pcm") {
                    continue;
                }
                let pcm = STANDARD.decode(blob.data.as_bytes()).map_err(|e| {
                    BridgeError::Protocol(format!("invalid base64 audio: {e}"))
                })?;
                if !pcm.is_empty() {
                    events.push(ServerEvent::Audio(pcm));
                }
            } else if let Some(text) = part.text {
                events.push(ServerEvent::Text(text));
            }
        }
        if content.turn_complete {
            events.push(ServerEvent::TurnComplete);
        }
    }

    if let Some(go_away) = message.go_away {
        events.push(ServerEvent::GoAway {
            time_left: go_away.time_left,
        });
    }

    Ok(events)
}
