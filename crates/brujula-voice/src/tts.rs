//! Speech synthesis: the backend seam and the HTTP implementation.
//!
//! Backends return base64-encoded 16-bit PCM, mono, at
//! [`crate::pcm::SPEECH_SAMPLE_RATE`]. Decode and playback live in the
//! sibling modules; a backend only fetches bytes.

use crate::error::{VoiceError, VoiceResult};
use brujula_core::{AppConfig, CoachMode};
use serde_json::Value;
use std::time::Duration;

/// One synthesized utterance: base64 PCM16 payload as delivered on the wire.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub data: String,
}

/// Backend that turns text into a speech payload. Implemented over HTTP for
/// production and as [`PlaceholderSpeech`] for tests.
pub trait SpeechBackend: Send + Sync {
    /// Synthesize `text` with the given prebuilt voice. An empty payload
    /// means "nothing to play" and is not an error.
    fn synthesize(&self, text: &str, voice: &str) -> VoiceResult<SpeechAudio>;
}

/// Placeholder backend: returns empty audio so nothing plays.
#[derive(Debug, Default)]
pub struct PlaceholderSpeech;

impl SpeechBackend for PlaceholderSpeech {
    fn synthesize(&self, _text: &str, _voice: &str) -> VoiceResult<SpeechAudio> {
        Ok(SpeechAudio { data: String::new() })
    }
}

/// Voice for a coach persona (prebuilt voice names on the speech endpoint).
pub fn mode_voice(mode: CoachMode) -> &'static str {
    match mode {
        CoachMode::Strategist => "Charon",
        CoachMode::Financial => "Kore",
        CoachMode::BusinessOwner => "Orus",
        CoachMode::ZenEnergy => "Aoede",
        CoachMode::Socratic => "Puck",
    }
}

/// Production speech backend: Gemini-style `:generateContent` with the AUDIO
/// response modality. The payload comes back as base64 inline data.
#[derive(Debug, Clone)]
pub struct GenAiSpeech {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl GenAiSpeech {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
            model: model.into(),
            client,
        })
    }

    /// Build from config. Fails when no API key is configured.
    pub fn from_config(config: &AppConfig) -> VoiceResult<Self> {
        let key = config
            .genai_api_key
            .clone()
            .ok_or_else(|| VoiceError::Config("speech requires BRUJULA_GENAI_API_KEY".into()))?;
        Self::new(config.genai_base_url.clone(), key, config.tts_model.clone())
    }
}

impl SpeechBackend for GenAiSpeech {
    fn synthesize(&self, text: &str, voice: &str) -> VoiceResult<SpeechAudio> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SpeechAudio { data: String::new() });
        }
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": text}]}],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": voice}}
                }
            }
        });
        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Tts(format!("speech API error {status}: {body}")));
        }
        let value: Value = res.json().map_err(|e| VoiceError::Tts(e.to_string()))?;
        let data = value
            .pointer("/candidates/0/content/parts/0/inlineData/data")
            .and_then(Value::as_str)
            .ok_or_else(|| VoiceError::Tts("speech response carried no audio".into()))?;
        Ok(SpeechAudio { data: data.to_string() })
    }
}
