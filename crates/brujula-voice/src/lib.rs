//! brujula-voice: the coach's voice.
//!
//! Given a coach message and a persona voice, fetch synthesized speech
//! (base64 PCM16 on the wire), decode it, and play it through one shared
//! output sink keyed by the message's timestamp. Failures log and reset the
//! playing indicator; the UI never sees an error from this path.

mod error;
pub mod pcm;
mod playback;
mod tts;

pub use error::{VoiceError, VoiceResult};
pub use pcm::{decode_base64_pcm, SPEECH_SAMPLE_RATE};
pub use playback::VoicePlayer;
pub use tts::{mode_voice, GenAiSpeech, PlaceholderSpeech, SpeechAudio, SpeechBackend};
