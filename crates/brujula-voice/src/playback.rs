//! Playback: one shared output sink, one "currently playing" message.
//!
//! The output stream is created lazily on the first play and reused for the
//! life of the process; it is never torn down. Playback state is keyed by the
//! originating message's timestamp, so replaying a message that is still
//! sounding is a no-op, while a different message preempts it.

use crate::error::{VoiceError, VoiceResult};
use crate::pcm::{decode_base64_pcm, samples_buffer};
use crate::tts::{SpeechAudio, SpeechBackend};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, info, warn};

struct PlaybackOutput {
    _stream: OutputStream,
    _handle: OutputStreamHandle,
    sink: Sink,
}

impl PlaybackOutput {
    fn open() -> VoiceResult<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| VoiceError::Playback(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| VoiceError::Playback(e.to_string()))?;
        info!("voice output ready");
        Ok(Self {
            _stream: stream,
            _handle: handle,
            sink,
        })
    }
}

/// Single playback slot for coach messages. Lives on the UI thread; the
/// underlying output stream is not `Send`.
pub struct VoicePlayer {
    output: Option<PlaybackOutput>,
    now_playing: Option<i64>,
}

impl VoicePlayer {
    pub fn new() -> Self {
        Self {
            output: None,
            now_playing: None,
        }
    }

    /// Whether the given message is the one currently sounding.
    pub fn is_playing(&self, message_ts: i64) -> bool {
        self.now_playing == Some(message_ts)
            && self.output.as_ref().is_some_and(|o| !o.sink.empty())
    }

    /// Decodes and plays a payload for the message. Replaying the message
    /// while it still sounds is a no-op; any other message is stopped first.
    pub fn play(&mut self, message_ts: i64, audio: &SpeechAudio) -> VoiceResult<()> {
        if self.is_playing(message_ts) {
            debug!(message_ts, "already playing this message");
            return Ok(());
        }
        let samples = decode_base64_pcm(&audio.data)?;
        if samples.is_empty() {
            debug!(message_ts, "empty payload, nothing to play");
            return Ok(());
        }
        if self.output.is_none() {
            self.output = Some(PlaybackOutput::open()?);
        }
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| VoiceError::Playback("output unavailable".into()))?;
        output.sink.stop();
        output.sink.append(samples_buffer(samples));
        output.sink.play();
        self.now_playing = Some(message_ts);
        Ok(())
    }

    /// Synthesizes and plays one coach message. Failures reset the playing
    /// indicator and are logged; nothing propagates to the caller.
    pub fn speak_message(
        &mut self,
        message_ts: i64,
        text: &str,
        voice: &str,
        backend: &dyn SpeechBackend,
    ) {
        let result = backend
            .synthesize(text, voice)
            .and_then(|audio| self.play(message_ts, &audio));
        if let Err(e) = result {
            self.now_playing = None;
            warn!(message_ts, "voice playback failed: {e}");
        }
    }

    /// Stops whatever is sounding and clears the playing indicator.
    pub fn stop(&mut self) {
        if let Some(output) = &self.output {
            output.sink.stop();
        }
        self.now_playing = None;
    }
}

impl Default for VoicePlayer {
    fn default() -> Self {
        Self::new()
    }
}
