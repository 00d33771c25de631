//! Speech-to-text seam for the voice endpoint.

use crate::error::IntentError;

/// Transcript produced by [`PlaceholderTranscriber`] for every payload.
pub const PLACEHOLDER_TRANSCRIPT: &str = "show me the way to the library";

/// Converts decoded audio bytes into text.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &[u8]) -> Result<String, IntentError>;

    fn name(&self) -> &str;
}

/// Stand-in used until a speech-to-text model is wired in.
///
/// Ignores the audio and always returns [`PLACEHOLDER_TRANSCRIPT`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTranscriber;

impl Transcriber for PlaceholderTranscriber {
    fn transcribe(&self, audio: &[u8]) -> Result<String, IntentError> {
        tracing::debug!(
            bytes = audio.len(),
            "placeholder transcriber discarding audio payload"
        );
        Ok(PLACEHOLDER_TRANSCRIPT.to_string())
    }

    fn name(&self) -> &str {
        "placeholder"
    }
}
