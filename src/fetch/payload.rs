//! Encoding of fetched bytes into a self-contained `data:` URI.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use super::fetcher::FetchedAudio;

/// MIME type assumed when the provider does not send an audio type.
pub const DEFAULT_MIME: &str = "audio/mpeg";

/// Payload ready for inline embedding in a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlinePayload {
    pub mime: String,
    pub data_uri: String,
    /// Size of the audio before encoding.
    pub byte_len: usize,
}

impl InlinePayload {
    /// Bytes this payload occupies in the cache.
    pub fn cached_size(&self) -> usize {
        self.data_uri.len()
    }
}

/// Pick the MIME type: the provider's when it names an audio type, otherwise MP3.
pub fn audio_mime(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase())
        .filter(|essence| essence.starts_with("audio/") || essence == "application/ogg")
        .unwrap_or_else(|| DEFAULT_MIME.to_string())
}

pub fn encode(audio: &FetchedAudio) -> InlinePayload {
    let mime = audio_mime(audio.content_type.as_deref());
    let data_uri = format!("data:{mime};base64,{}", STANDARD.encode(&audio.bytes));
    InlinePayload {
        mime,
        data_uri,
        byte_len: audio.bytes.len(),
    }
}
