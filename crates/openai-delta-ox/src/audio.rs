use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use delta_ox_common::Timestamp;
use serde::{Deserialize, Serialize};

/// Audio response data, present when the audio output modality was requested.
///
/// Streamed responses split the payload across fragments: `data` and
/// `transcript` arrive in pieces, `id` and `expires_at` usually once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOutput {
    /// Identifier to reference this audio in follow-up turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Base64 encoded audio bytes in the requested format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Transcript of the generated audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// When the server stops accepting `id` as a multi-turn reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl AudioOutput {
    pub fn with_transcript(transcript: impl Into<String>) -> Self {
        Self {
            transcript: Some(transcript.into()),
            ..Self::default()
        }
    }

    /// Decode the base64 payload, empty when no data was sent
    pub fn decode_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.data.as_deref() {
            Some(data) if !data.is_empty() => BASE64_STANDARD.decode(data),
            _ => Ok(Vec::new()),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at.is_past(now))
    }

    /// Fold a later fragment of the same audio response into this one
    pub(crate) fn absorb(&mut self, fragment: &AudioOutput) {
        if fragment.id.is_some() {
            self.id.clone_from(&fragment.id);
        }
        if fragment.expires_at.is_some() {
            self.expires_at = fragment.expires_at;
        }
        append_fragment(&mut self.data, fragment.data.as_deref());
        append_fragment(&mut self.transcript, fragment.transcript.as_deref());
    }
}

fn append_fragment(target: &mut Option<String>, fragment: Option<&str>) {
    if let Some(fragment) = fragment {
        target.get_or_insert_with(String::new).push_str(fragment);
    }
}

/// The transcript, or nothing when the fragment carried none
impl std::fmt::Display for AudioOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.transcript.as_deref().unwrap_or_default())
    }
}
