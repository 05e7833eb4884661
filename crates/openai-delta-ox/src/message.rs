use serde::{Deserialize, Serialize};

use crate::{
    audio::AudioOutput, chunk::FinishReason, error::DeltaError, role::Role, tool::ToolCall,
};

/// A complete assistant message assembled from streamed deltas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author
    pub role: Role,

    /// Concatenated text, `None` when no fragment carried any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tool calls ordered by their stream index
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioOutput>,

    /// Not part of the message object on the wire; kept from the final chunk
    #[serde(skip)]
    pub finish_reason: Option<FinishReason>,
}

impl Message {
    /// Readable text, same priority as a single delta: content, then audio transcript
    pub fn text(&self) -> &str {
        match self.content.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => self
                .audio
                .as_ref()
                .and_then(|audio| audio.transcript.as_deref())
                .unwrap_or_default(),
        }
    }

    /// Decoded audio bytes, empty when the message carried no audio
    pub fn audio_bytes(&self) -> Result<Vec<u8>, DeltaError> {
        Ok(self
            .audio
            .as_ref()
            .map(AudioOutput::decode_data)
            .transpose()?
            .unwrap_or_default())
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether the model declined the request instead of answering
    pub fn is_refusal(&self) -> bool {
        self.refusal.as_deref().is_some_and(|r| !r.is_empty())
    }
}
