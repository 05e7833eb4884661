use std::collections::VecDeque;

use delta_ox_common::{CommonStreamError, SseDecoder, Timestamp, parse_sse_events};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{delta::Delta, error::DeltaError, usage::Usage};

/// Object type carried by every streamed chunk
pub const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// Why the model stopped generating for a choice
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[serde(alias = "STOP")]
    Stop,
    #[serde(alias = "LENGTH", alias = "MAX_TOKENS")]
    Length,
    ToolCalls,
    ContentFilter,
    /// Legacy single function call
    FunctionCall,
    /// Reason this crate does not know, kept as sent
    #[serde(untagged)]
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::FunctionCall => "function_call",
            FinishReason::Other(s) => s,
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One server-sent event of a streamed chat completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,

    #[serde(default = "chunk_object")]
    pub object: String,

    /// When the completion was created; identical on every chunk of a stream
    pub created: Timestamp,

    pub model: String,

    /// Choices updated by this chunk; empty on the trailing usage chunk
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<String>,
}

fn chunk_object() -> String {
    CHUNK_OBJECT.to_string()
}

/// Streaming choice delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Index of this choice
    pub index: u32,

    /// The partial message delta
    #[serde(default)]
    pub delta: Delta,

    /// Set on the last chunk for this choice
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,

    /// Log probabilities (if requested)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Value>,
}

impl ChatCompletionChunk {
    /// Decode every chunk in a complete `text/event-stream` body.
    ///
    /// An `{"error": ...}` payload in place of a chunk stops decoding with
    /// [`DeltaError::Api`].
    pub fn from_streaming_data(data: &str) -> Result<Vec<Self>, DeltaError> {
        parse_sse_events::<Value>(data)?
            .into_iter()
            .map(Self::from_event)
            .collect()
    }

    /// Decode one event payload, recognising server error objects
    pub fn from_event(event: Value) -> Result<Self, DeltaError> {
        if let Some(error) = event.get("error") {
            return Err(api_error(error));
        }
        Ok(serde_json::from_value(event)?)
    }

    pub fn first_choice(&self) -> Option<&ChunkChoice> {
        self.choices.first()
    }

    /// Text carried by the first choice, `""` when there is none
    pub fn text(&self) -> &str {
        crate::delta::text_of(self.first_choice().map(|choice| &choice.delta))
    }

    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.first_choice().and_then(|choice| choice.finish_reason.as_ref())
    }

    /// The trailing chunk sent with `include_usage`: no choices, only totals
    pub fn is_usage_only(&self) -> bool {
        self.choices.is_empty() && self.usage.is_some()
    }
}

fn api_error(error: &Value) -> DeltaError {
    let field = |key: &str| {
        error.get(key).and_then(|value| match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    };

    DeltaError::Api {
        code: field("code"),
        message: field("message").unwrap_or_else(|| error.to_string()),
        r#type: field("type"),
    }
}

/// Incremental chunk decoder over raw response bytes
///
/// An event that fails to decode, or a server error object, is reported only
/// after the chunks decoded before it have been returned: the call that meets
/// it returns those chunks, the next call returns the error, and the chunks
/// behind it come after that.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    sse: SseDecoder,
    pending: VecDeque<Result<ChatCompletionChunk, DeltaError>>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next piece of the response body
    pub fn push(&mut self, bytes: impl AsRef<[u8]>) -> Result<Vec<ChatCompletionChunk>, DeltaError> {
        let framed = self.sse.push::<Value>(bytes);
        self.settle(framed)
    }

    /// Flush a trailing event once the body has ended
    pub fn finish(&mut self) -> Result<Vec<ChatCompletionChunk>, DeltaError> {
        let framed = self.sse.finish::<Value>();
        self.settle(framed)
    }

    fn settle(
        &mut self,
        framed: Result<Vec<Value>, CommonStreamError>,
    ) -> Result<Vec<ChatCompletionChunk>, DeltaError> {
        match framed {
            Ok(events) => self
                .pending
                .extend(events.into_iter().map(ChatCompletionChunk::from_event)),
            Err(err) => self.pending.push_back(Err(err.into())),
        }

        let mut chunks = Vec::new();
        while let Some(next) = self.pending.pop_front() {
            match next {
                Ok(chunk) => chunks.push(chunk),
                Err(err) if chunks.is_empty() => return Err(err),
                Err(err) => {
                    log::debug!("Holding back stream error until {} chunk(s) are delivered", chunks.len());
                    self.pending.push_front(Err(err));
                    break;
                }
            }
        }

        Ok(chunks)
    }

    /// Whether the server already sent `data: [DONE]`
    pub fn is_done(&self) -> bool {
        self.sse.is_done()
    }
}
