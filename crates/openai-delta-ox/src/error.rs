use delta_ox_common::CommonStreamError;
use serde::{Serialize, Serializer, ser::SerializeStruct};
use thiserror::Error;

/// Errors that can occur while decoding or assembling a streamed response
#[derive(Debug, Error)]
pub enum DeltaError {
    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Event framing or payload errors from the stream decoder
    #[error(transparent)]
    Common(#[from] CommonStreamError),

    /// Audio payload was not valid base64
    #[error("Invalid audio data: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Error object sent by the server in place of a chunk
    #[error("API error: {message}")]
    Api {
        code: Option<String>,
        message: String,
        r#type: Option<String>,
    },

    /// A tool call ended the stream without a function name
    #[error("Tool call {index} of choice {choice} is missing its function name")]
    IncompleteToolCall { choice: u32, index: u32 },

    /// The chunk stream itself yielded an error
    #[error("Stream error: {0}")]
    Stream(String),
}

impl Serialize for DeltaError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DeltaError::Json(e) => {
                let mut state = serializer.serialize_struct("DeltaError", 2)?;
                state.serialize_field("type", "Json")?;
                state.serialize_field("error", &e.to_string())?;
                state.end()
            }
            DeltaError::Common(e) => {
                let mut state = serializer.serialize_struct("DeltaError", 2)?;
                state.serialize_field("type", "Common")?;
                state.serialize_field("error", &e.to_string())?;
                state.end()
            }
            DeltaError::Base64(e) => {
                let mut state = serializer.serialize_struct("DeltaError", 2)?;
                state.serialize_field("type", "Base64")?;
                state.serialize_field("error", &e.to_string())?;
                state.end()
            }
            DeltaError::Api {
                code,
                message,
                r#type,
            } => {
                let field_count = 2 + usize::from(code.is_some()) + usize::from(r#type.is_some());
                let mut state = serializer.serialize_struct("DeltaError", field_count)?;
                state.serialize_field("type", "Api")?;
                if let Some(c) = code {
                    state.serialize_field("code", c)?;
                }
                state.serialize_field("message", message)?;
                if let Some(t) = r#type {
                    state.serialize_field("error_type", t)?;
                }
                state.end()
            }
            DeltaError::IncompleteToolCall { choice, index } => {
                let mut state = serializer.serialize_struct("DeltaError", 3)?;
                state.serialize_field("type", "IncompleteToolCall")?;
                state.serialize_field("choice", choice)?;
                state.serialize_field("index", index)?;
                state.end()
            }
            DeltaError::Stream(message) => {
                let mut state = serializer.serialize_struct("DeltaError", 2)?;
                state.serialize_field("type", "Stream")?;
                state.serialize_field("message", message)?;
                state.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DeltaError;
    use serde_json::json;

    #[test]
    fn serializes_as_tagged_map() {
        let err = DeltaError::IncompleteToolCall { choice: 0, index: 2 };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"type": "IncompleteToolCall", "choice": 0, "index": 2})
        );

        let err = DeltaError::Api {
            code: None,
            message: "overloaded".to_string(),
            r#type: Some("server_error".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"type": "Api", "message": "overloaded", "error_type": "server_error"})
        );
    }
}
