use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    audio::AudioOutput,
    role::Role,
    tool::{FunctionCallDelta, ToolCallDelta},
};

/// Longest author name OpenAI accepts
pub const MAX_NAME_LEN: usize = 64;

/// Presence of the `content` key in a streamed fragment.
///
/// Servers send `"content": null` on role-only and tool-call fragments and
/// omit the key entirely on others; both are kept apart from an explicit
/// (possibly empty) string so a fragment re-encodes exactly as it arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum DeltaContent {
    /// The key was not sent
    #[default]
    Absent,
    /// The key was sent with a `null` value
    Null,
    /// The key was sent with a string, possibly empty
    Text(String),
}

impl DeltaContent {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Absent | Self::Null => None,
        }
    }
}

impl From<String> for DeltaContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for DeltaContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// `None` maps to an explicit `null`, not to an absent key
impl From<Option<String>> for DeltaContent {
    fn from(text: Option<String>) -> Self {
        text.map_or(Self::Null, Self::Text)
    }
}

// `Absent` is never reached here: the containing struct skips it.
impl Serialize for DeltaContent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

// A missing key never reaches this impl; `#[serde(default)]` yields `Absent`.
impl<'de> Deserialize<'de> for DeltaContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Self::from)
    }
}

/// One incremental slice of an assistant message in a streamed chat completion.
///
/// A `Delta` is built once, either by the JSON decoder or through
/// [`Delta::builder`], and is read-only afterwards.
///
/// ```
/// use openai_delta_ox::Delta;
///
/// let delta: Delta = serde_json::from_str(r#"{"role":"assistant","content":"Hello"}"#).unwrap();
/// assert_eq!(delta.as_text(), "Hello");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(from = "DeltaWire", into = "DeltaWire")]
pub struct Delta {
    role: Option<Role>,
    #[builder(default, into)]
    content: DeltaContent,
    #[builder(into)]
    refusal: Option<String>,
    #[builder(into)]
    name: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
    audio: Option<AudioOutput>,
}

impl Delta {
    /// Author role, usually only on the first fragment of a message
    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    /// Text carried by this fragment, `None` when absent or `null`
    pub fn content(&self) -> Option<&str> {
        self.content.as_text()
    }

    pub fn content_state(&self) -> &DeltaContent {
        &self.content
    }

    /// Refusal message generated by the model
    pub fn refusal(&self) -> Option<&str> {
        self.refusal.as_deref()
    }

    /// Optional author name, see [`is_valid_author_name`]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Tool call fragments in the order the server sent them
    pub fn tool_calls(&self) -> Option<&[ToolCallDelta]> {
        self.tool_calls.as_deref()
    }

    pub fn audio(&self) -> Option<&AudioOutput> {
        self.audio.as_ref()
    }

    /// Readable text of this fragment.
    ///
    /// Non-blank content wins; otherwise the audio transcript; otherwise `""`.
    pub fn as_text(&self) -> &str {
        match self.content() {
            Some(text) if !text.trim().is_empty() => text,
            _ => self
                .audio
                .as_ref()
                .and_then(|audio| audio.transcript.as_deref())
                .unwrap_or_default(),
        }
    }

    /// Whether the fragment carries nothing at all, as keep-alive chunks do
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.content().is_none_or(str::is_empty)
            && self.refusal.is_none()
            && self.name.is_none()
            && self.tool_calls.as_ref().is_none_or(Vec::is_empty)
            && self.audio.is_none()
    }

    /// Check the documented name constraint; nothing enforces it on construction
    #[must_use]
    pub fn has_valid_name(&self) -> bool {
        self.name.as_deref().is_none_or(is_valid_author_name)
    }
}

/// Text of an optional fragment, `""` when there is none
pub fn text_of(delta: Option<&Delta>) -> &str {
    delta.map(Delta::as_text).unwrap_or_default()
}

/// `[A-Za-z0-9_]{0,64}`
pub fn is_valid_author_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl std::fmt::Display for Delta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_text())
    }
}

impl From<&Delta> for String {
    fn from(delta: &Delta) -> Self {
        delta.as_text().to_string()
    }
}

/// Wire shape of a delta object.
///
/// Decoding also accepts the legacy `function_call` key, which is folded into
/// `tool_calls` when no `tool_calls` were sent alongside it. Encoding always
/// uses `tool_calls`.
#[derive(Serialize, Deserialize)]
struct DeltaWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(default, skip_serializing_if = "DeltaContent::is_absent")]
    content: DeltaContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refusal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallDelta>>,
    #[serde(default, skip_serializing)]
    function_call: Option<FunctionCallDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audio: Option<AudioOutput>,
}

impl From<DeltaWire> for Delta {
    fn from(wire: DeltaWire) -> Self {
        let tool_calls = wire.tool_calls.or_else(|| {
            wire.function_call
                .map(|function| vec![ToolCallDelta::from_legacy_function_call(function)])
        });

        Self {
            role: wire.role,
            content: wire.content,
            refusal: wire.refusal,
            name: wire.name,
            tool_calls,
            audio: wire.audio,
        }
    }
}

impl From<Delta> for DeltaWire {
    fn from(delta: Delta) -> Self {
        Self {
            role: delta.role,
            content: delta.content,
            refusal: delta.refusal,
            name: delta.name,
            tool_calls: delta.tool_calls,
            function_call: None,
            audio: delta.audio,
        }
    }
}
