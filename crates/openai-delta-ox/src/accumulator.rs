//! Folding streamed deltas back into complete messages
//!
//! OpenAI-format servers fragment a message across many chunks: text arrives
//! piecewise, and each tool call is announced once (id, type, name) and then
//! extended by argument fragments that share its `index`. Parallel tool calls
//! interleave, so fragments are merged by index rather than by arrival order.

use std::collections::BTreeMap;

use bon::Builder;
use futures_util::{Stream, StreamExt};

use crate::{
    audio::AudioOutput,
    chunk::{ChatCompletionChunk, FinishReason},
    delta::Delta,
    error::DeltaError,
    message::Message,
    role::Role,
    tool::{FUNCTION_TYPE, FunctionCall, ToolCall, ToolCallDelta},
    usage::Usage,
};

/// Assembles [`Message`]s from a sequence of deltas or chunks
///
/// ```
/// use openai_delta_ox::{Delta, StreamAccumulator};
///
/// let mut acc = StreamAccumulator::new();
/// acc.push_delta(0, &Delta::builder().content("Hel").build());
/// acc.push_delta(0, &Delta::builder().content("lo").build());
///
/// let messages = acc.finish().unwrap();
/// assert_eq!(messages[0].text(), "Hello");
/// ```
#[derive(Debug, Default, Builder)]
pub struct StreamAccumulator {
    /// Fail on tool calls that never received a function name instead of
    /// dropping them
    #[builder(default)]
    strict_tool_calls: bool,

    #[builder(skip)]
    id: Option<String>,
    #[builder(skip)]
    model: Option<String>,
    #[builder(skip)]
    usage: Option<Usage>,
    #[builder(skip)]
    choices: BTreeMap<u32, ChoiceState>,
}

#[derive(Debug, Default)]
struct ChoiceState {
    role: Option<Role>,
    content: Option<String>,
    refusal: Option<String>,
    name: Option<String>,
    tool_calls: BTreeMap<u32, PartialToolCall>,
    audio: Option<AudioOutput>,
    finish_reason: Option<FinishReason>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    r#type: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion id, taken from the first chunk
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Usage from the last chunk that reported it
    ///
    /// Servers send usage as running totals for the whole completion (once,
    /// on the trailing chunk, or repeated on every chunk), so the latest
    /// report replaces earlier ones.
    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// Text assembled so far for a choice
    pub fn text(&self, choice: u32) -> &str {
        self.choices
            .get(&choice)
            .and_then(|state| state.content.as_deref())
            .unwrap_or_default()
    }

    pub fn push_chunk(&mut self, chunk: &ChatCompletionChunk) {
        if self.id.is_none() {
            self.id = Some(chunk.id.clone());
        }
        if self.model.is_none() {
            self.model = Some(chunk.model.clone());
        }
        if let Some(usage) = &chunk.usage {
            self.usage = Some(usage.clone());
        }

        for choice in &chunk.choices {
            self.push_delta(choice.index, &choice.delta);
            if let Some(reason) = &choice.finish_reason {
                self.choices.entry(choice.index).or_default().finish_reason = Some(reason.clone());
            }
        }
    }

    pub fn push_delta(&mut self, choice: u32, delta: &Delta) {
        log::trace!("Merging delta into choice {choice}: {delta:?}");
        let state = self.choices.entry(choice).or_default();

        if state.role.is_none() {
            state.role = delta.role().cloned();
        }
        if state.name.is_none() {
            state.name = delta.name().map(str::to_string);
        }
        append(&mut state.content, delta.content());
        append(&mut state.refusal, delta.refusal());

        for fragment in delta.tool_calls().unwrap_or_default() {
            state
                .tool_calls
                .entry(fragment.index)
                .or_default()
                .absorb(fragment);
        }

        if let Some(audio) = delta.audio() {
            match &mut state.audio {
                Some(existing) => existing.absorb(audio),
                None => state.audio = Some(audio.clone()),
            }
        }
    }

    /// Drain a chunk stream and assemble its messages
    pub async fn accumulate<S, E>(mut self, stream: S) -> Result<Vec<Message>, DeltaError>
    where
        S: Stream<Item = Result<ChatCompletionChunk, E>>,
        E: std::fmt::Display,
    {
        let mut stream = std::pin::pin!(stream);
        while let Some(item) = stream.next().await {
            let chunk = item.map_err(|e| DeltaError::Stream(e.to_string()))?;
            self.push_chunk(&chunk);
        }
        self.finish()
    }

    /// Assembled messages ordered by choice index
    pub fn finish(self) -> Result<Vec<Message>, DeltaError> {
        let strict = self.strict_tool_calls;
        log::debug!(
            "Assembling {} choice(s) for completion {:?}",
            self.choices.len(),
            self.id
        );

        self.choices
            .into_iter()
            .map(|(index, state)| state.into_message(index, strict))
            .collect()
    }
}

impl ChoiceState {
    fn into_message(self, choice: u32, strict: bool) -> Result<Message, DeltaError> {
        let mut tool_calls = Vec::with_capacity(self.tool_calls.len());
        for (index, partial) in self.tool_calls {
            match partial.into_tool_call() {
                Some(call) => tool_calls.push(call),
                None if strict => return Err(DeltaError::IncompleteToolCall { choice, index }),
                None => log::warn!(
                    "Dropping tool call {index} of choice {choice}: missing function name"
                ),
            }
        }

        Ok(Message {
            role: self.role.unwrap_or(Role::Assistant),
            content: self.content.filter(|text| !text.is_empty()),
            refusal: self.refusal,
            name: self.name,
            tool_calls,
            audio: self.audio,
            finish_reason: self.finish_reason,
        })
    }
}

impl PartialToolCall {
    fn absorb(&mut self, fragment: &ToolCallDelta) {
        if self.id.is_none() {
            self.id.clone_from(&fragment.id);
        }
        if self.r#type.is_none() {
            self.r#type.clone_from(&fragment.r#type);
        }
        if self.name.is_none() {
            self.name = fragment.function_name().map(str::to_string);
        }
        if let Some(arguments) = fragment.function_arguments() {
            self.arguments.push_str(arguments);
        }
    }

    /// `None` without a function name. Legacy `function_call` streams never
    /// carry an id, so a missing one becomes empty.
    fn into_tool_call(self) -> Option<ToolCall> {
        Some(ToolCall {
            id: self.id.unwrap_or_default(),
            r#type: self.r#type.unwrap_or_else(|| FUNCTION_TYPE.to_string()),
            function: FunctionCall {
                name: self.name.filter(|name| !name.is_empty())?,
                arguments: self.arguments,
            },
        })
    }
}

fn append(target: &mut Option<String>, fragment: Option<&str>) {
    if let Some(fragment) = fragment {
        target.get_or_insert_with(String::new).push_str(fragment);
    }
}
