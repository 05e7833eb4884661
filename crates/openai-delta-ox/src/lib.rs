//! Streaming chat-completion deltas for OpenAI-format APIs
//!
//! This crate models the pieces of a streamed chat completion, with support for:
//! - `Delta` fragments with exact `content` presence (absent, `null`, text)
//! - Tool call fragments, including the legacy `function_call` key
//! - Audio output payloads (base64 data, transcript, expiry)
//! - Decoding `text/event-stream` bodies into chunks
//! - Assembling chunks back into complete messages
//!
//! It performs no I/O: bring your own HTTP client and feed the response
//! bytes to [`ChunkDecoder`].
//!
//! # Example
//!
//! ```rust
//! use openai_delta_ox::{ChunkDecoder, StreamAccumulator};
//!
//! let body = concat!(
//!     "data: {\"id\":\"c1\",\"created\":1,\"model\":\"gpt-4o\",",
//!     "\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hi\"}}]}\n\n",
//!     "data: [DONE]\n\n",
//! );
//!
//! let mut decoder = ChunkDecoder::new();
//! let mut acc = StreamAccumulator::new();
//! for chunk in decoder.push(body)? {
//!     print!("{}", chunk.text());
//!     acc.push_chunk(&chunk);
//! }
//!
//! let messages = acc.finish()?;
//! assert_eq!(messages[0].text(), "Hi");
//! # Ok::<(), openai_delta_ox::DeltaError>(())
//! ```

pub mod accumulator;
pub mod audio;
pub mod chunk;
pub mod delta;
pub mod error;
pub mod message;
pub mod role;
pub mod tool;
pub mod usage;

// Re-export main types
pub use accumulator::StreamAccumulator;
pub use audio::AudioOutput;
pub use chunk::{ChatCompletionChunk, ChunkChoice, ChunkDecoder, FinishReason};
pub use delta::{Delta, DeltaContent, is_valid_author_name, text_of};
pub use error::DeltaError;
pub use message::Message;
pub use role::Role;
pub use tool::{FunctionCall, FunctionCallDelta, ToolCall, ToolCallDelta};
pub use usage::Usage;

// Re-export shared types from delta-ox-common
pub use delta_ox_common::Timestamp;
