#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items
)]

//! Shared stream decoding plumbing for the delta-ox crates
//!
//! This crate holds the transport-agnostic pieces every OpenAI-format stream
//! consumer needs: Server-Sent-Events framing, a unix-seconds timestamp and
//! the error type those two can produce.

pub mod error;
pub mod streaming;
pub mod timestamp;

pub use error::CommonStreamError;
pub use streaming::{SseDecoder, parse_sse_events};
pub use timestamp::Timestamp;
