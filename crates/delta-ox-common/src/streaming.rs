use std::collections::VecDeque;

use crate::error::CommonStreamError;
use serde::de::DeserializeOwned;

/// Sentinel OpenAI-format servers send as the last `data:` payload
pub const DONE_MARKER: &str = "[DONE]";

/// Incremental Server-Sent Events decoder for streaming responses
///
/// Bytes can be pushed in arbitrarily sized pieces; an event is only decoded
/// once its terminating blank line has been seen. Splits inside a multi-byte
/// UTF-8 sequence are safe because only complete lines are converted to text.
///
/// A payload that fails to decode does not swallow the events before it:
/// those are returned first and the failing payload is reported by the next
/// call to [`push`](Self::push) or [`finish`](Self::finish). Events framed
/// after it stay queued behind it.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes received but not yet terminated by a newline
    buffer: Vec<u8>,
    /// `data:` lines belonging to the event being assembled
    data_lines: Vec<String>,
    /// Complete payloads waiting to be decoded, oldest first
    pending: VecDeque<String>,
    /// Whether the `[DONE]` sentinel has been seen
    done: bool,
}

impl SseDecoder {
    /// Decoder with nothing buffered
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the stream announced its end with `data: [DONE]`
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a piece of the byte stream and return every event it completed
    pub fn push<T: DeserializeOwned>(
        &mut self,
        chunk: impl AsRef<[u8]>,
    ) -> Result<Vec<T>, CommonStreamError> {
        self.buffer.extend_from_slice(chunk.as_ref());

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let line = String::from_utf8(line_bytes)?;
            self.process_line(&line);
        }

        self.drain_pending()
    }

    /// Flush whatever remains once the underlying stream has ended
    pub fn finish<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, CommonStreamError> {
        if !self.buffer.is_empty() {
            let line = String::from_utf8(std::mem::take(&mut self.buffer))?;
            self.process_line(&line);
        }
        self.finalize_event();

        self.drain_pending()
    }

    /// Apply one line of the stream; a blank line completes the current event
    fn process_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\n', '\r']);

        if line.trim_end().is_empty() {
            self.finalize_event();
            return;
        }

        if line.starts_with(':') {
            return;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            // A single optional space follows the colon
            let data = rest.strip_prefix(' ').unwrap_or(rest);

            if data.trim() == DONE_MARKER {
                log::trace!("SSE stream reached {DONE_MARKER}");
                self.data_lines.clear();
                self.done = true;
                return;
            }

            self.data_lines.push(data.to_string());
            return;
        }

        // event, id, retry and unknown fields carry nothing we decode
        log::trace!("Ignoring SSE field line: {line}");
    }

    /// Join the collected `data:` lines into one payload and queue it
    fn finalize_event(&mut self) {
        if self.data_lines.is_empty() {
            return;
        }

        let payload = self.data_lines.join("\n");
        self.data_lines.clear();

        if !payload.trim().is_empty() {
            self.pending.push_back(payload);
        }
    }

    /// Decode queued payloads up to the first one that fails
    ///
    /// The failure is returned only when nothing was decoded before it;
    /// otherwise its payload goes back to the front of the queue.
    fn drain_pending<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, CommonStreamError> {
        let mut events = Vec::new();

        while let Some(payload) = self.pending.pop_front() {
            match serde_json::from_str(&payload) {
                Ok(event) => events.push(event),
                Err(e) if events.is_empty() => {
                    return Err(CommonStreamError::invalid_payload(&payload, &e));
                }
                Err(_) => {
                    log::debug!(
                        "Holding back undecodable SSE payload until {} event(s) are delivered",
                        events.len()
                    );
                    self.pending.push_front(payload);
                    break;
                }
            }
        }

        Ok(events)
    }
}

/// Decode every event contained in a complete event-stream body
pub fn parse_sse_events<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, CommonStreamError> {
    let mut decoder = SseDecoder::new();
    let mut events = decoder.push::<T>(body)?;
    events.extend(decoder.finish::<T>()?);
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_parse_sse_events_empty() {
        let result: Result<Vec<Value>, _> = parse_sse_events("");
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_parse_sse_events_done_message() {
        let result: Result<Vec<Value>, _> = parse_sse_events("data: [DONE]\n\n");
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_parse_sse_events_valid_json() {
        let events: Vec<Value> = parse_sse_events("data: {\"test\": \"value\"}\n").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["test"], "value");
    }

    #[test]
    fn test_parse_sse_events_invalid_json() {
        let result: Result<Vec<Value>, _> = parse_sse_events("data: {invalid json}\n\n");
        assert!(matches!(result, Err(CommonStreamError::InvalidEventData(_))));
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let body = "data: {\"a\":\ndata: 1}\n\n";
        let events: Vec<Value> = parse_sse_events(body).unwrap();
        assert_eq!(events, vec![serde_json::json!({"a": 1})]);
    }

    #[test]
    fn test_comments_and_other_fields_are_skipped() {
        let body = ": keep-alive\nevent: message\nid: 7\nretry: 100\ndata: {\"n\":1}\n\n";
        let events: Vec<Value> = parse_sse_events(body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["n"], 1);
    }

    #[test]
    fn test_decoder_tracks_done_marker() {
        let mut decoder = SseDecoder::new();
        let events: Vec<Value> = decoder.push("data: {\"n\":1}\n\ndata: [DONE]\n\n").unwrap();
        assert_eq!(events.len(), 1);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_bad_payload_does_not_drop_earlier_events() {
        let mut decoder = SseDecoder::new();
        let events: Vec<Value> = decoder
            .push("data: {\"n\":1}\n\ndata: {broken\n\ndata: {\"n\":2}\n\n")
            .unwrap();
        assert_eq!(events, vec![serde_json::json!({"n": 1})]);

        let err = decoder.push::<Value>("").unwrap_err();
        assert!(matches!(err, CommonStreamError::InvalidEventData(_)));

        let rest: Vec<Value> = decoder.finish().unwrap();
        assert_eq!(rest, vec![serde_json::json!({"n": 2})]);
    }

    #[test]
    fn test_one_shot_parse_still_reports_bad_payload() {
        let result: Result<Vec<Value>, _> = parse_sse_events("data: {\"n\":1}\n\ndata: {broken\n\n");
        assert!(matches!(result, Err(CommonStreamError::InvalidEventData(_))));
    }

    #[test]
    fn test_decoder_handles_split_utf8_sequence() {
        let body = "data: {\"text\":\"héllo\"}\n\n".as_bytes();
        let split = body.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut decoder = SseDecoder::new();
        let first: Vec<Value> = decoder.push(&body[..split]).unwrap();
        assert!(first.is_empty());
        let second: Vec<Value> = decoder.push(&body[split..]).unwrap();
        assert_eq!(second[0]["text"], "héllo");
    }
}
