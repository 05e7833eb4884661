use delta_ox_common::{CommonStreamError, SseDecoder, parse_sse_events};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct Tick {
    n: u32,
}

const BODY: &str = "data: {\"n\":1}\r\n\r\n: ping\r\ndata: {\"n\":2}\r\n\r\ndata: [DONE]\r\n\r\n";

#[test]
fn crlf_stream_decodes_in_one_pass() {
    let ticks: Vec<Tick> = parse_sse_events(BODY).unwrap();
    assert_eq!(ticks, vec![Tick { n: 1 }, Tick { n: 2 }]);
}

#[test]
fn every_split_point_yields_the_same_events() {
    for split in 0..=BODY.len() {
        let mut decoder = SseDecoder::new();
        let mut ticks: Vec<Tick> = decoder.push(&BODY.as_bytes()[..split]).unwrap();
        ticks.extend(decoder.push::<Tick>(&BODY.as_bytes()[split..]).unwrap());
        ticks.extend(decoder.finish::<Tick>().unwrap());

        assert_eq!(ticks, vec![Tick { n: 1 }, Tick { n: 2 }], "split at {split}");
        assert!(decoder.is_done());
    }
}

#[test]
fn trailing_event_without_blank_line_is_flushed_on_finish() {
    let mut decoder = SseDecoder::new();
    let ticks: Vec<Tick> = decoder.push("data: {\"n\":3}").unwrap();
    assert!(ticks.is_empty());

    let ticks: Vec<Tick> = decoder.finish().unwrap();
    assert_eq!(ticks, vec![Tick { n: 3 }]);
    assert!(!decoder.is_done());
}

#[test]
fn payload_of_wrong_shape_is_reported_with_excerpt() {
    let err = parse_sse_events::<Tick>("data: {\"n\":\"three\"}\n\n").unwrap_err();
    match err {
        CommonStreamError::InvalidEventData(message) => {
            assert!(message.contains("JSON parse error"));
            assert!(message.contains("three"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn invalid_utf8_line_is_an_error() {
    let mut decoder = SseDecoder::new();
    let result = decoder.push::<Tick>([b'd', b'a', 0xFF, b'\n'].as_slice());
    assert!(matches!(result, Err(CommonStreamError::Utf8Error(_))));
}

#[test]
fn undecodable_event_is_reported_after_the_good_ones() {
    let mut decoder = SseDecoder::new();
    let ticks: Vec<Tick> = decoder
        .push("data: {\"n\":1}\n\ndata: {\"n\":\"one\"}\n\ndata: {\"n\":3}\n\n")
        .unwrap();
    assert_eq!(ticks, vec![Tick { n: 1 }]);

    match decoder.push::<Tick>("data: {\"n\":4}\n\n") {
        Err(CommonStreamError::InvalidEventData(message)) => assert!(message.contains("\"one\"")),
        other => panic!("expected invalid event data, got {other:?}"),
    }

    let rest: Vec<Tick> = decoder.finish().unwrap();
    assert_eq!(rest, vec![Tick { n: 3 }, Tick { n: 4 }]);
}
