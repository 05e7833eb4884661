use futures_util::stream;
use openai_delta_ox::{
    ChatCompletionChunk, ChunkDecoder, DeltaError, FinishReason, Role, StreamAccumulator,
};
use serde_json::{Value, json};

fn chunk(choices: Value) -> ChatCompletionChunk {
    serde_json::from_value(json!({
        "id": "chatcmpl-42",
        "object": "chat.completion.chunk",
        "created": 1727000000,
        "model": "gpt-4o-2024-08-06",
        "choices": choices,
    }))
    .unwrap()
}

fn sse(chunks: &[ChatCompletionChunk]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(&serde_json::to_string(chunk).unwrap());
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn tool_call_stream() -> Vec<ChatCompletionChunk> {
    vec![
        chunk(json!([{"index": 0, "delta": {"role": "assistant", "content": null, "tool_calls": [
            {"index": 0, "id": "call_weather", "type": "function",
             "function": {"name": "get_weather", "arguments": ""}}
        ]}}])),
        chunk(json!([{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "{\"location\":"}}
        ]}}])),
        chunk(json!([{"index": 0, "delta": {"tool_calls": [
            {"index": 1, "id": "call_time", "type": "function",
             "function": {"name": "get_time", "arguments": "{}"}}
        ]}}])),
        chunk(json!([{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "\"Paris\"}"}}
        ]}}])),
        chunk(json!([{"index": 0, "delta": {}, "finish_reason": "tool_calls"}])),
    ]
}

#[test]
fn sse_body_assembles_into_tool_calls() {
    let body = sse(&tool_call_stream());

    let mut decoder = ChunkDecoder::new();
    let mut acc = StreamAccumulator::builder().strict_tool_calls(true).build();
    for piece in body.as_bytes().chunks(7) {
        for chunk in decoder.push(piece).unwrap() {
            acc.push_chunk(&chunk);
        }
    }
    assert!(decoder.is_done());
    assert_eq!(acc.id(), Some("chatcmpl-42"));
    assert_eq!(acc.model(), Some("gpt-4o-2024-08-06"));

    let message = acc.finish().unwrap().remove(0);
    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.content, None);
    assert_eq!(message.finish_reason, Some(FinishReason::ToolCalls));
    assert_eq!(message.tool_calls.len(), 2);

    let weather = &message.tool_calls[0];
    assert_eq!(weather.id, "call_weather");
    assert_eq!(weather.function.name, "get_weather");
    let args: Value = weather.parse_arguments().unwrap();
    assert_eq!(args, json!({"location": "Paris"}));

    assert_eq!(message.tool_calls[1].function.name, "get_time");
}

#[tokio::test]
async fn accumulates_a_chunk_stream() {
    let mut chunks = vec![
        chunk(json!([{"index": 0, "delta": {"role": "assistant", "content": ""}}])),
        chunk(json!([{"index": 0, "delta": {"content": "The answer"}}])),
        chunk(json!([{"index": 0, "delta": {"content": " is 42."}, "finish_reason": "stop"}])),
    ];
    let mut usage_chunk = chunk(json!([]));
    usage_chunk.usage = Some(openai_delta_ox::Usage::new(12, 5));
    chunks.push(usage_chunk);

    let acc = StreamAccumulator::new();
    let messages = acc
        .accumulate(stream::iter(chunks.into_iter().map(Ok::<_, DeltaError>)))
        .await
        .unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text(), "The answer is 42.");
    assert_eq!(messages[0].finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn stream_error_aborts_accumulation() {
    let items: Vec<Result<ChatCompletionChunk, String>> = vec![
        Ok(chunk(json!([{"index": 0, "delta": {"content": "partial"}}]))),
        Err("connection reset".to_string()),
    ];

    let result = StreamAccumulator::new().accumulate(stream::iter(items)).await;
    match result {
        Err(DeltaError::Stream(message)) => assert_eq!(message, "connection reset"),
        other => panic!("expected stream error, got {other:?}"),
    }
}

#[test]
fn usage_is_tracked_across_chunks() {
    let mut acc = StreamAccumulator::new();
    let mut last = chunk(json!([]));
    last.usage = Some(openai_delta_ox::Usage::new(20, 3));
    acc.push_chunk(&chunk(json!([{"index": 0, "delta": {"content": "ok"}}])));
    acc.push_chunk(&last);

    assert_eq!(acc.usage().map(|u| u.total_tokens), Some(23));
    assert_eq!(acc.finish().unwrap()[0].text(), "ok");
}

#[test]
fn repeated_running_usage_is_not_double_counted() {
    let mut acc = StreamAccumulator::new();
    let mut early = chunk(json!([{"index": 0, "delta": {"content": "o"}}]));
    early.usage = Some(openai_delta_ox::Usage::new(8, 2));
    let mut late = chunk(json!([{"index": 0, "delta": {"content": "k"}, "finish_reason": "stop"}]));
    late.usage = Some(openai_delta_ox::Usage::new(20, 3));

    acc.push_chunk(&early);
    acc.push_chunk(&late);

    let usage = acc.usage().unwrap();
    assert_eq!((usage.prompt_tokens, usage.completion_tokens), (20, 3));
    assert_eq!(usage.total_tokens, 23);
}

#[test]
fn legacy_function_call_stream_assembles() {
    let chunks = vec![
        chunk(json!([{"index": 0, "delta": {"role": "assistant", "content": null,
            "function_call": {"name": "get_time", "arguments": ""}}}])),
        chunk(json!([{"index": 0, "delta": {"function_call": {"arguments": "{}"}}}])),
        chunk(json!([{"index": 0, "delta": {}, "finish_reason": "function_call"}])),
    ];

    let mut acc = StreamAccumulator::new();
    for chunk in &chunks {
        acc.push_chunk(chunk);
    }

    let message = acc.finish().unwrap().remove(0);
    assert_eq!(message.tool_calls.len(), 1);
    assert_eq!(message.tool_calls[0].id, "");
    assert_eq!(message.tool_calls[0].function.name, "get_time");
    assert_eq!(message.tool_calls[0].function.arguments, "{}");
    assert_eq!(message.finish_reason, Some(FinishReason::FunctionCall));
}
