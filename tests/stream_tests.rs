// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use futures::stream;
use sql_query_generator::{
    error::{AppErrorKind, AppResult, generation_failed},
    llm::stream::{ChunkAccumulator, consume_stream}
};

fn bytes(parts: &[&str]) -> Vec<AppResult<Vec<u8>>> {
    parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
}

async fn consume(parts: &[&str]) -> AppResult<String> {
    consume_stream(stream::iter(bytes(parts)), |_| {}).await
}

#[tokio::test]
async fn test_fragments_accumulate_in_order() {
    let sql = consume(&[
        "{\"response\":\"SELECT \"}\n",
        "{\"response\":\"1;\"}\n",
        "{\"done\":true}\n"
    ])
    .await
    .unwrap();
    assert_eq!(sql, "SELECT 1;");
}

#[tokio::test]
async fn test_lines_split_across_reads() {
    let sql = consume(&[
        "{\"respo",
        "nse\":\"SELECT id \"}\n{\"response\":\"FROM",
        " users\"}\n{\"do",
        "ne\":true}\n"
    ])
    .await
    .unwrap();
    assert_eq!(sql, "SELECT id FROM users;");
}

#[tokio::test]
async fn test_prose_around_streamed_statement_is_removed() {
    let sql = consume(&[
        "{\"response\":\"Here is the query:\\n\"}\n",
        "{\"response\":\"```sql\\nSELECT name\\n\"}\n",
        "{\"response\":\"FROM users\\n```\\n\"}\n",
        "{\"response\":\"This lists all users.\"}\n",
        "{\"done\":true}\n"
    ])
    .await
    .unwrap();
    assert_eq!(sql, "SELECT name FROM users;");
}

#[tokio::test]
async fn test_malformed_chunk_is_skipped() {
    let sql = consume(&[
        "{\"response\":\"SELECT \"}\n",
        "this is not json\n",
        "{\"response\":\"2\"}\n",
        "\n",
        "{\"done\":true}\n"
    ])
    .await
    .unwrap();
    assert_eq!(sql, "SELECT 2;");
}

#[tokio::test]
async fn test_inline_error_fails_immediately() {
    let err = consume(&[
        "{\"response\":\"SELECT \"}\n",
        "{\"error\":\"model overloaded\"}\n",
        "{\"response\":\"1\"}\n",
        "{\"done\":true}\n"
    ])
    .await
    .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Service);
    assert!(err.message.as_deref().unwrap_or_default().contains("model overloaded"));
}

#[tokio::test]
async fn test_missing_done_is_incomplete() {
    let err = consume(&["{\"response\":\"SELECT 1\"}\n"])
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Network);
}

#[tokio::test]
async fn test_empty_stream_is_incomplete() {
    let err = consume(&[]).await.unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Network);
}

#[tokio::test]
async fn test_done_without_statement_yields_empty() {
    let sql = consume(&["{\"response\":\"I cannot do that.\"}\n", "{\"done\":true}\n"])
        .await
        .unwrap();
    assert_eq!(sql, "");
}

#[tokio::test]
async fn test_transport_error_propagates() {
    let items: Vec<AppResult<Vec<u8>>> = vec![
        Ok(b"{\"response\":\"SELECT 1\"}\n".to_vec()),
        Err(generation_failed("Request to Ollama timed out. Please try again."))
    ];
    let err = consume_stream(stream::iter(items), |_| {})
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Service);
}

#[tokio::test]
async fn test_partials_are_sanitized_prefixes() {
    let mut partials = Vec::new();
    let sql = consume_stream(
        stream::iter(bytes(&[
            "{\"response\":\"SELECT id \"}\n",
            "{\"response\":\"FROM t\"}\n",
            "{\"response\":\" WHERE x = 1;\"}\n",
            "{\"done\":true}\n"
        ])),
        |partial| partials.push(partial.to_string())
    )
    .await
    .unwrap();
    assert_eq!(sql, "SELECT id FROM t WHERE x = 1;");
    assert_eq!(partials, vec!["SELECT id;", "SELECT id FROM t WHERE x = 1;"]);
}

#[tokio::test]
async fn test_unchanged_partial_is_not_repeated() {
    let mut partials = Vec::new();
    consume_stream(
        stream::iter(bytes(&[
            "{\"response\":\"SELECT 1;\"}\n",
            "{\"response\":\"\\nThis returns one row. \"}\n",
            "{\"done\":true}\n"
        ])),
        |partial| partials.push(partial.to_string())
    )
    .await
    .unwrap();
    assert_eq!(partials, vec!["SELECT 1;"]);
}

#[tokio::test]
async fn test_text_after_done_is_ignored() {
    let sql = consume(&[
        "{\"response\":\"SELECT 3\",\"done\":true}\n",
        "{\"response\":\" garbage\"}\n"
    ])
    .await
    .unwrap();
    assert_eq!(sql, "SELECT 3;");
}

#[test]
fn test_accumulator_error_discards_buffer() {
    let mut acc = ChunkAccumulator::new();
    acc.feed(b"{\"response\":\"SELECT 1\"}\n").unwrap();
    assert_eq!(acc.text(), "SELECT 1");
    assert!(acc.feed(b"{\"error\":\"boom\"}\n").is_err());
    assert_eq!(acc.text(), "");
}
