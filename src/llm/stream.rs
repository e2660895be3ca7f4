//! Consumption of newline-delimited JSON generation streams.
//!
//! Ollama answers a streaming `/api/generate` call with one JSON object per
//! line:
//!
//! ```text
//! {"response":"SELECT "}
//! {"response":"1;"}
//! {"done":true}
//! ```
//!
//! Transport reads do not line up with those lines, so bytes are buffered
//! until a newline arrives. A line that fails to parse is skipped; a line
//! carrying `error` aborts the whole stream; `done` ends consumption.

use std::pin::pin;

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::{
    error::{AppResult, generation_failed, stream_incomplete},
    sanitize::sanitize_sql
};

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error:    Option<String>,
    #[serde(default)]
    done:     bool
}

/// Running state of one streamed response.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    pending:  Vec<u8>,
    text:     String,
    received: usize,
    done:     bool
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw transport bytes, returning the text fragments completed by
    /// this read in arrival order.
    ///
    /// Bytes after the completion marker are ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> AppResult<Vec<String>> {
        self.received += bytes.len();
        if self.done {
            return Ok(Vec::new());
        }
        self.pending.extend_from_slice(bytes);
        let mut fragments = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(fragment) = self.process_line(&line)? {
                fragments.push(fragment);
            }
            if self.done {
                self.pending.clear();
                break;
            }
        }
        Ok(fragments)
    }

    /// Close the stream and return the accumulated raw text.
    ///
    /// A trailing line without newline is still parsed. Fails with a
    /// stream-incomplete error when no completion marker was seen.
    pub fn finish(mut self) -> AppResult<String> {
        if !self.done && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.process_line(&line)?;
        }
        if !self.done {
            return Err(stream_incomplete(self.received));
        }
        Ok(self.text)
    }

    /// Raw text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn process_line(&mut self, line: &[u8]) -> AppResult<Option<String>> {
        let Ok(line) = std::str::from_utf8(line) else {
            tracing::debug!("skipping non-UTF-8 stream line");
            return Ok(None);
        };
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let chunk: StreamChunk = match serde_json::from_str(line) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed stream chunk");
                return Ok(None);
            }
        };
        if let Some(error) = chunk.error {
            self.text.clear();
            return Err(generation_failed(format!("Ollama API error: {}", error)));
        }
        if chunk.done {
            self.done = true;
        }
        match chunk.response {
            Some(fragment) if !fragment.is_empty() => {
                self.text.push_str(&fragment);
                Ok(Some(fragment))
            }
            _ => Ok(None)
        }
    }
}

/// Whether a fragment ends at a point worth re-sanitizing for live display.
pub fn is_emission_boundary(fragment: &str) -> bool {
    !fragment.trim().is_empty() && fragment.ends_with([';', '\n', ' ', ','])
}

/// Drain a byte stream of JSON chunks and sanitize the accumulated text.
///
/// `on_partial` receives the sanitized prefix whenever a fragment ends at an
/// emission boundary and the prefix changed since the last report. Those
/// prefixes are for display only; the returned statement comes from one
/// sanitize pass over the complete buffer and may be empty when the model
/// produced no statement.
pub async fn consume_stream<S, B, F>(stream: S, mut on_partial: F) -> AppResult<String>
where
    S: Stream<Item = AppResult<B>>,
    B: AsRef<[u8]>,
    F: FnMut(&str)
{
    let mut stream = pin!(stream);
    let mut accumulator = ChunkAccumulator::new();
    let mut last_partial = String::new();
    while let Some(bytes) = stream.next().await {
        let fragments = accumulator.feed(bytes?.as_ref())?;
        if fragments.iter().any(|f| is_emission_boundary(f)) {
            let partial = sanitize_sql(accumulator.text());
            if !partial.is_empty() && partial != last_partial {
                on_partial(&partial);
                last_partial = partial;
            }
        }
        if accumulator.is_done() {
            break;
        }
    }
    let text = accumulator.finish()?;
    Ok(sanitize_sql(&text))
}
