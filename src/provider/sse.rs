//! SSE (Server-Sent Events) decoding for streaming completions
//!
//! Buffers partial chunks from `bytes_stream()` and yields complete `data:`
//! frames. The buffer is bounded so a malformed stream cannot grow it
//! without limit.

use serde::de::DeserializeOwned;

/// SSE stream decoder with buffering
///
/// # Example
/// ```ignore
/// let mut decoder = SseDecoder::new();
///
/// while let Some(chunk) = stream.next().await {
///     for frame in decoder.push(&chunk?) {
///         if frame.is_done() { break; }
///         if let Some(data) = frame.try_parse::<MyType>() { /* ... */ }
///     }
/// }
/// ```
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Maximum buffer size (1MB)
    const MAX_BUFFER_SIZE: usize = 1024 * 1024;

    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Push a chunk of bytes and extract complete frames
    ///
    /// Incomplete trailing data stays buffered for the next push. Lines are
    /// split on raw bytes, so a UTF-8 sequence cut across chunks survives.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        if self.buffer.len() > Self::MAX_BUFFER_SIZE {
            tracing::warn!(
                "SSE buffer exceeded {}KB limit, truncating",
                Self::MAX_BUFFER_SIZE / 1024
            );
            let keep_from = self.buffer.len() - (Self::MAX_BUFFER_SIZE / 2);
            self.buffer.drain(..keep_from);
        }

        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();

            // Blank lines separate events; `:` lines are keep-alive comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                frames.push(SseFrame {
                    data: data.trim_start().to_string(),
                });
            }
        }

        frames
    }

    /// Push a string directly
    pub fn push_str(&mut self, s: &str) -> Vec<SseFrame> {
        self.push(s.as_bytes())
    }

    pub fn has_remaining(&self) -> bool {
        self.buffer.iter().any(|b| !b.is_ascii_whitespace())
    }
}

/// A complete SSE data line
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    /// The data content (without the "data:" prefix)
    pub data: String,
}

impl SseFrame {
    /// Check if this is the [DONE] sentinel
    pub fn is_done(&self) -> bool {
        self.data == "[DONE]"
    }

    /// Parse the frame data as JSON, returning None on failure
    pub fn try_parse<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_str(&self.data).ok()
    }

    /// First 200 chars of the data, for logs
    pub fn preview(&self) -> String {
        match self.data.char_indices().nth(200) {
            Some((idx, _)) => format!("{}...", &self.data[..idx]),
            None => self.data.clone(),
        }
    }
}
