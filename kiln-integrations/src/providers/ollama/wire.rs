//! Request and response shapes of `POST /api/generate`.

use futures::{Stream, StreamExt, stream};
use kiln_core::GenerationParams;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use tracing::debug;

use super::error::{OllamaError, Result};

/// Body of a generate request.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

/// One response object; the whole body when not streaming, one NDJSON
/// line when streaming.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

/// Translate generation parameters into Ollama `options`.
///
/// Keys without a dedicated field are passed through unchanged.
pub(crate) fn options(params: &GenerationParams) -> Map<String, Value> {
    let mut options = Map::new();

    if let Some(v) = params.top_k {
        options.insert("top_k".into(), json!(v));
    }
    if let Some(v) = params.top_p {
        options.insert("top_p".into(), json!(v));
    }
    if let Some(v) = params.temperature {
        options.insert("temperature".into(), json!(v));
    }
    if let Some(v) = params.repetition_penalty {
        options.insert("repeat_penalty".into(), json!(v));
    }
    if let Some(v) = params.last_n_tokens {
        options.insert("repeat_last_n".into(), json!(v));
    }
    if let Some(v) = params.seed.filter(|s| *s >= 0) {
        options.insert("seed".into(), json!(v));
    }
    if let Some(v) = params.max_new_tokens {
        options.insert("num_predict".into(), json!(v));
    }
    if let Some(v) = params.stop.as_ref().filter(|s| !s.is_empty()) {
        options.insert("stop".into(), json!(v));
    }
    if let Some(v) = params.batch_size {
        options.insert("num_batch".into(), json!(v));
    }
    if let Some(v) = params.threads.filter(|t| *t > 0) {
        options.insert("num_thread".into(), json!(v));
    }
    if params.reset == Some(false) {
        debug!("reset = false has no Ollama equivalent, every request starts fresh");
    }

    for (key, value) in &params.extra {
        options.insert(key.clone(), value.clone());
    }

    options
}

/// Splits a byte stream into newline-delimited JSON objects.
#[derive(Debug, Default)]
pub(crate) struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    /// Feed bytes, returning every complete line decoded.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<Result<GenerateChunk>> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(chunk) = parse_line(&line) {
                out.push(chunk);
            }
        }
        out
    }

    /// Decode whatever is left once the body has ended.
    pub(crate) fn finish(&mut self) -> Option<Result<GenerateChunk>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<Result<GenerateChunk>> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(serde_json::from_slice(line).map_err(OllamaError::decode))
}

struct DecodeState<S> {
    bytes: S,
    decoder: NdjsonDecoder,
    queue: VecDeque<Result<String>>,
    done: bool,
}

impl<S> DecodeState<S> {
    fn accept(&mut self, chunk: Result<GenerateChunk>) {
        if self.done {
            return;
        }
        match chunk {
            Ok(chunk) => {
                if let Some(message) = chunk.error {
                    self.queue.push_back(Err(OllamaError::Server { message }));
                    self.done = true;
                    return;
                }
                if !chunk.response.is_empty() {
                    self.queue.push_back(Ok(chunk.response));
                }
                if chunk.done {
                    debug!(
                        "Ollama stream done: reason {:?}, {:?} tokens",
                        chunk.done_reason, chunk.eval_count
                    );
                    self.done = true;
                }
            }
            Err(e) => {
                self.queue.push_back(Err(e));
                self.done = true;
            }
        }
    }
}

/// Turn a streamed response body into text fragments.
///
/// Ends after the line with `done: true`; anything after it is ignored.
pub(crate) fn fragments<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<OllamaError> + Send,
{
    let state = DecodeState {
        bytes,
        decoder: NdjsonDecoder::default(),
        queue: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.queue.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    for chunk in state.decoder.push(bytes.as_ref()) {
                        state.accept(chunk);
                    }
                }
                Some(Err(e)) => {
                    state.queue.push_back(Err(e.into()));
                    state.done = true;
                }
                None => {
                    if let Some(chunk) = state.decoder.finish() {
                        state.accept(chunk);
                    }
                    state.done = true;
                }
            }
        }
    })
}
