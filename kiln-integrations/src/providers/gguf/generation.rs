//! The token generation loop.

use candle_core::{DType, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::config::SessionParams;
use super::error::{GgufError, Result};
use super::model::TokenModel;
use super::tokenizer::{TokenOutputStream, Vocabulary};

/// Why a generation call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The model produced an end-of-sequence token.
    EndOfSequence,
    /// A stop sequence was found.
    StopSequence,
    /// `max_new_tokens` or the context limit was reached.
    Length,
    /// The consumer went away.
    Cancelled,
}

/// Summary of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Prompt tokens evaluated by this call.
    pub prompt_tokens: usize,
    /// Tokens sampled by this call.
    pub generated_tokens: usize,
    /// Why generation ended.
    pub finish_reason: FinishReason,
}

/// Model state that survives between calls when `reset` is off.
pub(crate) struct Session<M> {
    pub(crate) model: M,
    /// Tokens already in the model's cache.
    pub(crate) history: Vec<u32>,
    /// Last sampled token, not yet fed to the model.
    pub(crate) pending: Option<u32>,
    pub(crate) context_limit: usize,
    pub(crate) eos: HashSet<u32>,
}

impl<M: TokenModel> Session<M> {
    pub(crate) fn new(model: M, context_limit: usize, eos: impl IntoIterator<Item = u32>) -> Self {
        Self {
            model,
            history: Vec::new(),
            pending: None,
            context_limit: context_limit.max(2),
            eos: eos.into_iter().collect(),
        }
    }

    fn clear(&mut self) {
        self.history.clear();
        self.pending = None;
    }

    /// Run one generation call, handing every text fragment to `emit`.
    ///
    /// `emit` returns `false` when nobody is listening any more, which ends
    /// generation early.
    pub(crate) fn generate<V, F>(
        &mut self,
        vocab: &V,
        prompt: &str,
        params: &SessionParams,
        mut emit: F,
    ) -> Result<GenerationSummary>
    where
        V: Vocabulary + ?Sized,
        F: FnMut(String) -> bool,
    {
        if params.reset {
            self.clear();
        }

        let mut input = self.prompt_tokens(vocab, prompt)?;
        if !self.history.is_empty() && self.history.len() + input.len() >= self.context_limit {
            warn!(
                "Session holds {} tokens and the prompt adds {}, context limit is {}; starting over",
                self.history.len(),
                input.len(),
                self.context_limit
            );
            self.clear();
            input = self.prompt_tokens(vocab, prompt)?;
        }

        if input.is_empty() {
            return Err(GgufError::config("prompt produced no tokens"));
        }

        let room = self.context_limit - 1;
        if input.len() > room {
            let dropped = input.len() - room;
            warn!(
                "Prompt has {} tokens, context limit is {}; dropping the oldest {}",
                input.len(),
                self.context_limit,
                dropped
            );
            input.drain(..dropped);
        }

        let prompt_tokens = input.len();
        let mut logits = self.feed(&input)?;

        let max_new = params
            .max_new_tokens
            .min(self.context_limit.saturating_sub(self.history.len()));
        if max_new < params.max_new_tokens {
            debug!(
                "Context allows only {} of {} requested tokens",
                max_new, params.max_new_tokens
            );
        }

        let mut sampler = LogitsProcessor::from_sampling(params.seed, sampling(params));
        let mut decoder = TokenOutputStream::new(vocab);
        let mut matcher = StopMatcher::new(params.stop.clone());
        let mut generated = 0;
        let mut finish_reason = FinishReason::Length;

        for step in 0..max_new {
            let logits_now = self.penalize(logits, params)?;
            let next = sampler.sample(&logits_now)?;

            if self.eos.contains(&next) {
                finish_reason = FinishReason::EndOfSequence;
                break;
            }
            generated += 1;

            if let Some(piece) = decoder.next_token(next)? {
                let (text, stopped) = matcher.push(&piece);
                if !text.is_empty() && !emit(text) {
                    finish_reason = FinishReason::Cancelled;
                } else if stopped {
                    finish_reason = FinishReason::StopSequence;
                }
            }

            if finish_reason != FinishReason::Length || step + 1 == max_new {
                self.pending = Some(next);
                break;
            }

            logits = self.feed(&[next])?;
        }

        if matches!(
            finish_reason,
            FinishReason::Length | FinishReason::EndOfSequence
        ) {
            let mut tail = String::new();
            if let Some(rest) = decoder.decode_rest()? {
                let (text, stopped) = matcher.push(&rest);
                tail.push_str(&text);
                if stopped {
                    finish_reason = FinishReason::StopSequence;
                }
            }
            if finish_reason != FinishReason::StopSequence {
                tail.push_str(&matcher.finish());
            }
            if !tail.is_empty() && !emit(tail) {
                finish_reason = FinishReason::Cancelled;
            }
        }

        debug!(
            "Generation finished: {} prompt tokens, {} generated, {:?}",
            prompt_tokens, generated, finish_reason
        );

        Ok(GenerationSummary {
            prompt_tokens,
            generated_tokens: generated,
            finish_reason,
        })
    }

    fn prompt_tokens<V: Vocabulary + ?Sized>(&mut self, vocab: &V, prompt: &str) -> Result<Vec<u32>> {
        let fresh = self.history.is_empty();
        let mut tokens = vocab.encode(prompt, fresh)?;
        if let Some(pending) = self.pending.take() {
            tokens.insert(0, pending);
        }
        Ok(tokens)
    }

    /// Feed tokens to the model and return logits for the next position.
    ///
    /// A new sequence is evaluated in one pass. Tokens appended to an
    /// existing cache go in one at a time.
    fn feed(&mut self, tokens: &[u32]) -> Result<Tensor> {
        let mut logits = None;
        if self.history.is_empty() {
            logits = Some(self.model.forward(tokens, 0)?);
            self.history.extend_from_slice(tokens);
        } else {
            for &token in tokens {
                logits = Some(self.model.forward(&[token], self.history.len())?);
                self.history.push(token);
            }
        }
        let logits = logits.ok_or_else(|| GgufError::generation("no tokens to evaluate"))?;
        last_logits(logits)
    }

    fn penalize(&self, logits: Tensor, params: &SessionParams) -> Result<Tensor> {
        if (params.repetition_penalty - 1.0).abs() < f32::EPSILON || params.last_n_tokens == 0 {
            return Ok(logits);
        }
        let start = self.history.len().saturating_sub(params.last_n_tokens);
        Ok(candle_transformers::utils::apply_repeat_penalty(
            &logits,
            params.repetition_penalty,
            &self.history[start..],
        )?)
    }
}

/// Reduce model output to a rank-1 f32 tensor for the last position.
fn last_logits(logits: Tensor) -> Result<Tensor> {
    let mut logits = logits.to_dtype(DType::F32)?;
    while logits.rank() > 1 {
        let rows = logits.dim(0)?;
        logits = logits.get(rows.saturating_sub(1))?;
    }
    Ok(logits)
}

/// Sampling strategy for the given parameters.
pub(crate) fn sampling(params: &SessionParams) -> Sampling {
    let temperature = params.temperature;
    if temperature <= 0.0 {
        return Sampling::ArgMax;
    }

    let k = params.top_k;
    let p = params.top_p;
    match (k > 0, p < 1.0) {
        (false, false) => Sampling::All { temperature },
        (true, false) => Sampling::TopK { k, temperature },
        (false, true) => Sampling::TopP { p, temperature },
        (true, true) => Sampling::TopKThenTopP { k, p, temperature },
    }
}

/// Withholds text that might be the start of a stop sequence.
#[derive(Debug)]
pub(crate) struct StopMatcher {
    stop: Vec<String>,
    pending: String,
}

impl StopMatcher {
    pub(crate) fn new(stop: Vec<String>) -> Self {
        Self {
            stop: stop.into_iter().filter(|s| !s.is_empty()).collect(),
            pending: String::new(),
        }
    }

    /// Add a fragment. Returns the text that is safe to emit and whether a
    /// stop sequence was found, in which case everything from it on is
    /// dropped.
    pub(crate) fn push(&mut self, fragment: &str) -> (String, bool) {
        self.pending.push_str(fragment);

        if let Some(at) = self
            .stop
            .iter()
            .filter_map(|s| self.pending.find(s.as_str()))
            .min()
        {
            let text = self.pending[..at].to_string();
            self.pending.clear();
            return (text, true);
        }

        let keep = self.partial_match_len();
        let cut = self.pending.len() - keep;
        let text = self.pending[..cut].to_string();
        self.pending.drain(..cut);
        (text, false)
    }

    /// Release whatever is still held back.
    pub(crate) fn finish(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    /// Length of the longest suffix of `pending` that starts a stop sequence.
    fn partial_match_len(&self) -> usize {
        let mut best = 0;
        for stop in &self.stop {
            for (start, _) in self.pending.char_indices() {
                let suffix = &self.pending[start..];
                if suffix.len() <= best {
                    break;
                }
                if stop.starts_with(suffix) {
                    best = suffix.len();
                    break;
                }
            }
        }
        best
    }
}
