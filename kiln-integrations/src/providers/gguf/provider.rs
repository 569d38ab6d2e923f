//! Local GGUF provider.

use async_trait::async_trait;
use futures::StreamExt;
use kiln_core::{
    GenerationParams, Result as CoreResult,
    config::ProviderConfig,
    traits::{LlmProvider, ModelInfo, TokenStream},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use super::{
    config::{GgufConfig, SessionParams},
    device::{DeviceKind, select_device},
    error::{GgufError, Result},
    generation::{GenerationSummary, Session},
    loader::{self, ModelFiles},
    model::{ModelArch, TokenModel, Weights},
    tokenizer::{Vocabulary, eos_tokens, load_tokenizer},
};

/// Context length used when neither the options nor the file set one.
const DEFAULT_CONTEXT_LENGTH: usize = 2048;

/// A quantized causal language model running in-process on Candle.
///
/// One generation runs at a time per loaded model; concurrent calls wait
/// their turn. A stream keeps the model only while it is generating, not
/// while it is being read, so an unread stream never blocks later calls.
/// With `reset` off, the next call continues from the tokens the previous
/// call left in the cache.
///
/// # Examples
///
/// ```rust,no_run
/// use kiln_core::{GenerationParams, LlmProvider};
/// use kiln_integrations::providers::gguf::GgufProvider;
/// use std::collections::HashMap;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = GgufProvider::new(
///     "TheBloke/Llama-2-7B-Chat-GGUF",
///     Some("llama-2-7b-chat.Q4_K_M.gguf"),
///     "llama",
///     &HashMap::new(),
/// )
/// .await?;
///
/// let params = GenerationParams::new().with_max_new_tokens(32);
/// let text = provider.generate("Q: What is Rust?\nA:", &params).await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```
pub struct GgufProvider {
    model: String,
    model_file: Option<String>,
    arch: ModelArch,
    config: GgufConfig,
    files: ModelFiles,
    device: DeviceKind,
    context_length: usize,
    tokenizer: Arc<Tokenizer>,
    session: Arc<Mutex<Session<Weights>>>,
}

impl std::fmt::Debug for GgufProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GgufProvider")
            .field("model", &self.model)
            .field("model_file", &self.model_file)
            .field("arch", &self.arch)
            .field("device", &self.device)
            .field("context_length", &self.context_length)
            .finish_non_exhaustive()
    }
}

impl GgufProvider {
    /// Load a model.
    ///
    /// `model` is a GGUF file, a directory, or a Hugging Face repo id.
    /// `options` may hold any [`GgufConfig`] key.
    ///
    /// # Errors
    ///
    /// Fails on an unknown `model_type` or option, or when the model or its
    /// tokenizer cannot be found or loaded.
    pub async fn new(
        model: impl Into<String>,
        model_file: Option<&str>,
        model_type: &str,
        options: &HashMap<String, Value>,
    ) -> Result<Self> {
        let model = model.into();
        let arch = ModelArch::parse(model_type)?;
        let config = GgufConfig::from_map(options)?;

        info!("Loading {} model {}", arch, model);

        let files = loader::locate(&model, model_file, config.tokenizer.as_deref()).await?;
        check_threads(config.threads);

        let gpu_layers = config.gpu_layers;
        let model_path = files.model.clone();
        let tokenizer_path = files.tokenizer.clone();
        let (weights, metadata, tokenizer, device) = tokio::task::spawn_blocking(move || {
            let (device, kind) = select_device(gpu_layers);
            let (weights, metadata) = Weights::load(&model_path, arch, &device)?;
            let tokenizer = load_tokenizer(&tokenizer_path)?;
            Ok::<_, GgufError>((weights, metadata, tokenizer, kind))
        })
        .await
        .map_err(|e| GgufError::generation(format!("model loading task failed: {e}")))??;

        let context_length = match (config.context_limit(), metadata.context_length) {
            (Some(requested), Some(trained)) if requested > trained => {
                warn!(
                    "context_length {} exceeds the {} tokens the model was trained on",
                    requested, trained
                );
                requested
            }
            (Some(requested), _) => requested,
            (None, Some(trained)) => trained,
            (None, None) => DEFAULT_CONTEXT_LENGTH,
        };

        let eos = eos_tokens(&tokenizer, metadata.eos_token_id);
        if eos.is_empty() {
            warn!("No end-of-sequence token found, generation ends only at max_new_tokens or a stop sequence");
        }

        info!(
            "Model {} ready on {} with context length {}",
            model, device, context_length
        );

        Ok(Self {
            model,
            model_file: model_file.map(str::to_string),
            arch,
            config,
            files,
            device,
            context_length,
            tokenizer: Arc::new(tokenizer),
            session: Arc::new(Mutex::new(Session::new(weights, context_length, eos))),
        })
    }

    /// Load a model described by a provider configuration.
    pub async fn from_config(config: &ProviderConfig) -> Result<Self> {
        let model_type = config
            .model_type
            .as_deref()
            .ok_or_else(|| GgufError::config("model_type is required for gguf models"))?;
        Self::new(
            config.model.clone(),
            config.model_file.as_deref(),
            model_type,
            &config.config,
        )
        .await
    }

    /// Construction-time options.
    pub fn config(&self) -> &GgufConfig {
        &self.config
    }

    /// Architecture of the loaded model.
    pub fn arch(&self) -> ModelArch {
        self.arch
    }

    /// Device the model runs on.
    pub fn device(&self) -> DeviceKind {
        self.device
    }

    /// Context limit in tokens.
    pub fn context_length(&self) -> usize {
        self.context_length
    }

    /// Generate a completion and report how generation ended.
    pub async fn generate_with_summary(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<(String, GenerationSummary)> {
        let params = self.prepare(params)?;
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let prompt = prompt.to_string();

        tokio::task::spawn_blocking(move || {
            let mut session = session.lock().map_err(|_| lock_poisoned())?;
            let mut text = String::new();
            let summary = session.generate(tokenizer.as_ref(), &prompt, &params, |fragment| {
                text.push_str(&fragment);
                true
            })?;
            Ok::<_, GgufError>((text, summary))
        })
        .await
        .map_err(|e| GgufError::generation(format!("generation task failed: {e}")))?
    }

    fn prepare(&self, params: &GenerationParams) -> Result<SessionParams> {
        let resolved = self.config.resolve(params)?;
        if resolved.threads != self.config.threads {
            check_threads(resolved.threads);
        }
        debug!("Generation parameters: {:?}", resolved);
        Ok(resolved)
    }
}

/// Stream one generation from `session`.
///
/// Nothing runs until the stream is first polled. The worker never waits on
/// the reader while it holds the session: fragments are queued without bound,
/// which `max_new_tokens` and the context limit keep small. Dropping the
/// stream ends generation at the next fragment.
fn stream_session<M, V>(
    session: Arc<Mutex<Session<M>>>,
    vocab: Arc<V>,
    prompt: String,
    params: SessionParams,
) -> TokenStream
where
    M: TokenModel + 'static,
    V: Vocabulary + 'static,
{
    let stream = futures::stream::once(async move {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::task::spawn_blocking(move || {
            let result = match session.lock() {
                Ok(mut session) => session
                    .generate(vocab.as_ref(), &prompt, &params, |fragment| {
                        tx.send(Ok(fragment)).is_ok()
                    })
                    .map(|summary| debug!("Stream finished: {:?}", summary.finish_reason)),
                Err(_) => Err(lock_poisoned()),
            };
            if let Err(e) = result {
                if tx.send(Err(e.into())).is_err() {
                    debug!("Stream consumer dropped before the error was delivered");
                }
            }
        });
        UnboundedReceiverStream::new(rx)
    })
    .flatten();

    Box::pin(stream)
}

fn lock_poisoned() -> GgufError {
    GgufError::generation("model session is poisoned by an earlier panic")
}

/// Candle sizes its thread pool once per process; a differing request is
/// only reported.
fn check_threads(threads: i64) {
    let Ok(requested) = usize::try_from(threads) else {
        return;
    };
    let available = candle_core::utils::get_num_threads();
    if requested > 0 && requested != available {
        warn!(
            "threads = {} requested, inference uses {} (set RAYON_NUM_THREADS to change it)",
            requested, available
        );
    }
}

#[async_trait]
impl LlmProvider for GgufProvider {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> CoreResult<String> {
        let (text, _) = self.generate_with_summary(prompt, params).await?;
        Ok(text)
    }

    async fn stream(&self, prompt: &str, params: &GenerationParams) -> CoreResult<TokenStream> {
        let params = self.prepare(params)?;
        Ok(stream_session(
            Arc::clone(&self.session),
            Arc::clone(&self.tokenizer),
            prompt.to_string(),
            params,
        ))
    }

    fn name(&self) -> &'static str {
        "GgufProvider"
    }

    async fn health_check(&self) -> CoreResult<()> {
        if self.session.is_poisoned() {
            return Err(lock_poisoned().into());
        }
        Ok(())
    }

    fn model_info(&self) -> ModelInfo {
        let mut metadata = HashMap::new();
        metadata.insert(
            "model_path".to_string(),
            Value::String(self.files.model.display().to_string()),
        );
        metadata.insert(
            "tokenizer_path".to_string(),
            Value::String(self.files.tokenizer.display().to_string()),
        );
        metadata.insert("device".to_string(), Value::String(self.device.to_string()));
        if let Some(file) = &self.model_file {
            metadata.insert("model_file".to_string(), Value::String(file.clone()));
        }

        ModelInfo {
            name: self.model.clone(),
            provider: "gguf".to_string(),
            model_type: Some(self.arch.to_string()),
            max_context_length: Some(self.context_length),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::gguf::generation::tests::{ScriptedModel, params, vocab};
    use kiln_core::{KilnError, collect_stream};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unknown_model_type() {
        let err = GgufProvider::new("/tmp/model.gguf", None, "gpt2", &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GgufError::UnsupportedModelType { .. }));
        assert!(matches!(KilnError::from(err), KilnError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_unknown_option() {
        let mut options = HashMap::new();
        options.insert("mmap".to_string(), json!(true));

        let err = GgufProvider::new("/tmp/model.gguf", None, "llama", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, GgufError::Config { .. }));
    }

    #[tokio::test]
    async fn test_missing_model_surfaces_not_found() {
        let err = GgufProvider::new("/definitely/missing/model.gguf", None, "llama", &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(KilnError::from(err), KilnError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_from_config_requires_model_type() {
        let config = ProviderConfig::new("gguf", "/tmp/model.gguf");
        let err = GgufProvider::from_config(&config).await.unwrap_err();
        assert!(err.to_string().contains("model_type"));
    }

    fn shared_session(script: &[u32]) -> Arc<Mutex<Session<ScriptedModel>>> {
        Arc::new(Mutex::new(Session::new(ScriptedModel::new(script), 128, [0])))
    }

    #[tokio::test]
    async fn test_stream_yields_generated_text() {
        let session = shared_session(&[1, 2, 3, 0]);
        let stream = stream_session(session, Arc::new(vocab()), "a".to_string(), params());

        assert_eq!(collect_stream(stream).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_unread_stream_does_not_block_next_call() {
        let session = shared_session(&[1, 2, 3, 1, 2, 3, 1, 2, 3, 1, 2, 3]);
        let vocab = Arc::new(vocab());
        let mut p = params();
        p.max_new_tokens = 6;

        let mut first = stream_session(
            Arc::clone(&session),
            Arc::clone(&vocab),
            "a".to_string(),
            p.clone(),
        );
        assert_eq!(first.next().await.unwrap().unwrap(), "a");

        // `first` stays alive and unread while the session is used again.
        let second = stream_session(Arc::clone(&session), vocab, "b".to_string(), p);
        let text = tokio::time::timeout(Duration::from_secs(10), collect_stream(second))
            .await
            .expect("second generation waited on the unread stream")
            .unwrap();
        assert_eq!(text, "abcabc");

        // The first stream's output was queued in full.
        assert_eq!(collect_stream(first).await.unwrap(), "bcabc");
    }

    #[tokio::test]
    async fn test_dropped_stream_releases_session() {
        let session = shared_session(&[1; 64]);
        let mut p = params();
        p.max_new_tokens = 32;

        let mut stream =
            stream_session(Arc::clone(&session), Arc::new(vocab()), "a".to_string(), p);
        assert!(stream.next().await.unwrap().is_ok());
        drop(stream);

        let released = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if session.try_lock().is_ok() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(released.is_ok());
    }

    #[test]
    fn test_negative_threads_is_silent() {
        check_threads(-1);
        check_threads(0);
    }
}
