//! Quantized model weights.

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::models::{quantized_llama, quantized_phi3, quantized_qwen2};
use std::path::Path;
use tracing::{debug, info, warn};

use super::error::{GgufError, Result};

/// Model architectures this backend can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelArch {
    /// Llama family, including Mistral
    Llama,
    /// Qwen2
    Qwen2,
    /// Phi-3
    Phi3,
}

impl ModelArch {
    /// Parse an architecture tag such as `llama` or `qwen2`.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "llama" | "mistral" => Ok(Self::Llama),
            "qwen2" => Ok(Self::Qwen2),
            "phi3" => Ok(Self::Phi3),
            _ => Err(GgufError::UnsupportedModelType {
                model_type: tag.to_string(),
            }),
        }
    }

    /// Canonical tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llama => "llama",
            Self::Qwen2 => "qwen2",
            Self::Phi3 => "phi3",
        }
    }
}

impl std::fmt::Display for ModelArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values read from the GGUF header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMetadata {
    /// `general.architecture`
    pub architecture: Option<String>,
    /// `{arch}.context_length`
    pub context_length: Option<usize>,
    /// `tokenizer.ggml.eos_token_id`
    pub eos_token_id: Option<u32>,
}

impl ModelMetadata {
    fn read(content: &gguf_file::Content) -> Self {
        let architecture = content
            .metadata
            .get("general.architecture")
            .and_then(|v| v.to_string().ok())
            .cloned();

        let context_length = architecture.as_ref().and_then(|arch| {
            content
                .metadata
                .get(&format!("{arch}.context_length"))
                .and_then(|v| v.to_u32().ok())
                .map(|n| n as usize)
        });

        let eos_token_id = content
            .metadata
            .get("tokenizer.ggml.eos_token_id")
            .and_then(|v| v.to_u32().ok());

        Self {
            architecture,
            context_length,
            eos_token_id,
        }
    }
}

/// Something that turns token ids into next-token logits.
///
/// `pos` is the number of tokens already in the cache; `pos == 0` starts
/// a new sequence.
pub(crate) trait TokenModel: Send {
    fn forward(&mut self, tokens: &[u32], pos: usize) -> Result<Tensor>;
}

/// Loaded weights for one of the supported architectures.
pub(crate) struct Weights {
    inner: Inner,
    device: Device,
}

enum Inner {
    Llama(quantized_llama::ModelWeights),
    Qwen2(quantized_qwen2::ModelWeights),
    Phi3(quantized_phi3::ModelWeights),
}

impl std::fmt::Debug for Weights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arch = match self.inner {
            Inner::Llama(_) => ModelArch::Llama,
            Inner::Qwen2(_) => ModelArch::Qwen2,
            Inner::Phi3(_) => ModelArch::Phi3,
        };
        f.debug_struct("Weights")
            .field("arch", &arch)
            .field("device", &self.device)
            .finish()
    }
}

impl Weights {
    /// Read a GGUF file onto `device`.
    pub(crate) fn load(path: &Path, arch: ModelArch, device: &Device) -> Result<(Self, ModelMetadata)> {
        let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GgufError::ModelNotFound {
                path: path.display().to_string(),
            },
            _ => GgufError::Io(e),
        })?;

        let content = gguf_file::Content::read(&mut file).map_err(|e| e.with_path(path))?;
        let metadata = ModelMetadata::read(&content);
        debug!(
            "GGUF header: {} tensors, metadata {:?}",
            content.tensor_infos.len(),
            metadata
        );

        if let Some(found) = metadata.architecture.as_deref() {
            match ModelArch::parse(found) {
                Ok(found) if found == arch => {}
                Ok(found) => warn!(
                    "model_type is {} but the file declares {}, loading as {}",
                    arch, found, arch
                ),
                Err(_) => warn!(
                    "file declares unsupported architecture {}, loading as {}",
                    found, arch
                ),
            }
        }

        let inner = match arch {
            ModelArch::Llama => {
                Inner::Llama(quantized_llama::ModelWeights::from_gguf(content, &mut file, device)?)
            }
            ModelArch::Qwen2 => {
                Inner::Qwen2(quantized_qwen2::ModelWeights::from_gguf(content, &mut file, device)?)
            }
            ModelArch::Phi3 => Inner::Phi3(quantized_phi3::ModelWeights::from_gguf(
                false, content, &mut file, device,
            )?),
        };

        info!("Loaded {} weights from {}", arch, path.display());

        Ok((
            Self {
                inner,
                device: device.clone(),
            },
            metadata,
        ))
    }
}

impl TokenModel for Weights {
    fn forward(&mut self, tokens: &[u32], pos: usize) -> Result<Tensor> {
        let input = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        let logits = match &mut self.inner {
            Inner::Llama(model) => model.forward(&input, pos)?,
            Inner::Qwen2(model) => model.forward(&input, pos)?,
            Inner::Phi3(model) => model.forward(&input, pos)?,
        };
        Ok(logits)
    }
}
