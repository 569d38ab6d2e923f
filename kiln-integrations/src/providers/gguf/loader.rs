//! Locating model and tokenizer files.
//!
//! A model identifier is, in order of preference, a GGUF file, a directory
//! holding GGUF files, or a Hugging Face repository id. Tokenizers are
//! looked up next to the model first, then at the configured location,
//! then in the model's repository.

use hf_hub::api::tokio::{Api, ApiBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{GgufError, Result};

/// Name of the tokenizer file in model directories and repositories.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Resolved files for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    /// GGUF weights.
    pub model: PathBuf,
    /// `tokenizer.json`.
    pub tokenizer: PathBuf,
}

/// Resolve the model and tokenizer files, downloading them when needed.
pub async fn locate(
    model: &str,
    model_file: Option<&str>,
    tokenizer: Option<&str>,
) -> Result<ModelFiles> {
    let mut hub = Hub::default();

    let (model_path, repo) = match resolve_local(model, model_file)? {
        Some(path) => (path, None),
        None => {
            let path = hub.fetch_model(model, model_file).await?;
            (path, Some(model))
        }
    };

    let tokenizer_path = match sibling_tokenizer(&model_path) {
        Some(path) => path,
        None => match tokenizer {
            Some(hint) => match resolve_local_tokenizer(hint)? {
                Some(path) => path,
                None => hub.get(hint, TOKENIZER_FILE).await?,
            },
            None => match repo {
                Some(repo) => hub.get(repo, TOKENIZER_FILE).await.map_err(|e| {
                    GgufError::config(format!(
                        "no {TOKENIZER_FILE} found for {repo} ({e}); set the `tokenizer` option"
                    ))
                })?,
                None => {
                    return Err(GgufError::config(format!(
                        "no {TOKENIZER_FILE} next to {}; set the `tokenizer` option",
                        model_path.display()
                    )));
                }
            },
        },
    };

    info!(
        "Resolved model {} with tokenizer {}",
        model_path.display(),
        tokenizer_path.display()
    );

    Ok(ModelFiles {
        model: model_path,
        tokenizer: tokenizer_path,
    })
}

/// Resolve a model identifier on the local filesystem.
///
/// Returns `Ok(None)` when the identifier should be treated as a
/// repository id.
pub fn resolve_local(model: &str, model_file: Option<&str>) -> Result<Option<PathBuf>> {
    let path = Path::new(model);

    if path.is_file() {
        if let Some(file) = model_file {
            debug!("{} is a file, ignoring model_file {}", model, file);
        }
        return Ok(Some(path.to_path_buf()));
    }

    if path.is_dir() {
        if let Some(file) = model_file {
            let candidate = path.join(file);
            return if candidate.is_file() {
                Ok(Some(candidate))
            } else {
                Err(GgufError::ModelNotFound {
                    path: candidate.display().to_string(),
                })
            };
        }

        let mut ggufs: Vec<PathBuf> = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_gguf(p))
            .collect();
        ggufs.sort();

        return match ggufs.len() {
            0 => Err(GgufError::ModelNotFound {
                path: format!("{}/*.gguf", path.display()),
            }),
            1 => Ok(ggufs.pop()),
            _ => Err(GgufError::config(format!(
                "{} holds several GGUF files, set model_file to one of: {}",
                path.display(),
                file_names(&ggufs)
            ))),
        };
    }

    if looks_like_path(model) {
        return Err(GgufError::ModelNotFound {
            path: model.to_string(),
        });
    }

    Ok(None)
}

fn sibling_tokenizer(model_path: &Path) -> Option<PathBuf> {
    let candidate = model_path.parent()?.join(TOKENIZER_FILE);
    candidate.is_file().then_some(candidate)
}

/// Resolve a tokenizer hint on the local filesystem.
///
/// Returns `Ok(None)` when the hint should be treated as a repository id.
fn resolve_local_tokenizer(hint: &str) -> Result<Option<PathBuf>> {
    let path = Path::new(hint);

    if path.is_file() {
        return Ok(Some(path.to_path_buf()));
    }

    if path.is_dir() {
        let candidate = path.join(TOKENIZER_FILE);
        return if candidate.is_file() {
            Ok(Some(candidate))
        } else {
            Err(GgufError::ModelNotFound {
                path: candidate.display().to_string(),
            })
        };
    }

    if looks_like_path(hint) {
        return Err(GgufError::ModelNotFound {
            path: hint.to_string(),
        });
    }

    Ok(None)
}

fn is_gguf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gguf"))
}

fn looks_like_path(identifier: &str) -> bool {
    identifier.starts_with('/')
        || identifier.starts_with('.')
        || identifier.starts_with('~')
        || identifier.contains('\\')
        || identifier.ends_with(".gguf")
        || identifier.ends_with(".json")
}

fn file_names(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lazily built Hugging Face Hub client.
#[derive(Default)]
struct Hub {
    api: Option<Api>,
}

impl Hub {
    fn api(&mut self) -> Result<&Api> {
        if self.api.is_none() {
            let api = ApiBuilder::new()
                .with_progress(false)
                .build()
                .map_err(|e| GgufError::Download {
                    repo: "huggingface.co".to_string(),
                    message: e.to_string(),
                })?;
            self.api = Some(api);
        }
        self.api
            .as_ref()
            .ok_or_else(|| GgufError::generation("hub client unavailable"))
    }

    async fn get(&mut self, repo: &str, file: &str) -> Result<PathBuf> {
        info!("Fetching {} from {}", file, repo);
        self.api()?
            .model(repo.to_string())
            .get(file)
            .await
            .map_err(|e| GgufError::Download {
                repo: repo.to_string(),
                message: format!("{file}: {e}"),
            })
    }

    async fn fetch_model(&mut self, repo: &str, model_file: Option<&str>) -> Result<PathBuf> {
        let file = match model_file {
            Some(file) => file.to_string(),
            None => {
                let info = self
                    .api()?
                    .model(repo.to_string())
                    .info()
                    .await
                    .map_err(|e| GgufError::Download {
                        repo: repo.to_string(),
                        message: e.to_string(),
                    })?;

                let mut ggufs: Vec<String> = info
                    .siblings
                    .into_iter()
                    .map(|s| s.rfilename)
                    .filter(|name| is_gguf(Path::new(name)))
                    .collect();

                match ggufs.len() {
                    0 => {
                        return Err(GgufError::ModelNotFound {
                            path: format!("{repo}/*.gguf"),
                        });
                    }
                    1 => ggufs.remove(0),
                    _ => {
                        ggufs.sort();
                        return Err(GgufError::config(format!(
                            "{repo} holds several GGUF files, set model_file to one of: {}",
                            ggufs.join(", ")
                        )));
                    }
                }
            }
        };

        self.get(repo, &file).await
    }
}
