use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use std::time::Duration;
use tokenizers::Tokenizer;

use crate::error::{PipelineError, Result};

const MAX_RETRIES: u32 = 3;

/// Fetches single files from a HuggingFace model repository.
#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    pub fn load(&self) -> Result<PathBuf> {
        let repo = open_repo(&self.repo)?;
        let mut attempts = 0u32;

        for attempt in 0..MAX_RETRIES {
            match repo.get(self.filename.as_str()) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    let error_msg = e.to_string();
                    attempts = attempt + 1;
                    if error_msg.contains("Lock acquisition failed") && attempt < MAX_RETRIES - 1 {
                        let wait_time = Duration::from_millis(100 * (1 << attempt));
                        tracing::debug!(
                            repo = %self.repo,
                            file = %self.filename,
                            ?wait_time,
                            "hub cache locked, retrying"
                        );
                        std::thread::sleep(wait_time);
                        continue;
                    }
                    return Err(PipelineError::Download(format!(
                        "Failed to download '{}' from '{}': {}",
                        self.filename, self.repo, error_msg
                    )));
                }
            }
        }

        Err(PipelineError::Download(format!(
            "Download timed out for '{}' from '{}' after {} attempt(s)",
            self.filename, self.repo, attempts
        )))
    }
}

fn open_repo(repo_id: &str) -> Result<ApiRepo> {
    let api = Api::new().map_err(|e| {
        PipelineError::Download(format!("Failed to initialize HuggingFace API: {e}"))
    })?;
    Ok(api.repo(Repo::new(repo_id.to_string(), RepoType::Model)))
}

pub fn load_tokenizer(repo_id: &str) -> Result<Tokenizer> {
    let tokenizer_path = HfLoader::new(repo_id, "tokenizer.json").load()?;
    let path_str = tokenizer_path.display().to_string();
    Tokenizer::from_file(&tokenizer_path).map_err(|e| {
        PipelineError::Tokenization(format!(
            "Failed to load tokenizer from '{}': {}",
            path_str, e
        ))
    })
}

/// Raw `config.json` text plus a weight builder for the checkpoint.
pub struct Checkpoint {
    pub config_json: String,
    pub vb: VarBuilder<'static>,
}

pub fn load_checkpoint(repo_id: &str, device: &Device) -> Result<Checkpoint> {
    let config_path = HfLoader::new(repo_id, "config.json").load()?;
    let weights_path = HfLoader::new(repo_id, "model.safetensors")
        .load()
        .or_else(|_| HfLoader::new(repo_id, "pytorch_model.bin").load())?;

    let config_json = std::fs::read_to_string(&config_path)?;

    let vb = if weights_path.extension().is_some_and(|e| e == "safetensors") {
        unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? }
    } else {
        VarBuilder::from_pth(&weights_path, DType::F32, device)?
    };

    tracing::info!(repo = repo_id, ?device, "loaded checkpoint");

    Ok(Checkpoint { config_json, vb })
}
