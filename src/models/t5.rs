use candle_core::{Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::t5::{self, T5ForConditionalGeneration};
use std::sync::Mutex;
use tokenizers::Tokenizer;

use crate::error::{PipelineError, Result};
use crate::loaders::{load_checkpoint, load_tokenizer};
use crate::models::capabilities::{DecodingConfig, TextGenerator};

/// Longest encoder input fed to the model, in tokens.
const MAX_INPUT_TOKENS: usize = 512;
const DEFAULT_SEED: u64 = 299_792_458;

/// Available T5 checkpoint sizes.
#[derive(Debug, Clone, Copy, Default)]
pub enum T5Size {
    /// t5-small (~60M parameters).
    #[default]
    Small,
    /// t5-base (~220M parameters).
    Base,
    /// t5-large (~770M parameters).
    Large,
}

impl T5Size {
    pub(crate) fn repo(&self) -> &'static str {
        match self {
            T5Size::Small => "google-t5/t5-small",
            T5Size::Base => "google-t5/t5-base",
            T5Size::Large => "google-t5/t5-large",
        }
    }
}

impl std::fmt::Display for T5Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            T5Size::Small => "t5-small",
            T5Size::Base => "t5-base",
            T5Size::Large => "t5-large",
        };
        write!(f, "{name}")
    }
}

/// [`TextGenerator`] backed by a T5 encoder-decoder.
///
/// The model keeps a decoder KV cache, so calls are serialized through an
/// internal lock. Build one generator per worker to generate in parallel.
pub struct T5Generator {
    model: Mutex<T5ForConditionalGeneration>,
    tokenizer: Tokenizer,
    config: t5::Config,
    device: Device,
    seed: u64,
}

impl T5Generator {
    /// Download and load a checkpoint onto `device`.
    pub fn from_hub(repo_id: &str, device: Device) -> Result<Self> {
        let tokenizer = load_tokenizer(repo_id)?;
        let checkpoint = load_checkpoint(repo_id, &device)?;

        let mut config: t5::Config = serde_json::from_str(&checkpoint.config_json)?;
        config.use_cache = true;

        let model = T5ForConditionalGeneration::load(checkpoint.vb, &config)?;
        tracing::info!(repo = repo_id, "summarization model ready");

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            config,
            device,
            seed: DEFAULT_SEED,
        })
    }

    /// Seed used when sampling is enabled.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the device the model is running on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    fn encode_prompt(&self, prompt: &str) -> Result<Vec<u32>> {
        let encoding = self.tokenizer.encode(prompt, true).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Tokenization failed on '{}...': {}",
                prompt.chars().take(50).collect::<String>(),
                e
            ))
        })?;
        let mut ids = encoding.get_ids().to_vec();
        if ids.len() > MAX_INPUT_TOKENS {
            ids.truncate(MAX_INPUT_TOKENS - 1);
            ids.push(self.config.eos_token_id as u32);
        }
        Ok(ids)
    }

    fn decode_greedy(
        &self,
        model: &mut T5ForConditionalGeneration,
        input_ids: &[u32],
        config: &DecodingConfig,
    ) -> Result<Vec<u32>> {
        let sampling = if config.deterministic {
            Sampling::ArgMax
        } else {
            Sampling::All { temperature: 1.0 }
        };
        let mut logits_processor = LogitsProcessor::from_sampling(self.seed, sampling);

        let input = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let encoder_output = model.encode(&input)?;

        let start_token = self
            .config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32;
        let mut output_ids = vec![start_token];

        for step in 0..config.max_new_tokens {
            let decoder_input = if step == 0 {
                Tensor::new(output_ids.as_slice(), &self.device)?.unsqueeze(0)?
            } else {
                let last = output_ids[output_ids.len() - 1];
                Tensor::new(&[last], &self.device)?.unsqueeze(0)?
            };
            let logits = model.decode(&decoder_input, &encoder_output)?.squeeze(0)?;
            let next = logits_processor.sample(&logits)?;
            if next as usize == self.config.eos_token_id {
                break;
            }
            output_ids.push(next);
        }

        Ok(output_ids.split_off(1))
    }
}

impl TextGenerator for T5Generator {
    fn generate(&self, prompt: &str, config: &DecodingConfig) -> Result<String> {
        if prompt.is_empty() {
            return Ok(String::new());
        }

        let input_ids = self.encode_prompt(prompt)?;
        let generated = {
            let mut model = self
                .model
                .lock()
                .map_err(|_| PipelineError::Unexpected("T5 model lock poisoned".into()))?;
            model.clear_kv_cache();
            let generated = self.decode_greedy(&mut model, &input_ids, config);
            model.clear_kv_cache();
            generated?
        };

        tracing::trace!(
            prompt_tokens = input_ids.len(),
            generated_tokens = generated.len(),
            "generated"
        );

        self.tokenizer
            .decode(&generated, /*skip_special_tokens=*/ true)
            .map_err(|e| PipelineError::Tokenization(format!("Failed to decode output: {e}")))
    }

    fn generate_batch(
        &self,
        prompts: &[String],
        batch_size: usize,
        config: &DecodingConfig,
    ) -> Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(prompts.len());
        for (i, batch) in prompts.chunks(batch_size.max(1)).enumerate() {
            for prompt in batch {
                outputs.push(self.generate(prompt, config)?);
            }
            tracing::debug!(batch = i, size = batch.len(), "generated batch");
        }
        Ok(outputs)
    }
}
