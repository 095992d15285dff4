use tokenizers::Tokenizer;

use crate::error::{PipelineError, Result};
use crate::loaders::load_tokenizer;
use crate::models::capabilities::{Chunk, ChunkTokenizer};
use crate::pipelines::sentiment::token_windows;

const SPECIAL_PAIRS: [(&str, &str); 2] = [("[CLS]", "[SEP]"), ("<s>", "</s>")];

/// [`ChunkTokenizer`] backed by a HuggingFace `tokenizer.json`.
///
/// Content tokens are windowed first, then each window is wrapped in the
/// model's start/end tokens, so every chunk fits in `max_len` including them.
#[derive(Clone)]
pub struct HfChunkTokenizer {
    tokenizer: Tokenizer,
    bounds: Option<(u32, u32)>,
}

impl HfChunkTokenizer {
    /// Wrap an already loaded tokenizer.
    ///
    /// Padding and truncation baked into `tokenizer.json` are switched off;
    /// windowing replaces them.
    pub fn new(mut tokenizer: Tokenizer) -> Result<Self> {
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| PipelineError::Tokenization(format!("Failed to disable truncation: {e}")))?;

        let bounds = SPECIAL_PAIRS.iter().find_map(|(start, end)| {
            Some((tokenizer.token_to_id(start)?, tokenizer.token_to_id(end)?))
        });
        Ok(Self { tokenizer, bounds })
    }

    /// Download `tokenizer.json` from a hub repo.
    pub fn from_hub(repo_id: &str) -> Result<Self> {
        Self::new(load_tokenizer(repo_id)?)
    }
}

impl ChunkTokenizer for HfChunkTokenizer {
    fn chunk(&self, text: &str, max_len: usize, stride: usize) -> Result<Vec<Chunk>> {
        let budget = max_len.saturating_sub(self.special_tokens());
        if stride >= budget {
            return Err(PipelineError::Configuration(format!(
                "Stride {stride} leaves no room in a {max_len}-token window \
                 ({} special tokens)",
                self.special_tokens()
            )));
        }

        let encoding = self.tokenizer.encode(text, false).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Tokenization failed on '{}': {}",
                &text.chars().take(50).collect::<String>(),
                e
            ))
        })?;
        let ids = encoding.get_ids();

        let chunks = token_windows(ids.len(), budget, stride)
            .into_iter()
            .map(|window| {
                let content = &ids[window.start..window.end];
                let mut chunk_ids = Vec::with_capacity(content.len() + 2);
                match self.bounds {
                    Some((start, end)) => {
                        chunk_ids.push(start);
                        chunk_ids.extend_from_slice(content);
                        chunk_ids.push(end);
                    }
                    None => chunk_ids.extend_from_slice(content),
                }
                Chunk::new(chunk_ids)
            })
            .filter(|chunk| !chunk.is_empty())
            .collect();

        Ok(chunks)
    }

    fn special_tokens(&self) -> usize {
        if self.bounds.is_some() {
            2
        } else {
            0
        }
    }
}
