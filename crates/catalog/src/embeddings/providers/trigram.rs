//! Local hashed-trigram embedding provider.

use crate::embeddings::provider::EmbeddingProvider;
use retailgenie_core::AppResult;
use std::collections::BTreeMap;

/// Words carrying no product signal, including the field labels that every
/// product text shares ("Name:", "Category:", "Description:").
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "its",
    "of", "on", "or", "the", "this", "that", "to", "with", "name", "category", "description",
];

/// Weight of a whole-word feature relative to one of its trigrams.
const WORD_WEIGHT: f32 = 2.0;

/// Offline embedding provider built from feature hashing.
///
/// Each token contributes its whole-word hash plus the hashes of its
/// boundary-padded character trigrams (`^mu`, `mug`, `ug$`), so related
/// spellings ("mug", "mugs") share dimensions. Vectors are deterministic and
/// unit length; text with no usable tokens maps to the zero vector. Not a
/// semantic model, but good enough for development and offline catalogs.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a provider. `dimensions` is clamped to at least 1.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn tokens(text: &str) -> BTreeMap<String, u32> {
        let mut counts = BTreeMap::new();
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        {
            *counts.entry(token).or_insert(0) += 1;
        }
        counts
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        for (token, count) in Self::tokens(text) {
            let weight = (count as f32).sqrt();

            embedding[self.bucket(token.as_bytes())] += WORD_WEIGHT * weight;

            let padded: Vec<char> = std::iter::once('^')
                .chain(token.chars())
                .chain(std::iter::once('$'))
                .collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[self.bucket(trigram.as_bytes())] += weight;
            }
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }
        embedding
    }

    /// FNV-1a, reduced to a dimension index.
    fn bucket(&self, bytes: &[u8]) -> usize {
        let hash = bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |acc, &b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
        });
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
