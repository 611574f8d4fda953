//! Deterministic stand-ins for the tokenizer and model.
//!
//! The keyword model places a handful of issue-tracker words on their own
//! axes so that related words ("crash", "bug") land close together while
//! everything else is low-magnitude noise.

#![allow(dead_code)]

use smart_embeddings::{ActivationMatrix, Embedder, ModelRunner, Result, TokenBatch, Tokenizer};

pub const DIMENSION: usize = 8;

const PAD: u32 = 0;
const CLS: u32 = 1;
const SEP: u32 = 2;
const MAX_TOKENS: usize = 32;

/// Lowercases, splits on non-alphanumerics, wraps in `[CLS] ... [SEP]` and
/// pads to a multiple of eight. Inputs longer than 32 tokens are truncated.
pub struct KeywordTokenizer;

impl KeywordTokenizer {
    fn word_id(word: &str) -> u32 {
        match word {
            "bug" | "bugs" => 10,
            "crash" | "crashes" | "error" => 11,
            "docs" | "documentation" => 12,
            "typo" | "readme" => 13,
            "enhancement" => 14,
            "feature" | "request" => 15,
            other => {
                100 + other
                    .bytes()
                    .fold(7u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
                    % 1000
            }
        }
    }
}

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenBatch> {
        let mut ids = vec![CLS];
        ids.extend(
            text.to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(Self::word_id),
        );
        ids.truncate(MAX_TOKENS - 1);
        ids.push(SEP);

        let mut mask = vec![1; ids.len()];
        while ids.len() % 8 != 0 {
            ids.push(PAD);
            mask.push(0);
        }
        TokenBatch::new(ids, mask)
    }
}

/// Maps each token id to a fixed row. Padding rows are huge so that any
/// failure to honour the attention mask shows up in the results.
pub struct KeywordModel;

impl KeywordModel {
    fn row(id: u32) -> Vec<f32> {
        let mut row = vec![0.0; DIMENSION];
        match id {
            PAD => row.iter_mut().for_each(|v| *v = 50.0),
            CLS | SEP => row[7] = 0.3,
            10 | 11 => row[0] = 3.0,
            12 | 13 => row[1] = 3.0,
            14 | 15 => row[2] = 3.0,
            other => row[3 + (other % 4) as usize] = 0.2,
        }
        row
    }
}

impl ModelRunner for KeywordModel {
    fn model_id(&self) -> &str {
        "test/keyword-model"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn run(&self, token_ids: &[u32], _attention_mask: &[u32]) -> Result<ActivationMatrix> {
        ActivationMatrix::from_rows(token_ids.iter().map(|id| Self::row(*id)).collect(), DIMENSION)
    }
}

pub fn embedder() -> Embedder<KeywordTokenizer, KeywordModel> {
    Embedder::new(KeywordTokenizer, KeywordModel)
}
