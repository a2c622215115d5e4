// ============================================================
// Layer 3 — Sentence Pair Domain Types
// ============================================================
// A translation example is two aligned sentences: the text in
// the source language and its reference translation.
//
// The special token ids live here too, because every layer
// (dataset framing, loss masking, greedy decoding) has to agree
// on which id means "start", "end" and "padding".
//
// Example:
//   source: "the cat sleeps"
//   target: "le chat dort"
//   framed target ids: [<s>, le, chat, dort, </s>]
//
// Reference: Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};

/// One aligned (source, target) sentence pair from a parallel corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// Sentence in the source language
    pub source: String,

    /// Reference translation in the target language
    pub target: String,
}

impl SentencePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// A pair is only useful when both sides carry text.
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty() || self.target.trim().is_empty()
    }
}

/// The reserved token ids shared by the dataset, the loss and the decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    /// Start of sequence, `<s>`
    pub sos: u32,
    /// End of sequence, `</s>`
    pub eos: u32,
    /// Padding, excluded from attention and loss
    pub pad: u32,
}

impl SpecialTokens {
    pub fn new(sos: u32, eos: u32, pad: u32) -> Self {
        Self { sos, eos, pad }
    }
}

impl Default for SpecialTokens {
    /// Ids written by `TokenizerStore` when it builds a vocabulary.
    fn default() -> Self {
        Self { sos: 2, eos: 3, pad: 0 }
    }
}
