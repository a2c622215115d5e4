// ============================================================
// Layer 5 — Translator Capability
// ============================================================
// Both model families (recurrent + attention, transformer)
// implement ONE trait so the trainer, the checkpoint manager and
// the inferencer are written once:
//
//   forward        training pass → logits [B, T, V] + optional loss
//   align          predictions/labels pair used for metrics
//   greedy_decode  autoregressive inference from <s>
//
// Reference: Rust Book §10 (Traits), §17 (Trait Objects)

use burn::prelude::*;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::sentence_pair::SpecialTokens;
use crate::ml::generation::TeacherForcing;

/// Which architecture a run trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Bidirectional GRU encoder, attention, GRU decoder
    Seq2seq,
    /// Pre-norm transformer with one shared embedding table
    Transformer,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Seq2seq     => write!(f, "seq2seq"),
            ModelKind::Transformer => write!(f, "transformer"),
        }
    }
}

/// Result of a training-mode forward pass.
#[derive(Debug, Clone)]
pub struct TranslationOutput<B: Backend> {
    /// [batch_size, target_len, vocab_size]
    pub logits: Tensor<B, 3>,
    /// Mean next-token loss over non-pad labels; None when target_len <= 1
    pub loss: Option<Tensor<B, 1>>,
}

pub trait Translator<B: Backend>: Module<B> + Sized {
    /// Training pass over a padded batch.
    ///
    /// `policy` decides teacher forcing for models that unroll the
    /// decoder step by step; parallel decoders ignore it.
    fn forward(
        &self,
        source: Tensor<B, 2, Int>,
        target: Tensor<B, 2, Int>,
        tokens: &SpecialTokens,
        policy: &mut dyn TeacherForcing,
    ) -> TranslationOutput<B>;

    /// Argmax predictions and the labels they are scored against,
    /// both [batch_size, target_len - 1].
    fn align(
        &self,
        logits: Tensor<B, 3>,
        target: Tensor<B, 2, Int>,
    ) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>);

    /// Greedy decode of one unpadded source sentence.
    /// Returns `<s>` + generated ids, ending in `</s>` when it was produced.
    fn greedy_decode(&self, source: &[u32], tokens: &SpecialTokens, max_steps: usize) -> Vec<u32>;

    fn parameter_summary(&self) -> ParameterSummary;

    fn kind(&self) -> ModelKind;
}

/// Trainable parameter count per top-level component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSummary {
    pub components: Vec<(String, usize)>,
}

impl ParameterSummary {
    pub fn push(mut self, name: &str, count: usize) -> Self {
        self.components.push((name.to_string(), count));
        self
    }

    pub fn total(&self) -> usize {
        self.components.iter().map(|(_, n)| n).sum()
    }
}

impl fmt::Display for ParameterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, count) in &self.components {
            writeln!(f, "{:<24} {:>12}", name, format_params(*count))?;
        }
        write!(f, "{:<24} {:>12}", "TotalParams", format_params(self.total()))
    }
}

pub fn format_params(n: usize) -> String {
    if n >= 1_000_000_000 { format!("{:.2}B", n as f64 / 1e9) }
    else if n >= 1_000_000 { format!("{:.1}M", n as f64 / 1e6) }
    else if n >= 1_000 { format!("{:.1}K", n as f64 / 1e3) }
    else { n.to_string() }
}
