// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams other layers plug into. None of these mention
// burn: the ML layer implements them, the application layer
// only talks to the traits.
//
//   CorpusSource  → where aligned sentences come from
//   MetricsSink   → where training curves go (CSV today)
//   LrSchedule    → how the learning rate evolves per step
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::sentence_pair::SentencePair;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce aligned sentence pairs.
///
/// Implementations:
///   - ParallelTextLoader → two line-aligned text files
pub trait CorpusSource {
    /// Load every sentence pair this source holds.
    fn load_all(&self) -> Result<Vec<SentencePair>>;
}

// ─── TokenEncoder ─────────────────────────────────────────────────────────────
/// Maps text to vocabulary ids, without any `<s>` / `</s>` framing.
///
/// Implementations:
///   - Vocabulary → wraps a HuggingFace `tokenizers::Tokenizer`
pub trait TokenEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
}

// ─── MetricsSink ──────────────────────────────────────────────────────────────
/// Receives scalar training events, one `(step, name, value)` at a time.
///
/// Implementations:
///   - CsvMetricsSink → appends rows to metrics.csv
///   - MemorySink     → keeps events in a Vec (tests)
pub trait MetricsSink {
    fn record(&mut self, step: usize, name: &str, value: f64) -> Result<()>;
}

/// Collects events in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub events: Vec<(usize, String, f64)>,
}

impl MemorySink {
    pub fn values(&self, name: &str) -> Vec<f64> {
        self.events
            .iter()
            .filter(|(_, n, _)| n == name)
            .map(|(_, _, v)| *v)
            .collect()
    }
}

impl MetricsSink for MemorySink {
    fn record(&mut self, step: usize, name: &str, value: f64) -> Result<()> {
        self.events.push((step, name.to_string(), value));
        Ok(())
    }
}

// ─── LrSchedule ───────────────────────────────────────────────────────────────
/// A learning-rate schedule indexed by optimizer step (0-based).
pub trait LrSchedule {
    fn get_lr(&self, step: usize) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_filters_by_name() {
        let mut sink = MemorySink::default();
        sink.record(1, "train_loss", 2.0).unwrap();
        sink.record(1, "valid_loss", 3.0).unwrap();
        sink.record(2, "train_loss", 1.5).unwrap();
        assert_eq!(sink.values("train_loss"), vec![2.0, 1.5]);
        assert_eq!(sink.values("valid_loss"), vec![3.0]);
    }
}
