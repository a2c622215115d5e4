use anyhow::{ensure, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::sentence_pair::SpecialTokens;
use crate::domain::traits::TokenEncoder;

/// One tokenised translation example, not yet padded.
/// Target format: `<s> t1 … tn </s>`. Source carries no framing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSample {
    pub source_ids: Vec<u32>,
    pub target_ids: Vec<u32>,
}

impl TranslationSample {
    /// Longest of the two sides, used against the position table size.
    pub fn max_len(&self) -> usize {
        self.source_ids.len().max(self.target_ids.len())
    }
}

pub struct TranslationDataset {
    samples: Vec<TranslationSample>,
}

impl TranslationDataset {
    /// Tokenise and frame every sentence pair.
    ///
    /// Fails immediately when the two lists differ in length.
    pub fn new(
        sources:        &[String],
        targets:        &[String],
        encoder:        &dyn TokenEncoder,
        tokens:         SpecialTokens,
        reversed_input: bool,
    ) -> Result<Self> {
        ensure!(
            sources.len() == targets.len(),
            "Lengths mismatched: input has {} sentences, but targets has {} sentences",
            sources.len(),
            targets.len(),
        );

        let mut samples = Vec::with_capacity(sources.len());
        for (source, target) in sources.iter().zip(targets) {
            let mut source_ids = encoder.encode(source)?;
            if reversed_input {
                source_ids.reverse();
            }

            let body = encoder.encode(target)?;
            let mut target_ids = Vec::with_capacity(body.len() + 2);
            target_ids.push(tokens.sos);
            target_ids.extend(body);
            target_ids.push(tokens.eos);

            samples.push(TranslationSample { source_ids, target_ids });
        }

        Ok(Self { samples })
    }

    pub fn from_samples(samples: Vec<TranslationSample>) -> Self { Self { samples } }

    pub fn into_samples(self) -> Vec<TranslationSample> { self.samples }

    /// Drop samples that would overflow a position table of `max_len` rows.
    pub fn retain_max_len(&mut self, max_len: usize) -> usize {
        let before = self.samples.len();
        self.samples.retain(|s| s.max_len() <= max_len);
        before - self.samples.len()
    }
}

impl Dataset<TranslationSample> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TranslationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps every whitespace-separated word to its length + 10.
    struct WordLengthEncoder;

    impl TokenEncoder for WordLengthEncoder {
        fn encode(&self, text: &str) -> Result<Vec<u32>> {
            Ok(text.split_whitespace().map(|w| w.len() as u32 + 10).collect())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_target_is_framed_with_sos_and_eos() {
        let tokens = SpecialTokens::default();
        let ds = TranslationDataset::new(
            &strings(&["a bb"]), &strings(&["ccc"]), &WordLengthEncoder, tokens, false,
        ).unwrap();

        let sample = ds.get(0).unwrap();
        assert_eq!(sample.source_ids, vec![11, 12]);
        assert_eq!(sample.target_ids, vec![tokens.sos, 13, tokens.eos]);
    }

    #[test]
    fn test_reversed_input_flips_source_only() {
        let ds = TranslationDataset::new(
            &strings(&["a bb ccc"]), &strings(&["a bb"]),
            &WordLengthEncoder, SpecialTokens::default(), true,
        ).unwrap();

        let sample = ds.get(0).unwrap();
        assert_eq!(sample.source_ids, vec![13, 12, 11]);
        assert_eq!(&sample.target_ids[1..3], &[11, 12]);
    }

    #[test]
    fn test_length_mismatch_is_reported_at_construction() {
        let result = TranslationDataset::new(
            &strings(&["a", "b"]), &strings(&["c"]),
            &WordLengthEncoder, SpecialTokens::default(), false,
        );
        let err = result.err().unwrap().to_string();
        assert!(err.contains("input has 2 sentences"));
        assert!(err.contains("targets has 1 sentences"));
    }

    #[test]
    fn test_retain_max_len_drops_long_samples() {
        let mut ds = TranslationDataset::new(
            &strings(&["a", "a a a a a"]), &strings(&["b", "b"]),
            &WordLengthEncoder, SpecialTokens::default(), false,
        ).unwrap();

        assert_eq!(ds.retain_max_len(4), 1);
        assert_eq!(ds.len(), 1);
    }
}
