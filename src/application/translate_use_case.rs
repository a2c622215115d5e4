// ============================================================
// Layer 2 — Translate Use Case
// ============================================================
// Loads everything a checkpoint directory holds and translates
// sentences with greedy decoding:
//
//   1. Load the shared vocabulary       (Layer 6 - infra)
//   2. Rebuild the model + weights      (Layer 5 - ml)
//   3. Greedy-decode each sentence      (Layer 5 - ml)

use anyhow::Result;

use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::inferencer::{Inferencer, Translation};

pub struct TranslateUseCase {
    inferencer: Inferencer,
    max_steps:  usize,
}

impl TranslateUseCase {
    pub fn new(checkpoint_dir: &str, max_steps: usize) -> Result<Self> {
        let vocab      = TokenizerStore::new(checkpoint_dir).load()?;
        let ckpt       = CheckpointManager::new(checkpoint_dir)?;
        let inferencer = Inferencer::from_checkpoint(&ckpt, vocab)?;
        Ok(Self { inferencer, max_steps })
    }

    pub fn translate(&self, sentence: &str) -> Result<Translation> {
        let out = self.inferencer.translate(sentence, self.max_steps)?;
        tracing::debug!("'{}' → {:?}", sentence, out.ids);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrained_directory_reports_missing_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        let err = TranslateUseCase::new(dir.path().to_str().unwrap(), 10)
            .err()
            .expect("empty directory must fail");
        assert!(err.to_string().contains("tokenizer"), "{err}");
    }
}
