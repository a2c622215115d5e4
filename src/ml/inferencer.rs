// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the trained model from its checkpoint directory and
// translates one sentence at a time with greedy decoding.
//
//   train_config.json ──▶ which family, which sizes
//   tokenizer.json    ──▶ Vocabulary
//   {run_name}.mpk    ──▶ weights
//
//   text → clean → ids (reversed if trained that way)
//        → greedy_decode → ids → text

use anyhow::{ensure, Result};

use crate::application::train_use_case::TrainConfig;
use crate::data::preprocessor::Preprocessor;
use crate::domain::traits::TokenEncoder;
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::Vocabulary};
use crate::ml::{
    backend::{get_device, MyBackend},
    model::{ModelKind, Translator},
    recurrent::RecurrentTranslator,
    transformer::TransformerTranslator,
};

enum LoadedModel {
    Seq2seq(RecurrentTranslator<MyBackend>),
    Transformer(TransformerTranslator<MyBackend>),
}

/// One finished translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    /// `<s>` … `</s>` as produced by the decoder
    pub ids:  Vec<u32>,
    pub text: String,
}

pub struct Inferencer {
    model:        LoadedModel,
    vocab:        Vocabulary,
    preprocessor: Preprocessor,
    reversed_input: bool,
}

impl Inferencer {
    pub fn from_checkpoint(ckpt: &CheckpointManager, vocab: Vocabulary) -> Result<Self> {
        let cfg    = ckpt.load_config()?;
        let device = get_device();
        let model  = load_model(ckpt, &cfg, vocab.vocab_size(), &device)?;
        tracing::info!("{} model loaded from checkpoint '{}'", cfg.model_kind, cfg.run_name);

        Ok(Self {
            model,
            vocab,
            preprocessor: Preprocessor::new().with_lowercase(cfg.lowercase),
            reversed_input: cfg.reversed_input,
        })
    }

    pub fn translate(&self, sentence: &str, max_steps: usize) -> Result<Translation> {
        let mut source = self.vocab.encode(&self.preprocessor.clean(sentence))?;
        ensure!(!source.is_empty(), "Nothing to translate in '{sentence}'");
        if self.reversed_input {
            source.reverse();
        }

        let tokens = self.vocab.special_tokens();
        let ids = match &self.model {
            LoadedModel::Seq2seq(m)     => m.greedy_decode(&source, &tokens, max_steps),
            LoadedModel::Transformer(m) => m.greedy_decode(&source, &tokens, max_steps),
        };

        if ids.last() != Some(&tokens.eos) {
            tracing::debug!("No </s> within {} steps, returning partial output", max_steps);
        }

        let text = self.vocab.decode(&ids)?;
        Ok(Translation { ids, text })
    }
}

fn load_model(
    ckpt:       &CheckpointManager,
    cfg:        &TrainConfig,
    vocab_size: usize,
    device:     &<MyBackend as burn::prelude::Backend>::Device,
) -> Result<LoadedModel> {
    // Dropout plays no part at inference.
    let cfg = TrainConfig { dropout: 0.0, ..cfg.clone() };
    Ok(match cfg.model_kind {
        ModelKind::Seq2seq => {
            let model = cfg.recurrent_config(vocab_size).init::<MyBackend>(device);
            LoadedModel::Seq2seq(ckpt.load_model(model, &cfg.run_name, device)?)
        }
        ModelKind::Transformer => {
            let model = cfg.transformer_config(vocab_size).init::<MyBackend>(device);
            LoadedModel::Transformer(ckpt.load_model(model, &cfg.run_name, device)?)
        }
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;

    fn trained_dir(kind: ModelKind) -> (tempfile::TempDir, CheckpointManager, Vocabulary) {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let corpus = vec!["the cat sleeps".to_string(), "le chat dort".to_string()];
        let vocab = TokenizerStore::new(dir.path()).load_or_build(&corpus, 50).unwrap();

        let cfg = TrainConfig {
            model_kind: kind,
            run_name: "infer".to_string(),
            d_embed: 4, d_model: 8, d_ff: 8, num_heads: 2, num_layers: 1, max_len: 10,
            ..TrainConfig::default()
        };
        ckpt.save_config(&cfg).unwrap();

        let device = get_device();
        match kind {
            ModelKind::Seq2seq => {
                let m = cfg.recurrent_config(vocab.vocab_size()).init::<MyBackend>(&device);
                ckpt.save_model(&m, "infer").unwrap();
            }
            ModelKind::Transformer => {
                let m = cfg.transformer_config(vocab.vocab_size()).init::<MyBackend>(&device);
                ckpt.save_model(&m, "infer").unwrap();
            }
        }
        (dir, ckpt, vocab)
    }

    #[test]
    fn test_translate_with_each_model_family() {
        for kind in [ModelKind::Seq2seq, ModelKind::Transformer] {
            let (_dir, ckpt, vocab) = trained_dir(kind);
            let sos = vocab.special_tokens().sos;
            let inferencer = Inferencer::from_checkpoint(&ckpt, vocab).unwrap();

            let out = inferencer.translate("The cat sleeps", 5).unwrap();
            assert_eq!(out.ids[0], sos);
            assert!(out.ids.len() <= 6);
            assert!(!out.text.contains("<s>"));
        }
    }

    #[test]
    fn test_blank_input_is_rejected() {
        let (_dir, ckpt, vocab) = trained_dir(ModelKind::Seq2seq);
        let inferencer = Inferencer::from_checkpoint(&ckpt, vocab).unwrap();
        assert!(inferencer.translate("   ", 5).is_err());
    }
}
