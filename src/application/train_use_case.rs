// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the parallel corpus     (Layer 4 - data)
//   Step 2: Build / load tokenizer       (Layer 6 - infra)
//   Step 3: Tokenise into a dataset      (Layer 4 - data)
//   Step 4: Drop over-long samples       (Layer 4 - data)
//   Step 5: Split train/valid/test       (Layer 4 - data)
//   Step 6: Save config                  (Layer 6 - infra)
//   Step 7: Build the LR schedule        (Layer 5 - ml)
//   Step 8: Build the model, train       (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::TranslationDataset,
    loader::ParallelTextLoader,
    splitter::split_train_valid_test,
};
use crate::domain::traits::CorpusSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::CsvMetricsSink,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    backend::{backend_name, get_device, TrainBackend},
    model::{ModelKind, Translator},
    recurrent::RecurrentTranslatorConfig,
    scheduler::CosineScheduler,
    trainer::{train_model, EvalScores, TrainData},
    transformer::TransformerTranslatorConfig,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoint so inference rebuilds the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model_kind:          ModelKind,
    pub source_path:         String,
    pub target_path:         String,
    pub checkpoint_dir:      String,
    pub run_name:            String,

    // data
    pub vocab_size:          usize,
    pub lowercase:           bool,
    pub reversed_input:      bool,
    pub max_len:             usize,
    pub valid_fraction:      f64,
    pub test_fraction:       f64,

    // optimisation
    pub batch_size:          usize,
    pub epochs:              usize,
    pub max_lr:              f64,
    pub min_lr:              f64,
    pub warmup_steps:        usize,
    pub eval_every:          usize,
    pub teacher_force_ratio: f64,
    pub seed:                u64,
    pub num_workers:         usize,

    // architecture
    pub d_embed:             usize,
    pub d_model:             usize,
    pub d_ff:                usize,
    pub num_heads:           usize,
    pub num_layers:          usize,
    pub dropout:             f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model_kind:          ModelKind::Seq2seq,
            source_path:         "data/train.en".to_string(),
            target_path:         "data/train.fr".to_string(),
            checkpoint_dir:      "checkpoints".to_string(),
            run_name:            "nmt_run".to_string(),
            vocab_size:          30_000,
            lowercase:           true,
            reversed_input:      false,
            max_len:             128,
            valid_fraction:      0.05,
            test_fraction:       0.05,
            batch_size:          64,
            epochs:              10,
            max_lr:              1e-3,
            min_lr:              1e-5,
            warmup_steps:        200,
            eval_every:          500,
            teacher_force_ratio: 0.5,
            seed:                42,
            num_workers:         2,
            d_embed:             256,
            d_model:             512,
            d_ff:                1024,
            num_heads:           8,
            num_layers:          2,
            dropout:             0.1,
        }
    }
}

impl TrainConfig {
    pub fn recurrent_config(&self, vocab_size: usize) -> RecurrentTranslatorConfig {
        RecurrentTranslatorConfig::new(vocab_size, vocab_size)
            .with_d_embed(self.d_embed)
            .with_d_model(self.d_model)
            .with_d_ff(self.d_ff)
            .with_num_layers(self.num_layers)
            .with_dropout(self.dropout)
    }

    pub fn transformer_config(&self, vocab_size: usize) -> TransformerTranslatorConfig {
        TransformerTranslatorConfig::new(vocab_size)
            .with_d_model(self.d_model)
            .with_d_ff(self.d_ff)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_dropout(self.dropout)
            .with_max_len(self.max_len)
    }

    /// Optimizer steps for the whole run, given the training-set size.
    pub fn total_steps(&self, train_samples: usize) -> usize {
        self.epochs * train_samples.div_ceil(self.batch_size.max(1))
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    /// Returns the test-set scores.
    pub fn execute(&self) -> Result<EvalScores> {
        let cfg = &self.config;
        ensure!(cfg.batch_size > 0, "batch_size must be positive");
        ensure!(cfg.num_layers >= 1, "num_layers must be at least 1");
        if cfg.model_kind == ModelKind::Transformer {
            ensure!(
                cfg.num_heads > 0 && cfg.d_model % cfg.num_heads == 0,
                "d_model ({}) must be divisible by num_heads ({})",
                cfg.d_model, cfg.num_heads,
            );
        }

        // ── Step 1: Load the parallel corpus ─────────────────────────────────
        tracing::info!("Loading corpus '{}' / '{}'", cfg.source_path, cfg.target_path);
        let pairs = ParallelTextLoader::new(&cfg.source_path, &cfg.target_path)
            .with_lowercase(cfg.lowercase)
            .load_all()?;

        let (sources, targets): (Vec<String>, Vec<String>) =
            pairs.into_iter().map(|p| (p.source, p.target)).unzip();

        // ── Step 2: Build / load tokenizer ────────────────────────────────────
        // One vocabulary for both languages.
        let corpus: Vec<String> = sources.iter().chain(&targets).cloned().collect();
        let vocab = TokenizerStore::new(&cfg.checkpoint_dir).load_or_build(&corpus, cfg.vocab_size)?;
        let tokens = vocab.special_tokens();
        tracing::info!("Vocabulary size: {}", vocab.vocab_size());

        // ── Step 3: Tokenise ──────────────────────────────────────────────────
        let mut dataset = TranslationDataset::new(&sources, &targets, &vocab, tokens, cfg.reversed_input)?;

        // ── Step 4: Respect the position table ────────────────────────────────
        let dropped = dataset.retain_max_len(cfg.max_len);
        if dropped > 0 {
            tracing::warn!("Dropped {} samples longer than max_len={}", dropped, cfg.max_len);
        }

        // ── Step 5: Train / valid / test split ────────────────────────────────
        ensure!(
            cfg.valid_fraction >= 0.0 && cfg.test_fraction >= 0.0
                && cfg.valid_fraction + cfg.test_fraction < 1.0,
            "valid_fraction + test_fraction must be below 1.0 (got {} + {})",
            cfg.valid_fraction, cfg.test_fraction,
        );
        let splits = split_train_valid_test(dataset.into_samples(), cfg.valid_fraction, cfg.test_fraction, cfg.seed);
        ensure!(!splits.train.is_empty(), "No training samples left after filtering");
        tracing::info!(
            "Split: {} train, {} valid, {} test",
            splits.train.len(), splits.valid.len(), splits.test.len(),
        );

        // ── Step 6: Save config for inference ─────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 7: Learning-rate schedule ────────────────────────────────────
        let total_steps = cfg.total_steps(splits.train.len());
        let warmup = cfg.warmup_steps.clamp(1, total_steps.saturating_sub(1).max(1));
        if warmup != cfg.warmup_steps {
            tracing::warn!("warmup_steps {} clamped to {} for a {}-step run", cfg.warmup_steps, warmup, total_steps);
        }
        let schedule = CosineScheduler::new(total_steps.max(warmup + 1), warmup, cfg.max_lr, cfg.min_lr)
            .context("Invalid learning-rate schedule")?;

        let data = TrainData {
            train: TranslationDataset::from_samples(splits.train),
            valid: TranslationDataset::from_samples(splits.valid),
            test:  TranslationDataset::from_samples(splits.test),
        };
        let mut sink = CsvMetricsSink::new(&cfg.checkpoint_dir, &cfg.run_name)?;

        // ── Step 8: Build the model and train ─────────────────────────────────
        let device = get_device();
        tracing::info!("Using backend: {}", backend_name());

        let test = match cfg.model_kind {
            ModelKind::Seq2seq => {
                let model = cfg.recurrent_config(vocab.vocab_size()).init::<TrainBackend>(&device);
                tracing::info!("Seq2seq parameters:\n{}", model.parameter_summary());
                train_model::<TrainBackend, _>(cfg, model, data, tokens, &schedule, &mut sink, &ckpt, device)?.test
            }
            ModelKind::Transformer => {
                let model = cfg.transformer_config(vocab.vocab_size()).init::<TrainBackend>(&device);
                tracing::info!("Transformer parameters:\n{}", model.parameter_summary());
                train_model::<TrainBackend, _>(cfg, model, data, tokens, &schedule, &mut sink, &ckpt, device)?.test
            }
        };

        tracing::info!("Metrics written to '{}'", sink.csv_path().display());
        Ok(test)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_total_steps_rounds_partial_batches_up() {
        let cfg = TrainConfig { batch_size: 4, epochs: 3, ..TrainConfig::default() };
        assert_eq!(cfg.total_steps(10), 9);
        assert_eq!(cfg.total_steps(8), 6);
    }

    #[test]
    fn test_model_configs_follow_hyperparameters() {
        let cfg = TrainConfig { d_model: 32, num_layers: 3, max_len: 40, ..TrainConfig::default() };
        let r = cfg.recurrent_config(100);
        assert_eq!((r.source_vocab_size, r.target_vocab_size, r.d_model, r.num_layers), (100, 100, 32, 3));
        let t = cfg.transformer_config(100);
        assert_eq!((t.vocab_size, t.d_model, t.max_len), (100, 32, 40));
    }

    #[test]
    fn test_mismatched_corpus_fails_before_training() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let trg = dir.path().join("trg.txt");
        fs::write(&src, "a b\nc d\n").unwrap();
        fs::write(&trg, "x y\n").unwrap();

        let cfg = TrainConfig {
            source_path: src.display().to_string(),
            target_path: trg.display().to_string(),
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("Lengths mismatched"), "{err}");
    }

    #[test]
    fn test_invalid_architecture_flags_are_errors() {
        let no_layers = TrainConfig { num_layers: 0, ..TrainConfig::default() };
        let err = TrainUseCase::new(no_layers).execute().unwrap_err();
        assert!(err.to_string().contains("num_layers"), "{err}");

        let uneven_heads = TrainConfig {
            model_kind: ModelKind::Transformer,
            d_model: 10,
            num_heads: 4,
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(uneven_heads).execute().unwrap_err();
        assert!(err.to_string().contains("divisible by num_heads"), "{err}");

        let zero_heads = TrainConfig { model_kind: ModelKind::Transformer, num_heads: 0, ..TrainConfig::default() };
        assert!(TrainUseCase::new(zero_heads).execute().is_err());
    }

    #[test]
    fn test_end_to_end_tiny_transformer_run() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let trg = dir.path().join("trg.txt");
        let lines = |words: &[&str]| words.iter().map(|w| format!("{w}\n")).collect::<String>();
        fs::write(&src, lines(&["the cat", "the dog", "a cat", "a dog", "the bird", "a bird"])).unwrap();
        fs::write(&trg, lines(&["le chat", "le chien", "un chat", "un chien", "le oiseau", "un oiseau"])).unwrap();

        let ckpt_dir = dir.path().join("ckpt");
        let cfg = TrainConfig {
            model_kind: ModelKind::Transformer,
            source_path: src.display().to_string(),
            target_path: trg.display().to_string(),
            checkpoint_dir: ckpt_dir.display().to_string(),
            run_name: "tiny".to_string(),
            valid_fraction: 0.2,
            test_fraction: 0.2,
            batch_size: 2,
            epochs: 1,
            warmup_steps: 1,
            eval_every: 1,
            num_workers: 1,
            d_model: 8,
            d_ff: 16,
            num_heads: 2,
            num_layers: 1,
            max_len: 16,
            ..TrainConfig::default()
        };

        let test = TrainUseCase::new(cfg).execute().unwrap();
        assert!(test.loss.is_finite());
        assert!(ckpt_dir.join("tokenizer.json").exists());
        assert!(ckpt_dir.join("train_config.json").exists());
        assert!(ckpt_dir.join("tiny.mpk").exists());
        assert!(ckpt_dir.join("tiny_metrics.csv").exists());
    }
}
