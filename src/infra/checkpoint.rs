// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved per run:
//   1. Model weights ({run_name}.mpk) — all learned parameters
//   2. train_config.json             — architecture + hyperparameters
//
// The tokenizer lives in the same directory (TokenizerStore),
// so one directory is everything inference needs:
//
//   checkpoints/
//     tokenizer.json
//     train_config.json
//     seq2seq_run.mpk
//     seq2seq_run_metrics.csv
//
// The config decides which model family to rebuild before the
// weights are loaded into it; loading fails if the shapes differ.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;

const CONFIG_FILE: &str = "train_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Write `{dir}/{run_name}.mpk`; the recorder adds the extension.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, run_name: &str) -> Result<()> {
        let path = self.dir.join(run_name);

        Recorder::<B>::record(&CompactRecorder::new(), model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::info!("Checkpoint saved at: {}.mpk", path.display());
        Ok(())
    }

    /// Load `{dir}/{run_name}.mpk` into a freshly initialised model of
    /// the same architecture.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:    M,
        run_name: &str,
        device:   &B::Device,
    ) -> Result<M> {
        let path = self.dir.join(run_name);
        let record = Recorder::<B>::load(&CompactRecorder::new(), path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        tracing::info!("Loaded checkpoint '{}'", run_name);
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'translate'.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ModelKind;
    use crate::ml::recurrent::RecurrentTranslatorConfig;
    use burn::backend::NdArray;

    type TB = NdArray;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();

        let cfg = TrainConfig {
            model_kind: ModelKind::Transformer,
            run_name: "tiny".to_string(),
            num_layers: 1,
            ..TrainConfig::default()
        };
        ckpt.save_config(&cfg).unwrap();

        let back = ckpt.load_config().unwrap();
        assert_eq!(back.model_kind, ModelKind::Transformer);
        assert_eq!(back.run_name, "tiny");
        assert_eq!(back.num_layers, 1);
    }

    #[test]
    fn test_missing_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.load_config().is_err());

        let device = Default::default();
        let model = RecurrentTranslatorConfig::new(10, 10)
            .with_d_embed(4).with_d_model(4).with_d_ff(4).with_num_layers(1)
            .init::<TB>(&device);
        assert!(ckpt.load_model(model, "absent", &device).is_err());
    }

    #[test]
    fn test_weights_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let config = RecurrentTranslatorConfig::new(10, 10)
            .with_d_embed(4).with_d_model(4).with_d_ff(4).with_num_layers(1);

        let saved = config.init::<TB>(&device);
        ckpt.save_model(&saved, "run").unwrap();
        assert!(dir.path().join("run.mpk").exists());

        let loaded = ckpt.load_model(config.init::<TB>(&device), "run", &device).unwrap();
        let a: Vec<f32> = saved.classifier.weight.val().into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.classifier.weight.val().into_data().to_vec().unwrap();
        // Half-precision storage.
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2);
        }
    }
}
