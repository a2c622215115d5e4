// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `translate`, and
// all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::ModelKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a translation model on a parallel corpus
    Train(TrainArgs),

    /// Translate a sentence with a trained checkpoint
    Translate(TranslateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Model family to train
    #[arg(long, value_enum, default_value_t = ModelKind::Seq2seq)]
    pub model: ModelKind,

    /// Source-language file, one sentence per line
    #[arg(long)]
    pub source: String,

    /// Target-language file, line-aligned with --source
    #[arg(long)]
    pub target: String,

    /// Directory for checkpoints, tokenizer, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Checkpoint file stem: {checkpoint_dir}/{run_name}.mpk
    #[arg(long, default_value = "nmt_run")]
    pub run_name: String,

    /// Upper bound on the shared vocabulary, special tokens included
    #[arg(long, default_value_t = 30_000)]
    pub vocab_size: usize,

    /// Keep the corpus' original casing
    #[arg(long)]
    pub keep_case: bool,

    /// Feed source sentences back to front
    #[arg(long)]
    pub reversed_input: bool,

    /// Longest sequence kept; also the transformer's position table size
    #[arg(long, default_value_t = 128)]
    pub max_len: usize,

    #[arg(long, default_value_t = 0.05)]
    pub valid_fraction: f64,

    #[arg(long, default_value_t = 0.05)]
    pub test_fraction: f64,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Peak learning rate, reached at the end of warmup
    #[arg(long, default_value_t = 1e-3)]
    pub max_lr: f64,

    /// Floor of the cosine decay
    #[arg(long, default_value_t = 1e-5)]
    pub min_lr: f64,

    #[arg(long, default_value_t = 200)]
    pub warmup_steps: usize,

    /// Validate every N optimizer steps
    #[arg(long, default_value_t = 500)]
    pub eval_every: usize,

    /// Probability of feeding the ground-truth token (seq2seq only)
    #[arg(long, default_value_t = 0.5)]
    pub teacher_force_ratio: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    /// Token embedding width (seq2seq only)
    #[arg(long, default_value_t = 256)]
    pub d_embed: usize,

    /// Hidden width of the GRUs / the transformer
    #[arg(long, default_value_t = 512)]
    pub d_model: usize,

    /// Feed-forward inner width
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    /// Attention heads (transformer only); must divide d_model
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            model_kind:          a.model,
            source_path:         a.source,
            target_path:         a.target,
            checkpoint_dir:      a.checkpoint_dir,
            run_name:            a.run_name,
            vocab_size:          a.vocab_size,
            lowercase:           !a.keep_case,
            reversed_input:      a.reversed_input,
            max_len:             a.max_len,
            valid_fraction:      a.valid_fraction,
            test_fraction:       a.test_fraction,
            batch_size:          a.batch_size,
            epochs:              a.epochs,
            max_lr:              a.max_lr,
            min_lr:              a.min_lr,
            warmup_steps:        a.warmup_steps,
            eval_every:          a.eval_every,
            teacher_force_ratio: a.teacher_force_ratio,
            seed:                a.seed,
            num_workers:         a.num_workers,
            d_embed:             a.d_embed,
            d_model:             a.d_model,
            d_ff:                a.d_ff,
            num_heads:           a.num_heads,
            num_layers:          a.num_layers,
            dropout:             a.dropout,
        }
    }
}

/// All arguments for the `translate` command
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Sentence in the source language
    #[arg(long)]
    pub sentence: String,

    /// Directory where `train` saved its outputs
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Give up after this many generated tokens
    #[arg(long, default_value_t = 50)]
    pub max_steps: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_args_map_onto_config() {
        let cli = Cli::try_parse_from([
            "nmt-seq2seq", "train",
            "--model", "transformer",
            "--source", "a.en", "--target", "a.fr",
            "--keep-case", "--num-layers", "4",
        ]).unwrap();

        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.model_kind, ModelKind::Transformer);
        assert_eq!(cfg.source_path, "a.en");
        assert!(!cfg.lowercase);
        assert_eq!(cfg.num_layers, 4);
        assert_eq!(cfg.max_len, 128);
    }

    #[test]
    fn test_translate_requires_sentence() {
        assert!(Cli::try_parse_from(["nmt-seq2seq", "translate"]).is_err());
        let cli = Cli::try_parse_from(["nmt-seq2seq", "translate", "--sentence", "hello"]).unwrap();
        let Commands::Translate(args) = cli.command else { panic!("expected translate") };
        assert_eq!(args.max_steps, 50);
    }
}
