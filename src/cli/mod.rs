// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`     — trains a seq2seq or transformer model
//   2. `translate` — loads a checkpoint and translates a sentence
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs, TranslateArgs};

#[derive(Parser, Debug)]
#[command(
    name = "nmt-seq2seq",
    version = "0.1.0",
    about = "Train GRU-attention or transformer translation models, then translate with greedy decoding."
)]
pub struct Cli {
    /// The subcommand to run (train or translate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case; the CLI only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Translate(args) => run_translate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting {} training on '{}' → '{}'", args.model, args.source, args.target);

    let test = TrainUseCase::new(args.into()).execute()?;
    println!(
        "Training complete. Test accuracy={:.2}% BLEU={:.4}",
        test.accuracy * 100.0, test.bleu,
    );
    Ok(())
}

fn run_translate(args: TranslateArgs) -> Result<()> {
    use crate::application::translate_use_case::TranslateUseCase;

    let use_case = TranslateUseCase::new(&args.checkpoint_dir, args.max_steps)?;
    let out = use_case.translate(&args.sentence)?;
    println!("\nTranslation: {}", out.text);
    Ok(())
}
