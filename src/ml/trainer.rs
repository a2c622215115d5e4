// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One loop serves both model families through `Translator`.
//
//   for epoch:
//     for batch:                                  (Autodiff backend)
//       lr    = schedule.get_lr(step)
//       loss  = model.forward(src, tgt, policy).loss
//       grads = clip_norm(∇loss, 1.0)
//       model = adam.step(lr, model, grads)
//       every eval_every steps → evaluate on valid  (inner backend)
//   evaluate on test, save checkpoint
//
// Key Burn insight:
//   - Training runs on Autodiff<B> for gradients
//   - model.valid() returns the same model on B::InnerBackend,
//     with dropout switched off
//   - the validation/test batchers must use the inner backend too
//
// Evaluation always feeds the recurrent decoder its own
// predictions; the transformer has no such choice to make.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{TranslationBatch, TranslationBatcher},
    dataset::TranslationDataset,
};
use crate::domain::sentence_pair::SpecialTokens;
use crate::domain::traits::{LrSchedule, MetricsSink};
use crate::infra::{checkpoint::CheckpointManager, scoring::compute_metrics};
use crate::ml::{
    generation::{FixedPolicy, RatioPolicy},
    model::Translator,
};

/// Averages over every batch of one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalScores {
    pub loss:     f64,
    pub accuracy: f64,
    pub bleu:     f64,
}

/// What a finished run hands back to the caller.
#[derive(Debug)]
pub struct TrainOutcome<M> {
    pub model: M,
    pub steps: usize,
    pub last_valid: Option<EvalScores>,
    pub test: EvalScores,
}

pub struct TrainData {
    pub train: TranslationDataset,
    pub valid: TranslationDataset,
    pub test:  TranslationDataset,
}

pub fn train_model<B, M>(
    cfg:      &TrainConfig,
    model:    M,
    data:     TrainData,
    tokens:   SpecialTokens,
    schedule: &dyn LrSchedule,
    sink:     &mut dyn MetricsSink,
    ckpt:     &CheckpointManager,
    device:   B::Device,
) -> Result<TrainOutcome<M>>
where
    B: AutodiffBackend,
    M: Translator<B> + AutodiffModule<B>,
    M::InnerModule: Translator<B::InnerBackend>,
{
    let mut model = model;

    // ── Adam with gradient-norm clipping ──────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Norm(1.0)))
        .init::<B, M>();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(TranslationBatcher::<B>::new(device.clone(), tokens.pad))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(data.train);

    let valid_loader = DataLoaderBuilder::new(TranslationBatcher::<B::InnerBackend>::new(device.clone(), tokens.pad))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(data.valid);

    let test_loader = DataLoaderBuilder::new(TranslationBatcher::<B::InnerBackend>::new(device, tokens.pad))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(data.test);

    let mut policy = RatioPolicy::new(cfg.teacher_force_ratio, cfg.seed);
    let eval_every = cfg.eval_every.max(1);

    let mut step = 0usize;
    let mut last_valid = None;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in train_loader.iter() {
            let lr = schedule.get_lr(step);

            let output = model.forward(batch.source, batch.target, &tokens, &mut policy);
            let Some(loss) = output.loss else {
                tracing::warn!("Skipping batch at step {}: targets too short for a loss", step);
                continue;
            };

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val;
            batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);

            sink.record(step, "train_loss", loss_val)?;
            sink.record(step, "lr", lr)?;

            if (step + 1) % eval_every == 0 {
                let scores = evaluate(&model.valid(), valid_loader.iter(), &tokens);
                record_scores(sink, step, "valid", &scores)?;
                println!(
                    "Step {:>6} | lr={:.2e} | train_loss={:.4} | valid_loss={:.4} | valid_acc={:.2}% | valid_bleu={:.4}",
                    step + 1, lr, loss_val, scores.loss, scores.accuracy * 100.0, scores.bleu,
                );
                last_valid = Some(scores);
            }

            step += 1;
        }

        let avg = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        tracing::info!("Epoch {:>3}/{} | steps={} | avg_train_loss={:.4}", epoch, cfg.epochs, step, avg);
    }

    // ── Test evaluation ───────────────────────────────────────────────────────
    let test = evaluate(&model.valid(), test_loader.iter(), &tokens);
    record_scores(sink, step, "test", &test)?;
    println!(
        "Test | loss={:.4} | accuracy={:.2}% | bleu={:.4}",
        test.loss, test.accuracy * 100.0, test.bleu,
    );

    ckpt.save_model(&model, &cfg.run_name)?;
    tracing::info!("Training complete after {} steps", step);

    Ok(TrainOutcome { model, steps: step, last_valid, test })
}

/// Loss, accuracy and BLEU averaged over `batches`.
///
/// Predictions are the argmax logits aligned with the labels they
/// predict; padding labels are ignored by both the loss and the scores.
pub fn evaluate<B, M, I>(model: &M, batches: I, tokens: &SpecialTokens) -> EvalScores
where
    B: Backend,
    M: Translator<B>,
    I: Iterator<Item = TranslationBatch<B>>,
{
    let mut totals = EvalScores::default();
    let mut count  = 0usize;
    let mut policy = FixedPolicy::own_predictions();

    for batch in batches {
        let output = model.forward(batch.source, batch.target.clone(), tokens, &mut policy);
        let Some(loss) = output.loss else { continue };

        let (predictions, labels) = model.align(output.logits, batch.target);
        let scores = compute_metrics(&int_rows(labels), &int_rows(predictions), tokens.pad);

        totals.loss     += loss.into_scalar().elem::<f64>();
        totals.accuracy += scores.accuracy;
        totals.bleu     += scores.bleu;
        count += 1;
    }

    if count == 0 {
        tracing::warn!("Evaluation saw no scorable batches");
        return totals;
    }
    let n = count as f64;
    EvalScores { loss: totals.loss / n, accuracy: totals.accuracy / n, bleu: totals.bleu / n }
}

fn record_scores(sink: &mut dyn MetricsSink, step: usize, split: &str, scores: &EvalScores) -> Result<()> {
    sink.record(step, &format!("{split}_loss"), scores.loss)?;
    sink.record(step, &format!("{split}_accuracy"), scores.accuracy)?;
    sink.record(step, &format!("{split}_bleu"), scores.bleu)
}

/// [B, T] Int tensor → one Vec<u32> per row.
fn int_rows<B: Backend>(t: Tensor<B, 2, Int>) -> Vec<Vec<u32>> {
    let [_, width] = t.dims();
    let flat: Vec<u32> = t.into_data().iter::<i64>().map(|x| x as u32).collect();
    if width == 0 {
        return Vec::new();
    }
    flat.chunks(width).map(|row| row.to_vec()).collect()
}
