// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches tensors lives here.
//
//   backend.rs     — NdArray (default) or Wgpu, chosen by feature
//   masking.rs     — padding/causal masks, position ids, padded loss
//   attention.rs   — additive attention for the recurrent decoder
//   generation.rs  — teacher-forcing policies and the greedy loop
//   model.rs       — the `Translator` trait both families implement
//   recurrent.rs   — bidirectional GRU encoder, attentive GRU decoder
//   transformer.rs — pre-norm transformer with one shared embedding
//   scheduler.rs   — warmup + cosine learning-rate schedule
//   trainer.rs     — step-based training, validation and test loop
//   inferencer.rs  — checkpoint → greedy translation
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Compile-time backend selection
pub mod backend;

/// Masks, positions and the padded cross-entropy
pub mod masking;

/// Bahdanau attention
pub mod attention;

/// Teacher forcing and greedy decoding control flow
pub mod generation;

/// The shared translator capability
pub mod model;

/// GRU encoder/decoder with attention
pub mod recurrent;

/// Transformer with tied embedding/classifier
pub mod transformer;

/// Cosine learning-rate schedule
pub mod scheduler;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine: loads a checkpoint and translates
pub mod inferencer;
