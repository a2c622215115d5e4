// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several other layers:
//
//   checkpoint.rs      — model weights by run name (CompactRecorder)
//                        plus train_config.json, so inference can
//                        rebuild the exact architecture
//
//   tokenizer_store.rs — builds/saves/loads the shared word-level
//                        vocabulary and exposes it as `Vocabulary`
//
//   metrics.rs         — `CsvMetricsSink`: (step, metric, value) rows
//
//   scoring.rs         — sentence BLEU and unigram accuracy over
//                        predicted id rows
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV sink
pub mod metrics;

/// BLEU and accuracy
pub mod scoring;
