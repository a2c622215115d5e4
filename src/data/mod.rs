// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between two text files on disk and padded Int
// tensors on the device:
//
//   source.txt + target.txt
//       │
//       ▼
//   ParallelTextLoader   → line-aligned SentencePairs
//       │                  (Preprocessor cleans each line)
//       ▼
//   Vocabulary (infra)   → words to ids
//       │
//       ▼
//   TranslationDataset   → framed samples, burn Dataset
//       │
//       ▼
//   split_train_valid_test
//       │
//       ▼
//   TranslationBatcher   → right-padded [B, T] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads two line-aligned corpus files
pub mod loader;

/// Cleans one sentence before tokenisation
pub mod preprocessor;

/// Implements Burn's Dataset trait for translation samples
pub mod dataset;

/// Implements Burn's Batcher trait with per-batch padding
pub mod batcher;

/// Shuffles and splits samples into train/valid/test
pub mod splitter;
