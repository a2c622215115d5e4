// ============================================================
// Layer 4 — Translation Batcher (collator)
// ============================================================
// Implements Burn's Batcher trait to turn a Vec of unpadded
// TranslationSamples into two dense Int tensors.
//
// Sentences have different lengths, so each side is right-padded
// to the longest sequence IN THIS BATCH with the pad id:
//
//   source:  [5 9 7]        →  [5 9 7]
//            [4]            →  [4 0 0]
//   target:  [2 8 3]        →  [2 8 3 0]
//            [2 6 6 3]      →  [2 6 6 3]
//
// Source and target are padded independently — their widths
// only need to agree on the batch dimension.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslationSample;

// ─── TranslationBatch ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// Source ids — shape: [batch_size, max_source_len]
    pub source: Tensor<B, 2, Int>,

    /// Framed target ids — shape: [batch_size, max_target_len]
    pub target: Tensor<B, 2, Int>,
}

// ─── TranslationBatcher ───────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device: B::Device,
    pub pad_id: u32,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id }
    }
}

/// Right-pad `rows` to a common width.
/// Returns the row-major flat buffer and that width.
pub fn pad_rows<'a, I>(rows: I, pad_id: u32) -> (Vec<i32>, usize)
where
    I: IntoIterator<Item = &'a [u32]> + Clone,
{
    let width = rows.clone().into_iter().map(|r| r.len()).max().unwrap_or(0);
    let mut flat = Vec::new();
    for row in rows {
        flat.extend(row.iter().map(|&x| x as i32));
        flat.extend(std::iter::repeat(pad_id as i32).take(width - row.len()));
    }
    (flat, width)
}

impl<B: Backend> Batcher<B, TranslationSample, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TranslationSample>, _device: &B::Device) -> TranslationBatch<B> {
        let batch_size = items.len();

        let (source_flat, source_len) =
            pad_rows(items.iter().map(|s| s.source_ids.as_slice()), self.pad_id);
        let (target_flat, target_len) =
            pad_rows(items.iter().map(|s| s.target_ids.as_slice()), self.pad_id);

        let source = Tensor::<B, 1, Int>::from_ints(source_flat.as_slice(), &self.device)
            .reshape([batch_size, source_len]);
        let target = Tensor::<B, 1, Int>::from_ints(target_flat.as_slice(), &self.device)
            .reshape([batch_size, target_len]);

        TranslationBatch { source, target }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_pad_rows_right_pads_to_longest() {
        let rows: Vec<Vec<u32>> = vec![vec![5, 9, 7], vec![4]];
        let (flat, width) = pad_rows(rows.iter().map(|r| r.as_slice()), 0);
        assert_eq!(width, 3);
        assert_eq!(flat, vec![5, 9, 7, 4, 0, 0]);
    }

    #[test]
    fn test_source_and_target_padded_independently() {
        let batcher = TranslationBatcher::<TestBackend>::new(Default::default(), 0);
        let batch = batcher.batch(vec![
            TranslationSample { source_ids: vec![5, 9, 7], target_ids: vec![2, 8, 3] },
            TranslationSample { source_ids: vec![4],       target_ids: vec![2, 6, 6, 3] },
        ], &batcher.device);

        assert_eq!(batch.source.dims(), [2, 3]);
        assert_eq!(batch.target.dims(), [2, 4]);

        let target: Vec<i64> = batch.target.into_data().iter::<i64>().collect();
        assert_eq!(target, vec![2, 8, 3, 0, 2, 6, 6, 3]);
    }
}
