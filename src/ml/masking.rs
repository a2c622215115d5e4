// ============================================================
// Layer 5 — Masks, Positions and the Padded Loss
// ============================================================
// Small tensor helpers shared by both model families.
//
// Mask convention (same as burn's attention modules):
//   true  = this key is HIDDEN from the query
//   false = this key may be attended to
//
//   padding_mask([[7, 4, 0, 0]], pad=0) → [[F, F, T, T]]
//
//   causal_mask(len=4)                 j →
//                                  i  [F T T T]
//                                  ↓  [F F T T]
//                                     [F F F T]
//                                     [F F F F]
//
// The causal mask forbids j > i strictly: a position always
// sees itself.
//
// The loss is a mean cross-entropy over labels that are NOT
// padding. A batch made only of padding has nothing to average
// and yields 0.0 instead of 0/0.

use burn::{
    prelude::*,
    tensor::{activation::log_softmax, Bool},
};

/// `true` wherever `tokens == pad_id`. Shape follows `tokens`: [B, T].
pub fn padding_mask<B: Backend>(tokens: Tensor<B, 2, Int>, pad_id: u32) -> Tensor<B, 2, Bool> {
    tokens.equal_elem(pad_id as i32)
}

/// Autoregressive mask of shape [batch_size, seq_len, seq_len], `true` above the diagonal.
pub fn causal_mask<B: Backend>(
    batch_size: usize,
    seq_len:    usize,
    device:     &B::Device,
) -> Tensor<B, 3, Bool> {
    let idx = Tensor::<B, 1, Int>::arange(0..seq_len as i64, device);
    let query_pos = idx.clone()
        .reshape([1, seq_len, 1])
        .expand([batch_size, seq_len, seq_len]);
    let key_pos = idx
        .reshape([1, 1, seq_len])
        .expand([batch_size, seq_len, seq_len]);
    key_pos.greater(query_pos)
}

/// Position ids `0..seq_len` repeated for every row: [batch_size, seq_len].
pub fn position_ids<B: Backend>(
    batch_size: usize,
    seq_len:    usize,
    device:     &B::Device,
) -> Tensor<B, 2, Int> {
    Tensor::<B, 1, Int>::arange(0..seq_len as i64, device)
        .unsqueeze::<2>()
        .expand([batch_size, seq_len])
}

/// Mean cross-entropy of `logits` [B, T, V] against `labels` [B, T],
/// skipping every label equal to `pad_id`.
///
/// Returns a one-element tensor; 0.0 when every label is padding.
pub fn padded_cross_entropy<B: Backend>(
    logits: Tensor<B, 3>,
    labels: Tensor<B, 2, Int>,
    pad_id: u32,
) -> Tensor<B, 1> {
    let [batch_size, seq_len, vocab_size] = logits.dims();
    let n = batch_size * seq_len;

    let log_probs = log_softmax(logits.reshape([n, vocab_size]), 1);
    let labels    = labels.reshape([n]);

    let picked = log_probs
        .gather(1, labels.clone().reshape([n, 1]))
        .reshape([n]);

    let pad  = labels.equal_elem(pad_id as i32);
    let kept = pad.clone().bool_not().int().sum().float().clamp_min(1.0);

    picked.mask_fill(pad, 0.0).sum().neg() / kept
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn ints(rows: &[&[i32]]) -> Tensor<TB, 2, Int> {
        let width = rows[0].len();
        let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::<TB, 1, Int>::from_ints(flat.as_slice(), &Default::default())
            .reshape([rows.len(), width])
    }

    #[test]
    fn test_padding_mask_marks_pad_positions() {
        let mask = padding_mask(ints(&[&[7, 4, 0, 0], &[5, 0, 6, 0]]), 0);
        let values = mask.into_data().to_vec::<bool>().unwrap();
        assert_eq!(values, vec![false, false, true, true, false, true, false, true]);
    }

    #[test]
    fn test_causal_mask_is_strict_upper_triangle() {
        let mask = causal_mask::<TB>(2, 3, &Default::default());
        assert_eq!(mask.dims(), [2, 3, 3]);

        let values = mask.into_data().to_vec::<bool>().unwrap();
        let expected_one = vec![
            false, true,  true,
            false, false, true,
            false, false, false,
        ];
        assert_eq!(&values[..9], expected_one.as_slice());
        assert_eq!(&values[9..], expected_one.as_slice());
    }

    #[test]
    fn test_position_ids_repeat_per_row() {
        let ids = position_ids::<TB>(2, 4, &Default::default());
        let values: Vec<i64> = ids.into_data().iter::<i64>().collect();
        assert_eq!(values, vec![0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn test_uniform_logits_give_log_vocab_loss() {
        let device = Default::default();
        let logits = Tensor::<TB, 3>::zeros([1, 3, 5], &device);
        let loss = padded_cross_entropy(logits, ints(&[&[1, 2, 0]]), 0);
        let value: f32 = loss.into_scalar().elem();
        assert!((value - (5.0f32).ln()).abs() < 1e-5, "got {value}");
    }

    #[test]
    fn test_all_padding_loss_is_zero_not_nan() {
        let device = Default::default();
        let logits = Tensor::<TB, 3>::random([2, 3, 4], burn::tensor::Distribution::Default, &device);
        let loss = padded_cross_entropy(logits, ints(&[&[0, 0, 0], &[0, 0, 0]]), 0);
        let value: f32 = loss.into_scalar().elem();
        assert!(!value.is_nan());
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_padding_does_not_dilute_the_mean() {
        let device = Default::default();
        let logits = Tensor::<TB, 3>::zeros([1, 4, 5], &device);
        let dense  = padded_cross_entropy(logits.clone(), ints(&[&[1, 2, 3, 4]]), 0);
        let padded = padded_cross_entropy(logits, ints(&[&[1, 2, 0, 0]]), 0);
        let a: f32 = dense.into_scalar().elem();
        let b: f32 = padded.into_scalar().elem();
        assert!((a - b).abs() < 1e-6);
    }
}
