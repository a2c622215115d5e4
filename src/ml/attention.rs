// ============================================================
// Layer 5 — Additive Attention (recurrent model)
// ============================================================
// Scores every encoder position against the decoder's current
// top-layer state and normalises the scores with softmax:
//
//   state   [B, H]    ──repeat over T──▶ [B, T, H]
//   context [B, T, H] ─┐
//                      ├─ concat ─▶ [B, T, 2H]
//                      │
//   energy  = W_e · [state ; context]    [B, T, H]
//   score   = w_a · energy               [B, T]   (no bias)
//   weights = softmax over T             [B, T]
//
// Padded source positions are NOT masked here: they keep
// receiving some attention mass. The transformer encoder is the
// only component that hides padding from attention.
//
// Reference: Bahdanau et al. (2015) Neural Machine Translation
//            by Jointly Learning to Align and Translate

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

#[derive(Config, Debug)]
pub struct BahdanauAttentionConfig {
    /// Width of both the decoder state and the encoder context vectors
    pub d_hidden: usize,
}

impl BahdanauAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BahdanauAttention<B> {
        BahdanauAttention {
            fc_energy: LinearConfig::new(self.d_hidden * 2, self.d_hidden).init(device),
            alpha:     LinearConfig::new(self.d_hidden, 1).with_bias(false).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct BahdanauAttention<B: Backend> {
    pub fc_energy: Linear<B>,
    pub alpha:     Linear<B>,
}

impl<B: Backend> BahdanauAttention<B> {
    /// context: [B, T, H], decoder_state: [B, H] → weights [B, T], rows sum to 1.
    pub fn forward(&self, context: Tensor<B, 3>, decoder_state: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, seq_len, d_hidden] = context.dims();

        let state = decoder_state
            .unsqueeze_dim::<3>(1)
            .expand([batch_size, seq_len, d_hidden]);

        let energy = self.fc_energy.forward(Tensor::cat(vec![state, context], 2));
        let scores = self.alpha.forward(energy).reshape([batch_size, seq_len]);

        softmax(scores, 1)
    }
}
