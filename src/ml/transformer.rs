// ============================================================
// Layer 5 — Transformer Translator (shared embedding)
// ============================================================
// One token table serves three roles:
//
//   source lookup ─┐
//   target lookup ─┼── embedding.weight  [V, D]
//   classifier    ─┘   (logits = h · Wᵀ + b)
//
// The classifier owns only its bias; its projection reads the
// embedding parameter directly, so an optimizer step on either
// use updates the single matrix.
//
// Encoder:
//   tok_emb(src) + pos_emb(0..Ts) → dropout
//   → N pre-norm self-attention layers, key padding mask (src == pad)
//   → memory [B, Ts, D]
//
// Decoder:
//   tok_emb(tgt) + pos_emb(0..Tt) → dropout
//   → N pre-norm layers: causal self-attention with target padding
//     mask, cross-attention over memory WITHOUT a memory mask
//   → classifier → logits [B, Tt, V]
//
// Source padding is hidden only inside the encoder; the decoder's
// cross-attention still sees padded memory rows.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Press & Wolf (2017) Using the Output Embedding
//            to Improve Language Models

use burn::{
    module::Param,
    nn::{
        transformer::{
            TransformerDecoder, TransformerDecoderConfig, TransformerDecoderInput,
            TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput,
        },
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Initializer,
    },
    prelude::*,
};

use crate::domain::sentence_pair::SpecialTokens;
use crate::ml::{
    generation::{greedy_loop, TeacherForcing},
    masking::{causal_mask, padded_cross_entropy, padding_mask, position_ids},
    model::{ModelKind, ParameterSummary, TranslationOutput, Translator},
};

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct TransformerTranslatorConfig {
    /// Joint source/target vocabulary
    pub vocab_size: usize,
    #[config(default = 256)]
    pub d_model: usize,
    #[config(default = 1024)]
    pub d_ff: usize,
    #[config(default = 8)]
    pub num_heads: usize,
    #[config(default = 3)]
    pub num_layers: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    /// Size of the position table; no sequence may be longer
    #[config(default = 128)]
    pub max_len: usize,
}

impl TransformerTranslatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerTranslator<B> {
        assert!(
            self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model, self.num_heads,
        );

        let initializer = Initializer::Normal { mean: 0.0, std: 0.02 };

        TransformerTranslator {
            embedding: EmbeddingConfig::new(self.vocab_size, self.d_model)
                .with_initializer(initializer.clone())
                .init(device),
            positions: EmbeddingConfig::new(self.max_len, self.d_model)
                .with_initializer(initializer.clone())
                .init(device),
            encoder: TransformerEncoderConfig::new(self.d_model, self.d_ff, self.num_heads, self.num_layers)
                .with_dropout(self.dropout)
                .with_norm_first(true)
                .with_initializer(initializer.clone())
                .init(device),
            decoder: TransformerDecoderConfig::new(self.d_model, self.d_ff, self.num_heads, self.num_layers)
                .with_dropout(self.dropout)
                .with_norm_first(true)
                .with_initializer(initializer)
                .init(device),
            classifier_bias: Initializer::Zeros.init([self.vocab_size], device),
            dropout: DropoutConfig::new(self.dropout).init(),
            max_len: self.max_len,
        }
    }
}

// ─── Model ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TransformerTranslator<B: Backend> {
    /// Shared token table, also the classifier projection
    pub embedding: Embedding<B>,
    /// Shared by source and target
    pub positions: Embedding<B>,
    pub encoder: TransformerEncoder<B>,
    pub decoder: TransformerDecoder<B>,
    pub classifier_bias: Param<Tensor<B, 1>>,
    pub dropout: Dropout,
    pub max_len: usize,
}

impl<B: Backend> TransformerTranslator<B> {
    fn device(&self) -> B::Device {
        self.embedding.weight.val().device()
    }

    /// Token + position embedding for a [B, T] id tensor.
    fn embed(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tokens.dims();
        assert!(
            seq_len <= self.max_len,
            "sequence length {seq_len} exceeds the position table ({})",
            self.max_len,
        );
        let positions = position_ids::<B>(batch_size, seq_len, &tokens.device());
        self.dropout.forward(self.embedding.forward(tokens) + self.positions.forward(positions))
    }

    /// h [B, T, D] → logits [B, T, V] through the shared table.
    fn classify(&self, hidden: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch_size, seq_len, d_model] = hidden.dims();
        let weight = self.embedding.weight.val();
        let [vocab_size, _] = weight.dims();

        let logits = hidden
            .reshape([batch_size * seq_len, d_model])
            .matmul(weight.transpose())
            + self.classifier_bias.val().unsqueeze::<2>();
        logits.reshape([batch_size, seq_len, vocab_size])
    }

    /// source: [B, Ts] → memory [B, Ts, D]
    pub fn encode(&self, source: Tensor<B, 2, Int>, pad_id: u32) -> Tensor<B, 3> {
        let mask = padding_mask(source.clone(), pad_id);
        let input = TransformerEncoderInput::new(self.embed(source)).mask_pad(mask);
        self.encoder.forward(input)
    }

    /// target: [B, Tt], memory: [B, Ts, D] → logits [B, Tt, V]
    pub fn decode(&self, target: Tensor<B, 2, Int>, memory: Tensor<B, 3>, pad_id: u32) -> Tensor<B, 3> {
        let [batch_size, target_len] = target.dims();
        let pad_mask = padding_mask(target.clone(), pad_id);
        let attn_mask = causal_mask::<B>(batch_size, target_len, &target.device());

        let input = TransformerDecoderInput::new(self.embed(target), memory)
            .target_mask_pad(pad_mask)
            .target_mask_attn(attn_mask);

        self.classify(self.decoder.forward(input))
    }

    /// The shared token table.
    pub fn shared_embedding_weight(&self) -> Tensor<B, 2> {
        self.embedding.weight.val()
    }

    /// The matrix the classifier projects with, as [V, D].
    pub fn output_projection_weight(&self) -> Tensor<B, 2> {
        self.embedding.weight.val()
    }
}

impl<B: Backend> Translator<B> for TransformerTranslator<B> {
    fn forward(
        &self,
        source: Tensor<B, 2, Int>,
        target: Tensor<B, 2, Int>,
        tokens: &SpecialTokens,
        _policy: &mut dyn TeacherForcing,
    ) -> TranslationOutput<B> {
        let [batch_size, target_len] = target.dims();

        let memory = self.encode(source, tokens.pad);
        let logits = self.decode(target.clone(), memory, tokens.pad);

        // Position t predicts token t + 1.
        let loss = (target_len > 1).then(|| {
            let [_, _, vocab_size] = logits.dims();
            padded_cross_entropy(
                logits.clone().slice([0..batch_size, 0..target_len - 1, 0..vocab_size]),
                target.slice([0..batch_size, 1..target_len]),
                tokens.pad,
            )
        });

        TranslationOutput { logits, loss }
    }

    fn align(
        &self,
        logits: Tensor<B, 3>,
        target: Tensor<B, 2, Int>,
    ) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
        let [batch_size, target_len, vocab_size] = logits.dims();
        let predictions = logits
            .slice([0..batch_size, 0..target_len - 1, 0..vocab_size])
            .argmax(2)
            .reshape([batch_size, target_len - 1]);
        (predictions, target.slice([0..batch_size, 1..target_len]))
    }

    fn greedy_decode(&self, source: &[u32], tokens: &SpecialTokens, max_steps: usize) -> Vec<u32> {
        let device = self.device();
        if source.len() > self.max_len {
            tracing::warn!(
                "Source of {} tokens truncated to max_len={}",
                source.len(), self.max_len,
            );
        }
        let source = &source[..source.len().min(self.max_len)];
        let ids: Vec<i32> = source.iter().map(|&x| x as i32).collect();
        let source = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &device).reshape([1, ids.len()]);

        let memory = self.encode(source, tokens.pad);

        // The prefix may never outgrow the position table.
        let budget = max_steps.min(self.max_len.saturating_sub(1));

        greedy_loop(tokens.sos, tokens.eos, budget, |prefix| {
            let ids: Vec<i32> = prefix.iter().map(|&x| x as i32).collect();
            let target = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &device).reshape([1, ids.len()]);

            let logits = self.decode(target, memory.clone(), tokens.pad);
            let [_, seq_len, vocab_size] = logits.dims();
            logits
                .slice([0..1, seq_len - 1..seq_len, 0..vocab_size])
                .argmax(2)
                .into_scalar()
                .elem::<i64>() as u32
        })
    }

    fn parameter_summary(&self) -> ParameterSummary {
        ParameterSummary::default()
            .push("shared_embedding", self.embedding.num_params())
            .push("positions", self.positions.num_params())
            .push("encoder", self.encoder.num_params())
            .push("decoder", self.decoder.num_params())
            .push("classifier_bias", self.classifier_bias.num_params())
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Transformer
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::generation::FixedPolicy;
    use burn::{
        backend::{Autodiff, NdArray},
        nn::attention::{MhaInput, MultiHeadAttentionConfig},
        optim::{AdamConfig, GradientsParams, Optimizer},
        tensor::Distribution,
    };

    type TB = NdArray;
    type AB = Autodiff<NdArray>;

    const VOCAB: usize = 16;

    fn config() -> TransformerTranslatorConfig {
        TransformerTranslatorConfig::new(VOCAB)
            .with_d_model(16)
            .with_d_ff(32)
            .with_num_heads(4)
            .with_num_layers(2)
            .with_dropout(0.0)
            .with_max_len(12)
    }

    fn small_model() -> TransformerTranslator<TB> {
        config().init(&Default::default())
    }

    fn ints<Bk: Backend>(rows: &[&[i32]]) -> Tensor<Bk, 2, Int> {
        let width = rows[0].len();
        let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::<Bk, 1, Int>::from_ints(flat.as_slice(), &Default::default())
            .reshape([rows.len(), width])
    }

    fn floats<Bk: Backend, const D: usize>(t: Tensor<Bk, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn max_diff(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
    }

    #[test]
    fn test_forward_shapes_and_loss() {
        let model = small_model();
        let out = model.forward(
            ints(&[&[5, 6, 7], &[8, 0, 0]]),
            ints(&[&[2, 9, 10, 3], &[2, 11, 3, 0]]),
            &SpecialTokens::default(),
            &mut FixedPolicy::ground_truth(),
        );
        assert_eq!(out.logits.dims(), [2, 4, VOCAB]);
        let loss: f32 = out.loss.unwrap().into_scalar().elem();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_single_token_target_has_no_loss() {
        let model = small_model();
        let out = model.forward(
            ints(&[&[5, 6]]),
            ints(&[&[2]]),
            &SpecialTokens::default(),
            &mut FixedPolicy::ground_truth(),
        );
        assert_eq!(out.logits.dims(), [1, 1, VOCAB]);
        assert!(out.loss.is_none());
    }

    #[test]
    fn test_all_padding_labels_give_zero_loss() {
        let model = small_model();
        let out = model.forward(
            ints(&[&[5, 6]]),
            ints(&[&[2, 0, 0]]),
            &SpecialTokens::default(),
            &mut FixedPolicy::ground_truth(),
        );
        let loss: f32 = out.loss.unwrap().into_scalar().elem();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_future_tokens_do_not_change_earlier_logits() {
        let model  = small_model();
        let memory = model.encode(ints(&[&[5, 6, 7]]), 0);

        let a = model.decode(ints(&[&[2, 9, 10, 11, 3]]), memory.clone(), 0);
        let b = model.decode(ints(&[&[2, 9, 14, 4, 12]]), memory, 0);

        // Positions 0 and 1 only see tokens 0..=1, which are equal.
        let early_a = floats(a.clone().slice([0..1, 0..2, 0..VOCAB]));
        let early_b = floats(b.clone().slice([0..1, 0..2, 0..VOCAB]));
        assert!(max_diff(&early_a, &early_b) < 1e-5);

        let late_a = floats(a.slice([0..1, 2..3, 0..VOCAB]));
        let late_b = floats(b.slice([0..1, 2..3, 0..VOCAB]));
        assert!(max_diff(&late_a, &late_b) > 1e-6);
    }

    #[test]
    fn test_trailing_source_padding_does_not_change_memory() {
        let model = small_model();
        let short = model.encode(ints(&[&[5, 6, 0]]), 0);
        let long  = model.encode(ints(&[&[5, 6, 0, 0, 0]]), 0);

        let short_real = floats(short.slice([0..1, 0..2, 0..16]));
        let long_real  = floats(long.slice([0..1, 0..2, 0..16]));
        assert!(max_diff(&short_real, &long_real) < 1e-5);
    }

    #[test]
    fn test_padding_mask_gives_zero_attention_weight() {
        let device = Default::default();
        let mha = MultiHeadAttentionConfig::new(8, 2).init::<TB>(&device);
        let x = Tensor::<TB, 3>::random([1, 4, 8], Distribution::Normal(0.0, 1.0), &device);
        let mask = padding_mask(ints::<TB>(&[&[5, 6, 0, 0]]), 0);

        let weights = mha.forward(MhaInput::self_attn(x).mask_pad(mask)).weights;
        assert_eq!(weights.dims(), [1, 2, 4, 4]);

        let values = floats(weights);
        for (i, w) in values.iter().enumerate() {
            let key = i % 4;
            if key >= 2 {
                assert!(w.abs() < 1e-6, "padded key {key} got weight {w}");
            }
        }
    }

    #[test]
    fn test_classifier_reads_the_embedding_table() {
        let model = small_model();
        let hidden = Tensor::<TB, 3>::random([1, 2, 16], Distribution::Normal(0.0, 1.0), &Default::default());

        let logits = model.classify(hidden.clone());
        let manual = hidden.reshape([2, 16]).matmul(model.shared_embedding_weight().transpose());

        assert!(max_diff(&floats(logits.reshape([2, VOCAB])), &floats(manual)) < 1e-5);
    }

    #[test]
    fn test_tied_weights_stay_identical_after_optimizer_step() {
        let device = Default::default();
        let mut model: TransformerTranslator<AB> = config().init(&device);
        let mut optim = AdamConfig::new().init();
        let tokens = SpecialTokens::default();

        // Token 13 never appears as an input, only the classifier touches its row.
        let unused_row = |m: &TransformerTranslator<AB>| floats(m.shared_embedding_weight().slice([13..14, 0..16]));
        let before = unused_row(&model);

        for _ in 0..2 {
            let out = model.forward(
                ints(&[&[5, 6, 7]]),
                ints(&[&[2, 9, 10, 3]]),
                &tokens,
                &mut FixedPolicy::ground_truth(),
            );
            let grads = out.loss.unwrap().backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(1e-2, model, grads);

            let embedding  = floats(model.shared_embedding_weight());
            let projection = floats(model.output_projection_weight());
            assert_eq!(embedding, projection);
        }

        let after = unused_row(&model);
        assert!(max_diff(&before, &after) > 0.0);
    }

    #[test]
    fn test_greedy_starts_with_sos_and_respects_budget() {
        let model  = small_model();
        let tokens = SpecialTokens::default();

        let seq = model.greedy_decode(&[5, 6, 7], &tokens, 4);
        assert_eq!(seq[0], tokens.sos);
        assert!(seq.len() <= 5);
        if seq.len() < 5 {
            assert_eq!(*seq.last().unwrap(), tokens.eos);
        }
    }

    #[test]
    fn test_greedy_never_outgrows_position_table() {
        let model = small_model();
        let seq = model.greedy_decode(&[5, 6, 7], &SpecialTokens::default(), 100);
        assert!(seq.len() <= 12);
    }

    #[test]
    fn test_greedy_truncates_overlong_source() {
        let model  = small_model();
        let tokens = SpecialTokens::default();
        let long: Vec<u32> = (0..20).map(|i| 4 + (i % 12) as u32).collect();

        let seq = model.greedy_decode(&long, &tokens, 6);
        assert_eq!(seq, model.greedy_decode(&long[..12], &tokens, 6));
        assert!(seq.len() <= 7);
    }

    #[test]
    fn test_greedy_matches_naive_full_prefix_argmax() {
        let model  = small_model();
        let tokens = SpecialTokens::default();
        let seq = model.greedy_decode(&[5, 6, 7], &tokens, 6);

        let memory = model.encode(ints(&[&[5, 6, 7]]), tokens.pad);
        for k in 1..seq.len() {
            let prefix: Vec<i32> = seq[..k].iter().map(|&x| x as i32).collect();
            let logits = model.decode(ints(&[prefix.as_slice()]), memory.clone(), tokens.pad);
            let next: i64 = logits
                .slice([0..1, k - 1..k, 0..VOCAB])
                .argmax(2)
                .into_scalar()
                .elem();
            assert_eq!(next as u32, seq[k]);
        }
    }

    #[test]
    fn test_parameter_summary_matches_module_count() {
        let model = small_model();
        assert_eq!(model.parameter_summary().total(), model.num_params());
        assert_eq!(model.kind(), ModelKind::Transformer);
    }
}
