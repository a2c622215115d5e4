// ============================================================
// Layer 5 — Recurrent Encoder/Decoder with Attention
// ============================================================
// Data flow for one batch:
//
//   source [B, Ts]
//     │ embedding + dropout
//     ▼
//   bidirectional GRU × L ──▶ outputs [B, Ts, 2H]
//     │                         │
//     │ last fwd ⊕ last bwd     │ output_map (2H → F → H)
//     ▼                         ▼
//   hidden_map (2H → F → H)   context [B, Ts, H]
//     │
//     ▼
//   initial_state [B, H] ── repeated for every decoder layer
//
//   decoder step (one token):
//     embed(prev) ⊕ Σ attn(context, top state)·context
//       → GRU × L → output [B, 1, H] → classifier → logits
//
// The encoder's two directions are two independent GRUs; the
// backward one reads the time-reversed sequence and its outputs
// are flipped back into source order.
//
// Reference: Bahdanau et al. (2015)
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::sentence_pair::SpecialTokens;
use crate::ml::{
    attention::{BahdanauAttention, BahdanauAttentionConfig},
    generation::{choose_input, greedy_loop, TeacherForcing},
    masking::padded_cross_entropy,
    model::{ModelKind, ParameterSummary, TranslationOutput, Translator},
};

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct RecurrentTranslatorConfig {
    pub source_vocab_size: usize,
    pub target_vocab_size: usize,
    #[config(default = 256)]
    pub d_embed: usize,
    /// Hidden width of every GRU direction and of the decoder
    #[config(default = 512)]
    pub d_model: usize,
    /// Inner width of the state/context projection maps
    #[config(default = 1024)]
    pub d_ff: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl RecurrentTranslatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentTranslator<B> {
        assert!(self.num_layers >= 1, "num_layers must be at least 1");

        let encoder = RecurrentEncoder {
            embedding: EmbeddingConfig::new(self.source_vocab_size, self.d_embed).init(device),
            forward_layers:  self.gru_stack(self.d_embed, 2 * self.d_model, device),
            backward_layers: self.gru_stack(self.d_embed, 2 * self.d_model, device),
            hidden_map: self.projection(device),
            output_map: self.projection(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
        };

        let decoder = RecurrentDecoder {
            embedding: EmbeddingConfig::new(self.target_vocab_size, self.d_embed).init(device),
            attention: BahdanauAttentionConfig::new(self.d_model).init(device),
            layers:    self.gru_stack(self.d_embed + self.d_model, self.d_model, device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        };

        RecurrentTranslator {
            encoder,
            decoder,
            classifier: LinearConfig::new(self.d_model, self.target_vocab_size).init(device),
            num_layers: self.num_layers,
        }
    }

    /// First layer reads `d_first`, deeper layers read `d_rest`.
    fn gru_stack<B: Backend>(&self, d_first: usize, d_rest: usize, device: &B::Device) -> Vec<Gru<B>> {
        (0..self.num_layers)
            .map(|i| {
                let d_input = if i == 0 { d_first } else { d_rest };
                GruConfig::new(d_input, self.d_model, true).init(device)
            })
            .collect()
    }

    fn projection<B: Backend>(&self, device: &B::Device) -> FeedForwardMap<B> {
        FeedForwardMap {
            fc1:     LinearConfig::new(2 * self.d_model, self.d_ff).init(device),
            fc2:     LinearConfig::new(self.d_ff, self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Projection block ─────────────────────────────────────────────────────────
/// linear → ReLU → linear → dropout
#[derive(Module, Debug)]
pub struct FeedForwardMap<B: Backend> {
    pub fc1:     Linear<B>,
    pub fc2:     Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> FeedForwardMap<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.dropout.forward(self.fc2.forward(relu(self.fc1.forward(x))))
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RecurrentEncoder<B: Backend> {
    pub embedding:       Embedding<B>,
    pub forward_layers:  Vec<Gru<B>>,
    pub backward_layers: Vec<Gru<B>>,
    pub hidden_map:      FeedForwardMap<B>,
    pub output_map:      FeedForwardMap<B>,
    pub dropout:         Dropout,
}

impl<B: Backend> RecurrentEncoder<B> {
    /// source: [B, Ts] → (context [B, Ts, H], initial_state [B, H])
    pub fn forward(&self, source: Tensor<B, 2, Int>) -> (Tensor<B, 3>, Tensor<B, 2>) {
        let [batch_size, seq_len] = source.dims();

        let mut x = self.dropout.forward(self.embedding.forward(source));
        for (i, (fwd, bwd)) in self.forward_layers.iter().zip(&self.backward_layers).enumerate() {
            // Inter-layer dropout; the embedding dropout covers layer 0.
            if i > 0 {
                x = self.dropout.forward(x);
            }
            let out_fwd = fwd.forward(x.clone(), None);
            let out_bwd = bwd.forward(x.flip([1]), None).flip([1]);
            x = Tensor::cat(vec![out_fwd, out_bwd], 2);
        }

        let [_, _, d_both] = x.dims();
        let d_hidden = d_both / 2;

        // Forward direction finishes at the last position, backward at the first.
        let last_forward = x.clone()
            .slice([0..batch_size, seq_len - 1..seq_len, 0..d_hidden])
            .reshape([batch_size, d_hidden]);
        let last_backward = x.clone()
            .slice([0..batch_size, 0..1, d_hidden..d_both])
            .reshape([batch_size, d_hidden]);

        let initial_state = self.hidden_map.forward(Tensor::cat(vec![last_forward, last_backward], 1));
        let context = self.output_map.forward(x);

        (context, initial_state)
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────
/// One [B, H] hidden state per decoder layer, bottom layer first.
#[derive(Debug, Clone)]
pub struct DecoderState<B: Backend> {
    pub layers: Vec<Tensor<B, 2>>,
}

impl<B: Backend> DecoderState<B> {
    /// Every layer starts from the same projected encoder state.
    pub fn repeat(initial: Tensor<B, 2>, num_layers: usize) -> Self {
        Self { layers: vec![initial; num_layers] }
    }

    pub fn top(&self) -> Tensor<B, 2> {
        self.layers[self.layers.len() - 1].clone()
    }
}

#[derive(Debug, Clone)]
pub struct DecoderStep<B: Backend> {
    /// Top-layer output: [B, 1, H]
    pub output: Tensor<B, 3>,
    pub state: DecoderState<B>,
    /// Attention over source positions: [B, Ts]
    pub attention: Tensor<B, 2>,
}

#[derive(Module, Debug)]
pub struct RecurrentDecoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub attention: BahdanauAttention<B>,
    pub layers:    Vec<Gru<B>>,
    pub dropout:   Dropout,
}

impl<B: Backend> RecurrentDecoder<B> {
    /// prev_token: [B, 1], context: [B, Ts, H]
    pub fn step(
        &self,
        prev_token: Tensor<B, 2, Int>,
        context:    Tensor<B, 3>,
        state:      &DecoderState<B>,
    ) -> DecoderStep<B> {
        let embedded = self.embedding.forward(prev_token);

        let weights  = self.attention.forward(context.clone(), state.top());
        let attended = weights.clone().unsqueeze_dim::<3>(1).matmul(context);

        let mut x = Tensor::cat(vec![embedded, attended], 2);
        let mut layers = Vec::with_capacity(self.layers.len());
        for (i, (gru, hidden)) in self.layers.iter().zip(&state.layers).enumerate() {
            if i > 0 {
                x = self.dropout.forward(x);
            }
            x = gru.forward(x, Some(hidden.clone()));
            let [batch_size, _, d_hidden] = x.dims();
            layers.push(x.clone().reshape([batch_size, d_hidden]));
        }

        DecoderStep {
            output: x,
            state: DecoderState { layers },
            attention: weights,
        }
    }
}

// ─── Full model ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RecurrentTranslator<B: Backend> {
    pub encoder:    RecurrentEncoder<B>,
    pub decoder:    RecurrentDecoder<B>,
    pub classifier: Linear<B>,
    pub num_layers: usize,
}

/// Greedy output plus the attention row of every generated token.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendedDecode {
    pub tokens: Vec<u32>,
    /// attention[i] is the distribution used to produce tokens[i + 1]
    pub attention: Vec<Vec<f32>>,
}

impl<B: Backend> RecurrentTranslator<B> {
    fn device(&self) -> B::Device {
        self.classifier.weight.val().device()
    }

    /// Greedy decode that also keeps the attention distributions.
    pub fn greedy_decode_with_attention(
        &self,
        source:    &[u32],
        tokens:    &SpecialTokens,
        max_steps: usize,
    ) -> AttendedDecode {
        let device = self.device();
        let ids: Vec<i32> = source.iter().map(|&x| x as i32).collect();
        let source = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &device)
            .reshape([1, ids.len()]);

        let (context, initial) = self.encoder.forward(source);
        let mut state = DecoderState::repeat(initial, self.num_layers);
        let mut attention = Vec::new();

        let generated = greedy_loop(tokens.sos, tokens.eos, max_steps, |prefix| {
            let last = prefix[prefix.len() - 1] as i32;
            let input = Tensor::<B, 1, Int>::from_ints([last], &device).reshape([1, 1]);

            let step = self.decoder.step(input, context.clone(), &state);
            attention.push(step.attention.into_data().iter::<f32>().collect());
            state = step.state;

            let logits = self.classifier.forward(step.output);
            logits.argmax(2).into_scalar().elem::<i64>() as u32
        });

        AttendedDecode { tokens: generated, attention }
    }
}

impl<B: Backend> Translator<B> for RecurrentTranslator<B> {
    fn forward(
        &self,
        source: Tensor<B, 2, Int>,
        target: Tensor<B, 2, Int>,
        tokens: &SpecialTokens,
        policy: &mut dyn TeacherForcing,
    ) -> TranslationOutput<B> {
        let [batch_size, target_len] = target.dims();
        let vocab_size = self.classifier.weight.val().dims()[1];
        let device = target.device();

        let (context, initial) = self.encoder.forward(source);
        let mut state = DecoderState::repeat(initial, self.num_layers);

        // Position 0 is <s>; nothing predicts it.
        let mut outputs = vec![Tensor::<B, 3>::zeros([batch_size, 1, vocab_size], &device)];
        let mut step_token = target.clone().slice([0..batch_size, 0..1]);

        for step in 1..target_len {
            let out = self.decoder.step(step_token, context.clone(), &state);
            state = out.state;

            let logits = self.classifier.forward(out.output);
            let top1 = logits.clone().argmax(2).reshape([batch_size, 1]);
            let truth = target.clone().slice([0..batch_size, step..step + 1]);
            step_token = choose_input(policy, step, truth, top1);

            outputs.push(logits);
        }

        let logits = Tensor::cat(outputs, 1);
        let loss = (target_len > 1).then(|| {
            padded_cross_entropy(
                logits.clone().slice([0..batch_size, 1..target_len, 0..vocab_size]),
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
            .slice([0..batch_size, 1..target_len, 0..vocab_size])
            .argmax(2)
            .reshape([batch_size, target_len - 1]);
        (predictions, target.slice([0..batch_size, 1..target_len]))
    }

    fn greedy_decode(&self, source: &[u32], tokens: &SpecialTokens, max_steps: usize) -> Vec<u32> {
        self.greedy_decode_with_attention(source, tokens, max_steps).tokens
    }

    fn parameter_summary(&self) -> ParameterSummary {
        ParameterSummary::default()
            .push("encoder", self.encoder.num_params())
            .push("decoder", self.decoder.num_params())
            .push("classifier", self.classifier.num_params())
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Seq2seq
    }
}
