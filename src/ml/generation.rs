// ============================================================
// Layer 5 — Generation Policies
// ============================================================
// Two pieces of control flow shared by the model families:
//
// 1. Teacher forcing (recurrent training).
//    At every unrolled step the decoder is fed EITHER the
//    ground-truth token OR its own previous argmax. Which one is
//    a policy object, so tests can pin it down:
//
//      RatioPolicy(p)       ground truth with probability p,
//                           one independent draw per step
//      FixedPolicy::ground_truth()    always ground truth
//      FixedPolicy::own_predictions() always own argmax
//
// 2. The greedy loop (inference, both families).
//
//      seq = [<s>]
//      repeat up to max_steps:
//          next = argmax(model(seq))
//          seq.push(next)
//          stop if next == </s>
//
//    The model is passed in as a closure that returns the next
//    token given the sequence so far. The recurrent model's
//    closure carries its hidden state between calls; the
//    transformer's re-reads the whole prefix.

use burn::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

// ─── Teacher forcing ──────────────────────────────────────────────────────────

/// Decides, per decoding step, whether the next decoder input is the
/// ground-truth token.
pub trait TeacherForcing {
    fn use_ground_truth(&mut self, step: usize) -> bool;
}

/// Feed ground truth with probability `ratio`, independently at every step.
///
/// Ratios of 1.0 and 0.0 never touch the RNG.
#[derive(Debug, Clone)]
pub struct RatioPolicy {
    ratio: f64,
    rng:   StdRng,
}

impl RatioPolicy {
    pub fn new(ratio: f64, seed: u64) -> Self {
        Self { ratio, rng: StdRng::seed_from_u64(seed) }
    }
}

impl TeacherForcing for RatioPolicy {
    fn use_ground_truth(&mut self, _step: usize) -> bool {
        if self.ratio >= 1.0 {
            true
        } else if self.ratio <= 0.0 {
            false
        } else {
            self.ratio > self.rng.gen::<f64>()
        }
    }
}

/// Always makes the same choice.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy {
    ground_truth: bool,
}

impl FixedPolicy {
    pub fn ground_truth() -> Self { Self { ground_truth: true } }

    pub fn own_predictions() -> Self { Self { ground_truth: false } }
}

impl TeacherForcing for FixedPolicy {
    fn use_ground_truth(&mut self, _step: usize) -> bool {
        self.ground_truth
    }
}

/// Pick the decoder input for `step`: `ground_truth` or `prediction`, both [B, 1].
pub fn choose_input<B: Backend>(
    policy:       &mut dyn TeacherForcing,
    step:         usize,
    ground_truth: Tensor<B, 2, Int>,
    prediction:   Tensor<B, 2, Int>,
) -> Tensor<B, 2, Int> {
    if policy.use_ground_truth(step) { ground_truth } else { prediction }
}

// ─── Greedy loop ──────────────────────────────────────────────────────────────

/// Run greedy generation from `[sos]`.
///
/// `next_token` receives the sequence generated so far and returns the
/// argmax token for the next position. The loop stops after `eos` is
/// appended or after `max_steps` calls; the returned sequence always
/// starts with `sos`.
pub fn greedy_loop<F>(sos: u32, eos: u32, max_steps: usize, mut next_token: F) -> Vec<u32>
where
    F: FnMut(&[u32]) -> u32,
{
    let mut sequence = vec![sos];
    for step in 0..max_steps {
        let token = next_token(&sequence);
        sequence.push(token);
        if token == eos {
            tracing::trace!("Greedy decode hit </s> at step {}", step);
            break;
        }
    }
    sequence
}
