// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
//   lr
//   max ┤    ╭──╮
//       │   ╱    ╲_
//       │  ╱       ╲_
//   min ┤ ╱           ╲______________
//       └──┴─────────────┴──────────▶ step
//        warmup        max_steps
//
//   step <  warmup      : max_lr · (step + 1) / warmup
//   step >  max_steps   : min_lr
//   otherwise           : min + ½(1 + cos(π·r))·(max − min)
//                         r = (step − warmup) / (max_steps − warmup)

use anyhow::{ensure, Result};
use std::f64::consts::PI;

use crate::domain::traits::LrSchedule;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosineScheduler {
    max_steps:    usize,
    warmup_steps: usize,
    max_lr:       f64,
    min_lr:       f64,
}

impl CosineScheduler {
    pub fn new(max_steps: usize, warmup_steps: usize, max_lr: f64, min_lr: f64) -> Result<Self> {
        ensure!(warmup_steps >= 1, "warmup_steps must be at least 1");
        ensure!(
            max_steps > warmup_steps,
            "max_steps ({max_steps}) must be greater than warmup_steps ({warmup_steps})"
        );
        ensure!(min_lr <= max_lr, "min_lr ({min_lr}) must not exceed max_lr ({max_lr})");
        Ok(Self { max_steps, warmup_steps, max_lr, min_lr })
    }
}

impl LrSchedule for CosineScheduler {
    fn get_lr(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.max_lr * (step + 1) as f64 / self.warmup_steps as f64;
        }
        if step > self.max_steps {
            return self.min_lr;
        }

        let decay_ratio = (step - self.warmup_steps) as f64 / (self.max_steps - self.warmup_steps) as f64;
        assert!((0.0..=1.0).contains(&decay_ratio), "decay ratio {decay_ratio} out of range");

        let coeff = 0.5 * (1.0 + (PI * decay_ratio).cos());
        self.min_lr + coeff * (self.max_lr - self.min_lr)
    }
}
