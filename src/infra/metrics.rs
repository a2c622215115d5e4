// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Every scalar the trainer reports becomes one CSV row:
//
//   step,metric,value
//   0,train_loss,7.412300
//   0,lr,0.000030
//   200,valid_loss,5.981000
//   200,valid_bleu,0.041200
//   ...
//   1000,test_accuracy,0.284100
//
// A long format keeps the file valid no matter which metrics a
// run emits (train every step, validation every N steps, test
// once). Plot it with any spreadsheet or dataframe tool.
//
// Output file: {checkpoint_dir}/{run_name}_metrics.csv
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::traits::MetricsSink;

/// Appends `(step, metric, value)` rows to a CSV file.
pub struct CsvMetricsSink {
    csv_path: PathBuf,
}

impl CsvMetricsSink {
    /// Writes the header only when the file is new, so several runs
    /// can share one file.
    pub fn new(dir: impl AsRef<Path>, run_name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics dir '{}'", dir.display()))?;

        let csv_path = dir.join(format!("{run_name}_metrics.csv"));
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,metric,value")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

impl MetricsSink for CsvMetricsSink {
    fn record(&mut self, step: usize, name: &str, value: f64) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{step},{name},{value:.6}")?;
        Ok(())
    }
}
