// ============================================================
// Layer 4 — Parallel Text Loader
// ============================================================
// Reads a parallel corpus stored as two plain UTF-8 files:
//
//   corpus/train.en   line i = source sentence i
//   corpus/train.fr   line i = its translation
//
// Lines are paired by position. A corpus whose two files have
// a different number of lines is rejected outright: pairing by
// index would silently shift every later example.
//
// Pairs where either side is blank after cleaning are dropped.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (Reading a File)

use anyhow::{ensure, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::data::preprocessor::Preprocessor;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;

/// Loads aligned sentence pairs from two line-aligned files.
pub struct ParallelTextLoader {
    source_path: PathBuf,
    target_path: PathBuf,
    preprocessor: Preprocessor,
}

impl ParallelTextLoader {
    pub fn new(source_path: impl AsRef<Path>, target_path: impl AsRef<Path>) -> Self {
        Self {
            source_path: source_path.as_ref().to_path_buf(),
            target_path: target_path.as_ref().to_path_buf(),
            preprocessor: Preprocessor::new(),
        }
    }

    /// Lowercase both sides while cleaning.
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.preprocessor = Preprocessor::new().with_lowercase(lowercase);
        self
    }
}

impl CorpusSource for ParallelTextLoader {
    fn load_all(&self) -> Result<Vec<SentencePair>> {
        let sources = read_lines(&self.source_path)?;
        let targets = read_lines(&self.target_path)?;

        ensure!(
            sources.len() == targets.len(),
            "Lengths mismatched: '{}' has {} sentences, but '{}' has {} sentences",
            self.source_path.display(),
            sources.len(),
            self.target_path.display(),
            targets.len(),
        );

        let total = sources.len();
        let pairs: Vec<SentencePair> = sources
            .iter()
            .zip(targets.iter())
            .map(|(s, t)| {
                SentencePair::new(self.preprocessor.clean(s), self.preprocessor.clean(t))
            })
            .filter(|pair| !pair.is_blank())
            .collect();

        if pairs.len() < total {
            tracing::warn!("Dropped {} blank sentence pairs", total - pairs.len());
        }
        tracing::info!(
            "Loaded {} sentence pairs from '{}' / '{}'",
            pairs.len(),
            self.source_path.display(),
            self.target_path.display(),
        );

        Ok(pairs)
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_pairs_lines_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(dir.path(), "a.en", "the cat\na dog\n");
        let trg = write_file(dir.path(), "a.fr", "le chat\nun chien\n");

        let pairs = ParallelTextLoader::new(&src, &trg).load_all().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], SentencePair::new("a dog", "un chien"));
    }

    #[test]
    fn test_mismatched_line_counts_fail() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(dir.path(), "a.en", "one\ntwo\nthree\n");
        let trg = write_file(dir.path(), "a.fr", "un\ndeux\n");

        let err = ParallelTextLoader::new(&src, &trg).load_all().unwrap_err();
        assert!(err.to_string().contains("Lengths mismatched"));
    }

    #[test]
    fn test_blank_pairs_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(dir.path(), "a.en", "hello\n   \nbye\n");
        let trg = write_file(dir.path(), "a.fr", "bonjour\nrien\nsalut\n");

        let pairs = ParallelTextLoader::new(&src, &trg).load_all().unwrap();
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ParallelTextLoader::new("/nope/a.en", "/nope/a.fr")
            .load_all()
            .unwrap_err();
        assert!(err.to_string().contains("/nope/a.en"));
    }
}
