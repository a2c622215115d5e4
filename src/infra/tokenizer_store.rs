// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// One word-level vocabulary covers both languages, so the
// transformer can share its embedding table and the recurrent
// model reuses the same ids on both sides.
//
// Layout of the vocabulary:
//   0  <pad>
//   1  <unk>
//   2  <s>
//   3  </s>
//   4… corpus words, most frequent first
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper, so the tokenizer JSON is written by hand
// and loaded back with Tokenizer::from_file.
//
// Saved as {checkpoint_dir}/tokenizer.json.

use anyhow::{anyhow, Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tokenizers::{
    pre_tokenizers::whitespace::Whitespace, OffsetReferential, OffsetType, PreTokenizedString,
    PreTokenizer, Tokenizer,
};

use crate::domain::sentence_pair::SpecialTokens;
use crate::domain::traits::TokenEncoder;

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const SOS_TOKEN: &str = "<s>";
pub const EOS_TOKEN: &str = "</s>";

const SPECIALS: [&str; 4] = [PAD_TOKEN, UNK_TOKEN, SOS_TOKEN, EOS_TOKEN];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Load existing tokenizer or build a new one from texts
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Vocabulary> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from disk");
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Vocabulary> {
        let path = self.path();
        let tokenizer = Tokenizer::from_file(&path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;
        Vocabulary::new(tokenizer)
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Vocabulary> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: Count words the way the saved pre-tokenizer splits them ───
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in pre_tokenize(text)? {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // Most frequent first, ties alphabetical so builds are reproducible.
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIALS.len()));

        // ── Step 2: Build vocab JSON ──────────────────────────────────────────
        let mut vocab = serde_json::Map::new();
        for (id, special) in SPECIALS.iter().enumerate() {
            vocab.insert(special.to_string(), serde_json::json!(id));
        }
        for (word, _) in words {
            if !vocab.contains_key(&word) {
                let id = vocab.len();
                vocab.insert(word, serde_json::json!(id));
            }
        }

        let added_tokens: Vec<serde_json::Value> = SPECIALS
            .iter()
            .enumerate()
            .map(|(id, content)| serde_json::json!({
                "id": id, "content": content,
                "single_word": false, "lstrip": false, "rstrip": false,
                "normalized": false, "special": true
            }))
            .collect();

        // ── Step 3: Write tokenizer JSON in HuggingFace format ────────────────
        let word_count = vocab.len();
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;

        tracing::info!("Tokenizer built with {} entries, saved to '{}'", word_count, path.display());
        self.load()
    }
}

/// Runs the same `Whitespace` pre-tokenizer the saved JSON declares,
/// so every counted word is a piece the loaded tokenizer will look up.
fn pre_tokenize(text: &str) -> Result<Vec<String>> {
    let mut pretokenized = PreTokenizedString::from(text);
    Whitespace::default()
        .pre_tokenize(&mut pretokenized)
        .map_err(|e| anyhow!("Pre-tokenization failed: {e}"))?;

    Ok(pretokenized
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(piece, _, _)| piece.to_string())
        .collect())
}

// ─── Vocabulary ───────────────────────────────────────────────────────────────
/// A loaded tokenizer plus the special ids every other layer needs.
pub struct Vocabulary {
    tokenizer: Tokenizer,
    special:   SpecialTokens,
}

impl Vocabulary {
    pub fn new(tokenizer: Tokenizer) -> Result<Self> {
        let lookup = |symbol: &str| {
            tokenizer
                .token_to_id(symbol)
                .ok_or_else(|| anyhow!("Tokenizer has no '{symbol}' token"))
        };
        let special = SpecialTokens::new(lookup(SOS_TOKEN)?, lookup(EOS_TOKEN)?, lookup(PAD_TOKEN)?);
        Ok(Self { tokenizer, special })
    }

    pub fn token_id(&self, symbol: &str) -> Option<u32> {
        self.tokenizer.token_to_id(symbol)
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(false)
    }

    pub fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    /// Ids back to text, dropping `<s>`, `</s>` and `<pad>`.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| anyhow!("Decoding failed: {e}"))
    }
}

impl TokenEncoder for Vocabulary {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self.tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenization failed: {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }
}
