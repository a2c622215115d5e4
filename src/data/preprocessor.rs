// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Cleans one corpus line before tokenisation.
//
// Parallel corpora scraped from subtitles or web pages carry
// non-breaking spaces, zero-width characters, stray tabs and
// byte order marks. Left alone, the word-level tokenizer would
// treat "chat\u{00A0}" and "chat" as different words.
//
// Cleaning steps (applied in order):
//   1. Map Unicode whitespace variants and control chars to ' '
//   2. Collapse runs of spaces into one
//   3. Trim both ends
//   4. Optionally lowercase
//
// A sentence is a single line, so unlike document cleaning
// there are no paragraph breaks to preserve.
//
// Reference: Rust Book §8 (Strings in Rust)

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    lowercase: bool,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { lowercase: false }
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    /// Clean a raw sentence for downstream tokenisation.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true; // swallows leading spaces

        for c in text.chars() {
            let c = match c {
                '\t' | '\r' | '\n' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        let trimmed = out.trim_end();
        if self.lowercase {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("le   chat \t dort"), "le chat dort");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello world  "), "hello world");
    }

    #[test]
    fn test_removes_invisible_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("\u{FEFF}hello\u{200B}world\x01"), "hello world");
    }

    #[test]
    fn test_lowercase_is_opt_in() {
        assert_eq!(Preprocessor::new().clean("Bonjour"), "Bonjour");
        assert_eq!(Preprocessor::new().with_lowercase(true).clean("Bonjour"), "bonjour");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(Preprocessor::new().clean(""), "");
    }
}
