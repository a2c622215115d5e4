// ============================================================
// Layer 6 — Translation Scoring (BLEU / accuracy)
// ============================================================
// Scores predicted id rows against reference id rows.
//
// Per row:
//   1. keep only the positions where the reference is not the
//      ignore id (applied to BOTH rows, position by position)
//   2. sentence BLEU over 1..4-grams with uniform weights
//   3. "accuracy" = the same BLEU with weights [1, 0, 0, 0]
// Both are averaged over rows.
//
// Sentence BLEU:
//   p_n  = clipped n-gram matches / candidate n-grams
//   smoothing: for n ≥ 2, p_n = (matches + 1) / (total + 1);
//              unigram precision is never smoothed
//   no unigram match at all → score 0
//   BP   = 1                 if c > r
//          0                 if c = 0
//          exp(1 − r / c)    otherwise
//   BLEU = BP · exp(Σ w_n · ln p_n)
//
// Reference: Papineni et al. (2002) BLEU
//            Lin & Och (2004) ORANGE, smoothing method 2

use std::collections::HashMap;

const MAX_ORDER: usize = 4;

/// Averaged scores for a batch of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TranslationScores {
    pub accuracy: f64,
    pub bleu:     f64,
}

/// Score every `(reference, candidate)` row pair.
///
/// Rows are aligned position by position; positions where the
/// reference equals `ignore_id` are removed from both.
pub fn compute_metrics(references: &[Vec<u32>], candidates: &[Vec<u32>], ignore_id: u32) -> TranslationScores {
    assert_eq!(references.len(), candidates.len(), "row count mismatch");
    if references.is_empty() {
        return TranslationScores::default();
    }

    let mut total = TranslationScores::default();
    for (reference, candidate) in references.iter().zip(candidates) {
        let (reference, candidate): (Vec<u32>, Vec<u32>) = reference
            .iter()
            .zip(candidate)
            .filter(|(r, _)| **r != ignore_id)
            .map(|(r, c)| (*r, *c))
            .unzip();

        total.bleu     += sentence_bleu(&[reference.as_slice()], &candidate, &[0.25; MAX_ORDER]);
        total.accuracy += sentence_bleu(&[reference.as_slice()], &candidate, &[1.0, 0.0, 0.0, 0.0]);
    }

    let n = references.len() as f64;
    TranslationScores { accuracy: total.accuracy / n, bleu: total.bleu / n }
}

/// Smoothed sentence BLEU of `candidate` against one or more references.
pub fn sentence_bleu(references: &[&[u32]], candidate: &[u32], weights: &[f64; MAX_ORDER]) -> f64 {
    let precisions: Vec<(usize, usize)> = (1..=MAX_ORDER)
        .map(|n| modified_precision(references, candidate, n))
        .collect();

    if precisions[0].0 == 0 {
        return 0.0;
    }

    let log_sum: f64 = precisions
        .iter()
        .zip(weights)
        .enumerate()
        .map(|(i, (&(matches, total), &w))| {
            let p = if i == 0 {
                matches as f64 / total as f64
            } else {
                (matches + 1) as f64 / (total + 1) as f64
            };
            w * p.ln()
        })
        .sum();

    brevity_penalty(references, candidate.len()) * log_sum.exp()
}

/// Clipped n-gram matches and the candidate n-gram count (at least 1).
fn modified_precision(references: &[&[u32]], candidate: &[u32], n: usize) -> (usize, usize) {
    let counts = ngram_counts(candidate, n);

    let mut max_ref: HashMap<&[u32], usize> = HashMap::new();
    for reference in references {
        for (gram, count) in ngram_counts(reference, n) {
            let entry = max_ref.entry(gram).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    let matches = counts
        .iter()
        .map(|(gram, &count)| count.min(max_ref.get(gram).copied().unwrap_or(0)))
        .sum();
    let total = counts.values().sum::<usize>().max(1);

    (matches, total)
}

fn ngram_counts(tokens: &[u32], n: usize) -> HashMap<&[u32], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

fn brevity_penalty(references: &[&[u32]], hyp_len: usize) -> f64 {
    // Closest reference length, shorter one on ties.
    let ref_len = references
        .iter()
        .map(|r| r.len())
        .min_by_key(|&len| (len.abs_diff(hyp_len), len))
        .unwrap_or(0);

    if hyp_len > ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    }
}
