//! TF-IDF lexical index over the training corpus queries.
//!
//! Tokens are runs of two or more word characters, English stop words are
//! dropped, and terms are weighted with smoothed IDF
//! (`ln((1 + n) / (1 + df)) + 1`) over raw counts. Every row is
//! L2-normalised, so cosine similarity reduces to a sparse dot product.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::ArtifactError;
use crate::stop_words;

const TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// Sparse L2-normalised vector: `(term id, weight)` sorted by term id.
pub type SparseVector = Vec<(u32, f32)>;

/// Fitted vocabulary, IDF weights, and one vector per indexed document.
///
/// Row `i` always corresponds to the `i`-th document passed to [`fit`](Self::fit).
pub struct LexicalIndex {
    vocabulary: HashMap<String, u32>,
    idf: Vec<f64>,
    rows: Vec<SparseVector>,
    token_pattern: Regex,
    stop_words: HashSet<&'static str>,
}

impl std::fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalIndex")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("rows", &self.rows.len())
            .finish()
    }
}

impl LexicalIndex {
    /// Fit the vocabulary and IDF weights, then index every document.
    ///
    /// Fails when no document contributes a single term.
    pub fn fit<'a, I>(documents: I) -> Result<Self, ArtifactError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let token_pattern =
            Regex::new(TOKEN_PATTERN).map_err(|e| ArtifactError::Lexical(e.to_string()))?;
        let stop_words: HashSet<&'static str> = stop_words::ENGLISH.iter().copied().collect();

        let tokenized: Vec<Vec<String>> = documents
            .into_iter()
            .map(|doc| analyze(&token_pattern, &stop_words, doc))
            .collect();

        let mut vocabulary: HashMap<String, u32> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for token in unique {
                let next = vocabulary.len() as u32;
                let id = *vocabulary.entry(token.to_string()).or_insert(next);
                if id as usize == document_frequency.len() {
                    document_frequency.push(0);
                }
                document_frequency[id as usize] += 1;
            }
        }

        if vocabulary.is_empty() {
            return Err(ArtifactError::Lexical(
                "empty vocabulary; documents contain only stop words".into(),
            ));
        }

        let n = tokenized.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let mut index = Self {
            vocabulary,
            idf,
            rows: Vec::with_capacity(tokenized.len()),
            token_pattern,
            stop_words,
        };
        index.rows = tokenized.iter().map(|t| index.weigh(t)).collect();
        Ok(index)
    }

    /// Project text into the fitted space. Unknown terms are ignored; text
    /// with no known terms yields an empty vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let tokens = analyze(&self.token_pattern, &self.stop_words, text);
        self.weigh(&tokens)
    }

    /// Cosine similarity of `text` against every row, in row order.
    pub fn similarities(&self, text: &str) -> Vec<f32> {
        let query = self.transform(text);
        self.rows.iter().map(|row| sparse_dot(&query, row)).collect()
    }

    /// Row with the highest similarity; ties go to the lowest row index.
    ///
    /// Returns `None` only for an index with no rows.
    pub fn best_match(&self, text: &str) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (row, sim) in self.similarities(text).into_iter().enumerate() {
            match best {
                Some((_, best_sim)) if sim <= best_sim => {}
                _ => best = Some((row, sim)),
            }
        }
        best
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<u32, f64> = HashMap::new();
        for token in tokens {
            if let Some(&id) = self.vocabulary.get(token) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }

        let mut weighted: Vec<(u32, f64)> = counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.idf[id as usize]))
            .collect();
        weighted.sort_unstable_by_key(|&(id, _)| id);

        let norm: f64 = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Vec::new();
        }
        weighted
            .into_iter()
            .map(|(id, w)| (id, (w / norm) as f32))
            .collect()
    }
}

fn analyze(pattern: &Regex, stop_words: &HashSet<&'static str>, text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    pattern
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !stop_words.contains(t))
        .map(str::to_string)
        .collect()
}

/// Dot product of two sparse vectors sorted by term id.
fn sparse_dot(a: &[(u32, f32)], b: &[(u32, f32)]) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0f32;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}
