// Batch-fit TF-IDF vectorization.
//
// Every clustering run rebuilds its vocabulary from the current batch —
// nothing is persisted between runs. Terms are lowercase unigrams and
// adjacent-word bigrams after URL stripping and English stop-word removal;
// the vocabulary is capped to the most frequent terms across the batch.
// Rows are L2-normalized so cosine similarity downstream behaves.

use std::collections::{HashMap, HashSet};

use regex_lite::Regex;
use stop_words::{get, LANGUAGE};
use thiserror::Error;

/// The batch could not be embedded — typically a degenerate vocabulary
/// (all texts empty or nothing but stop words). The orchestrator recovers
/// from this locally; it is never propagated to the caller.
#[derive(Debug, Clone, Error)]
#[error("vectorization failed: {reason}")]
pub struct VectorizationError {
    pub reason: String,
}

pub struct BatchVectorizer {
    max_features: usize,
    stop_words: HashSet<String>,
    url_pattern: Regex,
}

impl BatchVectorizer {
    pub fn new(max_features: usize) -> Self {
        let stop_words: HashSet<String> = get(LANGUAGE::English).into_iter().collect();
        Self {
            max_features,
            stop_words,
            // Tweets and Reddit selftext routinely embed links; their
            // tokens would pollute the vocabulary. Stripping happens
            // before lowercasing, hence the (?i).
            url_pattern: Regex::new(r"(?i)https?://\S+").unwrap(),
        }
    }

    /// Fit a vocabulary on the batch and produce one feature vector per
    /// text, all sharing dimensionality min(max_features, vocabulary size).
    pub fn fit_transform(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, VectorizationError> {
        if texts.is_empty() {
            return Err(VectorizationError {
                reason: "empty batch".to_string(),
            });
        }

        let docs: Vec<Vec<String>> = texts.iter().map(|t| self.terms(t)).collect();

        // Corpus-wide term counts pick the vocabulary; document frequency
        // feeds the idf weighting.
        let mut corpus_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_frequency: HashMap<String, usize> = HashMap::new();
        for doc in &docs {
            for term in doc {
                *corpus_counts.entry(term.clone()).or_insert(0) += 1;
            }
            let unique: HashSet<&String> = doc.iter().collect();
            for term in unique {
                *doc_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        if corpus_counts.is_empty() {
            return Err(VectorizationError {
                reason: format!(
                    "no terms survive tokenization across {} texts",
                    texts.len()
                ),
            });
        }

        // Most frequent terms first; ties broken alphabetically so the
        // vocabulary (and everything downstream) is deterministic.
        let mut ranked: Vec<(&String, usize)> =
            corpus_counts.iter().map(|(t, c)| (t, *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let vocabulary: Vec<String> = ranked
            .into_iter()
            .take(self.max_features)
            .map(|(t, _)| t.clone())
            .collect();

        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        // Smoothed idf, as if every term occurred in one extra document.
        let n = texts.len() as f64;
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|t| {
                let df = doc_frequency.get(t).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vectors = docs
            .iter()
            .map(|doc| {
                let mut row = vec![0.0; vocabulary.len()];
                for term in doc {
                    if let Some(&j) = index.get(term.as_str()) {
                        row[j] += 1.0;
                    }
                }
                for (j, value) in row.iter_mut().enumerate() {
                    *value *= idf[j];
                }
                // A text whose terms all fell outside the capped
                // vocabulary stays a zero row; leave it unnormalized.
                let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for value in row.iter_mut() {
                        *value /= norm;
                    }
                }
                row
            })
            .collect();

        Ok(vectors)
    }

    /// Unigrams plus adjacent bigrams from the cleaned, stop-filtered text.
    fn terms(&self, text: &str) -> Vec<String> {
        let cleaned = self.url_pattern.replace_all(text, " ").to_lowercase();

        let tokens: Vec<String> = cleaned
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= 2)
            .filter(|t| !self.stop_words.contains(*t))
            .map(|t| t.to_string())
            .collect();

        let mut terms = tokens.clone();
        for pair in tokens.windows(2) {
            terms.push(format!("{} {}", pair[0], pair[1]));
        }
        terms
    }
}
