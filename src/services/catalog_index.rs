use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::models::{CatalogItem, ItemId};

/// English stop words dropped from tag fields before weighting
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "almost", "also", "am", "among",
    "an", "and", "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "doing",
    "down", "during", "each", "either", "else", "ever", "every", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "however", "if", "in", "into", "is", "it", "its", "itself", "just",
    "least", "less", "many", "may", "me", "might", "more", "most", "much", "must", "my",
    "myself", "neither", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or",
    "other", "our", "ours", "ourselves", "out", "over", "own", "per", "rather", "same", "she",
    "should", "since", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "though", "through", "thus",
    "to", "too", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "were", "what",
    "when", "where", "whether", "which", "while", "who", "whom", "whose", "why", "will", "with",
    "within", "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Splits a tag field into lowercase terms
///
/// Tokens break on any non-alphanumeric character; single-character tokens and stop words
/// are dropped, so `"Sci-Fi|(no genres listed)"` yields `["sci", "fi", "genres", "listed"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .collect()
}

/// Dense N×N cosine similarity matrix, row-major
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// Gram matrix of L2-normalized sparse vectors
    ///
    /// The diagonal is pinned to exactly 1.0 and off-diagonal entries are mirrored, so the
    /// result is symmetric regardless of floating-point summation order.
    fn gram(vectors: &[Vec<(usize, f64)>]) -> Self {
        let size = vectors.len();
        let mut values = vec![0.0; size * size];

        for i in 0..size {
            values[i * size + i] = 1.0;
            for j in (i + 1)..size {
                let similarity = sparse_dot(&vectors[i], &vectors[j]).clamp(0.0, 1.0);
                values[i * size + j] = similarity;
                values[j * size + i] = similarity;
            }
        }

        Self { size, values }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.size && col < self.size).then(|| self.values[row * self.size + col])
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        (row < self.size).then(|| &self.values[row * self.size..(row + 1) * self.size])
    }
}

/// Dot product of two term-sorted sparse vectors
fn sparse_dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j, mut sum) = (0, 0, 0.0);
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

/// Content index over the catalog: TF-IDF tag vectors and their pairwise similarities
///
/// Immutable once built. A catalog reload builds a fresh index; the old one is dropped when
/// its last reader releases it.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    items: Vec<CatalogItem>,
    rows: HashMap<ItemId, usize>,
    vocabulary_size: usize,
    matrix: SimilarityMatrix,
    built_at: DateTime<Utc>,
}

impl CatalogIndex {
    /// Builds the index; catalog order defines matrix rows
    pub fn build(items: &[CatalogItem]) -> Self {
        let started = Instant::now();

        let mut rows = HashMap::with_capacity(items.len());
        for (row, item) in items.iter().enumerate() {
            // First occurrence of a duplicated id keeps the lookup
            rows.entry(item.id).or_insert(row);
        }

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let term_counts: Vec<HashMap<usize, f64>> = items
            .iter()
            .map(|item| {
                let mut counts = HashMap::new();
                for token in tokenize(&item.tags) {
                    let next_id = vocabulary.len();
                    let term = *vocabulary.entry(token).or_insert(next_id);
                    *counts.entry(term).or_insert(0.0) += 1.0;
                }
                counts
            })
            .collect();

        let mut document_frequency = vec![0usize; vocabulary.len()];
        for counts in &term_counts {
            for &term in counts.keys() {
                document_frequency[term] += 1;
            }
        }

        // Smoothed idf: ln((1 + n) / (1 + df)) + 1
        let n = items.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let vectors: Vec<Vec<(usize, f64)>> = term_counts
            .into_iter()
            .map(|counts| {
                let mut weights: Vec<(usize, f64)> = counts
                    .into_iter()
                    .map(|(term, tf)| (term, tf * idf[term]))
                    .collect();
                weights.sort_unstable_by_key(|&(term, _)| term);

                let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, weight) in &mut weights {
                        *weight /= norm;
                    }
                }
                weights
            })
            .collect();

        let matrix = SimilarityMatrix::gram(&vectors);

        tracing::info!(
            items = items.len(),
            distinct_ids = rows.len(),
            vocabulary = vocabulary.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built catalog similarity index"
        );

        Self {
            items: items.to_vec(),
            rows,
            vocabulary_size: vocabulary.len(),
            matrix,
            built_at: Utc::now(),
        }
    }

    /// Matrix row for an id, `None` when the id is not indexed
    pub fn row_index_of(&self, item_id: ItemId) -> Option<usize> {
        self.rows.get(&item_id).copied()
    }

    pub fn item_at(&self, row: usize) -> Option<&CatalogItem> {
        self.items.get(row)
    }

    /// Cosine similarity between two indexed ids
    pub fn similarity(&self, a: ItemId, b: ItemId) -> Option<f64> {
        self.matrix.get(self.row_index_of(a)?, self.row_index_of(b)?)
    }

    pub fn matrix(&self) -> &SimilarityMatrix {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}
