//! Fuzzy query engine over [`SearchDocument`]s.
//!
//! The engine keeps its documents in memory and scores every document
//! against the query on each search. It is cheap to rebuild and is owned
//! by [`SearchIndex`](crate::index::SearchIndex), which keeps it in step
//! with the persisted index.
//!
//! # Scoring Algorithm
//!
//! 1. Lower-case the query; the whole query is one pattern.
//! 2. For each field (`title`, `content`, each tag, `source_type`), find
//!    the substring with the fewest edits to the pattern (Sellers'
//!    approximate string matching).
//! 3. Field score: `errors / pattern_len + |start - location| / distance`
//!    (the proximity term is dropped when `ignore_location` is set).
//!    A field matches when its score is `<= threshold`.
//! 4. Document score: product over matched fields of
//!    `max(score, ε) ^ (weight × norm)`, where weights are normalized to
//!    sum to 1 and `norm = 1 / √(tokens in the field)`.
//! 5. Documents with no matched field are dropped. Sort ascending (0 is a
//!    perfect match); ties keep insertion order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::SearchDocument;

/// Relative importance of each searchable field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldWeights {
    pub title: f64,
    pub content: f64,
    pub tags: f64,
    pub source_type: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            title: 0.5,
            content: 0.3,
            tags: 0.1,
            source_type: 0.1,
        }
    }
}

impl FieldWeights {
    fn normalized(self) -> Self {
        let total = self.title + self.content + self.tags + self.source_type;
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            title: self.title / total,
            content: self.content / total,
            tags: self.tags / total,
            source_type: self.source_type / total,
        }
    }
}

/// Matching tolerances, decoupled from application config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Highest field score that still counts as a match (0 = exact only).
    pub threshold: f64,
    /// Characters of offset from `location` that cost a full score point.
    pub distance: usize,
    /// Expected match position within a field.
    pub location: usize,
    /// Score matches on edits alone, wherever they occur.
    pub ignore_location: bool,
    pub weights: FieldWeights,
    /// Maximum results to return.
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            distance: 100,
            location: 0,
            ignore_location: false,
            weights: FieldWeights::default(),
            limit: None,
        }
    }
}

/// A matched document with its composite score (lower is better).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: SearchDocument,
    pub score: f64,
}

/// In-memory fuzzy-match structure answering ranked queries.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    docs: Vec<SearchDocument>,
    options: SearchOptions,
    weights: FieldWeights,
}

impl QueryEngine {
    pub fn new(docs: Vec<SearchDocument>, options: SearchOptions) -> Self {
        let weights = options.weights.normalized();
        Self {
            docs,
            options,
            weights,
        }
    }

    /// Add a document, replacing any existing document with the same id
    /// in place.
    pub fn upsert(&mut self, doc: SearchDocument) {
        match self.docs.iter_mut().find(|existing| existing.id == doc.id) {
            Some(existing) => *existing = doc,
            None => self.docs.push(doc),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn documents(&self) -> &[SearchDocument] {
        &self.docs
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Matching documents, most relevant first.
    pub fn search(&self, query: &str) -> Vec<SearchDocument> {
        self.search_scored(query)
            .into_iter()
            .map(|hit| hit.document)
            .collect()
    }

    /// Like [`search`](QueryEngine::search), keeping the scores.
    pub fn search_scored(&self, query: &str) -> Vec<ScoredDocument> {
        let pattern: Vec<char> = query.trim().to_lowercase().chars().collect();
        if pattern.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(usize, f64)> = self
            .docs
            .iter()
            .enumerate()
            .filter_map(|(i, doc)| self.score_document(&pattern, doc).map(|s| (i, s)))
            .collect();

        // Stable sort: equal scores keep index order.
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        if let Some(limit) = self.options.limit {
            hits.truncate(limit);
        }

        hits.into_iter()
            .map(|(i, score)| ScoredDocument {
                document: self.docs[i].clone(),
                score,
            })
            .collect()
    }

    fn score_document(&self, pattern: &[char], doc: &SearchDocument) -> Option<f64> {
        let best_tag = doc
            .tags
            .iter()
            .filter_map(|tag| match_field(pattern, tag, &self.options))
            .min_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));

        let fields = [
            (self.weights.title, match_field(pattern, &doc.title, &self.options)),
            (self.weights.content, match_field(pattern, &doc.content, &self.options)),
            (self.weights.tags, best_tag),
            (
                self.weights.source_type,
                match_field(pattern, doc.source_type.label(), &self.options),
            ),
        ];

        let mut total = 1.0;
        let mut matched = false;
        for (weight, field) in fields {
            if let Some(m) = field {
                matched = true;
                total *= m.score.max(f64::EPSILON).powf(weight * m.norm);
            }
        }
        matched.then_some(total)
    }
}

struct FieldMatch {
    score: f64,
    norm: f64,
}

fn match_field(pattern: &[char], text: &str, options: &SearchOptions) -> Option<FieldMatch> {
    fuzzy_score(pattern, text, options).map(|score| FieldMatch {
        score,
        norm: field_norm(text),
    })
}

/// Shorter fields weigh more: `1 / √tokens`.
fn field_norm(text: &str) -> f64 {
    let tokens = text.split_whitespace().count().max(1);
    1.0 / (tokens as f64).sqrt()
}

/// Best score of `pattern` (already lower-cased) against any substring of
/// `text`, or `None` when nothing scores within the threshold.
pub fn fuzzy_score(pattern: &[char], text: &str, options: &SearchOptions) -> Option<f64> {
    let m = pattern.len();
    if m == 0 {
        return None;
    }

    // column[i]: fewest edits turning pattern[..i] into some substring
    // ending at the current text position.
    let mut column: Vec<usize> = (0..=m).collect();
    let mut best: Option<f64> = None;

    for (j, tc) in text.to_lowercase().chars().enumerate() {
        let mut diag = column[0];
        for i in 1..=m {
            let above = column[i];
            let cost = usize::from(pattern[i - 1] != tc);
            column[i] = (diag + cost).min(above + 1).min(column[i - 1] + 1);
            diag = above;
        }

        let start = (j + 1).saturating_sub(m);
        let score = position_score(column[m], m, start, options);
        if best.map_or(true, |b| score < b) {
            best = Some(score);
        }

        // Later starts only move farther from `location`.
        if start > options.location && position_score(0, m, start, options) > options.threshold {
            break;
        }
    }

    best.filter(|score| *score <= options.threshold)
}

fn position_score(errors: usize, pattern_len: usize, start: usize, options: &SearchOptions) -> f64 {
    let accuracy = errors as f64 / pattern_len as f64;
    if options.ignore_location {
        return accuracy;
    }
    let proximity = start.abs_diff(options.location);
    if options.distance == 0 {
        return if proximity == 0 { accuracy } else { 1.0 };
    }
    accuracy + proximity as f64 / options.distance as f64
}
