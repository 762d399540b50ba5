//! Corpus-level aggregation: term weighting and run statistics.

use crate::{AnalyzedPost, text};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::sentiment::{NEGATIVE_COMPOUND, POSITIVE_COMPOUND};

/// Terms reported when the caller does not ask for a specific count.
pub const DEFAULT_TERM_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct TermWeight {
    pub term: String,
    pub weight: f64,
}

/// Rank distinctive terms across a corpus by summed tf-idf.
///
/// Tokens come pre-cleaned and stopword-filtered from [`text::tokenize`].
/// Weights use the smoothed idf `ln((1 + n) / (1 + df)) + 1`, so a term in
/// every document still counts but rare recurring terms rank higher. Ties
/// break alphabetically to keep reports stable.
pub fn top_terms<S: AsRef<str>>(texts: &[S], limit: usize) -> Vec<TermWeight> {
    let docs: Vec<Vec<String>> = texts.iter().map(|t| text::tokenize(t.as_ref())).collect();
    if docs.iter().all(|d| d.is_empty()) {
        return Vec::new();
    }

    let mut tf: HashMap<&str, f64> = HashMap::new();
    let mut df: HashMap<&str, usize> = HashMap::new();
    for doc in &docs {
        let mut seen: HashSet<&str> = HashSet::new();
        for token in doc {
            *tf.entry(token.as_str()).or_insert(0.0) += 1.0;
            if seen.insert(token.as_str()) {
                *df.entry(token.as_str()).or_insert(0) += 1;
            }
        }
    }

    let n = docs.len() as f64;
    let mut ranked: Vec<TermWeight> = tf
        .into_iter()
        .map(|(term, freq)| {
            let d = df.get(term).copied().unwrap_or(0) as f64;
            let idf = ((1.0 + n) / (1.0 + d)).ln() + 1.0;
            TermWeight {
                term: term.to_string(),
                weight: freq * idf,
            }
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then_with(|| a.term.cmp(&b.term))
    });
    ranked.truncate(limit);
    ranked
}

/// How compounds distribute across the standard polarity bands.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SentimentBreakdown {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub mean_compound: f64,
}

/// Everything the `stats` command and run summaries report.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchStats {
    pub total_posts: u64,
    pub by_platform: BTreeMap<String, u64>,
    pub by_keyword: BTreeMap<String, u64>,
    /// Post counts per UTC calendar day (`YYYY-MM-DD`). Posts without a
    /// timestamp are counted in the totals but not here.
    pub by_day: BTreeMap<String, u64>,
    pub sentiment: SentimentBreakdown,
    pub pain_points: BTreeMap<String, u64>,
    pub struggles: BTreeMap<String, u64>,
    pub top_terms: Vec<TermWeight>,
}

pub fn compile_stats(posts: &[AnalyzedPost], term_limit: usize) -> ResearchStats {
    let mut by_platform: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_keyword: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_day: BTreeMap<String, u64> = BTreeMap::new();
    let mut pain_points: BTreeMap<String, u64> = BTreeMap::new();
    let mut struggles: BTreeMap<String, u64> = BTreeMap::new();
    let mut sentiment = SentimentBreakdown::default();
    let mut compound_sum = 0.0f64;

    for entry in posts {
        *by_platform
            .entry(entry.post.platform.as_str().to_string())
            .or_insert(0) += 1;
        *by_keyword.entry(entry.post.keyword.clone()).or_insert(0) += 1;
        if let Some(created) = entry.post.created_at {
            *by_day.entry(created.date().to_string()).or_insert(0) += 1;
        }

        let compound = entry.analysis.sentiment.compound;
        compound_sum += compound;
        if compound >= POSITIVE_COMPOUND {
            sentiment.positive += 1;
        } else if compound <= NEGATIVE_COMPOUND {
            sentiment.negative += 1;
        } else {
            sentiment.neutral += 1;
        }

        if let Some(pain) = entry.analysis.pain_point {
            *pain_points.entry(pain.label().to_string()).or_insert(0) += 1;
        }
        if let Some(struggle) = entry.analysis.struggle {
            *struggles.entry(struggle.label().to_string()).or_insert(0) += 1;
        }
    }

    if !posts.is_empty() {
        sentiment.mean_compound = round4(compound_sum / posts.len() as f64);
    }

    let texts: Vec<&str> = posts.iter().map(|e| e.post.text.as_str()).collect();
    let top_terms = top_terms(&texts, term_limit);

    tracing::debug!(
        target: "analysis.stats",
        posts = posts.len(),
        platforms = by_platform.len(),
        keywords = by_keyword.len(),
        "stats.compiled"
    );

    ResearchStats {
        total_posts: posts.len() as u64,
        by_platform,
        by_keyword,
        by_day,
        sentiment,
        pain_points,
        struggles,
        top_terms,
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
