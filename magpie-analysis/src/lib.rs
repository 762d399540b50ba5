//! Text analysis for collected research artifacts.
//!
//! Collected posts flow through three passes: sentiment scoring
//! ([`sentiment`]), rule-based tagging of pain points and user struggles
//! ([`tags`]), and corpus aggregation ([`stats`]). [`analyze_text`] bundles
//! the per-post passes in the order the tag rules expect.

use serde::{Deserialize, Serialize};

pub mod sentiment;
pub mod stats;
pub mod tags;
pub mod text;

pub use sentiment::{SentimentScores, analyze_sentiment};
pub use stats::{ResearchStats, TermWeight, compile_stats, top_terms};
pub use tags::{PainPoint, Struggle};

/// Per-post analysis bundle, persisted alongside the post itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAnalysis {
    pub sentiment: SentimentScores,
    pub pain_point: Option<PainPoint>,
    pub struggle: Option<Struggle>,
}

/// A post joined with its analysis, the unit stats compile from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedPost {
    pub post: magpie_social::PostArtifact,
    pub analysis: PostAnalysis,
}

/// Run the full per-text pipeline: score sentiment, then tag, with pain
/// points gated on that score.
///
/// ```
/// use magpie_analysis::analyze_text;
///
/// let report = analyze_text("Way too expensive and the quality is bad.");
/// assert!(report.sentiment.compound < -0.05);
/// assert_eq!(report.pain_point.map(|p| p.label()), Some("High Price"));
/// ```
pub fn analyze_text(text: &str) -> PostAnalysis {
    let sentiment = analyze_sentiment(text);
    let pain_point = tags::pain_point(text, &sentiment);
    let struggle = tags::user_struggle(text);
    PostAnalysis {
        sentiment,
        pain_point,
        struggle,
    }
}
