//! Keyword tagging of negative feedback into pain-point and struggle
//! categories. Rules are ordered; the first match wins.

use crate::sentiment::{NEGATIVE_COMPOUND, SentimentScores};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PainPoint {
    #[serde(rename = "High Price")]
    HighPrice,
    #[serde(rename = "Delivery Issues")]
    DeliveryIssues,
    #[serde(rename = "Poor Quality")]
    PoorQuality,
    #[serde(rename = "Customer Support")]
    CustomerSupport,
    #[serde(rename = "General Dissatisfaction")]
    GeneralDissatisfaction,
}

impl PainPoint {
    pub fn label(&self) -> &'static str {
        match self {
            PainPoint::HighPrice => "High Price",
            PainPoint::DeliveryIssues => "Delivery Issues",
            PainPoint::PoorQuality => "Poor Quality",
            PainPoint::CustomerSupport => "Customer Support",
            PainPoint::GeneralDissatisfaction => "General Dissatisfaction",
        }
    }
}

impl fmt::Display for PainPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Struggle {
    #[serde(rename = "Difficulty Using Product")]
    UsageDifficulty,
    #[serde(rename = "Technical Issues")]
    TechnicalIssues,
    #[serde(rename = "Confusing Instructions")]
    ConfusingInstructions,
    #[serde(rename = "Performance Issues")]
    PerformanceIssues,
}

impl Struggle {
    pub fn label(&self) -> &'static str {
        match self {
            Struggle::UsageDifficulty => "Difficulty Using Product",
            Struggle::TechnicalIssues => "Technical Issues",
            Struggle::ConfusingInstructions => "Confusing Instructions",
            Struggle::PerformanceIssues => "Performance Issues",
        }
    }
}

impl fmt::Display for Struggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn pain_rules() -> &'static [(Regex, PainPoint)] {
    static RULES: OnceLock<Vec<(Regex, PainPoint)>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            vec![
                (
                    Regex::new(r"(?i)\b(price|cost|expensive)\b").expect("valid pattern"),
                    PainPoint::HighPrice,
                ),
                (
                    Regex::new(r"(?i)\b(delivery|shipping|late)\b").expect("valid pattern"),
                    PainPoint::DeliveryIssues,
                ),
                (
                    Regex::new(r"(?i)\b(quality|poor|bad)\b").expect("valid pattern"),
                    PainPoint::PoorQuality,
                ),
                (
                    Regex::new(r"(?i)\b(support|service|help)\b").expect("valid pattern"),
                    PainPoint::CustomerSupport,
                ),
            ]
        })
        .as_slice()
}

fn struggle_rules() -> &'static [(Regex, Struggle)] {
    static RULES: OnceLock<Vec<(Regex, Struggle)>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            vec![
                (
                    Regex::new(r"(?i)\b(difficult|hard|complicated)\b").expect("valid pattern"),
                    Struggle::UsageDifficulty,
                ),
                (
                    Regex::new(r"(?i)\b(problem|issue|error)\b").expect("valid pattern"),
                    Struggle::TechnicalIssues,
                ),
                (
                    Regex::new(r"(?i)\b(confusing|unclear|understand)\b").expect("valid pattern"),
                    Struggle::ConfusingInstructions,
                ),
                (
                    Regex::new(r"(?i)\b(slow|lag|freeze)\b").expect("valid pattern"),
                    Struggle::PerformanceIssues,
                ),
            ]
        })
        .as_slice()
}

/// Categorize a negatively-scored text. Texts whose compound sits above the
/// negative threshold never produce a pain point, whatever they mention;
/// negative texts that match no rule fall through to
/// [`PainPoint::GeneralDissatisfaction`].
pub fn pain_point(text: &str, sentiment: &SentimentScores) -> Option<PainPoint> {
    if sentiment.compound >= NEGATIVE_COMPOUND {
        return None;
    }
    for (re, tag) in pain_rules() {
        if re.is_match(text) {
            return Some(*tag);
        }
    }
    Some(PainPoint::GeneralDissatisfaction)
}

/// Categorize a usage struggle. Unlike pain points this is not gated on
/// sentiment; "how do I..." posts are often neutral in tone.
pub fn user_struggle(text: &str) -> Option<Struggle> {
    for (re, tag) in struggle_rules() {
        if re.is_match(text) {
            return Some(*tag);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(compound: f64) -> SentimentScores {
        SentimentScores {
            compound,
            ..SentimentScores::default()
        }
    }

    #[test]
    fn pain_points_require_negative_sentiment() {
        let text = "the price went up again";
        assert_eq!(pain_point(text, &scored(0.0)), None);
        assert_eq!(pain_point(text, &scored(-0.3)), Some(PainPoint::HighPrice));
    }

    #[test]
    fn first_matching_rule_wins() {
        let text = "the PRICE is bad";
        assert_eq!(pain_point(text, &scored(-0.5)), Some(PainPoint::HighPrice));
    }

    #[test]
    fn unmatched_negative_text_is_general_dissatisfaction() {
        assert_eq!(
            pain_point("just hate everything about it", &scored(-0.6)),
            Some(PainPoint::GeneralDissatisfaction)
        );
    }

    #[test]
    fn struggles_do_not_need_negative_sentiment() {
        assert_eq!(
            user_struggle("it was hard to set up but works now"),
            Some(Struggle::UsageDifficulty)
        );
        assert_eq!(user_struggle("loving the new update"), None);
    }

    #[test]
    fn keyword_matches_are_whole_words() {
        // "lately" must not trip the delivery rule
        assert_eq!(pain_point("lately it feels off", &scored(-0.2)), Some(PainPoint::GeneralDissatisfaction));
        // "slowly" must not trip the performance rule
        assert_eq!(user_struggle("rolling out slowly"), None);
    }

    #[test]
    fn labels_serialize_as_report_strings() {
        let json = serde_json::to_string(&PainPoint::DeliveryIssues).unwrap();
        assert_eq!(json, "\"Delivery Issues\"");
        let json = serde_json::to_string(&Struggle::PerformanceIssues).unwrap();
        assert_eq!(json, "\"Performance Issues\"");
    }
}
