//! Rule-based sentiment scoring in the VADER family: a valence lexicon,
//! modifier handling (negation, boosters, ALL-CAPS, punctuation emphasis,
//! "but" clauses) and a normalized compound score in [-1, 1].
//!
//! The lexicon is a compact embedded table focused on product and service
//! vocabulary rather than the full research lexicon. Scores run on raw text;
//! stopword stripping would eat the negators this scorer depends on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Compound at or below this is treated as negative downstream.
pub const NEGATIVE_COMPOUND: f64 = -0.05;
/// Compound at or above this is treated as positive downstream.
pub const POSITIVE_COMPOUND: f64 = 0.05;

const B_INCR: f64 = 0.293;
const B_DECR: f64 = -0.293;
const C_INCR: f64 = 0.733;
const N_SCALAR: f64 = -0.74;
const NORM_ALPHA: f64 = 15.0;

/// The four scores the scorer reports. `positive`, `negative` and `neutral`
/// are proportions summing to ~1.0; `compound` is the normalized overall
/// valence. Empty or symbol-only input scores all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub compound: f64,
}

// Valences on the VADER -4..4 scale, alphabetical.
const LEXICON: &[(&str, f64)] = &[
    ("amazing", 2.8),
    ("angry", -2.3),
    ("annoyed", -1.8),
    ("annoying", -1.9),
    ("atrocious", -2.8),
    ("avoid", -1.3),
    ("awesome", 3.1),
    ("awful", -2.0),
    ("bad", -2.5),
    ("best", 3.2),
    ("better", 1.9),
    ("breaks", -1.6),
    ("brilliant", 2.8),
    ("broke", -1.5),
    ("broken", -1.6),
    ("bug", -1.4),
    ("buggy", -1.8),
    ("bugs", -1.5),
    ("clean", 1.7),
    ("clear", 1.6),
    ("comfortable", 1.9),
    ("complicated", -1.1),
    ("confused", -1.4),
    ("confusing", -1.3),
    ("convenient", 1.7),
    ("crap", -2.4),
    ("crash", -1.9),
    ("crashed", -1.9),
    ("crashes", -1.9),
    ("decent", 1.3),
    ("defective", -2.0),
    ("delight", 2.9),
    ("delighted", 2.9),
    ("difficult", -1.5),
    ("disappointed", -2.0),
    ("disappointing", -2.2),
    ("disappointment", -2.3),
    ("disaster", -3.1),
    ("dreadful", -2.7),
    ("easy", 1.9),
    ("effective", 1.8),
    ("efficient", 1.9),
    ("enjoy", 2.2),
    ("enjoyed", 2.3),
    ("error", -1.6),
    ("errors", -1.7),
    ("excellent", 2.7),
    ("expensive", -1.1),
    ("fail", -2.3),
    ("failed", -2.3),
    ("fails", -2.2),
    ("failure", -2.4),
    ("fantastic", 2.6),
    ("fast", 1.3),
    ("faulty", -1.9),
    ("favorite", 2.0),
    ("fine", 0.8),
    ("flawless", 2.9),
    ("freeze", -1.0),
    ("freezes", -1.2),
    ("frozen", -1.1),
    ("frustrated", -2.1),
    ("frustrating", -2.2),
    ("frustration", -2.2),
    ("fun", 2.3),
    ("garbage", -2.2),
    ("glad", 2.0),
    ("glitch", -1.4),
    ("glitchy", -1.7),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("hate", -2.7),
    ("hated", -2.6),
    ("hates", -2.4),
    ("helpful", 1.8),
    ("horrible", -2.5),
    ("impressed", 2.2),
    ("impressive", 2.3),
    ("inferior", -1.7),
    ("intuitive", 1.7),
    ("issue", -1.1),
    ("issues", -1.2),
    ("junk", -1.8),
    ("lag", -1.2),
    ("laggy", -1.5),
    ("lags", -1.3),
    ("late", -1.0),
    ("like", 1.5),
    ("liked", 1.7),
    ("lost", -1.3),
    ("love", 3.2),
    ("loved", 2.9),
    ("loves", 2.7),
    ("mediocre", -0.9),
    ("meh", -0.7),
    ("mess", -1.5),
    ("missing", -1.2),
    ("nice", 1.8),
    ("nightmare", -2.7),
    ("ok", 0.9),
    ("okay", 0.9),
    ("overpriced", -1.9),
    ("pain", -1.9),
    ("painful", -2.0),
    ("pathetic", -2.4),
    ("perfect", 2.7),
    ("pleased", 2.1),
    ("poor", -2.1),
    ("problem", -1.7),
    ("problems", -1.8),
    ("recommend", 1.5),
    ("recommended", 1.6),
    ("refund", -0.8),
    ("regret", -1.9),
    ("reliable", 1.9),
    ("ridiculous", -1.6),
    ("sad", -2.1),
    ("satisfied", 1.9),
    ("scam", -2.6),
    ("slow", -1.1),
    ("smooth", 1.5),
    ("solid", 1.4),
    ("stable", 1.3),
    ("struggle", -1.9),
    ("struggled", -1.9),
    ("struggling", -2.0),
    ("stuck", -1.3),
    ("suck", -1.5),
    ("sucked", -1.6),
    ("sucks", -1.5),
    ("superb", 3.0),
    ("terrible", -2.1),
    ("trash", -2.0),
    ("trouble", -1.8),
    ("unhappy", -1.9),
    ("unreliable", -1.8),
    ("unstable", -1.5),
    ("unusable", -2.1),
    ("upset", -1.9),
    ("useful", 1.9),
    ("useless", -1.8),
    ("valuable", 2.1),
    ("waste", -1.8),
    ("wasted", -1.9),
    ("win", 2.8),
    ("wonderful", 2.7),
    ("works", 1.2),
    ("worse", -2.1),
    ("worst", -3.1),
    ("worth", 0.9),
    ("worthless", -2.3),
    ("worthwhile", 1.6),
    ("wrong", -1.4),
    ("wtf", -2.3),
];

const BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", B_INCR),
    ("completely", B_INCR),
    ("considerably", B_INCR),
    ("deeply", B_INCR),
    ("enormously", B_INCR),
    ("entirely", B_INCR),
    ("especially", B_INCR),
    ("exceptionally", B_INCR),
    ("extremely", B_INCR),
    ("fully", B_INCR),
    ("greatly", B_INCR),
    ("highly", B_INCR),
    ("hugely", B_INCR),
    ("incredibly", B_INCR),
    ("particularly", B_INCR),
    ("purely", B_INCR),
    ("quite", B_INCR),
    ("really", B_INCR),
    ("remarkably", B_INCR),
    ("so", B_INCR),
    ("substantially", B_INCR),
    ("thoroughly", B_INCR),
    ("totally", B_INCR),
    ("tremendously", B_INCR),
    ("truly", B_INCR),
    ("unbelievably", B_INCR),
    ("utterly", B_INCR),
    ("very", B_INCR),
    ("almost", B_DECR),
    ("barely", B_DECR),
    ("hardly", B_DECR),
    ("kinda", B_DECR),
    ("marginally", B_DECR),
    ("occasionally", B_DECR),
    ("partly", B_DECR),
    ("scarcely", B_DECR),
    ("slightly", B_DECR),
    ("somewhat", B_DECR),
];

const NEGATIONS: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "despite", "didnt", "doesnt", "dont",
    "hadnt", "hasnt", "havent", "isnt", "mightnt", "mustnt", "neither", "never", "no", "none",
    "nope", "nor", "not", "nothing", "nowhere", "rarely", "seldom", "shouldnt", "wasnt", "werent",
    "without", "wont", "wouldnt",
];

fn lexicon_valence(word: &str) -> Option<f64> {
    static MAP: OnceLock<HashMap<&'static str, f64>> = OnceLock::new();
    MAP.get_or_init(|| LEXICON.iter().copied().collect())
        .get(word)
        .copied()
}

fn booster_scalar(word: &str) -> Option<f64> {
    static MAP: OnceLock<HashMap<&'static str, f64>> = OnceLock::new();
    MAP.get_or_init(|| BOOSTERS.iter().copied().collect())
        .get(word)
        .copied()
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word)
}

struct Token {
    /// Lowercased, alphanumerics only. Lookup key for all word tables.
    key: String,
    /// The raw token was fully uppercase (emphasis, when the text is mixed).
    is_caps: bool,
}

fn word_tokens(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .filter_map(|raw| {
            let key: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if key.is_empty() {
                return None;
            }
            Some(Token {
                is_caps: is_all_caps(raw),
                key,
            })
        })
        .collect()
}

fn is_all_caps(raw: &str) -> bool {
    let mut has_alpha = false;
    for c in raw.chars() {
        if c.is_alphabetic() {
            has_alpha = true;
            if !c.is_uppercase() {
                return false;
            }
        }
    }
    has_alpha
}

/// Score a text.
///
/// ```
/// use magpie_analysis::sentiment::analyze_sentiment;
///
/// assert!(analyze_sentiment("I love this, works great").compound > 0.05);
/// assert!(analyze_sentiment("not good at all").compound < 0.0);
/// assert_eq!(analyze_sentiment("").compound, 0.0);
/// ```
pub fn analyze_sentiment(text: &str) -> SentimentScores {
    let tokens = word_tokens(text);
    if tokens.is_empty() {
        return SentimentScores::default();
    }

    let caps_count = tokens.iter().filter(|t| t.is_caps).count();
    let mixed_caps = caps_count > 0 && caps_count < tokens.len();
    let but_idx = tokens.iter().position(|t| t.key == "but");

    let mut sentiments: Vec<f64> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        // Boosters carry no valence of their own.
        if booster_scalar(&token.key).is_some() {
            sentiments.push(0.0);
            continue;
        }
        let Some(mut valence) = lexicon_valence(&token.key) else {
            sentiments.push(0.0);
            continue;
        };

        if mixed_caps && token.is_caps {
            valence += if valence > 0.0 { C_INCR } else { -C_INCR };
        }

        // Look back up to three words for boosters and negators, damped
        // with distance.
        for dist in 0..3usize {
            if i <= dist {
                break;
            }
            let prev = &tokens[i - dist - 1];
            if lexicon_valence(&prev.key).is_some() {
                continue;
            }
            if let Some(scalar) = booster_scalar(&prev.key) {
                let mut scalar = if valence < 0.0 { -scalar } else { scalar };
                if mixed_caps && prev.is_caps {
                    scalar += if scalar > 0.0 { C_INCR } else { -C_INCR };
                }
                let damp = match dist {
                    1 => 0.95,
                    2 => 0.9,
                    _ => 1.0,
                };
                valence += scalar * damp;
            }
            if is_negation(&prev.key) {
                valence *= N_SCALAR;
            }
        }

        // "least awful" flips, "at least" does not.
        if i >= 1 && tokens[i - 1].key == "least" && !(i >= 2 && tokens[i - 2].key == "at") {
            valence *= N_SCALAR;
        }

        sentiments.push(valence);
    }

    // The clause after "but" dominates the one before it.
    if let Some(b) = but_idx {
        for (i, s) in sentiments.iter_mut().enumerate() {
            if i < b {
                *s *= 0.5;
            } else if i > b {
                *s *= 1.5;
            }
        }
    }

    score_valences(&sentiments, text)
}

fn score_valences(sentiments: &[f64], text: &str) -> SentimentScores {
    let punct = punctuation_emphasis(text);

    let mut sum: f64 = sentiments.iter().sum();
    if sum > 0.0 {
        sum += punct;
    } else if sum < 0.0 {
        sum -= punct;
    }
    let compound = normalize(sum);

    let mut pos = 0.0f64;
    let mut neg = 0.0f64;
    let mut neu = 0u32;
    for &s in sentiments {
        if s > 0.0 {
            pos += s + 1.0;
        } else if s < 0.0 {
            neg += s - 1.0;
        } else {
            neu += 1;
        }
    }
    if pos > neg.abs() {
        pos += punct;
    } else if pos < neg.abs() {
        neg -= punct;
    }

    let total = pos + neg.abs() + f64::from(neu);
    if total <= 0.0 {
        return SentimentScores::default();
    }
    SentimentScores {
        positive: round_to(pos / total, 3),
        negative: round_to(neg.abs() / total, 3),
        neutral: round_to(f64::from(neu) / total, 3),
        compound: round_to(compound, 4),
    }
}

fn normalize(score: f64) -> f64 {
    let norm = score / (score * score + NORM_ALPHA).sqrt();
    norm.clamp(-1.0, 1.0)
}

// Exclamation marks amplify (capped at four); repeated question marks too.
fn punctuation_emphasis(text: &str) -> f64 {
    let ep = text.matches('!').count().min(4) as f64 * 0.292;
    let qm = text.matches('?').count();
    let qm_amp = match qm {
        0 | 1 => 0.0,
        2 | 3 => qm as f64 * 0.18,
        _ => 0.96,
    };
    ep + qm_amp
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_symbol_only_text_scores_zero() {
        assert_eq!(analyze_sentiment(""), SentimentScores::default());
        assert_eq!(analyze_sentiment("!!! ???"), SentimentScores::default());
    }

    #[test]
    fn polarity_matches_the_lexicon() {
        assert!(analyze_sentiment("this product is terrible").compound < NEGATIVE_COMPOUND);
        assert!(analyze_sentiment("this product is excellent").compound > POSITIVE_COMPOUND);
    }

    #[test]
    fn negation_flips_polarity() {
        let plain = analyze_sentiment("the app is good").compound;
        let negated = analyze_sentiment("the app is not good").compound;
        assert!(plain > 0.0);
        assert!(negated < 0.0);
    }

    #[test]
    fn boosters_amplify_valence() {
        let plain = analyze_sentiment("the battery is bad").compound;
        let boosted = analyze_sentiment("the battery is very bad").compound;
        assert!(boosted < plain);
    }

    #[test]
    fn exclamations_add_emphasis() {
        let plain = analyze_sentiment("this is great").compound;
        let shouted = analyze_sentiment("this is great!!!").compound;
        assert!(shouted > plain);
    }

    #[test]
    fn caps_add_emphasis_in_mixed_case_text() {
        let plain = analyze_sentiment("terrible customer service").compound;
        let shouted = analyze_sentiment("TERRIBLE customer service").compound;
        assert!(shouted < plain);
    }

    #[test]
    fn clause_after_but_dominates() {
        assert!(analyze_sentiment("great product but awful support").compound < 0.0);
        assert!(analyze_sentiment("awful support but great product").compound > 0.0);
    }

    #[test]
    fn proportions_sum_to_one() {
        let scores = analyze_sentiment("good camera, bad battery, average screen");
        let total = scores.positive + scores.negative + scores.neutral;
        assert!((total - 1.0).abs() < 0.01);
    }
}
