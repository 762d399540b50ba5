//! Text normalization shared by the sentiment, tagging and stats passes.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

// English stopwords, stored in post-clean form (apostrophes already
// stripped, so "don't" and "dont" both resolve here).
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "aint", "all", "am", "an", "and",
    "any", "are", "aren", "arent", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "couldn", "couldnt", "d", "did", "didn", "didnt", "do",
    "does", "doesn", "doesnt", "doing", "don", "dont", "down", "during", "each", "few", "for",
    "from", "further", "had", "hadn", "hadnt", "has", "hasn", "hasnt", "have", "haven", "havent",
    "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "i", "if",
    "in", "into", "is", "isn", "isnt", "it", "its", "itself", "just", "ll", "m", "ma", "me",
    "mightn", "mightnt", "more", "most", "mustn", "mustnt", "my", "myself", "needn", "neednt",
    "no", "nor", "not", "now", "o", "of", "off", "on", "once", "only", "or", "other", "our",
    "ours", "ourselves", "out", "over", "own", "re", "s", "same", "shan", "shant", "she", "shes",
    "should", "shouldn", "shouldnt", "shouldve", "so", "some", "such", "t", "than", "that",
    "thatll", "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
    "this", "those", "through", "to", "too", "under", "until", "up", "ve", "very", "was", "wasn",
    "wasnt", "we", "were", "weren", "werent", "what", "when", "where", "which", "while", "who",
    "whom", "why", "will", "with", "won", "wont", "wouldn", "wouldnt", "y", "you", "youd",
    "youll", "your", "youre", "yours", "yourself", "yourselves", "youve",
];

fn stopword_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

pub fn is_stopword(word: &str) -> bool {
    stopword_set().contains(word)
}

/// Strip URLs, @-mentions, hash signs and punctuation, lowercase, and
/// collapse runs of whitespace.
///
/// ```
/// use magpie_analysis::text::clean_text;
///
/// let cleaned = clean_text("Check https://example.com @alice  #WiFi: it's SLOW");
/// assert_eq!(cleaned, "check wifi its slow");
/// ```
pub fn clean_text(text: &str) -> String {
    static RE_URL: OnceLock<Regex> = OnceLock::new();
    static RE_MENTION: OnceLock<Regex> = OnceLock::new();
    static RE_PUNCT: OnceLock<Regex> = OnceLock::new();

    let re_url = RE_URL.get_or_init(|| Regex::new(r"(?:https?://|www\.)\S+").expect("valid pattern"));
    let re_mention = RE_MENTION.get_or_init(|| Regex::new(r"@\w+|#").expect("valid pattern"));
    let re_punct = RE_PUNCT.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid pattern"));

    let text = re_url.replace_all(text, "");
    let text = re_mention.replace_all(&text, "");
    let text = re_punct.replace_all(&text, "");
    let lowered = text.to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean, split, and drop stopwords. The unit every frequency count uses.
pub fn tokenize(text: &str) -> Vec<String> {
    clean_text(text)
        .split_whitespace()
        .filter(|word| !is_stopword(word))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_urls_mentions_and_punctuation() {
        let cleaned = clean_text("Loved it!! https://t.co/abc123 via @bob, 10/10 #win");
        assert_eq!(cleaned, "loved it via 1010 win");
    }

    #[test]
    fn tokenize_drops_stopwords() {
        let tokens = tokenize("The delivery was very late and I am not happy");
        assert_eq!(tokens, vec!["delivery", "late", "happy"]);
    }

    #[test]
    fn contractions_match_their_cleaned_stopword_forms() {
        let tokens = tokenize("I don't think it's working");
        assert_eq!(tokens, vec!["think", "working"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   !!! ???").is_empty());
    }
}
