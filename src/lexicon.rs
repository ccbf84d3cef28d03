// Word-list sentiment scoring, used as an opt-in fallback when no sentiment model answers
use crate::labels::Sentiment;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w]").unwrap();
    static ref POSITIVE_WORDS: HashSet<&'static str> = [
        "excellent", "amazing", "wonderful", "fantastic", "great", "good", "best",
        "outstanding", "superb", "brilliant", "awesome", "perfect", "love",
        "incredible", "exceptional", "fabulous", "terrific", "marvelous",
        "satisfied", "happy", "pleased", "delighted", "impressed", "recommended",
        "quality", "efficient", "helpful", "friendly", "fast", "easy", "smooth",
    ]
    .into_iter()
    .collect();
    static ref NEGATIVE_WORDS: HashSet<&'static str> = [
        "terrible", "horrible", "awful", "bad", "worst", "poor", "disappointing",
        "disappointed", "hate", "useless", "broken", "defective", "failure",
        "pathetic", "disgusting", "frustrating", "annoying", "waste", "never",
        "angry", "upset", "unhappy", "dissatisfied", "uncomfortable", "rude",
        "slow", "expensive", "complicated", "difficult", "confusing", "problem",
    ]
    .into_iter()
    .collect();
    static ref NEUTRAL_WORDS: HashSet<&'static str> =
        ["okay", "ok", "average", "decent", "fine", "acceptable", "moderate"]
            .into_iter()
            .collect();
}

const NEGATIONS: &[&str] = &["not", "no", "never", "neither", "nobody", "nothing", "dont"];
const INTENSIFIERS: &[&str] = &[
    "very",
    "extremely",
    "really",
    "absolutely",
    "completely",
    "totally",
];

/// Margin one side must lead by before the text counts as polar.
const POLARITY_MARGIN: f64 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub struct LexiconScore {
    pub sentiment: Sentiment,
    pub score: f64,
}

/// Score text against the word lists.
pub fn score(text: &str) -> LexiconScore {
    let lower = text.to_lowercase();
    let words: Vec<String> = lower
        .split_whitespace()
        .map(|w| NON_WORD.replace_all(w, "").into_owned())
        .collect();

    let mut positive = 0.0_f64;
    let mut negative = 0.0_f64;
    let mut neutral = 0.0_f64;

    for (i, word) in words.iter().enumerate() {
        // Punctuation is stripped first, so "don't" arrives as "dont"
        let negated = i > 0 && NEGATIONS.contains(&words[i - 1].as_str());

        if POSITIVE_WORDS.contains(word.as_str()) {
            if negated {
                negative += 1.5;
            } else {
                positive += 2.0;
            }
        }
        if NEGATIVE_WORDS.contains(word.as_str()) {
            if negated {
                positive += 1.0;
            } else {
                negative += 2.0;
            }
        }
        if NEUTRAL_WORDS.contains(word.as_str()) {
            neutral += 1.0;
        }
    }

    for intensifier in INTENSIFIERS {
        if lower.contains(intensifier) {
            positive *= 1.2;
            negative *= 1.2;
        }
    }

    let exclamations = text.matches('!').count();
    if exclamations > 0 {
        let boost = 1.0 + exclamations as f64 * 0.1;
        positive *= boost;
        negative *= boost;
    }

    let total = positive + negative + neutral;
    if total == 0.0 {
        return LexiconScore {
            sentiment: Sentiment::Neutral,
            score: 0.5,
        };
    }

    let pos_ratio = positive / total;
    let neg_ratio = negative / total;

    if pos_ratio > neg_ratio + POLARITY_MARGIN {
        LexiconScore {
            sentiment: Sentiment::Positive,
            score: (0.6 + pos_ratio * 0.4).min(0.95),
        }
    } else if neg_ratio > pos_ratio + POLARITY_MARGIN {
        LexiconScore {
            sentiment: Sentiment::Negative,
            score: (0.6 + neg_ratio * 0.4).min(0.95),
        }
    } else {
        LexiconScore {
            sentiment: Sentiment::Neutral,
            score: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_text() {
        let result = score("Amazing app, I love it!");
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert!(result.score > 0.6 && result.score <= 0.95);
    }

    #[test]
    fn test_negative_text() {
        let result = score("Terrible support and a broken checkout");
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_negation_flips() {
        assert_eq!(score("this is not good").sentiment, Sentiment::Negative);
        assert_eq!(score("honestly not bad").sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_no_signal_is_neutral() {
        let result = score("The package arrived on Tuesday");
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.score, 0.5);
    }

    #[test]
    fn test_mixed_is_neutral() {
        let result = score("good but slow");
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.score, 0.6);
    }
}
