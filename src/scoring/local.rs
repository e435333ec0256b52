//! In-process scoring functions

use super::{MetricValue, ScoringFunction};
use crate::{Error, Result};

/// Compute a local scoring function.
///
/// # Errors
///
/// Returns [`Error::Scoring`] for external functions or unusable
/// parameters (empty keyword, inverted length bucket bounds).
#[allow(clippy::cast_precision_loss)]
pub(crate) fn compute(variable: &str, function: &ScoringFunction, text: &str) -> Result<MetricValue> {
    let scoring_error = |message: &str| Error::Scoring {
        variable: variable.to_string(),
        message: message.to_string(),
    };

    let value = match function {
        ScoringFunction::WordCount => MetricValue::Number(word_count(text) as f64),
        ScoringFunction::CharacterCount => MetricValue::Number(text.chars().count() as f64),
        ScoringFunction::SentenceCount => MetricValue::Number(sentence_count(text) as f64),
        ScoringFunction::KeywordCount { keyword } => {
            if keyword.is_empty() {
                return Err(scoring_error("keyword must not be empty"));
            }
            MetricValue::Number(keyword_occurrences(text, keyword) as f64)
        }
        ScoringFunction::ContainsKeyword { keyword } => {
            if keyword.is_empty() {
                return Err(scoring_error("keyword must not be empty"));
            }
            let found = keyword_occurrences(text, keyword) > 0;
            MetricValue::Category(if found { "yes" } else { "no" }.to_string())
        }
        ScoringFunction::LengthBucket {
            short_max,
            long_min,
        } => {
            if short_max >= long_min {
                return Err(scoring_error("short_max must be below long_min"));
            }
            let words = word_count(text);
            let bucket = if words <= *short_max {
                "short"
            } else if words >= *long_min {
                "long"
            } else {
                "medium"
            };
            MetricValue::Category(bucket.to_string())
        }
        ScoringFunction::Sentiment
        | ScoringFunction::Rating { .. }
        | ScoringFunction::Classification { .. } => {
            return Err(scoring_error("function requires an external scorer"));
        }
    };

    Ok(value)
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .count()
}

fn keyword_occurrences(text: &str, keyword: &str) -> usize {
    text.to_lowercase()
        .matches(&keyword.to_lowercase())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(function: &ScoringFunction, text: &str) -> f64 {
        compute("v", function, text).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_counts() {
        let text = "Rust is fast. Rust is safe! Is it fun?";
        assert!((number(&ScoringFunction::WordCount, text) - 9.0).abs() < f64::EPSILON);
        assert!((number(&ScoringFunction::SentenceCount, text) - 3.0).abs() < f64::EPSILON);
        assert!((number(&ScoringFunction::CharacterCount, "héllo") - 5.0).abs() < f64::EPSILON);
        let keyword = ScoringFunction::KeywordCount {
            keyword: "rust".to_string(),
        };
        assert!((number(&keyword, text) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_text() {
        assert!(number(&ScoringFunction::WordCount, "").abs() < f64::EPSILON);
        assert!(number(&ScoringFunction::SentenceCount, "...").abs() < f64::EPSILON);
    }

    #[test]
    fn test_contains_keyword() {
        let function = ScoringFunction::ContainsKeyword {
            keyword: "Borrow".to_string(),
        };
        assert_eq!(compute("v", &function, "the borrow checker").unwrap().label(), "yes");
        assert_eq!(compute("v", &function, "lifetimes").unwrap().label(), "no");
    }

    #[test]
    fn test_length_bucket() {
        let function = ScoringFunction::LengthBucket {
            short_max: 2,
            long_min: 5,
        };
        assert_eq!(compute("v", &function, "one two").unwrap().label(), "short");
        assert_eq!(compute("v", &function, "one two three").unwrap().label(), "medium");
        assert_eq!(compute("v", &function, "a b c d e f").unwrap().label(), "long");
    }

    #[test]
    fn test_invalid_parameters() {
        let empty = ScoringFunction::KeywordCount {
            keyword: String::new(),
        };
        assert!(matches!(compute("v", &empty, "x"), Err(Error::Scoring { .. })));

        let inverted = ScoringFunction::LengthBucket {
            short_max: 10,
            long_min: 3,
        };
        assert!(compute("v", &inverted, "x").is_err());
        assert!(compute("v", &ScoringFunction::Sentiment, "x").is_err());
    }
}
