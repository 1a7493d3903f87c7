

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOKEN_PATTERN: Regex = Regex::new(r"\b[a-z0-9_]+\b").expect("token pattern compiles");
}

/// Tokens shorter than this many characters are dropped.
pub const MIN_TOKEN_LEN: usize = 3;

/// Lowercases `text` and returns its `[a-z0-9_]` word runs of length > 2.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_drops_short_tokens() {
        assert_eq!(
            tokenize("Neural Network pruning IS an art of 2021"),
            vec!["neural", "network", "pruning", "art", "2021"]
        );
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        assert_eq!(tokenize("self-attention, (BERT)"), vec!["self", "attention", "bert"]);
        assert_eq!(tokenize("snake_case_token"), vec!["snake_case_token"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("a an to").is_empty());
    }
}
