

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref METHOD_TERMS: Regex = Regex::new(
        r"(?i)\b(method|approach|model|algorithm|technique|framework|system|network|dataset|metric)\b"
    )
    .expect("method term pattern compiles");
}

/// Boosts method-related terms for the keyword side by appending every match
/// to the query. Returns the query unchanged when nothing matches.
pub fn preprocess_query(query: &str) -> String {
    let matches: Vec<&str> = METHOD_TERMS.find_iter(query).map(|m| m.as_str()).collect();
    if matches.is_empty() {
        return query.to_string();
    }
    format!("{} {}", query, matches.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_method_terms() {
        assert_eq!(
            preprocess_query("Which Model and dataset work best?"),
            "Which Model and dataset work best? Model dataset"
        );
    }

    #[test]
    fn test_no_terms_leaves_query_untouched() {
        assert_eq!(preprocess_query("what is pruning"), "what is pruning");
    }

    #[test]
    fn test_requires_whole_words() {
        assert_eq!(preprocess_query("methodology networks"), "methodology networks");
    }
}
