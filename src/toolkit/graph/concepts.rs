

use crate::core::models::PaperFields;

/// Technical vocabulary recognised inside contribution summaries.
const TECHNICAL_TERMS: &[&str] = &[
    "neural",
    "network",
    "learning",
    "deep",
    "machine",
    "model",
    "algorithm",
    "optimization",
    "training",
    "architecture",
    "transformer",
    "attention",
    "convolution",
    "lstm",
    "gru",
];

const TERMS_PER_FIELD: usize = 5;

/// Whitespace-separated words of `text` that are exact vocabulary terms,
/// in first-occurrence order.
pub fn technical_terms(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for word in text.to_lowercase().split_whitespace() {
        if TECHNICAL_TERMS.contains(&word) && !found.iter().any(|f| f == word) {
            found.push(word.to_string());
        }
    }
    found
}

/// Concepts for a paper: up to five terms each from the key innovation and the
/// core methodology, then the category tags, deduplicated and capped.
pub fn extract_concepts(fields: &PaperFields, max_concepts: usize) -> Vec<String> {
    let mut concepts: Vec<String> = Vec::new();
    let mut push = |concept: String| {
        if !concept.is_empty() && !concepts.contains(&concept) {
            concepts.push(concept);
        }
    };

    for text in [&fields.key_innovation, &fields.core_methodology] {
        for term in technical_terms(text).into_iter().take(TERMS_PER_FIELD) {
            push(term);
        }
    }
    for category in &fields.categories {
        push(category.trim().to_string());
    }

    concepts.truncate(max_concepts);
    concepts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technical_terms_exact_words_only() {
        assert_eq!(
            technical_terms("A Transformer model with attention, attention and training"),
            vec!["transformer", "model", "attention", "training"]
        );
    }

    #[test]
    fn test_extract_concepts_combines_fields_and_categories() {
        let mut fields = PaperFields::new("1706.03762", "Attention Is All You Need");
        fields.key_innovation = "transformer architecture based on attention".to_string();
        fields.core_methodology = "deep learning training of the model".to_string();
        fields.categories = vec!["cs.CL".to_string(), "cs.LG".to_string()];

        let concepts = extract_concepts(&fields, 10);
        assert_eq!(
            concepts,
            vec!["transformer", "architecture", "attention", "deep", "learning", "training", "model", "cs.CL", "cs.LG"]
        );
    }

    #[test]
    fn test_extract_concepts_respects_cap() {
        let mut fields = PaperFields::default();
        fields.key_innovation = "neural network learning deep machine model algorithm".to_string();
        assert_eq!(extract_concepts(&fields, 3).len(), 3);
    }
}
