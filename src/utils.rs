

#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}


/// Keeps at most `max_words` whitespace-separated words.
///
/// Returns the (possibly shortened) text and whether anything was cut. When the
/// text is cut the kept words are re-joined with single spaces.
pub fn truncate_words(text: &str, max_words: usize) -> (String, bool) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return (text.to_string(), false);
    }
    (words[..max_words].join(" "), true)
}
