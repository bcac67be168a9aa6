//! Term helpers used by the keyword-scored stores.

/// Lowercased alphanumeric terms of `text`.
pub fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Fraction of distinct query terms found in `text`, in [0, 1].
pub fn term_overlap(query: &str, text: &str) -> f32 {
    let mut query_terms = terms(query);
    query_terms.sort();
    query_terms.dedup();
    if query_terms.is_empty() {
        return 0.0;
    }
    let text_terms = terms(text);
    let matched = query_terms
        .iter()
        .filter(|q| text_terms.iter().any(|t| t == *q))
        .count();
    matched as f32 / query_terms.len() as f32
}

/// Case-insensitive substring test.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
