//! Keyword overlap scoring used when embeddings are unavailable.

/// Lowercased whitespace-separated query tokens, duplicates kept.
pub fn keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Fraction of `keywords` that occur as substrings of `text`.
///
/// `text` is expected to be lowercased already. Each keyword counts once per
/// occurrence in `keywords`, so repeated query words weigh more. An empty
/// keyword list scores 0.
pub fn keyword_score(keywords: &[String], text: &str) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let matched = keywords
        .iter()
        .filter(|keyword| text.contains(keyword.as_str()))
        .count();
    matched as f32 / keywords.len() as f32
}
