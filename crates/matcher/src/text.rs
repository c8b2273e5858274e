//! Text views of an [`Item`] used for ranking.

use crate::types::Item;

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

/// Text sent to the embedding provider for an item.
///
/// `"{title}. {description}. Color: {color}. Location: {location}"`, with
/// absent or blank optional parts left out together with their separator.
pub fn embedding_text(item: &Item) -> String {
    let mut parts: Vec<String> = vec![item.title.clone()];
    if let Some(description) = present(&item.description) {
        parts.push(description.to_string());
    }
    if let Some(color) = present(&item.color) {
        parts.push(format!("Color: {color}"));
    }
    if let Some(location) = present(&item.location) {
        parts.push(format!("Location: {location}"));
    }
    parts.join(". ")
}

/// Lowercased `title description color location` used by keyword matching.
pub fn keyword_text(item: &Item) -> String {
    let title = Some(item.title.as_str()).filter(|t| !t.trim().is_empty());
    [
        title,
        present(&item.description),
        present(&item.color),
        present(&item.location),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}
