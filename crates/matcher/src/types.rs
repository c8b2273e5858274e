use chrono::{DateTime, Utc};
use semantic::SemanticError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of results returned by a search.
pub const DEFAULT_LIMIT: usize = 20;
/// Default minimum cosine similarity for an embedding-ranked result.
pub const DEFAULT_MIN_SCORE: f32 = 0.3;
/// Default number of candidate texts per embedding request.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Lifecycle state of a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Open,
    Claimed,
    Closed,
}

/// Whether the report describes something lost or something found.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    Lost,
    Found,
}

/// Campus drop-off point where found items are held.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Hub {
    #[serde(rename = "Strozier Library")]
    StrozierLibrary,
    #[serde(rename = "Student Union")]
    StudentUnion,
    #[serde(rename = "Dirac Library")]
    DiracLibrary,
}

impl Hub {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hub::StrozierLibrary => "Strozier Library",
            Hub::StudentUnion => "Student Union",
            Hub::DiracLibrary => "Dirac Library",
        }
    }
}

/// A lost-or-found report as stored by the application.
///
/// Only `title`, `description`, `color` and `location` feed ranking. The
/// remaining fields ride along unchanged into results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub: Option<Hub>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_lost: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Open lost-item report with only the required fields set.
    pub fn lost(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            color: None,
            location: None,
            status: ItemStatus::Open,
            item_type: ItemType::Lost,
            hub: None,
            user_id: None,
            image_path: None,
            when_lost: None,
            created_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    pub fn with_hub(mut self, hub: Hub) -> Self {
        self.hub = Some(hub);
        self
    }

    /// True for reports the matcher searches: lost and still open.
    pub fn is_open_lost(&self) -> bool {
        self.status == ItemStatus::Open && self.item_type == ItemType::Lost
    }
}

/// Per-call search knobs. Unset fields fall back to [`MatchConfig`] defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

/// Which path produced a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// Cosine similarity between query and item embeddings.
    Embedding,
    /// Fraction of query keywords found in the item text.
    Keyword,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Embedding => "embedding",
            ScoreSource::Keyword => "keyword",
        }
    }
}

/// A ranked item together with its score and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub item: Item,
    pub match_score: f32,
    pub source: ScoreSource,
}

impl ScoredItem {
    pub fn into_matched(self) -> MatchedItem {
        MatchedItem {
            item: self.item,
            match_score: self.match_score,
        }
    }
}

/// Caller-facing result: every item field plus `matchScore`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedItem {
    #[serde(flatten)]
    pub item: Item,
    #[serde(rename = "matchScore")]
    pub match_score: f32,
}

/// Matcher-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Candidate texts per embedding request.
    pub batch_size: usize,
    /// Result count when [`SearchOptions::limit`] is unset.
    pub default_limit: usize,
    /// Similarity floor when [`SearchOptions::min_score`] is unset.
    pub default_min_score: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            default_limit: DEFAULT_LIMIT,
            default_min_score: DEFAULT_MIN_SCORE,
        }
    }
}

impl MatchConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.batch_size == 0 {
            return Err(MatchError::InvalidConfig(
                "batch_size must be greater than zero".into(),
            ));
        }
        if self.default_min_score.is_nan() {
            return Err(MatchError::InvalidConfig(
                "default_min_score must be a number".into(),
            ));
        }
        Ok(())
    }

    /// Fill unset options from the defaults and reject a NaN threshold.
    pub(crate) fn resolve(&self, options: &SearchOptions) -> Result<(usize, f32), MatchError> {
        let limit = options.limit.unwrap_or(self.default_limit);
        let min_score = options.min_score.unwrap_or(self.default_min_score);
        if min_score.is_nan() {
            return Err(MatchError::InvalidConfig(
                "min_score must be a number".into(),
            ));
        }
        Ok((limit, min_score))
    }
}

/// Failure reported by an [`ItemSource`](crate::ItemSource).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ItemSourceError(pub String);

impl ItemSourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors surfaced by [`Matcher`](crate::Matcher).
///
/// Provider outages never show up here; they degrade to keyword ranking.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    #[error("embedding service is not configured: {0}")]
    Configuration(#[source] SemanticError),
    #[error("item source failed: {0}")]
    ItemSource(#[from] ItemSourceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_deserializes_database_row() {
        let row = json!({
            "id": "a1",
            "title": "Red Wallet",
            "description": null,
            "color": "red",
            "status": "open",
            "type": "lost",
            "hub": "Student Union",
            "created_at": "2024-03-01T12:00:00Z"
        });
        let item: Item = serde_json::from_value(row).unwrap();
        assert_eq!(item.color.as_deref(), Some("red"));
        assert_eq!(item.description, None);
        assert_eq!(item.hub, Some(Hub::StudentUnion));
        assert!(item.is_open_lost());
        assert!(item.created_at.is_some());
    }

    #[test]
    fn matched_item_flattens_with_match_score() {
        let matched = MatchedItem {
            item: Item::lost("a1", "Red Wallet").with_color("red"),
            match_score: 0.5,
        };
        let value = serde_json::to_value(&matched).unwrap();
        assert_eq!(value["title"], "Red Wallet");
        assert_eq!(value["type"], "lost");
        assert_eq!(value["matchScore"], 0.5);
        assert!(value.get("description").is_none());
    }

    #[test]
    fn open_lost_filter() {
        assert!(Item::lost("1", "Keys").is_open_lost());
        assert!(!Item::lost("1", "Keys")
            .with_status(ItemStatus::Claimed)
            .is_open_lost());
        assert!(!Item::lost("1", "Keys")
            .with_type(ItemType::Found)
            .is_open_lost());
    }

    #[test]
    fn options_resolve_against_defaults() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.resolve(&SearchOptions::new()).unwrap(), (20, 0.3));
        assert_eq!(
            cfg.resolve(&SearchOptions::new().with_limit(5).with_min_score(0.0))
                .unwrap(),
            (5, 0.0)
        );
        assert!(matches!(
            cfg.resolve(&SearchOptions::new().with_min_score(f32::NAN)),
            Err(MatchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_validation() {
        assert!(MatchConfig::default().validate().is_ok());
        assert!(MatchConfig::default().with_batch_size(0).validate().is_err());
        let cfg = MatchConfig {
            default_min_score: f32::NAN,
            ..MatchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_fills_missing_fields() {
        let cfg: MatchConfig = serde_json::from_value(json!({ "batch_size": 4 })).unwrap();
        assert_eq!(cfg.batch_size, 4);
        assert_eq!(cfg.default_limit, DEFAULT_LIMIT);
    }

    #[test]
    fn hub_names() {
        assert_eq!(Hub::DiracLibrary.as_str(), "Dirac Library");
        let hub: Hub = serde_json::from_value(json!("Strozier Library")).unwrap();
        assert_eq!(hub, Hub::StrozierLibrary);
    }
}
