//! # Lost-item matcher (`matcher`)
//!
//! ## Purpose
//!
//! Given a free-text description of something a person found (or is looking
//! for), rank the currently open lost-item reports by how well they match.
//!
//! The primary path embeds the query and every candidate's composite text
//! through a [`semantic::TextEmbedder`], scores each candidate by cosine
//! similarity, sorts, drops anything below `min_score` and truncates to
//! `limit`. Candidates are embedded in sequential batches (10 by default).
//!
//! If the embedding provider fails for operational reasons the matcher falls
//! back to keyword overlap: the fraction of query words that appear in the
//! item's text. A misconfigured provider (no credential, no endpoint) is not
//! masked; it comes back as [`MatchError::Configuration`].
//!
//! ## Core Types
//!
//! - [`Item`]: a lost-or-found report.
//! - [`ItemSource`]: where candidates come from; [`InMemoryItemSource`] ships here.
//! - [`SearchOptions`]: per-call `limit` and `min_score`.
//! - [`MatchConfig`]: defaults for those, plus `batch_size`.
//! - [`MatchedItem`]: item plus `matchScore`; [`ScoredItem`] also records the
//!   [`ScoreSource`].
//! - [`Matcher`]: wires a source and an embedder together.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use matcher::{InMemoryItemSource, Item, MatchConfig, Matcher, SearchOptions};
//! use semantic::SemanticConfig;
//!
//! # async fn run() -> Result<(), matcher::MatchError> {
//! let items = Arc::new(InMemoryItemSource::new(vec![
//!     Item::lost("1", "Red Wallet").with_color("red"),
//!     Item::lost("2", "Black Backpack").with_location("Dirac Library"),
//! ]));
//! let matcher = Matcher::from_semantic_config(
//!     items,
//!     &SemanticConfig::from_env(),
//!     MatchConfig::default(),
//! )?;
//!
//! for hit in matcher.search("found a red wallet", &SearchOptions::new()).await? {
//!     println!("{} score={:.3}", hit.item.title, hit.match_score);
//! }
//! # Ok(())
//! # }
//! ```

mod engine;
mod lexical;
mod metrics;
mod similarity;
mod source;
mod text;
mod types;

pub use crate::engine::Matcher;
pub use crate::lexical::{keyword_score, keywords};
pub use crate::metrics::{set_match_metrics, MatchMetrics};
pub use crate::similarity::cosine_similarity;
pub use crate::source::{InMemoryItemSource, ItemSource};
pub use crate::text::{embedding_text, keyword_text};
pub use crate::types::{
    Hub, Item, ItemSourceError, ItemStatus, ItemType, MatchConfig, MatchError, MatchedItem,
    ScoreSource, ScoredItem, SearchOptions, DEFAULT_BATCH_SIZE, DEFAULT_LIMIT, DEFAULT_MIN_SCORE,
};
