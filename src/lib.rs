//! # Campus lost-and-found matching (`lostfound`)
//!
//! Umbrella crate over the workspace:
//!
//! - [`semantic`]: embedding clients behind the `TextEmbedder` seam, with
//!   retry, circuit breaking and rate limiting for the remote provider.
//! - [`matcher`]: ranks open lost-item reports against a description by
//!   cosine similarity, falling back to keyword overlap when the provider is
//!   down.
//!
//! This crate adds the YAML configuration layer ([`LostFoundConfig`]),
//! tracing setup ([`init_tracing`]), and [`LostFound`], the entry point that
//! exposes [`LostFound::search_lost_items_by_similarity`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use lostfound::{
//!     init_tracing, InMemoryItemSource, Item, LostFound, LostFoundConfig, SearchOptions,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LostFoundConfig::load("lostfound.yaml")?;
//! init_tracing(&config.logging);
//!
//! let items = Arc::new(InMemoryItemSource::new(vec![
//!     Item::lost("1", "Red Wallet").with_color("red"),
//! ]));
//! let service = LostFound::new(&config, items)?;
//! let hits = service
//!     .search_lost_items_by_similarity("found a red wallet", SearchOptions::new().with_limit(5))
//!     .await?;
//! println!("{} matches", hits.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::info;

pub mod config;

pub use crate::config::{ConfigLoadError, LoggingConfig, LostFoundConfig};
pub use matcher::{
    Hub, InMemoryItemSource, Item, ItemSource, ItemSourceError, ItemStatus, ItemType, MatchConfig,
    MatchError, MatchedItem, Matcher, ScoreSource, ScoredItem, SearchOptions,
};
pub use semantic::{ErrorKind, SemanticConfig, SemanticError, TextEmbedder};

/// Matching service built from a [`LostFoundConfig`].
pub struct LostFound {
    matcher: Matcher,
}

impl LostFound {
    /// Build the configured embedder and matcher over `items`.
    pub fn new(config: &LostFoundConfig, items: Arc<dyn ItemSource>) -> Result<Self, MatchError> {
        let matcher =
            Matcher::from_semantic_config(items, &config.semantic, config.matcher.clone())?;
        info!(
            mode = ?config.semantic.mode,
            provider = config.semantic.provider.as_str(),
            model = %config.semantic.model_name,
            batch_size = config.matcher.batch_size,
            "lostfound_ready"
        );
        Ok(Self { matcher })
    }

    /// Wrap an existing matcher.
    pub fn with_matcher(matcher: Matcher) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Open lost items ranked by similarity to `query`, best first.
    ///
    /// Returns an empty list for a blank query. Provider outages degrade to
    /// keyword ranking; only a misconfigured embedding service (or a failing
    /// item source) is an error.
    pub async fn search_lost_items_by_similarity(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<MatchedItem>, MatchError> {
        self.matcher.search(query, &options).await
    }
}

/// Install the global tracing subscriber described by `logging`.
///
/// Returns `false` if a subscriber was already installed or the filter does
/// not parse; the existing subscriber (if any) stays in place.
pub fn init_tracing(logging: &LoggingConfig) -> bool {
    let filter = match tracing_subscriber::EnvFilter::try_new(&logging.filter) {
        Ok(filter) => filter,
        Err(_) => return false,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true);
    if logging.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
