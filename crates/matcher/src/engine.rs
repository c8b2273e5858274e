use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use semantic::{
    build_embedder, EmbeddingVector, ErrorKind, SemanticConfig, SemanticError, TextEmbedder,
};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::lexical::{keyword_score, keywords};
use crate::metrics::metrics_recorder;
use crate::similarity::cosine_similarity;
use crate::source::ItemSource;
use crate::text::{embedding_text, keyword_text};
use crate::types::{
    Item, MatchConfig, MatchError, MatchedItem, ScoreSource, ScoredItem, SearchOptions,
};


/// Ranks open lost-item reports against a free-text description.
///
/// Embedding similarity is the primary path. When the embedding provider fails
/// (network, bad status, garbage body, rate limit, open circuit) the matcher
/// falls back to keyword overlap. A misconfigured provider is not a failure it
/// degrades around: that surfaces as [`MatchError::Configuration`].
pub struct Matcher {
    items: Arc<dyn ItemSource>,
    embedder: Arc<dyn TextEmbedder>,
    cfg: MatchConfig,
}

impl Matcher {
    pub fn new(
        items: Arc<dyn ItemSource>,
        embedder: Arc<dyn TextEmbedder>,
        cfg: MatchConfig,
    ) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self {
            items,
            embedder,
            cfg,
        })
    }

    /// Build the embedder from `semantic_cfg` and wrap it.
    pub fn from_semantic_config(
        items: Arc<dyn ItemSource>,
        semantic_cfg: &SemanticConfig,
        cfg: MatchConfig,
    ) -> Result<Self, MatchError> {
        let embedder = build_embedder(semantic_cfg).map_err(MatchError::Configuration)?;
        Self::new(items, embedder, cfg)
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Ranked matches for `query`, best first.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<MatchedItem>, MatchError> {
        Ok(self
            .search_scored(query, options)
            .await?
            .into_iter()
            .map(ScoredItem::into_matched)
            .collect())
    }

    /// Like [`search`](Self::search) but keeps which path produced each score.
    pub async fn search_scored(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ScoredItem>, MatchError> {
        let (limit, min_score) = self.cfg.resolve(options)?;
        let span = info_span!(
            "matcher.search",
            query_len = query.len(),
            limit,
            min_score = f64::from(min_score),
        );
        self.run_search(query, limit, min_score)
            .instrument(span)
            .await
    }

    async fn run_search(
        &self,
        query: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredItem>, MatchError> {
        let started = Instant::now();
        if query.trim().is_empty() || limit == 0 {
            debug!(limit, "search_skipped");
            record_metrics(None, started, 0, 0);
            return Ok(Vec::new());
        }

        let candidates = self.fetch_candidates().await?;
        if candidates.is_empty() {
            debug!("search_no_candidates");
            record_metrics(None, started, 0, 0);
            return Ok(Vec::new());
        }
        let candidate_count = candidates.len();

        let (hits, source) = match self.embedding_scores(query, &candidates).await {
            Ok(scores) => (
                rank(candidates, scores, ScoreSource::Embedding, limit, |score| {
                    score >= min_score
                }),
                ScoreSource::Embedding,
            ),
            Err(err) if err.kind() == ErrorKind::Configuration => {
                warn!(
                    error = %err,
                    model = self.embedder.model_name(),
                    "semantic_search_misconfigured"
                );
                return Err(MatchError::Configuration(err));
            }
            Err(err) => {
                warn!(
                    error = %err,
                    model = self.embedder.model_name(),
                    "semantic_search_degraded"
                );
                if let Some(recorder) = metrics_recorder() {
                    recorder.record_fallback();
                }
                (self.keyword_search(query, limit).await?, ScoreSource::Keyword)
            }
        };

        info!(
            candidates = candidate_count,
            hits = hits.len(),
            source = source.as_str(),
            elapsed_micros = started.elapsed().as_micros() as u64,
            "search_complete"
        );
        record_metrics(Some(source), started, candidate_count, hits.len());
        Ok(hits)
    }

    async fn fetch_candidates(&self) -> Result<Vec<Item>, MatchError> {
        let items = self.items.fetch_open_lost_items().await.map_err(|err| {
            warn!(error = %err, "item_fetch_failed");
            MatchError::ItemSource(err)
        })?;
        Ok(items.into_iter().filter(Item::is_open_lost).collect())
    }

    /// Cosine score per candidate, in candidate order.
    async fn embedding_scores(
        &self,
        query: &str,
        candidates: &[Item],
    ) -> Result<Vec<f32>, SemanticError> {
        let query_vector = self.embedder.embed_text(query).await?;
        let texts: Vec<String> = candidates.iter().map(embedding_text).collect();
        let vectors = self.embed_in_batches(&texts).await?;
        Ok(vectors
            .iter()
            .map(|vector| cosine_similarity(&query_vector, vector))
            .collect())
    }

    /// Embed `texts` in sequential batches of `batch_size`, preserving order.
    async fn embed_in_batches(
        &self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingVector>, SemanticError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (batch, chunk) in texts.chunks(self.cfg.batch_size).enumerate() {
            let embedded = self.embedder.embed_texts(chunk).await?;
            if embedded.len() != chunk.len() {
                return Err(SemanticError::CountMismatch {
                    expected: chunk.len(),
                    returned: embedded.len(),
                });
            }
            debug!(batch, size = chunk.len(), "embedding_batch_complete");
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    /// Keyword-overlap ranking over a fresh candidate fetch.
    async fn keyword_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredItem>, MatchError> {
        let candidates = self.fetch_candidates().await?;
        let keywords = keywords(query);
        let scores: Vec<f32> = candidates
            .iter()
            .map(|item| keyword_score(&keywords, &keyword_text(item)))
            .collect();
        Ok(rank(candidates, scores, ScoreSource::Keyword, limit, |score| {
            score > 0.0
        }))
    }
}

/// Attach scores, sort best first (stable, so ties keep fetch order), keep the
/// scores `keep` accepts, then cut to `limit`.
fn rank(
    candidates: Vec<Item>,
    scores: Vec<f32>,
    source: ScoreSource,
    limit: usize,
    keep: impl Fn(f32) -> bool,
) -> Vec<ScoredItem> {
    let mut scored: Vec<ScoredItem> = candidates
        .into_iter()
        .zip(scores)
        .map(|(item, match_score)| ScoredItem {
            item,
            match_score,
            source,
        })
        .collect();
    scored.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(Ordering::Equal)
    });
    scored.retain(|hit| keep(hit.match_score));
    scored.truncate(limit);
    scored
}

fn record_metrics(source: Option<ScoreSource>, started: Instant, candidates: usize, hits: usize) {
    if let Some(recorder) = metrics_recorder() {
        recorder.record_search(source, started.elapsed(), candidates, hits);
    }
}
