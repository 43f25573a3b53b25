//! Turns a trigger context into Portal suggestions.
//!
//! ```text
//! AutoReorgContext
//!     │ extract_concepts(document_text)
//!     ▼
//! [Concept] ── dedupe by lowercase name
//!     │ semantic_search per concept (concurrent, current doc excluded)
//!     ▼
//! [RankedMatch] ── target = first bullet naming the concept as a word
//!     │ determine_placement(target)
//!     ▼
//! [PortalSuggestion] ── dedupe by source, best score, sorted, truncated
//! ```
//!
//! The search backend is a black box behind [`ConceptSearch`]; it owns its
//! own timeouts. No lock is held across an await.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::mpsc;

use hydra_blocks::{BlockHandle, BlockHost};
use hydra_types::{
    AutoReorgContext, BlockId, Concept, DocumentId, PortalSuggestion, RankedMatch,
    SemanticSearchRequest, SourceRef,
};

use super::config::AutoReorgConfig;
use super::watcher::TriggerCallback;
use crate::error::{PortalError, Result};
use crate::placement::determine_placement;

/// The external concept extraction and semantic search service.
#[async_trait]
pub trait ConceptSearch: Send + Sync {
    /// Pull named concepts out of free text.
    async fn extract_concepts(&self, text: &str) -> Result<Vec<Concept>>;

    /// Find blocks semantically close to `request.query`.
    async fn semantic_search(&self, request: SemanticSearchRequest) -> Result<Vec<RankedMatch>>;
}

/// A bullet of the watched document, resolved once per run.
struct Candidate {
    id: BlockId,
    handle: Arc<dyn BlockHandle>,
    lowered: String,
}

/// Concept extraction → search → placement.
pub struct AutoReorgPipeline {
    config: AutoReorgConfig,
    search: Arc<dyn ConceptSearch>,
    host: Arc<dyn BlockHost>,
}

impl AutoReorgPipeline {
    pub fn new(config: AutoReorgConfig, search: Arc<dyn ConceptSearch>, host: Arc<dyn BlockHost>) -> Self {
        Self {
            config: config.validated(),
            search,
            host,
        }
    }

    pub fn config(&self) -> &AutoReorgConfig {
        &self.config
    }

    fn request_for(&self, concept: &Concept, document_id: &DocumentId) -> SemanticSearchRequest {
        SemanticSearchRequest {
            query: concept.name.clone(),
            limit: self.config.max_results,
            threshold: self.config.threshold_score,
            exclude_doc_ids: vec![document_id.clone()],
            descriptor_filter: None,
        }
    }

    /// Run one pass over `ctx`.
    ///
    /// Fails only if concept extraction fails or every search does; a
    /// partial search failure is logged and the rest is used.
    #[tracing::instrument(skip(self, ctx), fields(doc = %ctx.document_id))]
    pub async fn suggest(&self, ctx: &AutoReorgContext) -> Result<Vec<PortalSuggestion>> {
        let concepts = dedupe_concepts(self.search.extract_concepts(&ctx.document_text).await?);
        if concepts.is_empty() {
            tracing::debug!("no concepts extracted");
            return Ok(Vec::new());
        }

        let searches = concepts.iter().map(|concept| {
            let request = self.request_for(concept, &ctx.document_id);
            self.search.semantic_search(request)
        });
        let results = futures::future::join_all(searches).await;

        let mut first_error = None;
        let mut matched = Vec::with_capacity(concepts.len());
        for (concept, result) in concepts.iter().zip(results) {
            match result {
                Ok(matches) => matched.push((concept, matches)),
                Err(e) => {
                    tracing::warn!(concept = %concept.name, error = %e, "semantic search failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if matched.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        // Resolve after the awaits so placement sees the current tree.
        let candidates = self.candidates(ctx);
        let mut suggestions: IndexMap<SourceRef, PortalSuggestion> = IndexMap::new();

        for (concept, matches) in matched {
            let needle = concept.name.trim().to_lowercase();
            let Some(target) = best_mention(&candidates, &needle) else {
                tracing::trace!(concept = %concept.name, "no bullet mentions concept");
                continue;
            };
            let placement = determine_placement(target.handle.as_ref());

            for hit in matches {
                if hit.score < self.config.threshold_score {
                    continue;
                }
                if hit.document_id == ctx.document_id && hit.block_id == target.id {
                    continue;
                }

                let source = hit.source();
                let suggestion = PortalSuggestion {
                    source: source.clone(),
                    target_bullet: target.id.clone(),
                    placement: placement.clone(),
                    concept: concept.name.clone(),
                    score: hit.score,
                };
                match suggestions.get_mut(&source) {
                    Some(existing) if existing.score >= hit.score => {}
                    Some(existing) => *existing = suggestion,
                    None => {
                        suggestions.insert(source, suggestion);
                    }
                }
            }
        }

        let mut suggestions: Vec<_> = suggestions.into_values().collect();
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        suggestions.truncate(self.config.max_results);

        tracing::debug!(concepts = concepts.len(), suggestions = suggestions.len(), "auto-reorg pass complete");
        Ok(suggestions)
    }

    fn candidates(&self, ctx: &AutoReorgContext) -> Vec<Candidate> {
        ctx.all_bullet_ids
            .iter()
            .filter_map(|id| {
                let handle = self
                    .host
                    .resolve_block(&SourceRef::new(ctx.document_id.clone(), id.clone()))?;
                let lowered = handle.text().to_lowercase();
                Some(Candidate {
                    id: id.clone(),
                    handle,
                    lowered,
                })
            })
            .collect()
    }

    /// Adapt into a watcher trigger.
    ///
    /// Each trigger spawns a pass on the current tokio runtime and sends the
    /// result to `sender`. Failed passes are logged and dropped.
    pub fn into_trigger(self: Arc<Self>, sender: mpsc::UnboundedSender<Vec<PortalSuggestion>>) -> Result<TriggerCallback> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| PortalError::Runtime(e.to_string()))?;

        Ok(Arc::new(move |ctx: AutoReorgContext| {
            let pipeline = self.clone();
            let sender = sender.clone();
            runtime.spawn(async move {
                match pipeline.suggest(&ctx).await {
                    Ok(suggestions) => {
                        if sender.send(suggestions).is_err() {
                            tracing::debug!(doc = %ctx.document_id, "suggestion receiver closed");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(doc = %ctx.document_id, error = %e, "auto-reorg pass failed");
                    }
                }
            });
        }))
    }
}

/// First candidate naming `needle` as a whole word, else the first where a
/// word starts with it ("pear" in "pears"). Matches inside a word
/// ("pear" in "appearance") never count.
fn best_mention<'a>(candidates: &'a [Candidate], needle: &str) -> Option<&'a Candidate> {
    let mut prefix_hit = None;
    for candidate in candidates {
        match mention_kind(&candidate.lowered, needle) {
            Some(Mention::Word) => return Some(candidate),
            Some(Mention::Prefix) if prefix_hit.is_none() => prefix_hit = Some(candidate),
            _ => {}
        }
    }
    prefix_hit
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mention {
    Word,
    Prefix,
}

fn mention_kind(text: &str, needle: &str) -> Option<Mention> {
    if needle.is_empty() {
        return None;
    }
    let is_word = |c: char| c.is_alphanumeric();
    let mut best = None;
    for (start, _) in text.match_indices(needle) {
        let end = start + needle.len();
        let starts_word = !text[..start].chars().next_back().is_some_and(is_word);
        if !starts_word {
            continue;
        }
        if !text[end..].chars().next().is_some_and(is_word) {
            return Some(Mention::Word);
        }
        best = Some(Mention::Prefix);
    }
    best
}

/// Drop blank and repeated (case-insensitive) concept names, first wins.
fn dedupe_concepts(concepts: Vec<Concept>) -> Vec<Concept> {
    let mut seen: IndexMap<String, Concept> = IndexMap::new();
    for concept in concepts {
        let key = concept.name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        seen.entry(key).or_insert(concept);
    }
    seen.into_values().collect()
}
