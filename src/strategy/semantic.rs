use std::sync::Arc;

use super::{CorrectionStrategy, StrategyContext, StrategyId, StrategyResult};
use crate::catalog::ReferenceCatalog;
use crate::embedding::EmbeddingIndex;
use crate::error::Result;

/// Nearest reference entry by embedding cosine similarity.
pub struct EmbeddingStrategy {
    catalog: Arc<ReferenceCatalog>,
    index: Arc<EmbeddingIndex>,
}

impl EmbeddingStrategy {
    pub fn new(catalog: Arc<ReferenceCatalog>, index: Arc<EmbeddingIndex>) -> Self {
        Self { catalog, index }
    }
}

impl CorrectionStrategy for EmbeddingStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Embedding
    }

    fn propose(&self, value: &str, ctx: &StrategyContext<'_>) -> Result<StrategyResult> {
        let Some(name) = ctx.domain.reference_list() else {
            return Ok(StrategyResult::abstain(self.id()));
        };
        let list = self.catalog.get(name);
        Ok(match self.index.nearest(&list, value)? {
            Some((entry, similarity)) => StrategyResult::propose(self.id(), entry, similarity),
            None => StrategyResult::abstain(self.id()),
        })
    }
}
