use std::sync::Arc;

use super::{CorrectionStrategy, StrategyContext, StrategyId, StrategyResult};
use crate::catalog::ReferenceCatalog;
use crate::error::Result;

/// Exact, case-insensitive lookup of corrections a human has already made.
pub struct UserMappingStrategy {
    catalog: Arc<ReferenceCatalog>,
}

impl UserMappingStrategy {
    pub fn new(catalog: Arc<ReferenceCatalog>) -> Self {
        Self { catalog }
    }
}

impl CorrectionStrategy for UserMappingStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::UserMapping
    }

    fn propose(&self, value: &str, _ctx: &StrategyContext<'_>) -> Result<StrategyResult> {
        Ok(match self.catalog.user_mapping(value) {
            Some(canonical) => StrategyResult::propose(self.id(), canonical, 1.0),
            None => StrategyResult::abstain(self.id()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sources;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(ReferenceCatalog::new(Sources::in_dir(dir.path())));
        catalog.register_user_mapping("bengaluru", "Bangalore").unwrap();
        let strategy = UserMappingStrategy::new(catalog);
        let ctx = StrategyContext::new(Some("city"));

        let result = strategy.propose(" BENGALURU ", &ctx).unwrap();
        assert_eq!(result.candidate.as_deref(), Some("Bangalore"));
        assert_eq!(result.confidence, 1.0);
        assert!(strategy.propose("mysore", &ctx).unwrap().abstains());
    }
}
