use std::sync::Arc;

use rayon::prelude::*;

use super::{CorrectionStrategy, StrategyContext, StrategyId, StrategyResult};
use crate::catalog::{ReferenceCatalog, ReferenceList};
use crate::error::Result;
use crate::text::{fold_for_match, weighted_ratio};

/// Lists at least this long are scanned in parallel.
const PARALLEL_SCAN_MIN: usize = 4096;

/// Best weighted-similarity match in the column's reference list.
pub struct FuzzyStrategy {
    catalog: Arc<ReferenceCatalog>,
}

#[derive(Clone, Copy)]
struct Scored<'a> {
    entry: &'a str,
    score: f64,
    tie_break: f64,
}

impl<'a> Scored<'a> {
    fn better(self, other: Scored<'a>) -> Scored<'a> {
        let ord = self
            .score
            .total_cmp(&other.score)
            .then(self.tie_break.total_cmp(&other.tie_break));
        if ord.is_lt() { other } else { self }
    }
}

impl FuzzyStrategy {
    pub fn new(catalog: Arc<ReferenceCatalog>) -> Self {
        Self { catalog }
    }

    fn best_match<'a>(list: &'a ReferenceList, query: &str) -> Option<Scored<'a>> {
        let score = |(entry, key): (&'a str, &'a str)| Scored {
            entry,
            score: weighted_ratio(query, key),
            tie_break: strsim::jaro_winkler(query, key),
        };
        if list.len() >= PARALLEL_SCAN_MIN {
            let pairs: Vec<(&str, &str)> = list.keyed().collect();
            pairs.into_par_iter().map(score).reduce_with(Scored::better)
        } else {
            list.keyed().map(score).reduce(Scored::better)
        }
    }
}

impl CorrectionStrategy for FuzzyStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Fuzzy
    }

    fn propose(&self, value: &str, ctx: &StrategyContext<'_>) -> Result<StrategyResult> {
        let Some(name) = ctx.domain.reference_list() else {
            return Ok(StrategyResult::abstain(self.id()));
        };
        let list = self.catalog.get(name);
        let query = fold_for_match(value);
        if list.is_empty() || query.is_empty() {
            return Ok(StrategyResult::abstain(self.id()));
        }
        Ok(match Self::best_match(&list, &query) {
            Some(best) => StrategyResult::propose(self.id(), best.entry, best.score),
            None => StrategyResult::abstain(self.id()),
        })
    }
}
