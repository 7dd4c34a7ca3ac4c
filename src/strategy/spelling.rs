use std::sync::Arc;

use whatlang::Script;

use super::{CorrectionStrategy, StrategyContext, StrategyId, StrategyResult};
use crate::catalog::{ListName, ReferenceCatalog};
use crate::dictionary::SpellDictionary;
use crate::error::Result;
use crate::text::{is_single_word, ratio};

/// Spell correction of single-word values.
///
/// Abstains on anything the dictionary or a reference list already knows, on
/// non-Latin text, and on words reliably detected as a language we have no
/// dictionary for.
pub struct DictionaryStrategy {
    dictionary: Arc<SpellDictionary>,
    catalog: Arc<ReferenceCatalog>,
    threshold: f64,
}

impl DictionaryStrategy {
    pub fn new(dictionary: Arc<SpellDictionary>, catalog: Arc<ReferenceCatalog>, threshold: f64) -> Self {
        Self {
            dictionary,
            catalog,
            threshold,
        }
    }

    fn is_correctable_text(&self, word: &str) -> bool {
        if whatlang::detect_script(word) != Some(Script::Latin) {
            return false;
        }
        if let Some(info) = whatlang::detect(word) {
            if info.is_reliable() && !self.dictionary.supports(info.lang()) {
                return false;
            }
        }
        true
    }

    /// Names are always checked so a rare name is not spelled into a common word.
    fn is_reference_term(&self, word: &str, ctx: &StrategyContext<'_>) -> bool {
        if self.catalog.get(ListName::Names).contains(word) {
            return true;
        }
        ctx.domain
            .reference_list()
            .is_some_and(|list| self.catalog.get(list).contains(word))
    }
}

impl CorrectionStrategy for DictionaryStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Dictionary
    }

    fn propose(&self, value: &str, ctx: &StrategyContext<'_>) -> Result<StrategyResult> {
        let word = value.trim();
        let abstain = Ok(StrategyResult::abstain(self.id()));
        if self.dictionary.is_empty() || !is_single_word(word) {
            return abstain;
        }
        if word.chars().any(|c| c.is_numeric()) || !self.is_correctable_text(word) {
            return abstain;
        }
        if self.dictionary.is_known(word) || self.is_reference_term(word, ctx) {
            return abstain;
        }

        let lower = word.to_lowercase();
        let candidates = self.dictionary.candidates(&lower);
        let Some(top) = candidates.first() else {
            return abstain;
        };
        let mut best = (top.as_str(), ratio(&lower, top));
        if best.1 < self.threshold {
            for candidate in &candidates[1..] {
                let score = ratio(&lower, candidate);
                if score > best.1 {
                    best = (candidate.as_str(), score);
                }
            }
        }
        let (candidate, score) = best;
        if score < self.threshold {
            return abstain;
        }
        if self.catalog.get(ListName::Whitelist).contains(candidate) {
            return abstain;
        }
        Ok(StrategyResult::propose(self.id(), candidate, score))
    }
}
