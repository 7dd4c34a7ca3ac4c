//! Final accept/reject authority for strategy candidates.

use std::sync::Arc;

use crate::config::Thresholds;
use crate::engine::CorrectionResult;
use crate::protect::ProtectedTermDetector;
use crate::strategy::{Domain, StrategyId};
use crate::text::apply_casing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyCandidate,
    ProtectedCandidate,
    BelowThreshold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    Accepted(CorrectionResult),
    /// The candidate is the original itself; the value is already canonical.
    Unchanged,
    Rejected(RejectReason),
}

pub struct ConfidenceGate {
    detector: Arc<dyn ProtectedTermDetector>,
    thresholds: Thresholds,
}

impl ConfidenceGate {
    pub fn new(detector: Arc<dyn ProtectedTermDetector>, thresholds: Thresholds) -> Self {
        Self {
            detector,
            thresholds,
        }
    }

    pub fn threshold_for(&self, strategy: StrategyId, domain: Domain) -> f64 {
        match strategy {
            StrategyId::UserMapping => 1.0,
            StrategyId::Dictionary => self.thresholds.dictionary,
            StrategyId::Fuzzy if domain.is_curated() => self.thresholds.fuzzy_curated,
            StrategyId::Fuzzy => self.thresholds.fuzzy_free_text,
            StrategyId::Embedding => self.thresholds.embedding,
            // No confidence signal to compare against.
            StrategyId::Generative => 0.0,
        }
    }

    pub fn evaluate(
        &self,
        original: &str,
        candidate: &str,
        confidence: f64,
        strategy: StrategyId,
        domain: Domain,
    ) -> GateVerdict {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return GateVerdict::Rejected(RejectReason::EmptyCandidate);
        }
        // Explicit human mappings may target protected terms.
        if strategy != StrategyId::UserMapping && self.detector.protects_candidate(candidate) {
            return GateVerdict::Rejected(RejectReason::ProtectedCandidate);
        }
        if confidence < self.threshold_for(strategy, domain) {
            return GateVerdict::Rejected(RejectReason::BelowThreshold);
        }
        let trimmed = original.trim();
        let corrected = apply_casing(trimmed, candidate);
        if corrected == trimmed {
            return GateVerdict::Unchanged;
        }
        GateVerdict::Accepted(CorrectionResult {
            original: original.to_string(),
            corrected,
            confidence,
            source: Some(strategy),
        })
    }

    /// Like [`evaluate`](Self::evaluate), falling back to the original on anything
    /// but acceptance.
    pub fn finalize(
        &self,
        original: &str,
        candidate: &str,
        confidence: f64,
        strategy: StrategyId,
        domain: Domain,
    ) -> CorrectionResult {
        match self.evaluate(original, candidate, confidence, strategy, domain) {
            GateVerdict::Accepted(result) => result,
            _ => CorrectionResult::unchanged(original),
        }
    }
}
