//! Ordered correction strategies and the chain that runs them.
//!
//! Each strategy maps `(value, context)` to a candidate with a confidence, or
//! abstains. The chain asks them in order and hands every candidate to the
//! [`ConfidenceGate`]; the first accepted candidate ends the chain.

mod fuzzy;
mod generative;
mod semantic;
mod spelling;
mod user_mapping;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::ListName;
use crate::engine::CorrectionResult;
use crate::error::Result;
use crate::gate::{ConfidenceGate, GateVerdict};
use crate::text::column_tokens;

pub use fuzzy::FuzzyStrategy;
pub use generative::{GenerativeCorrector, GenerativeStrategy};
pub use semantic::EmbeddingStrategy;
pub use spelling::DictionaryStrategy;
pub use user_mapping::UserMappingStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    UserMapping,
    Dictionary,
    Fuzzy,
    Embedding,
    Generative,
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyId::UserMapping => "user_mapping",
            StrategyId::Dictionary => "dictionary",
            StrategyId::Fuzzy => "fuzzy",
            StrategyId::Embedding => "embedding",
            StrategyId::Generative => "generative",
        };
        f.write_str(name)
    }
}

/// What kind of value a column holds, as far as reference matching goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Name,
    City,
    Country,
    Company,
    FreeText,
}

const COMPANY_TOKENS: &[&str] = &[
    "company", "companies", "organization", "organisation", "org", "employer", "firm", "business",
];
const COUNTRY_TOKENS: &[&str] = &["country", "countries", "nation", "nationality"];
const CITY_TOKENS: &[&str] = &["city", "cities", "town", "hometown", "municipality"];
const NAME_TOKENS: &[&str] = &[
    "name", "names", "surname", "firstname", "lastname", "fullname", "givenname", "middlename",
];

impl Domain {
    /// Map a column name onto a domain by its whole tokens ("home_town",
    /// "CompanyName"), never by substrings, so "capacity" is not a city.
    /// Company and country win over name, so "company_name" is a company.
    pub fn from_hint(column_hint: Option<&str>) -> Domain {
        let Some(hint) = column_hint else {
            return Domain::FreeText;
        };
        let tokens = column_tokens(hint);
        let has = |vocab: &[&str]| tokens.iter().any(|t| vocab.contains(&t.as_str()));
        if has(COMPANY_TOKENS) {
            Domain::Company
        } else if has(COUNTRY_TOKENS) {
            Domain::Country
        } else if has(CITY_TOKENS) {
            Domain::City
        } else if has(NAME_TOKENS) {
            Domain::Name
        } else {
            Domain::FreeText
        }
    }

    pub fn reference_list(&self) -> Option<ListName> {
        match self {
            Domain::Name => Some(ListName::Names),
            Domain::City => Some(ListName::Cities),
            Domain::Country => Some(ListName::Countries),
            Domain::Company => Some(ListName::Companies),
            Domain::FreeText => None,
        }
    }

    /// Names, cities and countries come from curated lists.
    pub fn is_curated(&self) -> bool {
        matches!(self, Domain::Name | Domain::City | Domain::Country)
    }
}

/// Per-request inputs shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub column_hint: Option<&'a str>,
    pub domain: Domain,
    pub record_context: Option<&'a serde_json::Value>,
    /// The value as the request wrote it; strategies otherwise see its normalized key.
    pub original: Option<&'a str>,
}

impl<'a> StrategyContext<'a> {
    pub fn new(column_hint: Option<&'a str>) -> Self {
        Self {
            column_hint,
            domain: Domain::from_hint(column_hint),
            record_context: None,
            original: None,
        }
    }

    pub fn with_original(mut self, original: &'a str) -> Self {
        self.original = Some(original);
        self
    }

    pub fn with_record(mut self, record_context: Option<&'a serde_json::Value>) -> Self {
        self.record_context = record_context;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub strategy_id: StrategyId,
    /// `None` means the strategy abstains.
    pub candidate: Option<String>,
    pub confidence: f64,
}

impl StrategyResult {
    pub fn abstain(strategy_id: StrategyId) -> Self {
        Self {
            strategy_id,
            candidate: None,
            confidence: 0.0,
        }
    }

    pub fn propose(strategy_id: StrategyId, candidate: impl Into<String>, confidence: f64) -> Self {
        Self {
            strategy_id,
            candidate: Some(candidate.into()),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn abstains(&self) -> bool {
        self.candidate.is_none()
    }
}

pub trait CorrectionStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    fn propose(&self, value: &str, ctx: &StrategyContext<'_>) -> Result<StrategyResult>;
}

pub struct StrategyChain {
    strategies: Vec<Box<dyn CorrectionStrategy>>,
    gate: ConfidenceGate,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn CorrectionStrategy>>, gate: ConfidenceGate) -> Self {
        Self { strategies, gate }
    }

    pub fn ids(&self) -> Vec<StrategyId> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// Run strategies in order until one candidate passes the gate.
    ///
    /// A failing strategy is logged and treated as abstaining. A candidate equal
    /// to the value itself ends the chain with no change.
    pub fn correct(&self, value: &str, ctx: &StrategyContext<'_>) -> CorrectionResult {
        for strategy in &self.strategies {
            let proposal = match strategy.propose(value, ctx) {
                Ok(proposal) => proposal,
                Err(e) => {
                    warn!("{} strategy failed on '{}': {}", strategy.id(), value, e);
                    continue;
                }
            };
            let Some(candidate) = proposal.candidate.as_deref() else {
                continue;
            };
            match self.gate.evaluate(
                value,
                candidate,
                proposal.confidence,
                proposal.strategy_id,
                ctx.domain,
            ) {
                GateVerdict::Accepted(result) => {
                    debug!(
                        "{} corrected '{}' -> '{}' (confidence {:.2})",
                        proposal.strategy_id, value, result.corrected, result.confidence
                    );
                    return result;
                }
                GateVerdict::Unchanged => return CorrectionResult::unchanged(value),
                GateVerdict::Rejected(reason) => {
                    debug!(
                        "Gate rejected {} candidate '{}' for '{}': {:?}",
                        proposal.strategy_id, candidate, value, reason
                    );
                }
            }
        }
        CorrectionResult::unchanged(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ReferenceCatalog, ReferenceList};
    use crate::config::{CorrectionConfig, Sources, Thresholds};
    use crate::error::CleanError;
    use crate::protect::LexicalDetector;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        id: StrategyId,
        answer: Option<(&'static str, f64)>,
        calls: Arc<AtomicUsize>,
    }

    impl CorrectionStrategy for Fixed {
        fn id(&self) -> StrategyId {
            self.id
        }

        fn propose(&self, _value: &str, _ctx: &StrategyContext<'_>) -> Result<StrategyResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match self.answer {
                Some((c, conf)) => StrategyResult::propose(self.id, c, conf),
                None => StrategyResult::abstain(self.id),
            })
        }
    }

    struct Failing;

    impl CorrectionStrategy for Failing {
        fn id(&self) -> StrategyId {
            StrategyId::Embedding
        }

        fn propose(&self, _value: &str, _ctx: &StrategyContext<'_>) -> Result<StrategyResult> {
            Err(CleanError::Embedding("model unavailable".to_string()))
        }
    }

    fn gate(whitelist: &[&str]) -> ConfidenceGate {
        let catalog = ReferenceCatalog::with_lists(
            Sources::default(),
            vec![ReferenceList::new(ListName::Whitelist, whitelist.iter().copied())],
        );
        let detector = LexicalDetector::new(Arc::new(catalog), &CorrectionConfig::default());
        ConfidenceGate::new(Arc::new(detector), Thresholds::default())
    }

    fn fixed(
        id: StrategyId,
        answer: Option<(&'static str, f64)>,
    ) -> (Box<dyn CorrectionStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Fixed {
            id,
            answer,
            calls: calls.clone(),
        };
        (Box::new(strategy), calls)
    }

    #[test]
    fn test_domain_from_hint() {
        assert_eq!(Domain::from_hint(Some("City")), Domain::City);
        assert_eq!(Domain::from_hint(Some("home_town")), Domain::City);
        assert_eq!(Domain::from_hint(Some("company_name")), Domain::Company);
        assert_eq!(Domain::from_hint(Some("First Name")), Domain::Name);
        assert_eq!(Domain::from_hint(Some("country")), Domain::Country);
        assert_eq!(Domain::from_hint(Some("notes")), Domain::FreeText);
        assert_eq!(Domain::from_hint(None), Domain::FreeText);
        assert_eq!(Domain::from_hint(Some("CompanyName")), Domain::Company);
        assert_eq!(Domain::from_hint(Some("birth-country")), Domain::Country);
        assert!(Domain::City.is_curated());
        assert!(!Domain::Company.is_curated());
    }

    #[test]
    fn test_domain_ignores_embedded_words() {
        for column in ["capacity", "ethnicity", "electricity_provider", "downtown_office"] {
            assert_eq!(Domain::from_hint(Some(column)), Domain::FreeText, "{}", column);
        }
        assert_eq!(Domain::from_hint(Some("destination")), Domain::FreeText);
        assert_eq!(Domain::from_hint(Some("username")), Domain::FreeText);
        assert_eq!(Domain::from_hint(Some("nickname")), Domain::FreeText);
    }

    #[test]
    fn test_first_accepted_candidate_halts_chain() {
        let (low, low_calls) = fixed(StrategyId::Fuzzy, Some(("Mumbai", 0.5)));
        let (high, high_calls) = fixed(StrategyId::Embedding, Some(("Mumbai", 0.9)));
        let (after, after_calls) = fixed(StrategyId::Generative, Some(("Bombay", 0.0)));
        let chain = StrategyChain::new(vec![low, high, after], gate(&[]));

        let result = chain.correct("mumbay", &StrategyContext::new(Some("city")));
        assert_eq!(result.corrected, "Mumbai");
        assert_eq!(result.source, Some(StrategyId::Embedding));
        assert_eq!(low_calls.load(Ordering::SeqCst), 1);
        assert_eq!(high_calls.load(Ordering::SeqCst), 1);
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_counts_as_abstain() {
        let (next, next_calls) = fixed(StrategyId::Generative, Some(("Pune", 0.0)));
        let chain = StrategyChain::new(vec![Box::new(Failing), next], gate(&[]));
        let result = chain.correct("poona", &StrategyContext::new(Some("city")));
        assert_eq!(result.corrected, "Pune");
        assert_eq!(next_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_abstain_is_no_change() {
        let (a, _) = fixed(StrategyId::Dictionary, None);
        let (b, _) = fixed(StrategyId::Fuzzy, None);
        let chain = StrategyChain::new(vec![a, b], gate(&[]));
        let result = chain.correct("xyz", &StrategyContext::new(None));
        assert_eq!(result, CorrectionResult::unchanged("xyz"));
    }

    #[test]
    fn test_canonical_value_stops_before_generative() {
        let (fuzzy, _) = fixed(StrategyId::Fuzzy, Some(("Mumbai", 1.0)));
        let (generative, generative_calls) = fixed(StrategyId::Generative, Some(("Bombay", 0.0)));
        let chain = StrategyChain::new(vec![fuzzy, generative], gate(&[]));
        let result = chain.correct("Mumbai", &StrategyContext::new(Some("city")));
        assert_eq!(result.source, None);
        assert_eq!(generative_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_protected_candidate_falls_through() {
        let (fuzzy, _) = fixed(StrategyId::Fuzzy, Some(("Drishti", 0.95)));
        let (embedding, _) = fixed(StrategyId::Embedding, Some(("Drishya", 0.7)));
        let chain = StrategyChain::new(vec![fuzzy, embedding], gate(&["drishti"]));
        let result = chain.correct("Drishty", &StrategyContext::new(Some("name")));
        assert_eq!(result.corrected, "Drishya");
        assert_eq!(result.source, Some(StrategyId::Embedding));
    }
}
