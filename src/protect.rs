//! Protected-term detection: values that no strategy may alter.
//!
//! Rules in precedence order: whitelist membership, identifier column,
//! all-caps acronym, and (with [`NerDetector`]) a named-entity match.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{ListName, ReferenceCatalog};
use crate::config::CorrectionConfig;
use crate::text::{column_tokens, fold_for_match, is_acronym, looks_numeric_short, whitelist_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionReason {
    Whitelist,
    IdentifierColumn,
    Acronym,
    NamedEntity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedDecision {
    pub protected: bool,
    pub reason: Option<ProtectionReason>,
}

impl ProtectedDecision {
    pub const UNPROTECTED: ProtectedDecision = ProtectedDecision {
        protected: false,
        reason: None,
    };

    pub fn because(reason: ProtectionReason) -> Self {
        Self {
            protected: true,
            reason: Some(reason),
        }
    }
}

pub trait ProtectedTermDetector: Send + Sync {
    fn is_protected(&self, value: &str, column_hint: Option<&str>) -> ProtectedDecision;

    /// Whether a proposed replacement is itself a protected term.
    fn protects_candidate(&self, candidate: &str) -> bool;

    /// Let the detector see a column's values once before a dataset pass.
    fn observe_column(&self, _column: &str, _values: &[&str]) {}
}

#[derive(Debug, Clone, Copy)]
struct ColumnVerdict {
    identifier: bool,
    observed: bool,
}

/// Whitelist, identifier-column and acronym rules.
pub struct LexicalDetector {
    catalog: Arc<ReferenceCatalog>,
    keywords: Vec<String>,
    numeric_ratio: f64,
    max_len: usize,
    columns: DashMap<String, ColumnVerdict>,
}

impl LexicalDetector {
    pub fn new(catalog: Arc<ReferenceCatalog>, config: &CorrectionConfig) -> Self {
        Self {
            catalog,
            keywords: config
                .identifier_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            numeric_ratio: config.identifier_numeric_ratio,
            max_len: config.identifier_max_len,
            columns: DashMap::new(),
        }
    }

    fn is_whitelisted(&self, value: &str) -> bool {
        let key = whitelist_key(value);
        !key.is_empty() && self.catalog.get(ListName::Whitelist).contains(&key)
    }

    pub fn is_identifier_column(&self, column: &str) -> bool {
        if let Some(verdict) = self.columns.get(column) {
            return verdict.identifier;
        }
        let identifier = matches_identifier_keyword(column, &self.keywords);
        self.columns
            .entry(column.to_string())
            .or_insert(ColumnVerdict {
                identifier,
                observed: false,
            })
            .identifier
    }
}

impl ProtectedTermDetector for LexicalDetector {
    fn is_protected(&self, value: &str, column_hint: Option<&str>) -> ProtectedDecision {
        if self.is_whitelisted(value) {
            return ProtectedDecision::because(ProtectionReason::Whitelist);
        }
        if let Some(column) = column_hint {
            if self.is_identifier_column(column) {
                return ProtectedDecision::because(ProtectionReason::IdentifierColumn);
            }
        }
        if is_acronym(value) {
            return ProtectedDecision::because(ProtectionReason::Acronym);
        }
        ProtectedDecision::UNPROTECTED
    }

    fn protects_candidate(&self, candidate: &str) -> bool {
        self.is_whitelisted(candidate)
    }

    fn observe_column(&self, column: &str, values: &[&str]) {
        if self.columns.get(column).is_some_and(|v| v.observed) {
            return;
        }
        let by_keyword = matches_identifier_keyword(column, &self.keywords);
        let non_empty: Vec<&&str> = values.iter().filter(|v| !v.trim().is_empty()).collect();
        let numeric = non_empty
            .iter()
            .filter(|v| looks_numeric_short(v, self.max_len))
            .count();
        let by_values =
            !non_empty.is_empty() && numeric as f64 / non_empty.len() as f64 >= self.numeric_ratio;
        let identifier = by_keyword || by_values;
        if identifier {
            debug!(
                "Column '{}' treated as identifier (keyword={}, values={})",
                column, by_keyword, by_values
            );
        }
        self.columns.insert(
            column.to_string(),
            ColumnVerdict {
                identifier,
                observed: true,
            },
        );
    }
}

/// Short keywords must match a whole token; longer ones may prefix or suffix one
/// ("rollno", "postcode").
fn matches_identifier_keyword(column: &str, keywords: &[String]) -> bool {
    column_tokens(column).iter().any(|token| {
        keywords.iter().any(|kw| {
            token == kw
                || (kw.chars().count() >= 4 && (token.starts_with(kw.as_str()) || token.ends_with(kw.as_str())))
        })
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Organization,
    Place,
}

impl EntityKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "person" | "per" => Some(EntityKind::Person),
            "organization" | "organisation" | "org" => Some(EntityKind::Organization),
            "place" | "location" | "loc" | "gpe" => Some(EntityKind::Place),
            _ => None,
        }
    }
}

pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, value: &str) -> Option<EntityKind>;
}

/// Exact (accent/case-insensitive) lookup against a list of known entities.
#[derive(Debug, Default)]
pub struct GazetteerRecognizer {
    entities: HashMap<String, EntityKind>,
}

impl GazetteerRecognizer {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (EntityKind, S)>,
        S: AsRef<str>,
    {
        let entities = entries
            .into_iter()
            .map(|(kind, name)| (fold_for_match(name.as_ref()), kind))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Self { entities }
    }

    /// `kind<TAB>entity` per line; unknown kinds are skipped.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read entity gazetteer {}: {}", path.display(), e);
                return Self::default();
            }
        };
        let recognizer = Self::from_entries(content.lines().filter_map(|line| {
            let (kind, name) = line.split_once('\t')?;
            Some((EntityKind::parse(kind)?, name.trim().to_string()))
        }));
        info!("Loaded entity gazetteer: {} entries", recognizer.entities.len());
        recognizer
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityRecognizer for GazetteerRecognizer {
    fn recognize(&self, value: &str) -> Option<EntityKind> {
        self.entities.get(&fold_for_match(value)).copied()
    }
}

/// Lexical rules followed by a named-entity check.
pub struct NerDetector<R: EntityRecognizer> {
    lexical: LexicalDetector,
    recognizer: R,
}

impl<R: EntityRecognizer> NerDetector<R> {
    pub fn new(lexical: LexicalDetector, recognizer: R) -> Self {
        Self { lexical, recognizer }
    }
}

impl<R: EntityRecognizer> ProtectedTermDetector for NerDetector<R> {
    fn is_protected(&self, value: &str, column_hint: Option<&str>) -> ProtectedDecision {
        let decision = self.lexical.is_protected(value, column_hint);
        if decision.protected {
            return decision;
        }
        match self.recognizer.recognize(value) {
            Some(kind) => {
                debug!("'{}' recognized as {:?}", value, kind);
                ProtectedDecision::because(ProtectionReason::NamedEntity)
            }
            None => ProtectedDecision::UNPROTECTED,
        }
    }

    fn protects_candidate(&self, candidate: &str) -> bool {
        self.lexical.protects_candidate(candidate)
    }

    fn observe_column(&self, column: &str, values: &[&str]) {
        self.lexical.observe_column(column, values);
    }
}

/// Detector selected by configuration: NER-augmented when enabled and a
/// gazetteer is configured, lexical-only otherwise.
pub fn detector_from_config(
    catalog: Arc<ReferenceCatalog>,
    config: &CorrectionConfig,
) -> Arc<dyn ProtectedTermDetector> {
    let lexical = LexicalDetector::new(catalog, config);
    match (config.enable_ner, config.sources.entities.as_ref()) {
        (true, Some(path)) => Arc::new(NerDetector::new(lexical, GazetteerRecognizer::load(path))),
        (true, None) => {
            warn!("Named-entity protection enabled without an entities source");
            Arc::new(lexical)
        }
        (false, _) => Arc::new(lexical),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReferenceList;
    use crate::config::Sources;

    fn detector(whitelist: &[&str]) -> LexicalDetector {
        let catalog = ReferenceCatalog::with_lists(
            Sources::default(),
            vec![ReferenceList::new(ListName::Whitelist, whitelist.iter().copied())],
        );
        LexicalDetector::new(Arc::new(catalog), &CorrectionConfig::default())
    }

    #[test]
    fn test_whitelist_wins_over_acronym() {
        let d = detector(&["india"]);
        assert_eq!(
            d.is_protected("INDIA", Some("country")),
            ProtectedDecision::because(ProtectionReason::Whitelist)
        );
        assert_eq!(
            d.is_protected("USA", Some("country")),
            ProtectedDecision::because(ProtectionReason::Acronym)
        );
        assert_eq!(d.is_protected("A", None), ProtectedDecision::UNPROTECTED);
    }

    #[test]
    fn test_whitelist_uses_alphabetic_key() {
        let d = detector(&["drishti"]);
        assert!(d.is_protected(" Drishti! ", Some("city")).protected);
        assert!(d.protects_candidate("DRISHTI"));
        assert!(!d.protects_candidate("Drisht"));
    }

    #[test]
    fn test_identifier_keywords() {
        let d = detector(&[]);
        for column in ["id", "Employee ID", "userId", "roll_no", "rollno", "phone", "postcode"] {
            assert!(d.is_identifier_column(column), "{column}");
        }
        for column in ["city", "paid_amount", "name", "country"] {
            assert!(!d.is_identifier_column(column), "{column}");
        }
        assert_eq!(
            d.is_protected("Ravi", Some("roll_no")).reason,
            Some(ProtectionReason::IdentifierColumn)
        );
    }

    #[test]
    fn test_observed_numeric_column_is_identifier() {
        let d = detector(&[]);
        d.observe_column("ref", &["1001", "1002", "", "1003", "abc", "1004"]);
        assert!(d.is_identifier_column("ref"));

        d.observe_column("notes", &["hello", "42", "there"]);
        assert!(!d.is_identifier_column("notes"));
    }

    #[test]
    fn test_observation_happens_once_per_column() {
        let d = detector(&[]);
        d.observe_column("ref", &["hello", "world"]);
        d.observe_column("ref", &["1", "2", "3"]);
        assert!(!d.is_identifier_column("ref"));
    }

    #[test]
    fn test_ner_detector() {
        let recognizer = GazetteerRecognizer::from_entries([
            (EntityKind::Organization, "Infosys"),
            (EntityKind::Person, "Drishti"),
        ]);
        let ner = NerDetector::new(detector(&[]), recognizer);
        assert_eq!(
            ner.is_protected("infosys", None).reason,
            Some(ProtectionReason::NamedEntity)
        );
        assert_eq!(ner.is_protected("NASA", None).reason, Some(ProtectionReason::Acronym));
        assert!(!ner.is_protected("mumbay", None).protected);
        assert!(!ner.protects_candidate("Infosys"));
    }

    #[test]
    fn test_gazetteer_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.tsv");
        fs::write(&path, "org\tAcme Corp\nplace\tSão Paulo\nbogus\tThing\nno tab here\n").unwrap();
        let recognizer = GazetteerRecognizer::load(&path);
        assert_eq!(recognizer.len(), 2);
        assert_eq!(recognizer.recognize("sao paulo"), Some(EntityKind::Place));
    }
}
