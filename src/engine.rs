//! The correction engine: protection, cache, strategy chain and change log
//! wired together, plus the free-text and dataset-column passes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, CorrectionCache};
use crate::catalog::ReferenceCatalog;
use crate::changelog::{ChangeLog, ChangeLogEntry};
use crate::config::CorrectionConfig;
use crate::dictionary::{SpellDictionary, init_dictionary};
use crate::embedding::{EmbeddingIndex, TextEmbedder, default_embedder};
use crate::error::{CleanError, Result};
use crate::gate::ConfidenceGate;
use crate::protect::{ProtectedTermDetector, detector_from_config};
use crate::strategy::{
    CorrectionStrategy, DictionaryStrategy, Domain, EmbeddingStrategy, FuzzyStrategy,
    GenerativeCorrector, GenerativeStrategy, StrategyChain, StrategyContext, StrategyId,
    UserMappingStrategy,
};
use crate::text::{apply_casing, is_single_word, normalize_key, word_spans};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRequest {
    pub value: String,
    #[serde(default)]
    pub column_hint: Option<String>,
    /// Opaque to the engine; handed to strategies as-is.
    #[serde(default)]
    pub record_context: Option<serde_json::Value>,
}

impl CorrectionRequest {
    pub fn new(value: impl ToString) -> Self {
        Self {
            value: value.to_string(),
            ..Self::default()
        }
    }

    /// A request for a JSON cell. Null becomes the empty string, other non-string
    /// values their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        Self::new(text)
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column_hint = Some(column.into());
        self
    }

    pub fn with_record(mut self, record: serde_json::Value) -> Self {
        self.record_context = Some(record);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionResult {
    pub original: String,
    pub corrected: String,
    pub confidence: f64,
    /// `None` means no change: `corrected == original`.
    pub source: Option<StrategyId>,
}

impl CorrectionResult {
    pub fn unchanged(original: &str) -> Self {
        Self {
            original: original.to_string(),
            corrected: original.to_string(),
            confidence: 0.0,
            source: None,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.source.is_some()
    }

    /// This result applied to another value with the same normalized key.
    fn rebased(&self, original: &str) -> CorrectionResult {
        if self.source.is_none() {
            return CorrectionResult::unchanged(original);
        }
        let trimmed = original.trim();
        let corrected = apply_casing(trimmed, &self.corrected);
        if corrected == trimmed {
            return CorrectionResult::unchanged(original);
        }
        CorrectionResult {
            original: original.to_string(),
            corrected,
            confidence: self.confidence,
            source: self.source,
        }
    }
}

/// Shared flag that stops a column pass from dispatching more values.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCorrection {
    /// One output value per input row.
    pub values: Vec<String>,
    pub changed: usize,
    pub distinct: usize,
    /// Set when cancellation left some values undispatched (and unchanged).
    pub cancelled: bool,
}

pub struct CorrectorBuilder {
    config: CorrectionConfig,
    catalog: Option<Arc<ReferenceCatalog>>,
    detector: Option<Arc<dyn ProtectedTermDetector>>,
    dictionary: Option<Arc<SpellDictionary>>,
    embedder: Option<Arc<dyn TextEmbedder>>,
    generative: Option<Arc<dyn GenerativeCorrector>>,
    strategies: Option<Vec<Box<dyn CorrectionStrategy>>>,
}

impl CorrectorBuilder {
    pub fn new(config: CorrectionConfig) -> Self {
        Self {
            config,
            catalog: None,
            detector: None,
            dictionary: None,
            embedder: None,
            generative: None,
            strategies: None,
        }
    }

    pub fn catalog(mut self, catalog: Arc<ReferenceCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn ProtectedTermDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn dictionary(mut self, dictionary: Arc<SpellDictionary>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn generative(mut self, corrector: Arc<dyn GenerativeCorrector>) -> Self {
        self.generative = Some(corrector);
        self
    }

    /// Replace the standard strategy order entirely.
    pub fn strategies(mut self, strategies: Vec<Box<dyn CorrectionStrategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    pub fn build(self) -> Result<Corrector> {
        let config = self.config;
        config.validate()?;
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(ReferenceCatalog::new(config.sources.clone())));
        let detector = self
            .detector
            .unwrap_or_else(|| detector_from_config(catalog.clone(), &config));

        let strategies = match self.strategies {
            Some(strategies) => strategies,
            None => {
                let dictionary = self.dictionary.or_else(|| {
                    let dir = config.sources.dictionary_dir.as_ref()?;
                    dir.exists().then(|| Arc::new(SpellDictionary::load(dir)))
                });
                standard_strategies(&config, &catalog, dictionary, self.embedder, self.generative)
            }
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("field-clean-{}", i))
            .build()
            .map_err(|e| CleanError::Config(format!("failed to build worker pool: {}", e)))?;

        let gate = ConfidenceGate::new(detector.clone(), config.thresholds);
        let chain = StrategyChain::new(strategies, gate);
        info!(
            "Corrector ready: strategies={:?}, workers={}",
            chain.ids(),
            pool.current_num_threads()
        );
        Ok(Corrector {
            catalog,
            detector,
            chain,
            cache: CorrectionCache::new(),
            log: ChangeLog::new(),
            pool,
        })
    }
}

/// User mapping, dictionary, fuzzy, embedding, generative; optional ones only
/// when enabled and available.
fn standard_strategies(
    config: &CorrectionConfig,
    catalog: &Arc<ReferenceCatalog>,
    dictionary: Option<Arc<SpellDictionary>>,
    embedder: Option<Arc<dyn TextEmbedder>>,
    generative: Option<Arc<dyn GenerativeCorrector>>,
) -> Vec<Box<dyn CorrectionStrategy>> {
    let mut strategies: Vec<Box<dyn CorrectionStrategy>> =
        vec![Box::new(UserMappingStrategy::new(catalog.clone()))];

    match dictionary {
        Some(dictionary) if !dictionary.is_empty() => {
            strategies.push(Box::new(DictionaryStrategy::new(
                dictionary,
                catalog.clone(),
                config.thresholds.dictionary,
            )));
        }
        _ => debug!("No spell dictionary loaded, dictionary strategy disabled"),
    }

    strategies.push(Box::new(FuzzyStrategy::new(catalog.clone())));

    if config.enable_embedding {
        let index = match embedder {
            Some(embedder) => EmbeddingIndex::with_embedder(embedder),
            None => {
                let model = config.embedding_model.clone();
                EmbeddingIndex::new(move || Ok(default_embedder(model.as_deref())))
            }
        };
        strategies.push(Box::new(EmbeddingStrategy::new(catalog.clone(), Arc::new(index))));
    }

    if config.enable_generative {
        match generative {
            Some(corrector) => strategies.push(Box::new(GenerativeStrategy::new(
                corrector,
                Duration::from_millis(config.generative_timeout_ms),
            ))),
            None => warn!("Generative correction enabled but no corrector is configured"),
        }
    }
    strategies
}

pub struct Corrector {
    catalog: Arc<ReferenceCatalog>,
    detector: Arc<dyn ProtectedTermDetector>,
    chain: StrategyChain,
    cache: CorrectionCache,
    log: ChangeLog,
    pool: rayon::ThreadPool,
}

impl Corrector {
    pub fn builder(config: CorrectionConfig) -> CorrectorBuilder {
        CorrectorBuilder::new(config)
    }

    /// Corrector over the process-wide catalog and dictionary, both loaded once.
    pub fn from_config(config: CorrectionConfig) -> Result<Self> {
        let catalog = ReferenceCatalog::init_global(config.sources.clone());
        let mut builder = CorrectorBuilder::new(config.clone()).catalog(catalog);
        if let Some(dir) = config.sources.dictionary_dir.as_ref() {
            builder = builder.dictionary(init_dictionary(dir));
        }
        builder.build()
    }

    pub fn catalog(&self) -> &Arc<ReferenceCatalog> {
        &self.catalog
    }

    pub fn change_log(&self) -> &ChangeLog {
        &self.log
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn strategy_ids(&self) -> Vec<StrategyId> {
        self.chain.ids()
    }

    /// Forget cached results, e.g. before a new, unrelated dataset.
    pub fn reset_cache(&self) {
        self.cache.clear();
    }

    /// Correct one cell. Multi-word values in a column with no reference domain
    /// are corrected word by word.
    pub fn correct(&self, request: &CorrectionRequest) -> CorrectionResult {
        let hint = request.column_hint.as_deref();
        let result = self.correct_cell(&request.value, hint, request.record_context.as_ref());
        self.log_change(hint, None, &result);
        result
    }

    /// Correct each word of `text` in place, keeping separators and punctuation.
    /// A learned mapping for the whole text is applied instead when one exists.
    pub fn correct_text(&self, text: &str, column_hint: Option<&str>) -> CorrectionResult {
        let result = self.correct_free_text(text, column_hint, None);
        self.log_change(column_hint, None, &result);
        result
    }

    /// Correct a whole column, one strategy pass per distinct value.
    pub fn correct_column<S>(&self, column: &str, values: &[S], cancel: &CancelToken) -> ColumnCorrection
    where
        S: AsRef<str>,
    {
        let rows: Vec<&str> = values.iter().map(AsRef::as_ref).collect();
        self.detector.observe_column(column, &rows);

        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut distinct: Vec<&str> = Vec::new();
        let row_slots: Vec<usize> = rows
            .iter()
            .map(|&value| {
                *slots.entry(value).or_insert_with(|| {
                    distinct.push(value);
                    distinct.len() - 1
                })
            })
            .collect();

        let results: Vec<Option<CorrectionResult>> = self.pool.install(|| {
            distinct
                .par_iter()
                .map(|value| {
                    if cancel.is_cancelled() {
                        None
                    } else {
                        Some(self.correct_cell(value, Some(column), None))
                    }
                })
                .collect()
        });

        let mut out = Vec::with_capacity(rows.len());
        let mut entries = Vec::new();
        let mut cancelled = false;
        for (row, (value, slot)) in rows.iter().zip(&row_slots).enumerate() {
            match &results[*slot] {
                Some(CorrectionResult {
                    corrected,
                    confidence,
                    source: Some(source),
                    ..
                }) => {
                    entries.push(ChangeLogEntry::new(
                        Some(column),
                        Some(row),
                        value,
                        corrected,
                        *source,
                        *confidence,
                    ));
                    out.push(corrected.clone());
                }
                Some(_) => out.push(value.to_string()),
                None => {
                    cancelled = true;
                    out.push(value.to_string());
                }
            }
        }

        let changed = entries.len();
        self.log.extend(entries);
        info!(
            "Column '{}': {} rows, {} distinct, {} corrected{}",
            column,
            rows.len(),
            distinct.len(),
            changed,
            if cancelled { " (cancelled)" } else { "" }
        );
        ColumnCorrection {
            values: out,
            changed,
            distinct: distinct.len(),
            cancelled,
        }
    }

    /// Record a human correction; later requests for `original` use it.
    ///
    /// The mapping is active for this process even when persisting it fails.
    pub fn learn(&self, original: &str, canonical: &str) -> Result<()> {
        let outcome = self.catalog.register_user_mapping(original, canonical);
        self.cache.invalidate_value(original);
        outcome
    }

    /// Add a term to the whitelist. Returns false if it was already protected.
    pub fn protect(&self, term: &str) -> Result<bool> {
        let outcome = self.catalog.add_whitelist_term(term);
        if !matches!(outcome, Ok(false)) {
            // Any cached correction may now target a protected term.
            self.cache.clear();
        }
        outcome
    }

    fn correct_cell(
        &self,
        value: &str,
        column_hint: Option<&str>,
        record_context: Option<&serde_json::Value>,
    ) -> CorrectionResult {
        let trimmed = value.trim();
        if !trimmed.is_empty() && Domain::from_hint(column_hint) == Domain::FreeText && !is_single_word(trimmed) {
            return self.correct_free_text(value, column_hint, record_context);
        }
        self.correct_single(value, column_hint, record_context)
    }

    /// A learned mapping for the whole value wins; otherwise word by word.
    fn correct_free_text(
        &self,
        text: &str,
        column_hint: Option<&str>,
        record_context: Option<&serde_json::Value>,
    ) -> CorrectionResult {
        if self.catalog.user_mapping(text).is_some() {
            return self.correct_single(text, column_hint, record_context);
        }
        self.correct_words(text, column_hint)
    }

    fn correct_single(
        &self,
        value: &str,
        column_hint: Option<&str>,
        record_context: Option<&serde_json::Value>,
    ) -> CorrectionResult {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return CorrectionResult::unchanged(value);
        }
        let decision = self.detector.is_protected(trimmed, column_hint);
        if decision.protected {
            debug!("'{}' protected: {:?}", trimmed, decision.reason);
            return CorrectionResult::unchanged(value);
        }
        // Computed on the key so the stored result depends on nothing else.
        let key = normalize_key(trimmed);
        let ctx = StrategyContext::new(column_hint)
            .with_record(record_context)
            .with_original(trimmed);
        self.cache
            .get_or_compute(column_hint, &key, || self.chain.correct(&key, &ctx))
            .rebased(value)
    }

    fn correct_words(&self, text: &str, column_hint: Option<&str>) -> CorrectionResult {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.detector.is_protected(trimmed, column_hint).protected {
            return CorrectionResult::unchanged(text);
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut source = None;
        let mut confidence = 1.0f64;
        for (start, end) in word_spans(text) {
            out.push_str(&text[last..start]);
            let word = self.correct_single(&text[start..end], column_hint, None);
            if let Some(id) = word.source {
                source.get_or_insert(id);
                confidence = confidence.min(word.confidence);
            }
            out.push_str(&word.corrected);
            last = end;
        }
        out.push_str(&text[last..]);

        match source {
            Some(_) if out != text => CorrectionResult {
                original: text.to_string(),
                corrected: out,
                confidence,
                source,
            },
            _ => CorrectionResult::unchanged(text),
        }
    }

    fn log_change(&self, column: Option<&str>, row: Option<usize>, result: &CorrectionResult) {
        if let Some(source) = result.source {
            self.log.record(ChangeLogEntry::new(
                column,
                row,
                &result.original,
                &result.corrected,
                source,
                result.confidence,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sources;
    use crate::error::CleanError;
    use crate::strategy::StrategyResult;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    fn write_sources(dir: &Path) {
        fs::write(dir.join("cities.txt"), "Mumbai\nPune\nDrisht\nNew York\n").unwrap();
        fs::write(dir.join("countries.txt"), "India\nFrance\nUSA\n").unwrap();
        fs::write(dir.join("whitelist.txt"), "india\ndrishti\n").unwrap();
    }

    fn config_in(dir: &Path) -> CorrectionConfig {
        write_sources(dir);
        CorrectionConfig {
            sources: Sources::in_dir(dir),
            workers: 2,
            ..CorrectionConfig::default()
        }
    }

    fn corrector(dir: &Path) -> Corrector {
        Corrector::builder(config_in(dir))
            .dictionary(Arc::new(SpellDictionary::from_words(["hello", "world", "the"])))
            .build()
            .unwrap()
    }

    /// Always proposes the same candidate and counts its invocations.
    struct Counting {
        candidate: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl CorrectionStrategy for Counting {
        fn id(&self) -> StrategyId {
            StrategyId::Fuzzy
        }

        fn propose(&self, _value: &str, _ctx: &StrategyContext<'_>) -> Result<StrategyResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StrategyResult::propose(self.id(), self.candidate, 0.95))
        }
    }

    fn counting(dir: &Path, candidate: &'static str) -> (Corrector, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Counting {
            candidate,
            calls: calls.clone(),
        };
        let corrector = Corrector::builder(config_in(dir))
            .strategies(vec![Box::new(strategy)])
            .build()
            .unwrap();
        (corrector, calls)
    }

    fn city(value: &str) -> CorrectionRequest {
        CorrectionRequest::new(value).with_column("city")
    }

    #[test]
    fn test_misspelled_city_is_fuzzy_matched() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        let result = c.correct(&city("mumbay"));
        assert_eq!(result.corrected, "Mumbai");
        assert_eq!(result.source, Some(StrategyId::Fuzzy));
        assert_eq!(c.change_log().len(), 1);
    }

    #[test]
    fn test_whitelisted_upper_value_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        let result = c.correct(&CorrectionRequest::new("INDIA").with_column("country"));
        assert_eq!(result, CorrectionResult::unchanged("INDIA"));
        assert!(c.change_log().is_empty());
    }

    #[test]
    fn test_empty_value_invokes_no_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let (c, calls) = counting(dir.path(), "Mumbai");
        for value in ["", "   "] {
            let result = c.correct(&city(value));
            assert_eq!(result.corrected, value);
            assert_eq!(result.source, None);
        }
        assert_eq!(c.correct(&CorrectionRequest::from_json(&serde_json::Value::Null)).source, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_whitelist_beats_similar_reference_entry() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        let result = c.correct(&city("Drishti"));
        assert_eq!(result.corrected, "Drishti");
        assert_eq!(result.source, None);
    }

    #[test]
    fn test_repeated_value_computed_once() {
        let dir = tempfile::tempdir().unwrap();
        let (c, calls) = counting(dir.path(), "Mumbai");
        for _ in 0..500 {
            assert_eq!(c.correct(&city("mumbay")).corrected, "Mumbai");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = c.cache_stats();
        assert_eq!((stats.hits, stats.misses), (499, 1));
        assert_eq!(c.change_log().len(), 500);
    }

    #[test]
    fn test_column_pass_computes_distinct_values_once() {
        let dir = tempfile::tempdir().unwrap();
        let (c, calls) = counting(dir.path(), "Mumbai");
        let values = vec!["mumbay"; 500];
        let out = c.correct_column("city", &values, &CancelToken::new());
        assert!(out.values.iter().all(|v| v == "Mumbai"));
        assert_eq!(out.distinct, 1);
        assert_eq!(out.changed, 500);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_protected_values_never_change() {
        let dir = tempfile::tempdir().unwrap();
        let (c, calls) = counting(dir.path(), "Mumbai");
        for (value, column) in [("india", "city"), ("NYC", "city"), ("mumbay", "roll_no"), ("mumbay", "Phone")] {
            let result = c.correct(&CorrectionRequest::new(value).with_column(column));
            assert_eq!(result, CorrectionResult::unchanged(value), "{value} in {column}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_correcting_twice_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        let first = c.correct(&city("mumbay"));
        let second = c.correct(&city(&first.corrected));
        assert_eq!(second, CorrectionResult::unchanged("Mumbai"));

        let first = c.correct(&CorrectionRequest::new("Helo").with_column("notes"));
        assert_eq!(first.corrected, "Hello");
        assert_eq!(c.correct(&CorrectionRequest::new("Hello").with_column("notes")).source, None);
    }

    #[test]
    fn test_casing_follows_each_original() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        assert_eq!(c.correct(&CorrectionRequest::new("helo")).corrected, "hello");
        // Same cache key, different casing class.
        assert_eq!(c.correct(&CorrectionRequest::new("Helo")).corrected, "Hello");
        assert_eq!(c.correct(&city("Mumbay")).corrected, "Mumbai");
        assert_eq!(c.correct(&city("mumbay")).corrected, "Mumbai");
    }

    #[test]
    fn test_free_text_is_corrected_word_by_word() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        let result = c.correct(&CorrectionRequest::new("Helo wrld, NASA!").with_column("notes"));
        assert_eq!(result.corrected, "Hello world, NASA!");
        assert_eq!(result.source, Some(StrategyId::Dictionary));

        let text = c.correct_text("the  wrld", None);
        assert_eq!(text.corrected, "the  world");
        assert_eq!(c.change_log().len(), 2);
    }

    #[test]
    fn test_column_pass_maps_rows_and_logs_row_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        let values = ["mumbay", "Mumbay", "Pune", "", "mumbay"];
        let out = c.correct_column("city", &values, &CancelToken::new());
        assert_eq!(out.values, vec!["Mumbai", "Mumbai", "Pune", "", "Mumbai"]);
        assert!(!out.cancelled);

        let rows: Vec<Option<usize>> = c.change_log().export().iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![Some(0), Some(1), Some(4)]);
        assert_eq!(c.change_log().corrections_by_column()["city"]["Mumbay"], "Mumbai");
    }

    #[test]
    fn test_numeric_column_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        let out = c.correct_column("ref", &["12", "13", "14", "15", "helo"], &CancelToken::new());
        assert_eq!(out.values[4], "helo");
        assert_eq!(out.changed, 0);
    }

    #[test]
    fn test_cancelled_pass_dispatches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (c, calls) = counting(dir.path(), "Mumbai");
        let cancel = CancelToken::new();
        cancel.cancel();
        let out = c.correct_column("city", &["mumbay", "poona"], &cancel);
        assert!(out.cancelled);
        assert_eq!(out.values, vec!["mumbay", "poona"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(c.change_log().is_empty());
    }

    #[test]
    fn test_learned_mapping_replaces_cached_result() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        assert_eq!(c.correct(&city("Bombay")).source, None);

        c.learn("bombay", "Mumbai").unwrap();
        let result = c.correct(&city("Bombay"));
        assert_eq!(result.corrected, "Mumbai");
        assert_eq!(result.source, Some(StrategyId::UserMapping));

        let restarted = corrector(dir.path());
        assert_eq!(restarted.correct(&city("bombay")).corrected, "Mumbai");
    }

    #[test]
    fn test_learn_persist_failure_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        fs::create_dir_all(blocked.join("inner")).unwrap();
        let mut config = config_in(dir.path());
        config.sources.user_mappings = Some(blocked);
        let c = Corrector::builder(config).build().unwrap();

        assert!(matches!(c.learn("bombay", "Mumbai"), Err(CleanError::Persist { .. })));
        assert_eq!(c.correct(&city("bombay")).corrected, "Mumbai");
    }

    #[test]
    fn test_protect_applies_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        assert_eq!(c.correct(&city("mumbay")).corrected, "Mumbai");
        assert!(c.protect("mumbay").unwrap());
        assert_eq!(c.correct(&city("mumbay")).source, None);
    }

    #[test]
    fn test_standard_strategy_order() {
        struct Upper;
        impl GenerativeCorrector for Upper {
            fn generate(&self, text: &str, _column_hint: Option<&str>) -> Result<String> {
                Ok(text.to_uppercase())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            corrector(dir.path()).strategy_ids(),
            vec![
                StrategyId::UserMapping,
                StrategyId::Dictionary,
                StrategyId::Fuzzy,
                StrategyId::Embedding
            ]
        );

        let config = CorrectionConfig {
            enable_embedding: false,
            enable_generative: true,
            ..config_in(dir.path())
        };
        let c = Corrector::builder(config).generative(Arc::new(Upper)).build().unwrap();
        assert_eq!(
            c.strategy_ids(),
            vec![StrategyId::UserMapping, StrategyId::Fuzzy, StrategyId::Generative]
        );
    }

    #[test]
    fn test_learned_multi_word_mapping_applies() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        c.learn("acme corp", "Acme Corporation").unwrap();

        for request in [
            CorrectionRequest::new("acme corp"),
            CorrectionRequest::new("Acme Corp").with_column("notes"),
        ] {
            let result = c.correct(&request);
            assert_eq!(result.corrected, "Acme Corporation", "{}", request.value);
            assert_eq!(result.source, Some(StrategyId::UserMapping));
        }
        let text = c.correct_text("ACME corp", None);
        assert_eq!(text.corrected, "Acme Corporation");
        assert_eq!(text.source, Some(StrategyId::UserMapping));
    }

    #[test]
    fn test_column_words_must_match_whole_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let c = corrector(dir.path());
        for column in ["ethnicity", "electricity_provider", "downtown_office", "capacity"] {
            let result = c.correct(&CorrectionRequest::new("mumbay").with_column(column));
            assert_eq!(result, CorrectionResult::unchanged("mumbay"), "{column}");
        }
        assert_eq!(c.correct(&CorrectionRequest::new("mumbay").with_column("home_town")).corrected, "Mumbai");
    }

    #[test]
    fn test_builtin_lists_correct_without_sources() {
        let config = CorrectionConfig {
            workers: 2,
            ..CorrectionConfig::default()
        };
        let c = Corrector::builder(config).build().unwrap();
        let result = c.correct(&CorrectionRequest::new("Germny").with_column("country"));
        assert_eq!(result.corrected, "Germany");
        assert_eq!(result.source, Some(StrategyId::Fuzzy));
        assert_eq!(c.correct(&city("Mumbay")).corrected, "Mumbai");
    }

    /// Proposes "Mumbai" and cancels the pass once it has been called `limit` times.
    struct CancellingAfter {
        limit: usize,
        calls: Arc<AtomicUsize>,
        cancel: CancelToken,
    }

    impl CorrectionStrategy for CancellingAfter {
        fn id(&self) -> StrategyId {
            StrategyId::Fuzzy
        }

        fn propose(&self, _value: &str, _ctx: &StrategyContext<'_>) -> Result<StrategyResult> {
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.limit {
                self.cancel.cancel();
            }
            Ok(StrategyResult::propose(self.id(), "Mumbai", 0.95))
        }
    }

    #[test]
    fn test_cancel_mid_pass_leaves_rest_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let cancel = CancelToken::new();
        let strategy = CancellingAfter {
            limit: 2,
            calls: calls.clone(),
            cancel: cancel.clone(),
        };
        // One worker dispatches distinct values in order.
        let config = CorrectionConfig {
            workers: 1,
            ..config_in(dir.path())
        };
        let c = Corrector::builder(config)
            .strategies(vec![Box::new(strategy)])
            .build()
            .unwrap();

        let values = ["mumbay", "mumbey", "mumbay", "bombay", "mumbi", "mumba"];
        let out = c.correct_column("city", &values, &cancel);
        assert!(out.cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.values, vec!["Mumbai", "Mumbai", "Mumbai", "bombay", "mumbi", "mumba"]);
        assert_eq!(out.changed, 3);
        assert_eq!(c.change_log().len(), 3);
    }

    #[test]
    fn test_request_coercion() {
        assert_eq!(CorrectionRequest::from_json(&serde_json::json!(42)).value, "42");
        assert_eq!(CorrectionRequest::from_json(&serde_json::json!("x")).value, "x");
        assert_eq!(CorrectionRequest::new(3.5).value, "3.5");
    }
}
