//! Field-value correction for tabular data.
//!
//! A [`Corrector`] takes one cell value plus a column hint and decides whether and
//! how to normalize it. Protected terms pass through untouched; everything else
//! goes through an ordered [`StrategyChain`] (user mapping, dictionary, fuzzy,
//! embedding, generative) whose candidates are accepted or rejected by the
//! [`ConfidenceGate`]. Results are cached per `(column, value)` and every applied
//! correction lands in the [`ChangeLog`].

pub mod cache;
#[cfg(feature = "embeddings-candle")]
pub mod candle_embedder;
pub mod catalog;
pub mod changelog;
pub mod config;
mod defaults;
pub mod dictionary;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod gate;
pub mod protect;
pub mod strategy;
pub mod text;

#[cfg(feature = "python")]
mod python;

pub use cache::{CacheStats, CorrectionCache};
pub use catalog::{ListName, ReferenceCatalog, ReferenceList};
pub use changelog::{ChangeLog, ChangeLogEntry};
pub use config::{CorrectionConfig, Sources, Thresholds};
pub use dictionary::SpellDictionary;
pub use embedding::{EmbeddingIndex, NgramEmbedder, TextEmbedder, default_embedder};
pub use engine::{
    CancelToken, ColumnCorrection, CorrectionRequest, CorrectionResult, Corrector, CorrectorBuilder,
};
pub use error::{CleanError, Result};
pub use gate::{ConfidenceGate, GateVerdict, RejectReason};
pub use protect::{
    EntityKind, EntityRecognizer, GazetteerRecognizer, LexicalDetector, NerDetector,
    ProtectedDecision, ProtectedTermDetector, ProtectionReason,
};
pub use strategy::{
    CorrectionStrategy, Domain, GenerativeCorrector, StrategyChain, StrategyContext, StrategyId,
    StrategyResult,
};
pub use text::CasingClass;
