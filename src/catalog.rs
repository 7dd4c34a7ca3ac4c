//! Reference catalog: canonical value lists loaded once and shared.
//!
//! Each list is read from its source on first access and cached for the
//! process lifetime. A missing or unreadable source yields an empty list so
//! strategies simply find nothing to match against. The whitelist and the
//! user-correction map are the only lists written back to disk.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::Sources;
use crate::defaults;
use crate::error::{CleanError, Result};
use crate::text::{fold_for_match, normalize_key, whitelist_key};

/// Process-wide catalog (initialized once, reused)
static CATALOG: OnceLock<Arc<ReferenceCatalog>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListName {
    Names,
    Cities,
    Countries,
    Companies,
    Whitelist,
}

impl ListName {
    pub const ALL: [ListName; 5] = [
        ListName::Names,
        ListName::Cities,
        ListName::Countries,
        ListName::Companies,
        ListName::Whitelist,
    ];

    fn source<'a>(&self, sources: &'a Sources) -> Option<&'a PathBuf> {
        match self {
            ListName::Names => sources.names.as_ref(),
            ListName::Cities => sources.cities.as_ref(),
            ListName::Countries => sources.countries.as_ref(),
            ListName::Companies => sources.companies.as_ref(),
            ListName::Whitelist => sources.whitelist.as_ref(),
        }
    }

    /// Shipped entries used when the list has no source file.
    fn builtin(&self) -> Option<&'static [&'static str]> {
        match self {
            ListName::Names => Some(defaults::NAMES),
            ListName::Cities => Some(defaults::CITIES),
            ListName::Countries => Some(defaults::COUNTRIES),
            ListName::Companies | ListName::Whitelist => None,
        }
    }

    fn key(&self, value: &str) -> String {
        match self {
            ListName::Whitelist => whitelist_key(value),
            _ => fold_for_match(value),
        }
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListName::Names => "names",
            ListName::Cities => "cities",
            ListName::Countries => "countries",
            ListName::Companies => "companies",
            ListName::Whitelist => "whitelist",
        };
        f.write_str(name)
    }
}

/// Immutable snapshot of one canonical value collection.
#[derive(Debug, Clone)]
pub struct ReferenceList {
    name: ListName,
    entries: Vec<String>,
    keys: Vec<String>,
    index: HashSet<String>,
}

impl ReferenceList {
    pub fn new<I, S>(name: ListName, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self {
            name,
            entries: Vec::new(),
            keys: Vec::new(),
            index: HashSet::new(),
        };
        for value in values {
            list.push(value.into());
        }
        list
    }

    pub fn empty(name: ListName) -> Self {
        Self::new(name, Vec::<String>::new())
    }

    fn push(&mut self, value: String) {
        let value = match self.name {
            ListName::Whitelist => whitelist_key(&value),
            _ => value.trim().to_string(),
        };
        let key = self.name.key(&value);
        if key.is_empty() || !self.index.insert(key.clone()) {
            return;
        }
        self.entries.push(value);
        self.keys.push(key);
    }

    pub fn name(&self) -> ListName {
        self.name
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Entries paired with their comparison keys.
    pub fn keyed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(String::as_str)
            .zip(self.keys.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Membership by the list's own key form (accent/case-insensitive).
    pub fn contains(&self, value: &str) -> bool {
        self.index.contains(&self.name.key(value))
    }
}

pub struct ReferenceCatalog {
    sources: Sources,
    lists: RwLock<HashMap<ListName, Arc<ReferenceList>>>,
    user_mappings: RwLock<Option<Arc<HashMap<String, String>>>>,
    loads: AtomicUsize,
}

impl ReferenceCatalog {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            lists: RwLock::new(HashMap::new()),
            user_mappings: RwLock::new(None),
            loads: AtomicUsize::new(0),
        }
    }

    /// Catalog seeded with in-memory lists; nothing is read from disk for them.
    pub fn with_lists(sources: Sources, lists: Vec<ReferenceList>) -> Self {
        let catalog = Self::new(sources);
        {
            let mut guard = catalog.lists.write();
            for list in lists {
                guard.insert(list.name(), Arc::new(list));
            }
        }
        catalog
    }

    /// Initialize the process-wide catalog. Later calls return the first instance.
    pub fn init_global(sources: Sources) -> Arc<ReferenceCatalog> {
        CATALOG
            .get_or_init(|| Arc::new(ReferenceCatalog::new(sources)))
            .clone()
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// Number of source reads performed so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn get(&self, name: ListName) -> Arc<ReferenceList> {
        if let Some(list) = self.lists.read().get(&name) {
            return list.clone();
        }
        let mut lists = self.lists.write();
        // Another worker may have loaded it while we waited for the write lock.
        if let Some(list) = lists.get(&name) {
            return list.clone();
        }
        let list = Arc::new(self.load_list(name));
        lists.insert(name, list.clone());
        list
    }

    pub fn reload(&self, name: ListName) -> Arc<ReferenceList> {
        let list = Arc::new(self.load_list(name));
        self.lists.write().insert(name, list.clone());
        list
    }

    pub fn reload_user_mappings(&self) {
        let mappings = Arc::new(self.load_user_mappings());
        *self.user_mappings.write() = Some(mappings);
    }

    /// Source file contents; the built-in list when there is no source file; empty
    /// when the source exists but cannot be read.
    fn load_list(&self, name: ListName) -> ReferenceList {
        let Some(path) = name.source(&self.sources) else {
            return Self::fallback(name);
        };
        self.loads.fetch_add(1, Ordering::Relaxed);
        match read_lines(path) {
            Ok(lines) => {
                let list = ReferenceList::new(name, lines);
                info!("Loaded {} list: {} entries", name, list.len());
                list
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found", path.display());
                Self::fallback(name)
            }
            Err(e) => {
                warn!("Failed to read {} list from {}: {}", name, path.display(), e);
                ReferenceList::empty(name)
            }
        }
    }

    fn fallback(name: ListName) -> ReferenceList {
        match name.builtin() {
            Some(entries) => {
                debug!("No {} source, using {} built-in entries", name, entries.len());
                ReferenceList::new(name, entries.iter().copied())
            }
            None => ReferenceList::empty(name),
        }
    }

    fn load_user_mappings(&self) -> HashMap<String, String> {
        let Some(path) = self.sources.user_mappings.as_ref() else {
            return HashMap::new();
        };
        self.loads.fetch_add(1, Ordering::Relaxed);
        if !path.exists() {
            debug!("User mappings file not found: {}", path.display());
            return HashMap::new();
        }
        let parsed = fs::read_to_string(path)
            .map_err(CleanError::from)
            .and_then(|content| {
                serde_json::from_str::<HashMap<String, String>>(&content).map_err(CleanError::from)
            });
        match parsed {
            Ok(raw) => {
                let mappings: HashMap<String, String> = raw
                    .into_iter()
                    .map(|(k, v)| (normalize_key(&k), v.trim().to_string()))
                    .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                    .collect();
                info!("Loaded user mappings: {} entries", mappings.len());
                mappings
            }
            Err(e) => {
                warn!("Failed to read user mappings from {}: {}", path.display(), e);
                HashMap::new()
            }
        }
    }

    pub fn user_mappings(&self) -> Arc<HashMap<String, String>> {
        if let Some(mappings) = self.user_mappings.read().as_ref() {
            return mappings.clone();
        }
        let mut guard = self.user_mappings.write();
        if let Some(mappings) = guard.as_ref() {
            return mappings.clone();
        }
        let mappings = Arc::new(self.load_user_mappings());
        *guard = Some(mappings.clone());
        mappings
    }

    /// Case-insensitive exact lookup of a learned correction.
    pub fn user_mapping(&self, value: &str) -> Option<String> {
        self.user_mappings().get(&normalize_key(value)).cloned()
    }

    /// Record a human correction and persist the whole map.
    ///
    /// The in-memory map is updated before the write, so the mapping stays usable
    /// for this process even when persisting fails.
    pub fn register_user_mapping(&self, original: &str, canonical: &str) -> Result<()> {
        let key = normalize_key(original);
        let canonical = canonical.trim();
        if key.is_empty() || canonical.is_empty() {
            return Err(CleanError::Config(
                "user mapping needs a non-empty original and canonical value".to_string(),
            ));
        }

        // Held across the write so concurrent registrations persist in order.
        let mut guard = self.user_mappings.write();
        let mut mappings = match guard.as_ref() {
            Some(existing) => (**existing).clone(),
            None => self.load_user_mappings(),
        };
        mappings.insert(key.clone(), canonical.to_string());
        let snapshot = Arc::new(mappings);
        *guard = Some(snapshot.clone());
        info!("Registered user mapping '{}' -> '{}'", key, canonical);

        if let Some(path) = self.sources.user_mappings.as_ref() {
            let mut ordered: Vec<(&String, &String)> = snapshot.iter().collect();
            ordered.sort();
            let as_map: serde_json::Map<String, serde_json::Value> = ordered
                .into_iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            let content = serde_json::to_string_pretty(&as_map)?;
            write_atomic(path, content.as_bytes())?;
        }
        Ok(())
    }

    /// Add a protected term. Returns false when the term was already present.
    pub fn add_whitelist_term(&self, term: &str) -> Result<bool> {
        let key = whitelist_key(term);
        if key.is_empty() {
            return Err(CleanError::Config(format!(
                "whitelist term '{}' has no alphabetic characters",
                term
            )));
        }

        // Held across the write so concurrent additions persist in order.
        let mut lists = self.lists.write();
        let current = match lists.get(&ListName::Whitelist) {
            Some(list) => list.clone(),
            None => Arc::new(self.load_list(ListName::Whitelist)),
        };
        if current.contains(&key) {
            lists.entry(ListName::Whitelist).or_insert(current);
            return Ok(false);
        }
        let mut updated = (*current).clone();
        updated.push(key.clone());
        let updated = Arc::new(updated);
        lists.insert(ListName::Whitelist, updated.clone());
        info!("Added whitelist term '{}'", key);

        if let Some(path) = self.sources.whitelist.as_ref() {
            let mut content = updated.entries().join("\n");
            content.push('\n');
            write_atomic(path, content.as_bytes())?;
        }
        Ok(true)
    }
}

/// Non-empty, non-comment lines of a text file.
fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Write to a uniquely named temp file beside the target, then rename over it.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let persist_err = |source: std::io::Error| CleanError::Persist {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(persist_err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(persist_err)?;
    tmp.write_all(contents).map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;
    Ok(())
}
