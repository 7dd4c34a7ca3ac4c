//! Spell dictionary for the dictionary correction strategy.
//!
//! Validity checks consult Hunspell dictionaries for English, German and French
//! (via zspell) plus a frequency word list. Suggestions come from a SymSpell
//! index over the frequency list: the closest known spellings within two edits,
//! most frequent first.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use symspell::{SymSpell, UnicodeStringStrategy, Verbosity};
use tracing::{debug, info, warn};
use whatlang::Lang;
use zspell::Dictionary;

use crate::text::title_case;

static DICTIONARY: OnceLock<Arc<SpellDictionary>> = OnceLock::new();

const HUNSPELL_LANGS: [(&str, Lang); 3] = [
    ("en_US", Lang::Eng),
    ("de_DE", Lang::Deu),
    ("fr_FR", Lang::Fra),
];

const FREQUENCY_FILE: &str = "words.txt";

/// Edit distance searched for suggestions; matches SymSpell's default index depth.
const MAX_EDIT_DISTANCE: i64 = 2;

pub struct SpellDictionary {
    hunspell: Vec<(Lang, Dictionary)>,
    frequencies: HashMap<String, u64>,
    suggester: SymSpell<UnicodeStringStrategy>,
}

impl Default for SpellDictionary {
    fn default() -> Self {
        Self::assemble(Vec::new(), HashMap::new())
    }
}

impl SpellDictionary {
    /// Hunspell `<lang>.aff/.dic` pairs and `words.txt` found in `dict_dir`.
    /// Missing or unreadable files are skipped.
    pub fn load(dict_dir: &Path) -> Self {
        let hunspell = HUNSPELL_LANGS
            .iter()
            .filter_map(|(name, lang)| load_hunspell(dict_dir, name).map(|d| (*lang, d)))
            .collect();
        Self::assemble(hunspell, load_frequency_list(&dict_dir.join(FREQUENCY_FILE)))
    }

    /// Frequency-only dictionary, each word counted once.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut frequencies = HashMap::new();
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() {
                *frequencies.entry(word).or_insert(0) += 1;
            }
        }
        Self::assemble(Vec::new(), frequencies)
    }

    pub fn with_frequencies(frequencies: HashMap<String, u64>) -> Self {
        let frequencies = frequencies
            .into_iter()
            .map(|(w, c)| (w.to_lowercase(), c))
            .collect();
        Self::assemble(Vec::new(), frequencies)
    }

    fn assemble(hunspell: Vec<(Lang, Dictionary)>, frequencies: HashMap<String, u64>) -> Self {
        let mut suggester: SymSpell<UnicodeStringStrategy> = SymSpell::default();
        for (word, count) in &frequencies {
            if word.chars().any(char::is_whitespace) {
                continue;
            }
            let line = format!("{} {}", word, (*count).clamp(1, i64::MAX as u64));
            suggester.load_dictionary_line(&line, 0, 1, " ");
        }
        Self {
            hunspell,
            frequencies,
            suggester,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hunspell.is_empty() && self.frequencies.is_empty()
    }

    /// Known in any loaded dictionary, as written, lowercased or capitalized.
    /// Hunspell lists proper nouns capitalized.
    pub fn is_known(&self, word: &str) -> bool {
        if self.check_exact(word) {
            return true;
        }
        let lower = word.to_lowercase();
        if lower != word && self.check_exact(&lower) {
            return true;
        }
        let capitalized = title_case(&lower);
        capitalized != word && self.check_exact(&capitalized)
    }

    fn check_exact(&self, word: &str) -> bool {
        self.frequencies.contains_key(word) || self.hunspell.iter().any(|(_, d)| d.check_word(word))
    }

    /// Whether a dictionary exists for the language. The frequency list is English.
    pub fn supports(&self, lang: Lang) -> bool {
        (lang == Lang::Eng && !self.frequencies.is_empty())
            || self.hunspell.iter().any(|(l, _)| *l == lang)
    }

    /// Known spellings at the smallest edit distance from `word` (zero when the
    /// word itself is listed), most frequent first. Empty when nothing in the
    /// word list is within two edits.
    pub fn candidates(&self, word: &str) -> Vec<String> {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Vec::new();
        }
        let mut suggestions = self.suggester.lookup(&word, Verbosity::Closest, MAX_EDIT_DISTANCE);
        suggestions.sort_by(|a, b| {
            a.distance
                .cmp(&b.distance)
                .then_with(|| b.count.cmp(&a.count))
                .then_with(|| a.term.cmp(&b.term))
        });
        suggestions.into_iter().map(|s| s.term).collect()
    }

    /// Most frequent candidate, if any.
    pub fn correction(&self, word: &str) -> Option<String> {
        self.candidates(word).into_iter().next()
    }

    pub fn stats(&self) -> String {
        let langs: Vec<&str> = self.hunspell.iter().map(|(l, _)| l.code()).collect();
        format!(
            "Dictionaries loaded: hunspell=[{}], words={}",
            langs.join(","),
            self.frequencies.len()
        )
    }
}

/// `word count` or bare `word` per line; `#` starts a comment line.
fn load_frequency_list(path: &Path) -> HashMap<String, u64> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("No frequency word list at {}: {}", path.display(), e);
            return HashMap::new();
        }
    };
    let mut words = HashMap::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else { continue };
        let count = parts.next().and_then(|c| c.parse().ok()).unwrap_or(1);
        *words.entry(word.to_lowercase()).or_insert(0) += count;
    }
    info!("Loaded frequency word list: {} words", words.len());
    words
}

fn load_hunspell(dict_dir: &Path, name: &str) -> Option<Dictionary> {
    let aff_path = dict_dir.join(format!("{}.aff", name));
    let dic_path = dict_dir.join(format!("{}.dic", name));
    if !aff_path.exists() || !dic_path.exists() {
        debug!("No Hunspell dictionary for {}", name);
        return None;
    }

    let built = fs::read_to_string(&aff_path)
        .and_then(|aff| Ok((aff, fs::read_to_string(&dic_path)?)))
        .map_err(|e| e.to_string())
        .and_then(|(aff, dic)| {
            zspell::builder()
                .config_str(&aff)
                .dict_str(&dic)
                .build()
                .map_err(|e| e.to_string())
        });
    match built {
        Ok(dict) => {
            info!("Loaded Hunspell dictionary {}", name);
            Some(dict)
        }
        Err(e) => {
            warn!("Skipping Hunspell dictionary {}: {}", name, e);
            None
        }
    }
}

/// Process-wide dictionary; later calls return the instance loaded first.
pub fn init_dictionary(dict_dir: &Path) -> Arc<SpellDictionary> {
    DICTIONARY
        .get_or_init(|| {
            let dict = if dict_dir.exists() {
                SpellDictionary::load(dict_dir)
            } else {
                warn!("Dictionary directory not found: {}", dict_dir.display());
                SpellDictionary::default()
            };
            info!("Dictionary initialization complete: {}", dict.stats());
            Arc::new(dict)
        })
        .clone()
}
