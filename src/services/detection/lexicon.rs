// Curated colloquial-name lexicon
// Loaded from versioned JSON; the builtin table is embedded at compile time.

use crate::error::{CatalogError, Result};
use crate::services::text_processor::{fold_diacritics, normalize_common_name, normalize_key};
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Deserialize)]
struct LexiconFile {
    version: String,
    #[serde(default)]
    language: String,
    entries: Vec<LexiconEntry>,
    #[serde(default)]
    determiners: Vec<String>,
    #[serde(default)]
    novelty_phrases: Vec<String>,
    #[serde(default)]
    generic_nouns: Vec<String>,
    #[serde(default)]
    stopwords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LexiconEntry {
    /// Canonical colloquial name, also the grouping name.
    pub name: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
    pub forms: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Lexicon {
    version: String,
    language: String,
    entries: Vec<LexiconEntry>,
    form_pattern: Regex,
    /// folded form -> entry
    form_index: HashMap<String, usize>,
    /// lowercase (accented) forms per entry, for exactness checks
    exact_forms: Vec<HashSet<String>>,
    /// normalize_common_name(form) -> entry
    normalized_index: HashMap<String, usize>,
    determiners: Vec<String>,
    novelty_phrases: Vec<String>,
    generic_nouns: HashSet<String>,
    stopwords: HashSet<String>,
}

const BUILTIN_LEXICON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/lexicon_es.json"));

fn builtin_file() -> &'static LexiconFile {
    static FILE: OnceLock<LexiconFile> = OnceLock::new();
    FILE.get_or_init(|| serde_json::from_str(BUILTIN_LEXICON).expect("lexicon_es.json parse failed"))
}

fn folded_set(words: &[String]) -> HashSet<String> {
    words
        .iter()
        .map(|w| normalize_key(w))
        .filter(|w| !w.is_empty())
        .collect()
}

impl Lexicon {
    /// The lexicon shipped with the crate
    pub fn builtin() -> Self {
        Self::from_file(builtin_file().clone()).expect("builtin lexicon is valid")
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: LexiconFile = serde_json::from_str(raw)?;
        Self::from_file(file)
    }

    /// Load a lexicon override from disk
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: LexiconFile = serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_file(file)
    }

    fn from_file(file: LexiconFile) -> Result<Self> {
        let mut form_index: HashMap<String, usize> = HashMap::new();
        let mut normalized_index: HashMap<String, usize> = HashMap::new();
        let mut exact_forms = Vec::with_capacity(file.entries.len());

        for (idx, entry) in file.entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(CatalogError::ReferenceData(format!("lexicon entry #{} has an empty name", idx)));
            }

            let mut exact = HashSet::new();
            // The canonical name always counts as one of its own forms
            for form in std::iter::once(&entry.name).chain(entry.forms.iter()) {
                let folded = normalize_key(form);
                if folded.is_empty() {
                    continue;
                }
                if let Some(&other) = form_index.get(&folded) {
                    if other != idx {
                        return Err(CatalogError::ReferenceData(format!(
                            "form {:?} is listed for both {:?} and {:?}",
                            form, file.entries[other].name, entry.name
                        )));
                    }
                }
                form_index.insert(folded, idx);
                normalized_index.entry(normalize_common_name(form)).or_insert(idx);
                exact.insert(form.trim().to_lowercase());
            }
            exact_forms.push(exact);
        }

        if form_index.is_empty() {
            return Err(CatalogError::ReferenceData("lexicon has no forms".to_string()));
        }

        // Longest form first so multi-word names win over their parts
        let mut forms: Vec<&String> = form_index.keys().collect();
        forms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = forms
            .iter()
            .map(|f| regex::escape(f).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        let form_pattern = Regex::new(&format!(r"\b(?:{})\b", alternation))
            .map_err(|e| CatalogError::ReferenceData(format!("lexicon pattern: {}", e)))?;

        let determiners = file
            .determiners
            .iter()
            .map(|d| normalize_key(d))
            .filter(|d| !d.is_empty())
            .collect();
        let novelty_phrases = file
            .novelty_phrases
            .iter()
            .map(|p| normalize_key(p))
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Self {
            version: file.version,
            language: file.language,
            form_pattern,
            form_index,
            exact_forms,
            normalized_index,
            determiners,
            novelty_phrases,
            generic_nouns: folded_set(&file.generic_nouns),
            stopwords: folded_set(&file.stopwords),
            entries: file.entries,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    /// Alternation of every folded form, for matching against folded text
    pub fn form_pattern(&self) -> &Regex {
        &self.form_pattern
    }

    pub fn entry_for_form(&self, folded_form: &str) -> Option<&LexiconEntry> {
        self.form_index
            .get(&normalize_key(folded_form))
            .map(|&idx| &self.entries[idx])
    }

    /// True when `surface` equals a listed form of the entry, ignoring case only
    pub fn is_exact_form(&self, entry: &LexiconEntry, surface: &str) -> bool {
        let Some(idx) = self.entries.iter().position(|e| e.name == entry.name) else {
            return false;
        };
        let surface = surface.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        self.exact_forms[idx].contains(&surface)
    }

    /// Lookup after diminutive/plural normalization
    pub fn lookup_normalized(&self, word: &str) -> Option<&LexiconEntry> {
        self.normalized_index
            .get(&normalize_common_name(word))
            .map(|&idx| &self.entries[idx])
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(&fold_diacritics(word))
    }

    pub fn is_generic_noun(&self, word: &str) -> bool {
        self.generic_nouns.contains(&fold_diacritics(word))
    }

    pub fn determiners(&self) -> &[String] {
        &self.determiners
    }

    pub fn novelty_phrases(&self) -> &[String] {
        &self.novelty_phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lexicon_loads() {
        let lexicon = Lexicon::builtin();
        assert!(!lexicon.version().is_empty());
        assert_eq!(lexicon.language(), "es");
        assert!(lexicon.entries().len() > 30);
        assert!(!lexicon.novelty_phrases().is_empty());
    }

    #[test]
    fn test_form_lookup_is_diacritic_insensitive() {
        let lexicon = Lexicon::builtin();
        let entry = lexicon.entry_for_form("Camarones").unwrap();
        assert_eq!(entry.name, "camarón");
        assert!(lexicon.entry_for_form("anemona").is_some());
        assert!(lexicon.entry_for_form("submarino").is_none());
    }

    #[test]
    fn test_exactness() {
        let lexicon = Lexicon::builtin();
        let entry = lexicon.entry_for_form("anemona").unwrap().clone();
        assert!(lexicon.is_exact_form(&entry, "Anémona"));
        assert!(!lexicon.is_exact_form(&entry, "anemona"));
    }

    #[test]
    fn test_normalized_lookup() {
        let lexicon = Lexicon::builtin();
        assert_eq!(lexicon.lookup_normalized("pulpitos").unwrap().name, "pulpo");
        assert_eq!(lexicon.lookup_normalized("cangrejitos").unwrap().name, "cangrejo");
        assert!(lexicon.lookup_normalized("mesa").is_none());
    }

    #[test]
    fn test_pattern_prefers_longest_form() {
        let lexicon = Lexicon::builtin();
        let m = lexicon.form_pattern().find("una estrella de mar roja").unwrap();
        assert_eq!(m.as_str(), "estrella de mar");
    }

    #[test]
    fn test_stopwords_and_generic_nouns() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.is_stopword("Después"));
        assert!(lexicon.is_generic_noun("cosa"));
        assert!(!lexicon.is_generic_noun("pulpo"));
    }

    #[test]
    fn test_duplicate_form_is_rejected() {
        let raw = r#"{
            "version": "t",
            "entries": [
                { "name": "pulpo", "forms": ["pulpo"] },
                { "name": "octopus", "forms": ["Pulpo"] }
            ]
        }"#;
        let err = Lexicon::from_json_str(raw).unwrap_err();
        assert!(matches!(err, CatalogError::ReferenceData(_)));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let raw = r#"{ "version": "t", "entries": [ { "name": " ", "forms": ["x"] } ] }"#;
        assert!(Lexicon::from_json_str(raw).is_err());
    }
}
