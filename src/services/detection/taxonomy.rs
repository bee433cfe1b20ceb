// Taxonomy Classifier
// Resolves canonical names to phylum/class from the reference taxonomy table.

use crate::error::{CatalogError, Result};
use crate::models::UNKNOWN_TAXON;
use crate::services::text_processor::normalize_key;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

pub const SUPPORTED_PHYLA: [&str; 7] = [
    "Arthropoda",
    "Cnidaria",
    "Mollusca",
    "Chordata",
    "Echinodermata",
    "Porifera",
    "Annelida",
];

#[derive(Debug, Clone, Deserialize)]
struct TaxonomyFile {
    version: String,
    phyla: Vec<PhylumTable>,
}

#[derive(Debug, Clone, Deserialize)]
struct PhylumTable {
    phylum: String,
    #[serde(default)]
    species: Vec<SpeciesRow>,
    #[serde(default)]
    genera: Vec<GenusRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpeciesRow {
    name: String,
    class: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GenusRow {
    genus: String,
    class: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    pub phylum: String,
    pub class: String,
    pub resolved: bool,
}

impl Taxonomy {
    pub fn unknown() -> Self {
        Self {
            phylum: UNKNOWN_TAXON.to_string(),
            class: UNKNOWN_TAXON.to_string(),
            resolved: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaxonomyClassifier {
    version: String,
    names: HashMap<String, (String, String)>,
    genera: HashMap<String, (String, String)>,
}

const BUILTIN_TAXONOMY: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/taxonomy.json"));

fn builtin_file() -> &'static TaxonomyFile {
    static FILE: OnceLock<TaxonomyFile> = OnceLock::new();
    FILE.get_or_init(|| serde_json::from_str(BUILTIN_TAXONOMY).expect("taxonomy.json parse failed"))
}

impl TaxonomyClassifier {
    pub fn builtin() -> Self {
        Self::from_file(builtin_file().clone()).expect("builtin taxonomy is valid")
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: TaxonomyFile = serde_json::from_str(raw)?;
        Self::from_file(file)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: TaxonomyFile = serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_file(file)
    }

    fn from_file(file: TaxonomyFile) -> Result<Self> {
        let mut names = HashMap::new();
        let mut genera = HashMap::new();

        for table in file.phyla {
            let phylum = table.phylum.trim().to_string();
            if !SUPPORTED_PHYLA.contains(&phylum.as_str()) {
                return Err(CatalogError::ReferenceData(format!(
                    "unsupported phylum {:?} in taxonomy table",
                    phylum
                )));
            }
            for row in table.species {
                let key = normalize_key(&row.name);
                if key.is_empty() {
                    continue;
                }
                names.insert(key, (phylum.clone(), row.class.trim().to_string()));
            }
            for row in table.genera {
                let key = normalize_key(&row.genus);
                if key.is_empty() {
                    continue;
                }
                genera.insert(key, (phylum.clone(), row.class.trim().to_string()));
            }
        }

        Ok(Self {
            version: file.version,
            names,
            genera,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn has_genus(&self, genus: &str) -> bool {
        self.genera.contains_key(&normalize_key(genus))
    }

    /// Resolve a canonical name; falls back to its genus, then to "Unknown"
    pub fn classify(&self, canonical_name: &str) -> Taxonomy {
        let key = normalize_key(canonical_name);
        let hit = self.names.get(&key).or_else(|| {
            let genus = key.split(' ').next().unwrap_or("");
            self.genera.get(genus)
        });

        match hit {
            Some((phylum, class)) => Taxonomy {
                phylum: phylum.clone(),
                class: class.clone(),
                resolved: true,
            },
            None => Taxonomy::unknown(),
        }
    }
}
