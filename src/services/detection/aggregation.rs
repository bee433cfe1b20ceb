// Aggregation Logic
// Aggregates species groups into catalog statistics and read-only query views

use crate::models::{
    Catalog, CatalogMetadata, CatalogStats, DetectionMethod, ParseWarning, SpeciesGroup, UNKNOWN_TAXON,
};
use std::collections::BTreeMap;

/// Per-phylum and per-method counts plus the mean group confidence
pub fn compute_stats(groups: &[SpeciesGroup]) -> CatalogStats {
    if groups.is_empty() {
        return CatalogStats::default();
    }

    let mut by_phylum: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_method: BTreeMap<DetectionMethod, usize> = BTreeMap::new();
    for group in groups {
        *by_phylum.entry(group.phylum.clone()).or_insert(0) += 1;
        *by_method.entry(group.detection_method).or_insert(0) += 1;
    }

    let avg_confidence = groups.iter().map(|g| g.confidence).sum::<f64>() / groups.len() as f64;

    CatalogStats {
        total_species: groups.len(),
        by_phylum,
        by_method,
        avg_confidence: avg_confidence.clamp(0.0, 1.0),
    }
}

/// Seal groups into an immutable catalog
pub fn build_catalog(metadata: CatalogMetadata, mut groups: Vec<SpeciesGroup>, parse_warnings: Vec<ParseWarning>) -> Catalog {
    groups.sort_by_key(|g| g.id);
    let stats = compute_stats(&groups);
    Catalog::from_parts(metadata, groups, stats, parse_warnings)
}

/// Filters over a catalog. Every set filter must match (AND).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub phylum: Option<String>,
    pub method: Option<DetectionMethod>,
    pub search: Option<String>,
    pub min_confidence: Option<f64>,
}

impl CatalogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phylum(mut self, phylum: impl Into<String>) -> Self {
        self.phylum = Some(phylum.into());
        self
    }

    pub fn method(mut self, method: DetectionMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(min);
        self
    }

    pub fn matches(&self, group: &SpeciesGroup) -> bool {
        if let Some(phylum) = &self.phylum {
            if group.phylum != *phylum {
                return false;
            }
        }
        if let Some(method) = self.method {
            if group.detection_method != method {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if group.confidence < min {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() {
                let in_common = group.common_name.to_lowercase().contains(&needle);
                let in_scientific = group
                    .scientific_name
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase().contains(&needle));
                if !in_common && !in_scientific {
                    return false;
                }
            }
        }
        true
    }
}

impl Catalog {
    /// Groups matching `query`, ordered by id
    pub fn query(&self, query: &CatalogQuery) -> Vec<&SpeciesGroup> {
        let mut hits: Vec<&SpeciesGroup> = self.groups().iter().filter(|g| query.matches(g)).collect();
        hits.sort_by_key(|g| g.id);
        hits
    }

    /// Groups bucketed by phylum, each bucket in id order
    pub fn organize_by_taxonomy(&self) -> BTreeMap<&str, Vec<&SpeciesGroup>> {
        let mut phyla: BTreeMap<&str, Vec<&SpeciesGroup>> = BTreeMap::new();
        for group in self.groups() {
            phyla.entry(group.phylum.as_str()).or_default().push(group);
        }
        phyla
    }

    /// Groups the taxonomy table could not place, for manual review
    pub fn unresolved(&self) -> Vec<&SpeciesGroup> {
        self.groups().iter().filter(|g| g.phylum == UNKNOWN_TAXON).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;

    fn group(id: u32, name: &str, sci: Option<&str>, phylum: &str, method: DetectionMethod, confidence: f64) -> SpeciesGroup {
        SpeciesGroup {
            id,
            common_name: name.to_string(),
            scientific_name: sci.map(str::to_string),
            phylum: phylum.to_string(),
            class: UNKNOWN_TAXON.to_string(),
            detection_method: method,
            confidence,
            total_mentions: 0,
            first_timestamp: Timestamp::ZERO,
            last_timestamp: Timestamp::ZERO,
            main_thumbnail: None,
            all_occurrences: Vec::new(),
        }
    }

    fn sample() -> Catalog {
        build_catalog(
            CatalogMetadata::default(),
            vec![
                group(3, "gusano", None, UNKNOWN_TAXON, DetectionMethod::Context, 0.5),
                group(1, "pulpo", Some("Octopoda"), "Mollusca", DetectionMethod::KnownPattern, 0.95),
                group(2, "Octopus vulgaris", Some("Octopus vulgaris"), "Mollusca", DetectionMethod::ScientificName, 0.85),
                group(4, "coral", Some("Anthozoa"), "Cnidaria", DetectionMethod::KnownPattern, 0.7),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_aggregate_empty() {
        let catalog = build_catalog(CatalogMetadata::default(), Vec::new(), Vec::new());
        assert_eq!(catalog.stats().total_species, 0);
        assert!(catalog.stats().by_phylum.is_empty());
        assert!(catalog.stats().by_method.is_empty());
        assert_eq!(catalog.stats().avg_confidence, 0.0);
    }

    #[test]
    fn test_stats_counts() {
        let catalog = sample();
        let stats = catalog.stats();
        assert_eq!(stats.total_species, 4);
        assert_eq!(stats.by_phylum["Mollusca"], 2);
        assert_eq!(stats.by_phylum[UNKNOWN_TAXON], 1);
        assert_eq!(stats.by_method[&DetectionMethod::KnownPattern], 2);
        assert!((stats.avg_confidence - 0.75).abs() < 1e-9);
        let ids: Vec<u32> = catalog.groups().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_query_filters_compose() {
        let catalog = sample();
        let all: Vec<u32> = catalog.query(&CatalogQuery::new()).iter().map(|g| g.id).collect();
        assert_eq!(all, vec![1, 2, 3, 4]);

        let mollusca = CatalogQuery::new().phylum("Mollusca");
        assert_eq!(catalog.query(&mollusca).len(), 2);

        let strict = CatalogQuery::new().phylum("Mollusca").min_confidence(0.9);
        let hits = catalog.query(&strict);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].common_name, "pulpo");

        let by_method = CatalogQuery::new().method(DetectionMethod::KnownPattern).min_confidence(0.7);
        let ids: Vec<u32> = catalog.query(&by_method).iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_search_matches_common_or_scientific_name() {
        let catalog = sample();
        let hits = catalog.query(&CatalogQuery::new().search("OCTOP"));
        let ids: Vec<u32> = hits.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(catalog.query(&CatalogQuery::new().search("tiburón")).is_empty());
    }

    #[test]
    fn test_phylum_filter_is_exact() {
        let catalog = sample();
        assert!(catalog.query(&CatalogQuery::new().phylum("mollusca")).is_empty());
    }

    #[test]
    fn test_organize_by_taxonomy_and_unresolved() {
        let catalog = sample();
        let phyla = catalog.organize_by_taxonomy();
        assert_eq!(phyla.keys().copied().collect::<Vec<_>>(), vec!["Cnidaria", "Mollusca", UNKNOWN_TAXON]);
        assert_eq!(phyla["Mollusca"].len(), 2);
        let unresolved = catalog.unresolved();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].common_name, "gusano");
    }
}
