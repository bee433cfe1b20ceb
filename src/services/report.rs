// Text Report
// Human-readable summary of a catalog, grouped by phylum.

use crate::models::{Catalog, SpeciesGroup};
use std::fmt::Write;

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn write_group(out: &mut String, group: &SpeciesGroup, show_occurrences: usize) {
    let scientific = group
        .scientific_name
        .as_deref()
        .map(|s| format!(" ({})", s))
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "  #{:<3} {}{} [{}]  mentions={} first={} last={} confidence={:.2} via {}",
        group.id,
        group.common_name,
        scientific,
        group.class,
        group.total_mentions,
        group.first_timestamp,
        group.last_timestamp,
        group.confidence,
        group.detection_method
    );
    for occ in group.all_occurrences.iter().take(show_occurrences) {
        let _ = writeln!(out, "        {}  {}", occ.timestamp, preview(&occ.context, 100));
        if let Some(info) = &occ.additional_info {
            let _ = writeln!(out, "                      {}", info);
        }
    }
    if group.all_occurrences.len() > show_occurrences {
        let _ = writeln!(
            out,
            "        ... ({} more)",
            group.all_occurrences.len() - show_occurrences
        );
    }
}

/// Plain-text report; `show_occurrences` limits the contexts listed per species
pub fn render_report(catalog: &Catalog, show_occurrences: usize) -> String {
    let mut out = String::new();
    let meta = catalog.metadata();
    let stats = catalog.stats();

    let _ = writeln!(out, "Source: {}", meta.source);
    let _ = writeln!(
        out,
        "Cues: {}  Species: {}  Mean confidence: {:.2}",
        meta.total_cues, stats.total_species, stats.avg_confidence
    );
    let _ = writeln!(
        out,
        "Lexicon: {}  Taxonomy: {}",
        meta.lexicon_version, meta.taxonomy_version
    );

    if !stats.by_method.is_empty() {
        let methods = stats
            .by_method
            .iter()
            .map(|(m, n)| format!("{}={}", m, n))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "By method: {}", methods);
    }

    if catalog.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No species detected.");
    }

    for (phylum, groups) in catalog.organize_by_taxonomy() {
        let _ = writeln!(out);
        let _ = writeln!(out, "== {} ({}) ==", phylum, groups.len());
        for group in groups {
            write_group(&mut out, group, show_occurrences);
        }
    }

    if !catalog.parse_warnings().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Parse warnings: {}", catalog.parse_warnings().len());
        for w in catalog.parse_warnings() {
            let _ = writeln!(out, "  line {}: {} ({})", w.line, w.kind.as_str(), w.message);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CatalogMetadata, Detection, DetectionMethod, ParseWarning, ParseWarningKind, Timestamp, UNKNOWN_TAXON,
    };
    use crate::services::detection::build_catalog;

    fn group(id: u32, name: &str, phylum: &str) -> SpeciesGroup {
        let occ = Detection {
            timestamp: Timestamp::from_millis(70_500),
            context: format!("Miren ese {}", name),
            thumbnail_url: None,
            confidence: 0.9,
            detection_method: DetectionMethod::KnownPattern,
            additional_info: Some("depth: 800 m".to_string()),
            phylum: phylum.to_string(),
            class: UNKNOWN_TAXON.to_string(),
            cue_index: 0,
        };
        SpeciesGroup {
            id,
            common_name: name.to_string(),
            scientific_name: None,
            phylum: phylum.to_string(),
            class: UNKNOWN_TAXON.to_string(),
            detection_method: DetectionMethod::KnownPattern,
            confidence: 0.9,
            total_mentions: 1,
            first_timestamp: occ.timestamp,
            last_timestamp: occ.timestamp,
            main_thumbnail: None,
            all_occurrences: vec![occ],
        }
    }

    #[test]
    fn test_report_sections() {
        let catalog = build_catalog(
            CatalogMetadata {
                source: "dive.srt".to_string(),
                total_cues: 3,
                ..CatalogMetadata::default()
            },
            vec![group(1, "pulpo", "Mollusca"), group(2, "gusano", UNKNOWN_TAXON)],
            vec![ParseWarning {
                line: 5,
                kind: ParseWarningKind::MissingTimestamp,
                message: "cue block has no timing line".to_string(),
            }],
        );
        let report = render_report(&catalog, 3);
        assert!(report.contains("Source: dive.srt"));
        assert!(report.contains("== Mollusca (1) =="));
        assert!(report.contains("== Unknown (1) =="));
        assert!(report.contains("00:01:10.500  Miren ese pulpo"));
        assert!(report.contains("depth: 800 m"));
        assert!(report.contains("line 5: missing_timestamp"));
    }

    #[test]
    fn test_empty_report() {
        let catalog = build_catalog(CatalogMetadata::default(), Vec::new(), Vec::new());
        let report = render_report(&catalog, 3);
        assert!(report.contains("No species detected."));
        assert!(!report.contains("=="));
    }
}
