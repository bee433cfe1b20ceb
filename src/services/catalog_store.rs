// Catalog Storage
// Writes the catalog document atomically and reads it back for the query tool.

use crate::error::{CatalogError, Result};
use crate::models::Catalog;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Pretty JSON with a trailing newline; identical catalogs give identical bytes
pub fn catalog_to_json(catalog: &Catalog) -> Result<String> {
    let mut json = serde_json::to_string_pretty(catalog)?;
    json.push('\n');
    Ok(json)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "catalog.json".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write through a temporary sibling file and rename it into place,
/// so a failed run never leaves a half-written catalog behind.
pub fn write_catalog(catalog: &Catalog, path: &Path) -> Result<()> {
    let json = catalog_to_json(catalog)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CatalogError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = temp_sibling(path);
    if let Err(source) = fs::write(&tmp, json.as_bytes()) {
        let _ = fs::remove_file(&tmp);
        return Err(CatalogError::Write { path: tmp, source });
    }
    if let Err(source) = fs::rename(&tmp, path) {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %e, "catalog.temp_cleanup_failed");
        }
        return Err(CatalogError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    info!(
        path = %path.display(),
        species = catalog.stats().total_species,
        bytes = json.len(),
        "catalog.written"
    );
    Ok(())
}

/// Read a written catalog back. Everything serialized survives; occurrence
/// `cue_index` is not stored and comes back as 0.
pub fn read_catalog(path: &Path) -> Result<Catalog> {
    let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut catalog: Catalog = serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    catalog.restore_occurrence_taxonomy();
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogMetadata;
    use crate::services::analyzer::Analyzer;
    use crate::services::detection::build_catalog;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("marine_catalog_store_{}_{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn empty_catalog() -> Catalog {
        let metadata = CatalogMetadata {
            source: "empty.srt".to_string(),
            ..CatalogMetadata::default()
        };
        build_catalog(metadata, Vec::new(), Vec::new())
    }

    #[test]
    fn test_write_then_read() {
        let dir = temp_dir("roundtrip");
        let path = dir.join("nested").join("catalog.json");
        let catalog = empty_catalog();
        write_catalog(&catalog, &path).unwrap();

        assert!(!temp_sibling(&path).exists());
        let back = read_catalog(&path).unwrap();
        assert_eq!(back, catalog);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_populated_catalog_reads_back() {
        let dir = temp_dir("populated");
        let path = dir.join("catalog.json");
        let text = "1\n00:00:01.000 --> 00:00:03.000\nMiren ese pulpo a 800 metros\n\n2\n00:00:05.000 --> 00:00:07.000\nOtro pulpo y una esponja\n";
        let catalog = Analyzer::builtin().unwrap().analyze_text(text, "dive.srt");
        assert_eq!(catalog.groups().len(), 2);
        write_catalog(&catalog, &path).unwrap();

        let back = read_catalog(&path).unwrap();
        assert_eq!(catalog_to_json(&back).unwrap(), catalog_to_json(&catalog).unwrap());
        assert_eq!(back.metadata(), catalog.metadata());
        assert_eq!(back.stats(), catalog.stats());
        for (read, original) in back.groups().iter().zip(catalog.groups()) {
            assert_eq!(read.common_name, original.common_name);
            assert_eq!(read.all_occurrences.len(), original.all_occurrences.len());
            for (r, o) in read.all_occurrences.iter().zip(&original.all_occurrences) {
                assert_eq!(r.phylum, o.phylum);
                assert_eq!(r.class, o.class);
                assert_eq!(r.timestamp, o.timestamp);
                assert_eq!(r.additional_info, o.additional_info);
            }
        }
        assert_eq!(back.groups()[0].all_occurrences[0].phylum, "Mollusca");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_document_shape() {
        let json = catalog_to_json(&empty_catalog()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["species"].as_array().unwrap().is_empty());
        assert_eq!(value["stats"]["total_species"], 0);
        assert_eq!(value["metadata"]["source"], "empty.srt");
        assert!(value["parse_warnings"].is_array());
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_failed_write_leaves_previous_catalog() {
        let dir = temp_dir("failed");
        fs::create_dir_all(&dir).unwrap();
        // Destination is a directory, so the rename must fail
        let target = dir.join("catalog.json");
        fs::create_dir_all(&target).unwrap();

        let err = write_catalog(&empty_catalog(), &target).unwrap_err();
        assert!(matches!(err, CatalogError::Write { .. }));
        assert!(!temp_sibling(&target).exists());
        assert!(target.is_dir());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_catalog(Path::new("/nonexistent/marine/catalog.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/marine/catalog.json"));
    }
}
