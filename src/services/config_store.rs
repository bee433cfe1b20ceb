// Configuration Storage Service
// Handles config file read/write and version backup

use crate::error::{CatalogError, Result};
use crate::services::detection::{DetectionSensitivity, ScoringWeights};
use crate::services::thumbnails::DEFAULT_THUMBNAIL_PREFIX;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(default)]
    pub sensitivity: DetectionSensitivity,
    /// Maximum characters of cue text kept as occurrence context (0 keeps everything)
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
    pub lexicon_path: Option<PathBuf>,
    pub taxonomy_path: Option<PathBuf>,
    pub thumbnails_index: Option<PathBuf>,
    #[serde(default = "default_thumbnail_prefix")]
    pub thumbnail_url_prefix: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sensitivity: DetectionSensitivity::Medium,
            context_chars: 200,
            lexicon_path: None,
            taxonomy_path: None,
            thumbnails_index: None,
            thumbnail_url_prefix: DEFAULT_THUMBNAIL_PREFIX.to_string(),
        }
    }
}

fn default_context_chars() -> usize { 200 }
fn default_thumbnail_prefix() -> String { DEFAULT_THUMBNAIL_PREFIX.to_string() }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Store backed by an explicit file; backups go next to it
    pub fn for_file(config_file: PathBuf) -> Self {
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("marine-catalog"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir).map_err(|source| CatalogError::Write {
            path: self.config_dir.clone(),
            source,
        })
    }

    /// Load configuration from file; a missing file yields defaults
    pub fn load(&self) -> Result<AppConfig> {
        if !self.config_file.exists() {
            debug!(path = %self.config_file.display(), "config.missing_using_defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(|source| CatalogError::Read {
            path: self.config_file.clone(),
            source,
        })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|source| CatalogError::Json {
            path: self.config_file.clone(),
            source,
        })?;
        validate(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        validate(config)?;
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;

        fs::write(&self.config_file, content).map_err(|source| CatalogError::Write {
            path: self.config_file.clone(),
            source,
        })
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<()> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(|source| CatalogError::Write {
            path: backup_dir.clone(),
            source,
        })?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(|source| CatalogError::Write {
            path: backup_file.clone(),
            source,
        })?;

        // Keep only last 10 backups
        cleanup_old_backups(&backup_dir, 10);

        Ok(())
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    let w = &config.scoring;
    let bases = [w.known_pattern_base, w.scientific_name_base, w.context_base];
    if bases.iter().any(|b| !(0.0..=1.0).contains(b)) {
        return Err(CatalogError::Config("base scores must lie in [0, 1]".to_string()));
    }
    let adjustments = [
        w.exact_bonus,
        w.normalized_penalty,
        w.resolved_bonus,
        w.unresolved_penalty,
        w.context_signal_bonus,
        w.context_signal_cap,
    ];
    if adjustments.iter().any(|a| !a.is_finite() || *a < 0.0) {
        return Err(CatalogError::Config("score adjustments must be non-negative".to_string()));
    }
    Ok(())
}

/// Remove old backups, keeping only the most recent N
fn cleanup_old_backups(backup_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(backup_dir) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect(),
        Err(_) => return,
    };

    if entries.len() <= keep {
        return;
    }

    // Backup names sort chronologically
    entries.sort_by_key(|e| e.file_name());

    for entry in entries.iter().take(entries.len() - keep) {
        let _ = fs::remove_file(entry.path());
    }
}
