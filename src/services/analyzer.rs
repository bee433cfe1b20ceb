// Analyzer
// Drives one run: parse -> match -> score/classify -> group -> aggregate.
// Components are built once and reused; every run starts from a fresh Grouper.

use crate::error::{CatalogError, Result};
use crate::models::{Catalog, CatalogMetadata, Detection};
use crate::services::config_store::AppConfig;
use crate::services::cue_parser::parse_cues;
use crate::services::detection::{
    build_catalog, ConfidenceScorer, DetectionSensitivity, Grouper, Lexicon, PatternMatcher, ScoringWeights,
    TaxonomyClassifier,
};
use crate::services::text_processor::{extract_additional_info, trim_context};
use crate::services::thumbnails::ThumbnailIndex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_CONTEXT_CHARS: usize = 200;

pub struct Analyzer {
    lexicon: Arc<Lexicon>,
    taxonomy: Arc<TaxonomyClassifier>,
    matcher: PatternMatcher,
    scorer: ConfidenceScorer,
    thumbnails: ThumbnailIndex,
    sensitivity: DetectionSensitivity,
    context_chars: usize,
}

impl Analyzer {
    pub fn new(lexicon: Lexicon, taxonomy: TaxonomyClassifier, weights: ScoringWeights) -> Result<Self> {
        let lexicon = Arc::new(lexicon);
        let taxonomy = Arc::new(taxonomy);
        let matcher = PatternMatcher::new(lexicon.clone(), taxonomy.clone(), &weights)?;
        Ok(Self {
            lexicon,
            taxonomy,
            matcher,
            scorer: ConfidenceScorer::new(weights),
            thumbnails: ThumbnailIndex::empty(),
            sensitivity: DetectionSensitivity::default(),
            context_chars: DEFAULT_CONTEXT_CHARS,
        })
    }

    /// Builtin reference data and default weights
    pub fn builtin() -> Result<Self> {
        Self::new(Lexicon::builtin(), TaxonomyClassifier::builtin(), ScoringWeights::default())
    }

    /// Build from configuration, loading any reference-data overrides it names
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let analysis = &config.analysis;
        let lexicon = match &analysis.lexicon_path {
            Some(path) => Lexicon::load(path)?,
            None => Lexicon::builtin(),
        };
        let taxonomy = match &analysis.taxonomy_path {
            Some(path) => TaxonomyClassifier::load(path)?,
            None => TaxonomyClassifier::builtin(),
        };

        let thumbnails = match &analysis.thumbnails_index {
            Some(path) => match ThumbnailIndex::load(path, &analysis.thumbnail_url_prefix) {
                Ok(index) => index,
                Err(e) => {
                    warn!(error = %e, "thumbnails.unavailable");
                    ThumbnailIndex::empty()
                }
            },
            None => ThumbnailIndex::empty(),
        };

        Ok(Self::new(lexicon, taxonomy, config.scoring.clone())?
            .with_sensitivity(analysis.sensitivity)
            .with_context_chars(analysis.context_chars)
            .with_thumbnails(thumbnails))
    }

    pub fn with_sensitivity(mut self, sensitivity: DetectionSensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    pub fn with_thumbnails(mut self, thumbnails: ThumbnailIndex) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    pub fn sensitivity(&self) -> DetectionSensitivity {
        self.sensitivity
    }

    /// Run the pipeline over transcript text. Never fails: bad cue blocks become warnings.
    pub fn analyze_text(&self, text: &str, source: &str) -> Catalog {
        let started = Instant::now();
        let parsed = parse_cues(text);
        let mut grouper = Grouper::new();
        let mut kept = 0usize;
        let mut dropped = 0usize;

        for cue in &parsed.cues {
            for candidate in self.matcher.match_cue(cue) {
                let taxonomy = self.taxonomy.classify(&candidate.canonical_name);
                let confidence = self.scorer.score(&candidate, &taxonomy);
                if !self.sensitivity.accepts(confidence) {
                    debug!(
                        cue = cue.index,
                        name = %candidate.canonical_name,
                        method = %candidate.method,
                        confidence,
                        "candidate.below_threshold"
                    );
                    dropped += 1;
                    continue;
                }

                let detection = Detection {
                    timestamp: cue.start,
                    context: trim_context(&cue.text, candidate.span, self.context_chars),
                    thumbnail_url: self.thumbnails.lookup(cue.start, cue.end),
                    confidence,
                    detection_method: candidate.method,
                    additional_info: extract_additional_info(&cue.text),
                    phylum: taxonomy.phylum,
                    class: taxonomy.class,
                    cue_index: cue.index,
                };
                grouper.add(&candidate.canonical_name, candidate.scientific_name.as_deref(), detection);
                kept += 1;
            }
        }

        let metadata = CatalogMetadata {
            source: source.to_string(),
            total_cues: parsed.cues.len(),
            lexicon_version: self.lexicon.version().to_string(),
            taxonomy_version: self.taxonomy.version().to_string(),
        };
        let catalog = build_catalog(metadata, grouper.into_groups(), parsed.warnings);

        info!(
            source,
            cues = catalog.metadata().total_cues,
            detections = kept,
            below_threshold = dropped,
            species = catalog.stats().total_species,
            warnings = catalog.parse_warnings().len(),
            sensitivity = self.sensitivity.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis.completed"
        );
        catalog
    }

    /// Read a transcript from disk and analyze it
    pub fn analyze_file(&self, path: &Path) -> Result<Catalog> {
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.analyze_text(&text, &source))
    }
}
