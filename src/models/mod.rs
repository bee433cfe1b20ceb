// Marine Catalog Data Models
// Cues -> candidates -> detections -> species groups -> catalog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

mod timestamp;

pub use timestamp::{ParseTimestampError, Timestamp};

/// Phylum/class placeholder for names the taxonomy table does not know.
pub const UNKNOWN_TAXON: &str = "Unknown";

fn unknown_taxon() -> String {
    UNKNOWN_TAXON.to_string()
}

// ============ Transcript ============

/// One timestamped block of transcript text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// Position in the parsed sequence (0-based, source order).
    pub index: usize,
    /// Sequence number written in the source block, if any.
    pub sequence: Option<u32>,
    /// 1-based line of the timing line in the source text.
    pub line: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Source lines joined with single spaces.
    pub text: String,
    /// Byte offset in `text` where each source line begins.
    pub line_starts: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseWarningKind {
    MissingTimestamp,
    InvalidTimestamp,
    EmptyCue,
}

impl ParseWarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseWarningKind::MissingTimestamp => "missing_timestamp",
            ParseWarningKind::InvalidTimestamp => "invalid_timestamp",
            ParseWarningKind::EmptyCue => "empty_cue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub line: usize,
    pub kind: ParseWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedTranscript {
    pub cues: Vec<Cue>,
    pub warnings: Vec<ParseWarning>,
}

// ============ Matching ============

/// Matcher strategies. Declaration order is precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    KnownPattern,
    ScientificName,
    Context,
}

impl DetectionMethod {
    pub const ALL: [DetectionMethod; 3] = [
        DetectionMethod::KnownPattern,
        DetectionMethod::ScientificName,
        DetectionMethod::Context,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::KnownPattern => "known_pattern",
            DetectionMethod::ScientificName => "scientific_name",
            DetectionMethod::Context => "context",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "known_pattern" => Ok(Self::KnownPattern),
            "scientific_name" => Ok(Self::ScientificName),
            "context" => Ok(Self::Context),
            other => Err(format!(
                "unknown detection method {other:?} (expected known_pattern, scientific_name or context)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchExactness {
    /// Surface text equals a listed form (case aside).
    Exact,
    /// Matched only after folding diacritics or stripping suffixes.
    Normalized,
}

/// Byte range into a cue's text, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Raw mention found by a single strategy; unscored and unclassified.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub raw_text: String,
    pub canonical_name: String,
    pub scientific_name: Option<String>,
    pub method: DetectionMethod,
    pub base_score: f64,
    pub exactness: MatchExactness,
    /// Independent novelty phrases in the sentence (context strategy only).
    pub signals: usize,
    pub cue: &'a Cue,
    pub span: Span,
}

// ============ Detection & Grouping ============

/// Scored, classified occurrence of a mention, tied to one cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub timestamp: Timestamp,
    pub context: String,
    pub thumbnail_url: Option<String>,
    pub confidence: f64,
    pub detection_method: DetectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(skip_serializing, default = "unknown_taxon")]
    pub phylum: String,
    #[serde(skip_serializing, default = "unknown_taxon")]
    pub class: String,
    #[serde(skip)]
    pub cue_index: usize,
}

/// Deduplicated record for one species across all its detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesGroup {
    pub id: u32,
    pub common_name: String,
    pub scientific_name: Option<String>,
    pub phylum: String,
    pub class: String,
    pub detection_method: DetectionMethod,
    pub confidence: f64,
    pub total_mentions: usize,
    pub first_timestamp: Timestamp,
    pub last_timestamp: Timestamp,
    pub main_thumbnail: Option<String>,
    pub all_occurrences: Vec<Detection>,
}

impl SpeciesGroup {
    pub fn is_resolved(&self) -> bool {
        self.phylum != UNKNOWN_TAXON
    }
}

// ============ Catalog ============

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_species: usize,
    pub by_phylum: BTreeMap<String, usize>,
    pub by_method: BTreeMap<DetectionMethod, usize>,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub source: String,
    pub total_cues: usize,
    pub lexicon_version: String,
    pub taxonomy_version: String,
}

/// Complete result of one analysis run. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    metadata: CatalogMetadata,
    #[serde(rename = "species")]
    groups: Vec<SpeciesGroup>,
    stats: CatalogStats,
    #[serde(default)]
    parse_warnings: Vec<ParseWarning>,
}

impl Catalog {
    pub(crate) fn from_parts(
        metadata: CatalogMetadata,
        groups: Vec<SpeciesGroup>,
        stats: CatalogStats,
        parse_warnings: Vec<ParseWarning>,
    ) -> Self {
        Self {
            metadata,
            groups,
            stats,
            parse_warnings,
        }
    }

    pub fn metadata(&self) -> &CatalogMetadata {
        &self.metadata
    }

    /// All groups, ordered by id.
    pub fn groups(&self) -> &[SpeciesGroup] {
        &self.groups
    }

    pub fn stats(&self) -> &CatalogStats {
        &self.stats
    }

    pub fn parse_warnings(&self) -> &[ParseWarning] {
        &self.parse_warnings
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Occurrences do not serialize their taxonomy; after a read they take their group's.
    pub(crate) fn restore_occurrence_taxonomy(&mut self) {
        for group in &mut self.groups {
            for occ in &mut group.all_occurrences {
                occ.phylum.clone_from(&group.phylum);
                occ.class.clone_from(&group.class);
            }
        }
    }
}
