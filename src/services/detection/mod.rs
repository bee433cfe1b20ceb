// Detection Module
// Species detection core logic organized into specialized submodules:
// - lexicon / taxonomy: versioned reference tables
// - pattern_matcher: ordered match strategies and the overlap rule
// - scoring / sensitivity: confidence and the keep threshold
// - grouping: per-species merge of detections
// - aggregation: statistics and read-only catalog views

pub mod lexicon;
pub mod taxonomy;
pub mod pattern_matcher;
pub mod scoring;
pub mod sensitivity;
pub mod grouping;
pub mod aggregation;

// Re-export commonly used items
pub use lexicon::{Lexicon, LexiconEntry};
pub use taxonomy::{Taxonomy, TaxonomyClassifier, SUPPORTED_PHYLA};
pub use pattern_matcher::{
    ContextStrategy,
    KnownPatternStrategy,
    MatchStrategy,
    PatternMatcher,
    ScientificNameStrategy,
};
pub use scoring::{ConfidenceScorer, ScoringWeights};
pub use sensitivity::DetectionSensitivity;
pub use grouping::Grouper;
pub use aggregation::{build_catalog, compute_stats, CatalogQuery};
