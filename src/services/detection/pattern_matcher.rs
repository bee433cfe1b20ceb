// Pattern Matcher
// Ordered detection strategies over one cue, with a single overlap rule:
// for overlapping spans only the candidate of the earliest strategy survives.

use crate::error::{CatalogError, Result};
use crate::models::{Candidate, Cue, DetectionMethod, MatchExactness, Span};
use crate::services::text_processor::{fold_diacritics, normalize_common_name, sentence_spans, FoldedText};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::lexicon::{Lexicon, LexiconEntry};
use super::scoring::ScoringWeights;
use super::taxonomy::TaxonomyClassifier;

/// One detection strategy. Strategies only find mentions; scoring happens later.
pub trait MatchStrategy: Send + Sync {
    fn method(&self) -> DetectionMethod;
    fn scan<'c>(&self, cue: &'c Cue) -> Vec<Candidate<'c>>;
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{L}+").expect("word regex"))
}

fn phrase_alternation(phrases: &[String]) -> String {
    let mut sorted: Vec<&String> = phrases.iter().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    sorted
        .iter()
        .map(|p| regex::escape(p).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|")
}

#[allow(clippy::too_many_arguments)]
fn make_candidate<'c>(
    cue: &'c Cue,
    span: Span,
    canonical_name: String,
    scientific_name: Option<String>,
    method: DetectionMethod,
    base_score: f64,
    exactness: MatchExactness,
    signals: usize,
) -> Candidate<'c> {
    Candidate {
        raw_text: cue.text[span.start..span.end].to_string(),
        canonical_name,
        scientific_name,
        method,
        base_score,
        exactness,
        signals,
        cue,
        span,
    }
}

// ============ known_pattern ============

pub struct KnownPatternStrategy {
    lexicon: Arc<Lexicon>,
    base_score: f64,
}

impl KnownPatternStrategy {
    pub fn new(lexicon: Arc<Lexicon>, base_score: f64) -> Self {
        Self { lexicon, base_score }
    }

    fn candidate<'c>(&self, cue: &'c Cue, span: Span, entry: &LexiconEntry, exactness: MatchExactness) -> Candidate<'c> {
        make_candidate(
            cue,
            span,
            entry.name.clone(),
            entry.scientific_name.clone(),
            DetectionMethod::KnownPattern,
            self.base_score,
            exactness,
            0,
        )
    }
}

impl MatchStrategy for KnownPatternStrategy {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::KnownPattern
    }

    fn scan<'c>(&self, cue: &'c Cue) -> Vec<Candidate<'c>> {
        let folded = FoldedText::new(&cue.text);
        let mut out = Vec::new();

        for m in self.lexicon.form_pattern().find_iter(&folded.folded) {
            let Some(entry) = self.lexicon.entry_for_form(m.as_str()) else {
                continue;
            };
            let span = folded.to_original(m.start(), m.end());
            let exactness = if self.lexicon.is_exact_form(entry, &cue.text[span.start..span.end]) {
                MatchExactness::Exact
            } else {
                MatchExactness::Normalized
            };
            out.push(self.candidate(cue, span, entry, exactness));
        }

        // Second pass: diminutives and plurals the lexicon does not list
        for m in word_re().find_iter(&cue.text) {
            let span = Span::new(m.start(), m.end());
            if out.iter().any(|c| c.span.overlaps(&span)) || self.lexicon.is_stopword(m.as_str()) {
                continue;
            }
            if let Some(entry) = self.lexicon.lookup_normalized(m.as_str()) {
                out.push(self.candidate(cue, span, entry, MatchExactness::Normalized));
            }
        }

        out
    }
}

// ============ scientific_name ============

fn binomial_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Z][a-z]{2,})\s+(?:(sp)\.|cf\.\s+([a-z]{3,})\b|([a-z]{3,})\b)").expect("binomial regex")
    })
}

/// Offsets of the first word of every sentence and every source line of a cue,
/// past opening punctuation such as `- `, `¿`, `¡` or quotes
fn sentence_starts(cue: &Cue) -> Vec<usize> {
    let text = &cue.text;
    let mut starts: Vec<usize> = sentence_spans(text)
        .iter()
        .map(|s| s.start)
        .chain(cue.line_starts.iter().copied())
        .filter(|&start| text.is_char_boundary(start))
        .map(|start| {
            let rest = &text[start..];
            start + (rest.len() - rest.trim_start_matches(|c: char| !c.is_alphanumeric()).len())
        })
        .collect();
    starts.sort_unstable();
    starts.dedup();
    starts
}

pub struct ScientificNameStrategy {
    lexicon: Arc<Lexicon>,
    taxonomy: Arc<TaxonomyClassifier>,
    base_score: f64,
}

impl ScientificNameStrategy {
    pub fn new(lexicon: Arc<Lexicon>, taxonomy: Arc<TaxonomyClassifier>, base_score: f64) -> Self {
        Self {
            lexicon,
            taxonomy,
            base_score,
        }
    }
}

impl MatchStrategy for ScientificNameStrategy {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::ScientificName
    }

    fn scan<'c>(&self, cue: &'c Cue) -> Vec<Candidate<'c>> {
        let sentence_starts = sentence_starts(cue);
        let mut out = Vec::new();

        for caps in binomial_re().captures_iter(&cue.text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let genus = &caps[1];
            let (canonical, exactness) = if caps.get(2).is_some() {
                (format!("{} sp.", genus), MatchExactness::Normalized)
            } else if let Some(species) = caps.get(3) {
                (format!("{} {}", genus, species.as_str()), MatchExactness::Normalized)
            } else if let Some(species) = caps.get(4) {
                if self.lexicon.is_stopword(species.as_str()) {
                    continue;
                }
                (format!("{} {}", genus, species.as_str()), MatchExactness::Exact)
            } else {
                continue;
            };

            if self.lexicon.is_stopword(genus) {
                continue;
            }
            // A capitalized first word is usually just the start of a sentence
            if sentence_starts.contains(&whole.start()) && !self.taxonomy.has_genus(genus) {
                continue;
            }

            let span = Span::new(whole.start(), whole.end());
            out.push(make_candidate(
                cue,
                span,
                canonical.clone(),
                Some(canonical),
                DetectionMethod::ScientificName,
                self.base_score,
                exactness,
                0,
            ));
        }

        out
    }
}

// ============ context ============

pub struct ContextStrategy {
    lexicon: Arc<Lexicon>,
    phrase_pattern: Option<Regex>,
    noun_phrase_pattern: Option<Regex>,
    base_score: f64,
}

struct NounPhrase {
    /// Offsets of the noun in folded text
    start: usize,
    end: usize,
    phrase_start: usize,
}

impl ContextStrategy {
    pub fn new(lexicon: Arc<Lexicon>, base_score: f64) -> Result<Self> {
        let phrase_pattern = if lexicon.novelty_phrases().is_empty() {
            None
        } else {
            let pattern = format!(r"\b(?:{})\b", phrase_alternation(lexicon.novelty_phrases()));
            Some(Regex::new(&pattern).map_err(|e| CatalogError::ReferenceData(format!("novelty pattern: {}", e)))?)
        };
        let noun_phrase_pattern = if lexicon.determiners().is_empty() {
            None
        } else {
            let pattern = format!(r"\b(?:{})\s+(\p{{L}}+)\b", phrase_alternation(lexicon.determiners()));
            Some(Regex::new(&pattern).map_err(|e| CatalogError::ReferenceData(format!("determiner pattern: {}", e)))?)
        };

        Ok(Self {
            lexicon,
            phrase_pattern,
            noun_phrase_pattern,
            base_score,
        })
    }

    fn acceptable_noun(&self, noun: &str) -> bool {
        noun.chars().count() >= 3 && !self.lexicon.is_stopword(noun) && !self.lexicon.is_generic_noun(noun)
    }

    fn noun_phrases(&self, pattern: &Regex, sentence: &str, offset: usize) -> Vec<NounPhrase> {
        pattern
            .captures_iter(sentence)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let noun = caps.get(1)?;
                if !self.acceptable_noun(noun.as_str()) {
                    return None;
                }
                Some(NounPhrase {
                    start: offset + noun.start(),
                    end: offset + noun.end(),
                    phrase_start: offset + whole.start(),
                })
            })
            .collect()
    }
}

impl MatchStrategy for ContextStrategy {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Context
    }

    fn scan<'c>(&self, cue: &'c Cue) -> Vec<Candidate<'c>> {
        let (Some(phrase_re), Some(np_re)) = (&self.phrase_pattern, &self.noun_phrase_pattern) else {
            return Vec::new();
        };
        let folded = FoldedText::new(&cue.text);
        let mut out: Vec<Candidate<'c>> = Vec::new();

        for sentence in sentence_spans(&folded.folded) {
            let text = &folded.folded[sentence.start..sentence.end];
            let hits: Vec<(usize, usize, String)> = phrase_re
                .find_iter(text)
                .map(|m| {
                    let key = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
                    (sentence.start + m.start(), sentence.start + m.end(), key)
                })
                .collect();
            if hits.is_empty() {
                continue;
            }

            let mut distinct: Vec<&str> = hits.iter().map(|(_, _, k)| k.as_str()).collect();
            distinct.sort_unstable();
            distinct.dedup();
            let signals = distinct.len();

            let nouns = self.noun_phrases(np_re, text, sentence.start);
            for (hit_start, hit_end, _) in &hits {
                let chosen = nouns
                    .iter()
                    .find(|np| np.phrase_start >= *hit_end)
                    .or_else(|| nouns.iter().rev().find(|np| np.end <= *hit_start));
                let Some(np) = chosen else {
                    continue;
                };

                let span = folded.to_original(np.start, np.end);
                if out.iter().any(|c| c.span == span) {
                    continue;
                }
                let surface = &cue.text[span.start..span.end];
                let normalized = normalize_common_name(surface);
                let exactness = if normalized == fold_diacritics(surface) {
                    MatchExactness::Exact
                } else {
                    MatchExactness::Normalized
                };
                let (canonical, scientific) = match self.lexicon.lookup_normalized(surface) {
                    Some(entry) => (entry.name.clone(), entry.scientific_name.clone()),
                    None => (normalized, None),
                };
                out.push(make_candidate(
                    cue,
                    span,
                    canonical,
                    scientific,
                    DetectionMethod::Context,
                    self.base_score,
                    exactness,
                    signals,
                ));
            }
        }

        out
    }
}

// ============ matcher ============

pub struct PatternMatcher {
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl PatternMatcher {
    /// The standard strategy list: known_pattern, scientific_name, context
    pub fn new(lexicon: Arc<Lexicon>, taxonomy: Arc<TaxonomyClassifier>, weights: &ScoringWeights) -> Result<Self> {
        let strategies: Vec<Box<dyn MatchStrategy>> = vec![
            Box::new(KnownPatternStrategy::new(
                lexicon.clone(),
                weights.base_score(DetectionMethod::KnownPattern),
            )),
            Box::new(ScientificNameStrategy::new(
                lexicon.clone(),
                taxonomy,
                weights.base_score(DetectionMethod::ScientificName),
            )),
            Box::new(ContextStrategy::new(lexicon, weights.base_score(DetectionMethod::Context))?),
        ];
        Ok(Self::with_strategies(strategies))
    }

    /// Strategies earlier in the list win overlaps
    pub fn with_strategies(strategies: Vec<Box<dyn MatchStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn methods(&self) -> Vec<DetectionMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    /// Candidates for one cue, non-overlapping, ordered by position
    pub fn match_cue<'c>(&self, cue: &'c Cue) -> Vec<Candidate<'c>> {
        let mut ranked: Vec<(usize, Candidate<'c>)> = self
            .strategies
            .iter()
            .enumerate()
            .flat_map(|(rank, strategy)| strategy.scan(cue).into_iter().map(move |c| (rank, c)))
            .filter(|(_, c)| !c.span.is_empty())
            .collect();

        ranked.sort_by(|(ra, a), (rb, b)| {
            ra.cmp(rb)
                .then(a.span.start.cmp(&b.span.start))
                .then(b.span.len().cmp(&a.span.len()))
        });

        let mut accepted: Vec<Candidate<'c>> = Vec::with_capacity(ranked.len());
        for (_, candidate) in ranked {
            if let Some(winner) = accepted.iter().find(|a| a.span.overlaps(&candidate.span)) {
                debug!(
                    cue = cue.index,
                    dropped = %candidate.raw_text,
                    dropped_method = %candidate.method,
                    kept_method = %winner.method,
                    "match.overlap"
                );
                continue;
            }
            accepted.push(candidate);
        }

        accepted.sort_by_key(|c| (c.span.start, c.span.end));
        accepted
    }
}
