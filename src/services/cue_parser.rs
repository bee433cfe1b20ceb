// Cue Parser
// Turns subtitle text into ordered, timestamped cues.
//
// Accepts SRT-style blocks (sequence, `start --> end`, text lines, blank line)
// and the bracketed `[start --> end] text` lines used by the expedition
// transcripts. Bad blocks are skipped with a warning; parsing never fails.

use crate::models::{Cue, ParseWarning, ParseWarningKind, ParsedTranscript, Timestamp};
use crate::services::text_processor::{normalize_punctuation, strip_markup};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn bracket_timing_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[\s*([0-9:.,]+)\s*-->\s*([0-9:.,]+)\s*\]\s*(.*)$").expect("bracket timing regex")
    })
}

fn plain_timing_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Anything after the end timestamp is WebVTT cue settings
        Regex::new(r"^([0-9:.,]+)\s*-->\s*([0-9:.,]+)(?:\s+.*)?$").expect("plain timing regex")
    })
}

enum TimingLine<'a> {
    Valid {
        start: Timestamp,
        end: Timestamp,
        inline_text: &'a str,
    },
    Invalid(String),
    NotTiming,
}

fn classify_line(line: &str) -> TimingLine<'_> {
    let trimmed = line.trim();
    if !trimmed.contains("-->") {
        return TimingLine::NotTiming;
    }

    let (raw_start, raw_end, inline_text) = if let Some(caps) = bracket_timing_re().captures(trimmed) {
        let inline = caps.get(3).map_or("", |m| m.as_str());
        (caps.get(1).map_or("", |m| m.as_str()), caps.get(2).map_or("", |m| m.as_str()), inline)
    } else if let Some(caps) = plain_timing_re().captures(trimmed) {
        (caps.get(1).map_or("", |m| m.as_str()), caps.get(2).map_or("", |m| m.as_str()), "")
    } else {
        return TimingLine::Invalid(format!("unrecognized timing line {:?}", trimmed));
    };

    let start = match raw_start.parse::<Timestamp>() {
        Ok(ts) => ts,
        Err(e) => return TimingLine::Invalid(e.to_string()),
    };
    let end = match raw_end.parse::<Timestamp>() {
        Ok(ts) => ts,
        Err(e) => return TimingLine::Invalid(e.to_string()),
    };
    if end < start {
        return TimingLine::Invalid(format!("cue ends ({}) before it starts ({})", end, start));
    }

    TimingLine::Valid {
        start,
        end,
        inline_text,
    }
}

fn is_sequence_line(line: &str) -> Option<u32> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// WebVTT header, NOTE, STYLE and REGION blocks carry no cues
fn is_formatting_block(first_line: &str, is_first_block: bool) -> bool {
    let trimmed = first_line.trim();
    if is_first_block && trimmed.starts_with("WEBVTT") {
        return true;
    }
    ["NOTE", "STYLE", "REGION"]
        .iter()
        .any(|kw| trimmed == *kw || trimmed.starts_with(&format!("{} ", kw)))
}

fn clean_text_line(line: &str) -> String {
    normalize_punctuation(&strip_markup(line))
}

struct PendingCue {
    sequence: Option<u32>,
    line: usize,
    start: Timestamp,
    end: Timestamp,
    text: Vec<String>,
}

#[derive(Default)]
struct ParseState {
    cues: Vec<Cue>,
    warnings: Vec<ParseWarning>,
}

impl ParseState {
    fn warn(&mut self, line: usize, kind: ParseWarningKind, message: String) {
        warn!(line, kind = ?kind, "{}", message);
        self.warnings.push(ParseWarning { line, kind, message });
    }

    fn flush(&mut self, pending: Option<PendingCue>) {
        let Some(p) = pending else {
            return;
        };
        if p.text.is_empty() {
            self.warn(p.line, ParseWarningKind::EmptyCue, format!("cue at {} has no text", p.start));
            return;
        }
        let mut line_starts = Vec::with_capacity(p.text.len());
        let mut offset = 0;
        for line in &p.text {
            line_starts.push(offset);
            offset += line.len() + 1;
        }
        self.cues.push(Cue {
            index: self.cues.len(),
            sequence: p.sequence,
            line: p.line,
            start: p.start,
            end: p.end,
            text: p.text.join(" "),
            line_starts,
        });
    }

    fn parse_block(&mut self, block: &[(usize, &str)]) {
        let mut pending: Option<PendingCue> = None;
        let mut leading: Vec<(usize, &str)> = Vec::new();
        let mut saw_timing = false;
        let mut skipping = false;

        for &(line_no, line) in block {
            match classify_line(line) {
                TimingLine::Valid {
                    start,
                    end,
                    inline_text,
                } => {
                    self.flush(pending.take());
                    let mut sequence = None;
                    if !saw_timing {
                        match leading.as_slice() {
                            [] => {}
                            [(_, only)] if is_sequence_line(only).is_some() => {
                                sequence = is_sequence_line(only);
                            }
                            [(first_line, _), ..] => {
                                let first_line = *first_line;
                                self.warn(
                                    first_line,
                                    ParseWarningKind::MissingTimestamp,
                                    format!("{} line(s) of text before the timing line", leading.len()),
                                );
                            }
                        }
                        leading.clear();
                    }
                    saw_timing = true;
                    skipping = false;

                    let mut cue = PendingCue {
                        sequence,
                        line: line_no,
                        start,
                        end,
                        text: Vec::new(),
                    };
                    let inline = clean_text_line(inline_text);
                    if !inline.is_empty() {
                        cue.text.push(inline);
                    }
                    pending = Some(cue);
                }
                TimingLine::Invalid(reason) => {
                    self.flush(pending.take());
                    leading.clear();
                    saw_timing = true;
                    skipping = true;
                    self.warn(line_no, ParseWarningKind::InvalidTimestamp, reason);
                }
                TimingLine::NotTiming => {
                    if let Some(cue) = pending.as_mut() {
                        let cleaned = clean_text_line(line);
                        if !cleaned.is_empty() {
                            cue.text.push(cleaned);
                        }
                    } else if !skipping {
                        leading.push((line_no, line));
                    }
                }
            }
        }
        self.flush(pending.take());

        if !saw_timing {
            if let Some(&(first_line, _)) = leading.first() {
                self.warn(
                    first_line,
                    ParseWarningKind::MissingTimestamp,
                    "cue block has no timing line".to_string(),
                );
            }
        }
    }
}

/// Parse raw transcript text into cues plus the warnings for skipped blocks
pub fn parse_cues(text: &str) -> ParsedTranscript {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let mut state = ParseState::default();

    let mut block: Vec<(usize, &str)> = Vec::new();
    let mut is_first_block = true;
    let lines = text.split('\n').map(|l| l.trim_end_matches('\r'));

    for (idx, line) in lines.enumerate().chain(std::iter::once((usize::MAX, ""))) {
        if !line.trim().is_empty() {
            block.push((idx.saturating_add(1), line));
            continue;
        }
        if block.is_empty() {
            continue;
        }
        if !is_formatting_block(block[0].1, is_first_block) {
            state.parse_block(&block);
        }
        is_first_block = false;
        block.clear();
    }

    debug!(cues = state.cues.len(), warnings = state.warnings.len(), "transcript.parsed");
    ParsedTranscript {
        cues: state.cues,
        warnings: state.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_srt_blocks() {
        let text = "1\n00:01:10,500 --> 00:01:12,000\nMiren ese pulpo.\n\n2\n00:45:03.200 --> 00:45:05.000\nOtro pulpo\nen la roca\n";
        let parsed = parse_cues(text);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.cues.len(), 2);
        assert_eq!(parsed.cues[0].sequence, Some(1));
        assert_eq!(parsed.cues[0].start.to_string(), "00:01:10.500");
        assert_eq!(parsed.cues[0].line, 2);
        assert_eq!(parsed.cues[1].text, "Otro pulpo en la roca");
        assert_eq!(parsed.cues[1].line_starts, vec![0, 11]);
        assert_eq!(parsed.cues[1].index, 1);
    }

    #[test]
    fn test_empty_input_yields_no_cues() {
        let parsed = parse_cues("");
        assert!(parsed.cues.is_empty());
        assert!(parsed.warnings.is_empty());
        assert!(parse_cues("\n\n   \n").cues.is_empty());
    }

    #[test]
    fn test_missing_timestamp_block_is_skipped_with_warning() {
        let text = "1\n00:00:01.000 --> 00:00:02.000\nUn coral\n\n2\nTexto sin tiempo\n\n\n\n3\n00:00:05.000 --> 00:00:06.000\nUna esponja\n";
        let parsed = parse_cues(text);
        assert_eq!(parsed.cues.len(), 2);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].kind, ParseWarningKind::MissingTimestamp);
        assert_eq!(parsed.warnings[0].line, 5);
        assert_eq!(parsed.cues[1].text, "Una esponja");
    }

    #[test]
    fn test_invalid_timestamp_block_is_skipped() {
        let text = "1\n00:00:01.000 --> 00:99:02.000\nUn coral\n\n2\n00:00:05.000 --> 00:00:04.000\nAl revés\n";
        let parsed = parse_cues(text);
        assert!(parsed.cues.is_empty());
        assert_eq!(parsed.warnings.len(), 2);
        assert!(parsed
            .warnings
            .iter()
            .all(|w| w.kind == ParseWarningKind::InvalidTimestamp));
    }

    #[test]
    fn test_bracketed_lines_without_blank_separators() {
        let text = "[00:00:01.000 --> 00:00:03.000] Bajamos a mil metros.\n[00:00:03.000 --> 00:00:05.000] Hay corales\nmuy grandes\n";
        let parsed = parse_cues(text);
        assert_eq!(parsed.cues.len(), 2);
        assert_eq!(parsed.cues[0].text, "Bajamos a mil metros.");
        assert_eq!(parsed.cues[1].text, "Hay corales muy grandes");
        assert_eq!(parsed.cues[1].sequence, None);
    }

    #[test]
    fn test_formatting_artifacts_are_ignored() {
        let text = "\u{FEFF}WEBVTT\r\n\r\nNOTE recorded on board\r\n\r\n00:00:01.000 --> 00:00:02.000 align:start\r\n<i>Una {\\an8}anémona</i>\r\n";
        let parsed = parse_cues(text);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.cues.len(), 1);
        assert_eq!(parsed.cues[0].text, "Una anémona");
    }

    #[test]
    fn test_webvtt_short_timestamps() {
        let text = "WEBVTT\n\n01:10.500 --> 01:13.000\nMiren ese pulpo\n\n00:01:20.000 --> 00:01:22.000\nOtra vez\n";
        let parsed = parse_cues(text);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.cues.len(), 2);
        assert_eq!(parsed.cues[0].start.to_string(), "00:01:10.500");
        assert_eq!(parsed.cues[0].end.as_millis(), 73_000);
        assert!(parsed.cues[0].start < parsed.cues[1].start);
    }

    #[test]
    fn test_empty_cue_warns() {
        let parsed = parse_cues("1\n00:00:01.000 --> 00:00:02.000\n<i></i>\n");
        assert!(parsed.cues.is_empty());
        assert_eq!(parsed.warnings[0].kind, ParseWarningKind::EmptyCue);
    }

    #[test]
    fn test_preserves_source_order() {
        let text = "2\n00:00:09.000 --> 00:00:10.000\nB\n\n1\n00:00:01.000 --> 00:00:02.000\nA\n";
        let parsed = parse_cues(text);
        let texts: Vec<&str> = parsed.cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["B", "A"]);
    }
}
