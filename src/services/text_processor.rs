// Text Processing Service
// Folding, name normalization, sentence spans and context trimming for cue text

use crate::models::Span;
use regex::Regex;
use std::sync::OnceLock;

fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>|\{\\[^}]*\}").expect("markup regex"))
}

fn space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("space regex"))
}

/// Normalize punctuation and whitespace in one line of cue text
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let s = text
        .replace(&['\u{201c}', '\u{201d}'][..], "\"")
        .replace(&['\u{2018}', '\u{2019}'][..], "'")
        .replace('\u{2014}', "-")
        .replace(&['\u{00A0}', '\u{3000}', '\u{FEFF}'][..], " ");

    space_re().replace_all(&s, " ").trim().to_string()
}

/// Remove subtitle markup (`<i>`, `</font>`, `{\an8}`) from a line
pub fn strip_markup(line: &str) -> String {
    markup_re().replace_all(line, "").to_string()
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        _ => c,
    }
}

/// Lowercase and strip diacritics
pub fn fold_diacritics(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).map(fold_char).collect()
}

/// Case/diacritic-insensitive key with collapsed whitespace
pub fn normalize_key(name: &str) -> String {
    let folded = fold_diacritics(name);
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folded copy of a text that can map its byte offsets back to the original.
#[derive(Debug, Clone)]
pub struct FoldedText {
    pub folded: String,
    origin: Vec<usize>,
    original_len: usize,
}

impl FoldedText {
    pub fn new(original: &str) -> Self {
        let mut folded = String::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len() + 1);
        for (pos, ch) in original.char_indices() {
            for lc in ch.to_lowercase() {
                let f = fold_char(lc);
                folded.push(f);
                origin.extend(std::iter::repeat(pos).take(f.len_utf8()));
            }
        }
        origin.push(original.len());
        Self {
            folded,
            origin,
            original_len: original.len(),
        }
    }

    /// Translate a span of `folded` into the matching span of the original text
    pub fn to_original(&self, start: usize, end: usize) -> Span {
        let s = self.origin.get(start).copied().unwrap_or(self.original_len);
        let e = self.origin.get(end).copied().unwrap_or(self.original_len);
        Span::new(s, e.max(s))
    }
}

fn strip_diminutive(token: &str) -> String {
    for suffix in ["citos", "citas", "cito", "cita"] {
        if let Some(stem) = token.strip_suffix(suffix) {
            if stem.chars().count() >= 3 {
                return stem.to_string();
            }
        }
    }
    if token.chars().count() > 4 {
        for (suffix, replacement) in [("itos", "os"), ("itas", "as"), ("ito", "o"), ("ita", "a")] {
            if let Some(stem) = token.strip_suffix(suffix) {
                return format!("{}{}", stem, replacement);
            }
        }
    }
    token.to_string()
}

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];

fn singularize(word: &str) -> String {
    if word.chars().count() <= 3 {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ces") {
        return format!("{}z", stem);
    }
    if let Some(stem) = word.strip_suffix("es") {
        return stem.to_string();
    }
    if word.ends_with(VOWELS) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('s') {
        if stem.ends_with(VOWELS) {
            return stem.to_string();
        }
    }
    word.to_string()
}

/// Reduce a colloquial Spanish name to its folded singular, non-diminutive form.
///
/// `camaroncitos` -> `camaron`, `pulpitos` -> `pulpo`, `Peces` -> `pez`.
/// Only the last word is singularized.
pub fn normalize_common_name(raw: &str) -> String {
    let key = normalize_key(raw);
    let mut tokens: Vec<String> = key.split(' ').map(strip_diminutive).collect();
    if let Some(last) = tokens.last_mut() {
        *last = singularize(last);
    }
    tokens.join(" ").trim().to_string()
}

/// Sentence spans (byte offsets) of a text; a trailing fragment counts as a sentence
pub fn sentence_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut start = 0usize;

    for (i, &(pos, ch)) in chars.iter().enumerate() {
        if !matches!(ch, '.' | '!' | '?' | '…') {
            continue;
        }
        // Decimal numbers ("3.5 metros") do not end a sentence
        if ch == '.' && i > 0 && i + 1 < chars.len() {
            if chars[i - 1].1.is_ascii_digit() && chars[i + 1].1.is_ascii_digit() {
                continue;
            }
        }
        let at_boundary = chars.get(i + 1).map_or(true, |&(_, next)| next.is_whitespace());
        if !at_boundary {
            continue;
        }
        let end = pos + ch.len_utf8();
        if !text[start..end].trim().is_empty() {
            spans.push(Span::new(start, end));
        }
        start = end;
    }

    if !text[start..].trim().is_empty() {
        spans.push(Span::new(start, text.len()));
    }
    spans
}

/// Span of the sentence that contains `offset`, or the whole text
pub fn sentence_containing(text: &str, offset: usize) -> Span {
    sentence_spans(text)
        .into_iter()
        .find(|s| offset >= s.start && offset < s.end)
        .unwrap_or_else(|| Span::new(0, text.len()))
}

/// Trim cue text to at most `max_chars` characters around `span`
pub fn trim_context(text: &str, span: Span, max_chars: usize) -> String {
    let collapsed_len = text.chars().count();
    if max_chars == 0 || collapsed_len <= max_chars {
        return normalize_punctuation(text);
    }

    let mut s = span.start.min(text.len());
    while s > 0 && !text.is_char_boundary(s) {
        s -= 1;
    }
    let span_chars = text[s..span.end.min(text.len()).max(s)].chars().count();
    let before_budget = max_chars.saturating_sub(span_chars) / 2;

    let start_char = text[..s].chars().count().saturating_sub(before_budget);
    let window: String = text.chars().skip(start_char).take(max_chars).collect();
    let cut_front = start_char > 0;
    let cut_back = start_char + max_chars < collapsed_len;

    let mut out = String::new();
    if cut_front {
        out.push_str("...");
    }
    out.push_str(window.trim());
    if cut_back {
        out.push_str("...");
    }
    normalize_punctuation(&out)
}

fn depth_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*(?:metros?|m)\b").expect("depth regex"))
}

fn size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(?:cm|cent[ií]metros?)\b").expect("size regex")
    })
}

const BEHAVIOUR_KEYWORDS: [(&str, &str); 4] = [
    ("comportamiento", "behaviour"),
    ("movimiento", "movement"),
    ("alimentacion", "feeding"),
    ("reproduccion", "reproduction"),
];

/// Depth, size and behaviour hints mentioned in a context string
pub fn extract_additional_info(context: &str) -> Option<String> {
    let mut info = Vec::new();

    if let Some(caps) = depth_re().captures(context) {
        info.push(format!("depth: {} m", &caps[1]));
    }
    if let Some(caps) = size_re().captures(context) {
        info.push(format!("size: {} cm", &caps[1]));
    }

    let folded = fold_diacritics(context);
    for (keyword, label) in BEHAVIOUR_KEYWORDS {
        if folded.contains(keyword) {
            info.push(format!("mentions {}", label));
        }
    }

    if info.is_empty() {
        None
    } else {
        Some(info.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_punctuation() {
        let input = "Hola\u{201c}mundo\u{201d}\u{00A0}\u{00A0}aquí";
        assert_eq!(normalize_punctuation(input), "Hola\"mundo\" aquí");
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<i>un pulpo</i>"), "un pulpo");
        assert_eq!(strip_markup("{\\an8}<font color=\"red\">coral</font>"), "coral");
    }

    #[test]
    fn test_fold_and_key() {
        assert_eq!(fold_diacritics("Anémona CAMARÓN"), "anemona camaron");
        assert_eq!(normalize_key("  Estrella   de  Mar "), "estrella de mar");
    }

    #[test]
    fn test_folded_text_maps_offsets_back() {
        let text = "Un camarón aquí";
        let folded = FoldedText::new(text);
        let start = folded.folded.find("camaron").unwrap();
        let span = folded.to_original(start, start + "camaron".len());
        assert_eq!(&text[span.start..span.end], "camarón");
    }

    #[test]
    fn test_normalize_common_name() {
        assert_eq!(normalize_common_name("camaroncitos"), "camaron");
        assert_eq!(normalize_common_name("pulpitos"), "pulpo");
        assert_eq!(normalize_common_name("Peces"), "pez");
        assert_eq!(normalize_common_name("corales"), "coral");
        assert_eq!(normalize_common_name("anémonas"), "anemona");
        assert_eq!(normalize_common_name("erizo"), "erizo");
    }

    #[test]
    fn test_sentence_spans() {
        let text = "Mira eso. Tiene 3.5 metros! Y sigue";
        let spans = sentence_spans(text);
        assert_eq!(spans.len(), 3);
        assert_eq!(&text[spans[0].start..spans[0].end], "Mira eso.");
        assert_eq!(text[spans[1].start..spans[1].end].trim(), "Tiene 3.5 metros!");
        assert_eq!(sentence_containing(text, text.find("sigue").unwrap()), spans[2]);
    }

    #[test]
    fn test_trim_context_keeps_short_text() {
        let text = "un pulpo  enorme";
        assert_eq!(trim_context(text, Span::new(3, 8), 200), "un pulpo enorme");
    }

    #[test]
    fn test_trim_context_window_contains_mention() {
        let text = format!("{} pulpo {}", "a".repeat(300), "b".repeat(300));
        let start = text.find("pulpo").unwrap();
        let out = trim_context(&text, Span::new(start, start + 5), 40);
        assert!(out.contains("pulpo"));
        assert!(out.starts_with("..."));
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_extract_additional_info() {
        let info = extract_additional_info("A 1200 metros vimos un pez de 30 cm en alimentación").unwrap();
        assert_eq!(info, "depth: 1200 m; size: 30 cm; mentions feeding");
        assert!(extract_additional_info("nada que decir").is_none());
    }
}
