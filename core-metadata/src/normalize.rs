//! Text Normalization
//!
//! Turns noisy tag values and file names into the canonical strings used for
//! provider queries. The pipeline is an ordered table of named rules so each
//! rule can be exercised on its own:
//!
//! 1. `separators` - underscores and hyphens become spaces
//! 2. `track_index` - leading track number (`01. `, `7 - `)
//! 3. `brackets` - `( ... )` and `[ ... ]` segments
//! 4. `noise_words` - mix/edit/version annotations, whole words only
//! 5. `featuring` - `feat.`/`ft.` plus the following token
//! 6. `bpm`, `camelot_key` - DJ annotations such as `128bpm` and `8A`
//! 7. `whitespace`, `en_dash`, mojibake repairs
//!
//! and finally a trim. The pass is repeated until the output stops changing,
//! so [`normalize`] is idempotent.
//!
//! ```
//! use core_metadata::normalize::normalize;
//!
//! assert_eq!(normalize("03_Midnight Drive (Extended Mix) 128bpm"), "Midnight Drive");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// Annotation words stripped from tag values, matched case-insensitively as whole words.
pub const NOISE_WORDS: &[&str] = &[
    "original mix",
    "extended mix",
    "clean",
    "dirty",
    "intro",
    "edit",
    "remix",
    "version",
    "track",
    "live",
    "SE",
    "Wingman",
    "VIP",
];

/// A single named rewrite step.
#[derive(Debug)]
pub struct NormalizationRule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl NormalizationRule {
    pub(crate) fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            // Patterns are compile-time constants covered by the unit tests.
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("rule {name}: {e}")),
            replacement,
        }
    }

    /// Rule name, stable across releases
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply this rule alone
    pub fn apply(&self, input: &str) -> String {
        self.pattern
            .replace_all(input, regex::NoExpand(self.replacement))
            .into_owned()
    }
}

/// Builds a case-insensitive whole-word alternation from a word list.
pub(crate) fn word_list_pattern(words: &[&str]) -> String {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    format!(r"(?i)\b(?:{})\b", alternation)
}

pub(crate) const BRACKETS_PATTERN: &str = r"(?s)\(.*?\)|\[.*?\]";
pub(crate) const BPM_PATTERN: &str = r"(?i)\b\d{2,3} ?bpm\b";
pub(crate) const CAMELOT_KEY_PATTERN: &str = r"\b\d{1,2}[AB]\b";
pub(crate) const WHITESPACE_RUN_PATTERN: &str = r"\s{2,}";

static RULES: Lazy<Vec<NormalizationRule>> = Lazy::new(|| {
    vec![
        NormalizationRule::new("separators", r"[_-]", " "),
        NormalizationRule::new("track_index", r"^[0-9]+[.\-\s]*", ""),
        NormalizationRule::new("brackets", BRACKETS_PATTERN, ""),
        NormalizationRule::new("noise_words", &word_list_pattern(NOISE_WORDS), ""),
        NormalizationRule::new("featuring", r"(?i)\b(?:feat\.?|ft\.?)\s+\S+", ""),
        NormalizationRule::new("bpm", BPM_PATTERN, ""),
        NormalizationRule::new("camelot_key", CAMELOT_KEY_PATTERN, ""),
        NormalizationRule::new("whitespace", WHITESPACE_RUN_PATTERN, " "),
        NormalizationRule::new("en_dash", "\u{2013}", "-"),
        // UTF-8 read as Latin-1
        NormalizationRule::new("mojibake_u_umlaut", "\u{c3}\u{bc}", "\u{fc}"),
        NormalizationRule::new("mojibake_e_acute", "\u{c3}\u{a9}", "\u{e9}"),
        NormalizationRule::new("mojibake_a_grave", "\u{c3}", "\u{e0}"),
    ]
});

/// The ordered rule table used by [`normalize`].
pub fn rules() -> &'static [NormalizationRule] {
    &RULES
}

/// One pass over the rule table followed by a trim.
fn normalize_once(raw: &str) -> String {
    let mut text = raw.to_string();
    for rule in RULES.iter() {
        text = rule.apply(&text);
    }
    text.trim().to_string()
}

/// Normalize a tag value or file name fragment.
///
/// Never fails; empty input yields empty output. Every rule either deletes
/// text or maps a character one way (`_`/`-` to space, en-dash to hyphen,
/// `Ã` to `à`), so repeating the pass reaches a fixpoint.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> &'static NormalizationRule {
        rules()
            .iter()
            .find(|r| r.name() == name)
            .unwrap_or_else(|| panic!("no rule named {name}"))
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<_> = rules().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec![
                "separators",
                "track_index",
                "brackets",
                "noise_words",
                "featuring",
                "bpm",
                "camelot_key",
                "whitespace",
                "en_dash",
                "mojibake_u_umlaut",
                "mojibake_e_acute",
                "mojibake_a_grave",
            ]
        );
    }

    #[test]
    fn test_separators_rule() {
        assert_eq!(rule("separators").apply("DJ_Nova-Drive"), "DJ Nova Drive");
    }

    #[test]
    fn test_track_index_rule() {
        assert_eq!(rule("track_index").apply("01. Song"), "Song");
        assert_eq!(rule("track_index").apply("7 Song"), "Song");
        assert_eq!(rule("track_index").apply("Song 01"), "Song 01");
    }

    #[test]
    fn test_brackets_rule() {
        assert_eq!(
            rule("brackets").apply("Song (Extended Mix) [Label]"),
            "Song  "
        );
        assert_eq!(rule("brackets").apply("Song (unclosed"), "Song (unclosed");
        assert_eq!(rule("brackets").apply("Song [a\nb]"), "Song ");
    }

    #[test]
    fn test_noise_words_rule() {
        let noise = rule("noise_words");
        assert_eq!(noise.apply("Song Original Mix"), "Song ");
        assert_eq!(noise.apply("Song vip"), "Song ");
        assert_eq!(noise.apply("Seven Tracks"), "Seven Tracks");
        assert_eq!(noise.apply("Editorial"), "Editorial");
    }

    #[test]
    fn test_featuring_rule() {
        assert_eq!(rule("featuring").apply("Song feat. Someone Else"), "Song  Else");
        assert_eq!(rule("featuring").apply("Song ft Guest"), "Song ");
    }

    #[test]
    fn test_dj_annotation_rules() {
        assert_eq!(rule("bpm").apply("Song 128bpm"), "Song ");
        assert_eq!(rule("bpm").apply("Song 95 BPM"), "Song ");
        assert_eq!(rule("camelot_key").apply("Song 8A"), "Song ");
        assert_eq!(rule("camelot_key").apply("Song 12B"), "Song ");
        assert_eq!(rule("camelot_key").apply("Song 8a"), "Song 8a");
    }

    #[test]
    fn test_mojibake_repairs() {
        assert_eq!(normalize("\u{c3}\u{bc}ber"), "\u{fc}ber");
        assert_eq!(normalize("Caf\u{c3}\u{a9}"), "Caf\u{e9}");
        assert_eq!(normalize("Voil\u{c3}"), "Voil\u{e0}");
    }

    #[test]
    fn test_normalize_full_pipeline() {
        assert_eq!(normalize("01. DJ Nova"), "DJ Nova");
        assert_eq!(
            normalize("Midnight Drive (Extended Mix) [128bpm]"),
            "Midnight Drive"
        );
        assert_eq!(normalize("Sunrise feat. Guest 8A 124 bpm"), "Sunrise");
        assert_eq!(normalize("  spaced    out  "), "spaced out");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("(Remix)"), "");
    }

    #[test]
    fn test_normalize_reaches_fixpoint() {
        // One pass leaves "01 Song" behind; the next strips the index.
        assert_eq!(normalize("Live 01 Song"), "Song");
        // En-dash becomes a hyphen, which the next pass turns into a space.
        assert_eq!(normalize("Artist \u{2013} Title"), "Artist Title");
    }
}
