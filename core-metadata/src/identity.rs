//! Track Identity Resolution
//!
//! Derives the `{artist, title}` pair used for provider queries from whatever
//! a file offers: embedded tags first, the file name as a fallback, and a few
//! heuristics for the common ways DJ pools and rippers mangle both.

use once_cell::sync::Lazy;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::normalize::{
    normalize, word_list_pattern, NormalizationRule, BPM_PATTERN, BRACKETS_PATTERN,
    CAMELOT_KEY_PATTERN, WHITESPACE_RUN_PATTERN,
};

/// Audio container extensions the processor will try to tag (lowercase).
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "m4a", "mp4", "aac", "ogg", "opus", "wav", "aiff", "aif", "wv", "ape",
    "mpc", "spx",
];

/// Smaller word list used when cleaning raw file names.
const FILE_NAME_NOISE_WORDS: &[&str] = &[
    "clean", "dirty", "extended", "edit", "intro", "SE", "wingman", "VIP",
];

static FILE_NAME_RULES: Lazy<Vec<NormalizationRule>> = Lazy::new(|| {
    vec![
        NormalizationRule::new("bpm", BPM_PATTERN, ""),
        NormalizationRule::new("camelot_key", CAMELOT_KEY_PATTERN, ""),
        NormalizationRule::new("noise_words", &word_list_pattern(FILE_NAME_NOISE_WORDS), ""),
        NormalizationRule::new("brackets", BRACKETS_PATTERN, ""),
        NormalizationRule::new("whitespace", WHITESPACE_RUN_PATTERN, " "),
    ]
});

/// Best-effort artist and title of a track. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackIdentity {
    pub artist: String,
    pub title: String,
}

impl TrackIdentity {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artist.is_empty() && self.title.is_empty()
    }
}

/// Whether the path has one of the [`AUDIO_EXTENSIONS`] (case-insensitive).
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn strip_audio_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
            stem
        }
        _ => file_name,
    }
}

/// Split a raw file name into artist and title.
///
/// The extension and DJ annotations are removed first. Then, in order:
/// `"Artist - Title"` splits on the separator; three or more words starting
/// with a letter take the first word as artist; anything else is all title.
/// The parts are not normalized here.
pub fn parse_file_name(file_name: &str) -> TrackIdentity {
    let mut clean = strip_audio_extension(file_name).trim().to_string();
    for rule in FILE_NAME_RULES.iter() {
        clean = rule.apply(&clean);
    }
    let clean = clean.trim();

    let parts: Vec<&str> = clean.split(" - ").collect();
    if let [artist, title] = parts.as_slice() {
        return TrackIdentity::new(artist.trim(), title.trim());
    }

    let words: Vec<&str> = clean.split_whitespace().collect();
    if words.len() > 2 && words[0].starts_with(|c: char| c.is_ascii_alphabetic()) {
        return TrackIdentity::new(words[0], words[1..].join(" "));
    }

    TrackIdentity::new("", clean)
}

/// Remove the first case-insensitive occurrence of `artist` from `title`.
///
/// Handles titles like `"Artist - Artist Name - Song"` where the artist was
/// baked into the title tag.
pub fn remove_artist_from_title(artist: &str, title: &str) -> String {
    if artist.is_empty() {
        return title.to_string();
    }

    match RegexBuilder::new(&regex::escape(artist))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) if pattern.is_match(title) => pattern.replace(title, "").trim().to_string(),
        _ => title.to_string(),
    }
}

/// Produce the best-effort identity of a file.
///
/// Tag values win when present; empty fields fall back to the parsed file
/// name. A lone title gets its leading words promoted to artist, and an
/// artist repeated inside the title is stripped out.
pub fn resolve_identity(
    tag_artist: Option<&str>,
    tag_title: Option<&str>,
    file_name: &str,
) -> TrackIdentity {
    let mut artist = normalize(tag_artist.unwrap_or_default());
    let mut title = normalize(tag_title.unwrap_or_default());

    if artist.is_empty() || title.is_empty() {
        let parsed = parse_file_name(file_name);
        if artist.is_empty() {
            artist = normalize(&parsed.artist);
        }
        if title.is_empty() {
            title = normalize(&parsed.title);
        }
    }

    if artist.is_empty() && !title.is_empty() {
        if let Some((head, _last_word)) = title.rsplit_once(char::is_whitespace) {
            let guess = head.trim().to_string();
            if !guess.is_empty() {
                title = title.replacen(&guess, "", 1).trim().to_string();
                artist = guess;
            }
        }
    }

    if !artist.is_empty() && !title.is_empty() {
        title = remove_artist_from_title(&artist, &title);
    }

    TrackIdentity { artist, title }
}
