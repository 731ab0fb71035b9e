//! Search Variations
//!
//! Providers index the same recording in different shapes, so queries are
//! tried in several word orders before a track is given up on.

use crate::normalize::normalize;

/// Build the ordered, distinct, non-empty query strings for a track.
///
/// Candidates in order: `artist title`, `title artist`, `title`, `artist`,
/// `artist - title`, `title - artist`. Each is normalized, then empties and
/// repeats are dropped with the first occurrence kept. The result is empty
/// only when both fields normalize to nothing.
pub fn generate_search_variations(artist: &str, title: &str) -> Vec<String> {
    let artist = normalize(artist);
    let title = normalize(title);

    let candidates = [
        format!("{} {}", artist, title),
        format!("{} {}", title, artist),
        title.clone(),
        artist.clone(),
        format!("{} - {}", artist, title),
        format!("{} - {}", title, artist),
    ];

    let mut variations: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let candidate = normalize(&candidate);
        if !candidate.is_empty() && !variations.contains(&candidate) {
            variations.push(candidate);
        }
    }
    variations
}
