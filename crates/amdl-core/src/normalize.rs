//! Text cleanup for tag values and file names.
//!
//! Apple Music titles carry release-type noise ("- Single", "(Single)") and
//! dashes that read badly on simple players. [`normalize_text`] removes that
//! noise; [`strip_track_prefix`] removes the `01. ` style numbering the
//! downloader prepends to file names.

use std::sync::LazyLock;

use regex::Regex;

/// Trailing "Single" marker, with or without a dash or parentheses.
static SINGLE_SUFFIX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:-\s*)?(?:\(\s*single\s*\)|\bsingle)\s*$").ok()
});

/// Leading "Single -" marker. The dash is optional because dashes are
/// already gone by the time this runs.
static SINGLE_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*single\b\s*-?\s*").ok());

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Characters treated as dashes: ASCII hyphen-minus plus the Unicode dash
/// block and the minus sign.
const DASHES: &[char] = &[
    '-', '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}',
];

/// Clean a tag value or file stem.
///
/// Applied in order:
/// 1. every dash becomes a space
/// 2. trailing `- Single`, `(Single)` or `Single` is removed (case-insensitive)
/// 3. leading `Single -` is removed (case-insensitive)
/// 4. whitespace runs collapse to one space and the ends are trimmed
///
/// Steps 2 and 3 repeat until nothing changes, which keeps the function
/// idempotent. Empty input comes back empty.
///
/// ```rust
/// use amdl_core::normalize::normalize_text;
///
/// assert_eq!(normalize_text("Flow-G"), "Flow G");
/// assert_eq!(normalize_text("Song - Single"), "Song");
/// assert_eq!(normalize_text("Single - Song"), "Song");
/// ```
#[must_use]
pub fn normalize_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut text: String = input
        .chars()
        .map(|c| if DASHES.contains(&c) { ' ' } else { c })
        .collect();

    loop {
        let stripped = strip_single_markers(&text);
        if stripped == text {
            break;
        }
        text = stripped;
    }

    collapse_whitespace(&text)
}

fn strip_single_markers(text: &str) -> String {
    let mut out = text.to_string();
    if let Some(re) = SINGLE_SUFFIX.as_ref() {
        out = re.replace(&out, "").into_owned();
    }
    if let Some(re) = SINGLE_PREFIX.as_ref() {
        out = re.replace(&out, "").into_owned();
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(text.trim(), " ").into_owned(),
        None => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Length of the track-number prefix at the start of `stem`, if any.
///
/// Recognized shapes, checked in this order: `DD. `, `D. `, `D `.
fn track_prefix_len(stem: &str) -> Option<usize> {
    let b = stem.as_bytes();
    let digit = |i: usize| b.get(i).is_some_and(u8::is_ascii_digit);
    let is = |i: usize, c: u8| b.get(i) == Some(&c);

    if digit(0) && digit(1) && is(2, b'.') && is(3, b' ') {
        Some(4)
    } else if digit(0) && is(1, b'.') && is(2, b' ') {
        Some(3)
    } else if digit(0) && is(1, b' ') {
        Some(2)
    } else {
        None
    }
}

/// Remove a leading track number from a file stem and normalize the rest.
///
/// ```rust
/// use amdl_core::normalize::strip_track_prefix;
///
/// assert_eq!(strip_track_prefix("01. Track Name"), "Track Name");
/// assert_eq!(strip_track_prefix("1 Track Name"), "Track Name");
/// assert_eq!(strip_track_prefix("Track Name"), "Track Name");
/// ```
#[must_use]
pub fn strip_track_prefix(stem: &str) -> String {
    let rest = track_prefix_len(stem).map_or(stem, |len| &stem[len..]);
    normalize_text(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_becomes_space() {
        assert_eq!(normalize_text("Flow-G"), "Flow G");
        assert_eq!(normalize_text("A\u{2013}B"), "A B");
    }

    #[test]
    fn test_single_suffix_variants() {
        assert_eq!(normalize_text("Song - Single"), "Song");
        assert_eq!(normalize_text("Song (Single)"), "Song");
        assert_eq!(normalize_text("Song Single"), "Song");
        assert_eq!(normalize_text("Song - SINGLE  "), "Song");
        assert_eq!(normalize_text("Song ( single )"), "Song");
    }

    #[test]
    fn test_single_prefix() {
        assert_eq!(normalize_text("Single - Song"), "Song");
        assert_eq!(normalize_text("single-Song"), "Song");
    }

    #[test]
    fn test_single_inside_word_is_kept() {
        assert_eq!(normalize_text("Singles Club"), "Singles Club");
        assert_eq!(normalize_text("Unsingle"), "Unsingle");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(normalize_text("Song   Title"), "Song Title");
        assert_eq!(normalize_text("  Song \t Title \n"), "Song Title");
    }

    #[test]
    fn test_empty_is_noop() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_repeated_markers_fully_removed() {
        assert_eq!(normalize_text("Song Single Single"), "Song");
        assert_eq!(normalize_text("Song (Single) - Single"), "Song");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Flow-G",
            "Song - Single",
            "Single - Song",
            "Song   Title",
            "",
            "Single",
            "- Single -",
            "Single Single - Song (Single)",
            "Artist \u{2014} Title - Single",
            "A - B - C",
            "(Single) Song",
            "Song (single)(Single)",
        ];
        for s in samples {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_strip_track_prefix_shapes() {
        assert_eq!(strip_track_prefix("01. Track Name"), "Track Name");
        assert_eq!(strip_track_prefix("1. Track Name"), "Track Name");
        assert_eq!(strip_track_prefix("1 Track Name"), "Track Name");
        assert_eq!(strip_track_prefix("Track Name"), "Track Name");
    }

    #[test]
    fn test_strip_track_prefix_leaves_other_numbers() {
        assert_eq!(strip_track_prefix("1999"), "1999");
        assert_eq!(strip_track_prefix("22 Acacia Avenue"), "22 Acacia Avenue");
        assert_eq!(strip_track_prefix("1.5 Degrees"), "1.5 Degrees");
    }

    #[test]
    fn test_strip_track_prefix_normalizes_remainder() {
        assert_eq!(strip_track_prefix("03. Flow-G - Single"), "Flow G");
    }
}
