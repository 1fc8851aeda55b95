use crate::hash::CanonicalOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Options recognized by [`compare`](crate::wml::compare).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareSettings {
    /// Characters that terminate Words during unit grouping.
    pub word_separators: Vec<char>,
    /// Author stamped on every revision element. Unset falls back to the
    /// modified document's last-modified-by / creator, then to "Redline".
    pub author_for_revisions: Option<String>,
    /// Timestamp stamped on every revision element. Unset falls back to
    /// the modified document's modified date, then to the current time.
    /// Pin this for byte-identical builds.
    pub date_time_for_revisions: Option<DateTime<Utc>>,
    /// Minimum matching fraction for common-prefix/suffix acceptance.
    pub detail_threshold: f64,
    /// Uppercase text under a locale-invariant mapping before hashing.
    pub case_insensitive: bool,
    /// Hash NBSP and SPACE identically.
    pub conflate_breaking_and_nonbreaking_spaces: bool,
    /// Emit `rPrChange`/`pPrChange` for formatting-only differences.
    pub track_formatting_changes: bool,
    /// First revision id allocated when processing footnotes/endnotes.
    pub starting_id_for_footnotes_endnotes: i32,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            word_separators: vec![
                ' ', '-', ')', '(', ';', ',', '.', '!', '?', ':', '\'', '"', '/', '\\', '[',
                ']', '{', '}', '<', '>',
                // CJK punctuation
                '\u{FF08}', '\u{FF09}', '\u{FF0C}', '\u{3001}', '\u{FF1B}', '\u{3002}',
                '\u{FF1A}',
            ],
            author_for_revisions: None,
            date_time_for_revisions: None,
            detail_threshold: 0.15,
            case_insensitive: false,
            conflate_breaking_and_nonbreaking_spaces: true,
            track_formatting_changes: true,
            starting_id_for_footnotes_endnotes: 1,
        }
    }
}

impl CompareSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author_for_revisions = Some(author.to_string());
        self
    }

    pub fn with_date_time(mut self, date_time: DateTime<Utc>) -> Self {
        self.date_time_for_revisions = Some(date_time);
        self
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn with_track_formatting(mut self, track: bool) -> Self {
        self.track_formatting_changes = track;
        self
    }

    pub fn is_word_separator(&self, ch: char) -> bool {
        ch.is_whitespace() || self.word_separators.contains(&ch)
    }

    pub fn canonical_options(&self) -> CanonicalOptions {
        CanonicalOptions {
            case_insensitive: self.case_insensitive,
            conflate_spaces: self.conflate_breaking_and_nonbreaking_spaces,
        }
    }
}
