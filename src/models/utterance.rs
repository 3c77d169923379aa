use serde::{Deserialize, Serialize};

/// One time-stamped row of a translated transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Position in the source table (0-based)
    pub index: usize,
    /// Original-language text as transcribed
    pub original: String,
    /// Revised original-language text (equals `original` when no revision exists)
    pub revised: String,
    /// Translated (target-language) text
    pub translated: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Utterance {
    /// Original-language text to carry into output records.
    ///
    /// Prefers the revised text, falling back to the raw transcription.
    pub fn original_text(&self) -> &str {
        if self.revised.trim().is_empty() {
            &self.original
        } else {
            &self.revised
        }
    }

    /// Whether the translated text carries nothing to classify
    pub fn is_blank(&self) -> bool {
        self.translated.trim().is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Which column-naming scheme the input table used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnScheme {
    /// `translated_text`, `original_text`, `revised_text`
    Current,
    /// `english`, `thai`, `thai_revised`
    Legacy,
}

impl ColumnScheme {
    /// Schemes in the order they are tried
    pub const PREFERENCE: [ColumnScheme; 2] = [ColumnScheme::Current, ColumnScheme::Legacy];

    pub fn translated_column(&self) -> &'static str {
        match self {
            ColumnScheme::Current => "translated_text",
            ColumnScheme::Legacy => "english",
        }
    }

    pub fn original_column(&self) -> &'static str {
        match self {
            ColumnScheme::Current => "original_text",
            ColumnScheme::Legacy => "thai",
        }
    }

    /// Optional; falls back to the original column when absent
    pub fn revised_column(&self) -> &'static str {
        match self {
            ColumnScheme::Current => "revised_text",
            ColumnScheme::Legacy => "thai_revised",
        }
    }

    pub fn required_columns(&self) -> [&'static str; 4] {
        [
            self.translated_column(),
            self.original_column(),
            START_COLUMN,
            END_COLUMN,
        ]
    }
}

impl std::fmt::Display for ColumnScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnScheme::Current => write!(f, "current"),
            ColumnScheme::Legacy => write!(f, "legacy"),
        }
    }
}

pub const START_COLUMN: &str = "start";
pub const END_COLUMN: &str = "end";

/// A loaded transcript: utterances in file order
#[derive(Debug, Clone)]
pub struct Transcript {
    pub utterances: Vec<Utterance>,
    /// Column scheme the source table matched
    pub scheme: ColumnScheme,
}

impl Transcript {
    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    /// Span from the earliest start to the latest end, in seconds
    pub fn time_span(&self) -> Option<(f64, f64)> {
        let start = self.utterances.iter().map(|u| u.start).reduce(f64::min)?;
        let end = self.utterances.iter().map(|u| u.end).reduce(f64::max)?;
        Some((start, end))
    }

    /// Count of utterances that start before their predecessor
    pub fn non_monotonic_count(&self) -> usize {
        self.utterances
            .windows(2)
            .filter(|pair| pair[1].start < pair[0].start)
            .count()
    }
}
