//! Data point types shared by the stores, the server and the renderer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ChartNotesError, ChartNotesResult};

/// Maximum number of characters a stored note may hold
pub const MAX_NOTE_CHARS: usize = 30;

/// One labeled value of the series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: i64,
    /// Period label ("Jan", "Q1", "2024"); not assumed chronological or unique
    pub month: String,
    pub value: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DataPoint {
    /// Build a stored point from a validated draft
    pub fn from_draft(id: i64, draft: PointDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            month: draft.month,
            value: draft.value,
            note: draft.note,
            created_at,
        }
    }

    /// Apply a validated patch in place. `id` and `created_at` never change.
    pub fn apply(&mut self, patch: &PointPatch) {
        if let Some(month) = &patch.month {
            self.month = month.clone();
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(note) = &patch.note {
            self.note = normalize_note(Some(note));
        }
    }

    pub fn has_note(&self) -> bool {
        self.note.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// Input for creating a point, checked before any backend call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDraft {
    pub month: String,
    pub value: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl PointDraft {
    /// Validate and normalize user input.
    ///
    /// The label is trimmed and must not be empty, the value must be finite and
    /// the note is trimmed, emptied to `None` and truncated to [`MAX_NOTE_CHARS`].
    pub fn new(month: &str, value: f64, note: Option<&str>) -> ChartNotesResult<Self> {
        Ok(Self {
            month: validate_month(month)?,
            value: validate_value(value)?,
            note: normalize_note(note),
        })
    }

    /// Validate loosely typed fields as they arrive from a form or JSON body
    pub fn from_fields(fields: PointFields) -> ChartNotesResult<Self> {
        let month = fields
            .month
            .ok_or_else(|| ChartNotesError::validation("month", "month and value are required"))?;
        let value = fields
            .value
            .ok_or_else(|| ChartNotesError::validation("value", "month and value are required"))?;
        Self::new(&month, value, fields.note.as_deref())
    }
}

/// Partial update; absent fields keep their stored value.
///
/// `note: Some("")` clears the note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PointPatch {
    pub fn validated(self) -> ChartNotesResult<Self> {
        Ok(Self {
            month: self.month.as_deref().map(validate_month).transpose()?,
            value: self.value.map(validate_value).transpose()?,
            note: self
                .note
                .map(|n| normalize_note(Some(&n)).unwrap_or_default()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.month.is_none() && self.value.is_none() && self.note.is_none()
    }
}

/// Raw point fields with every member optional, as posted by clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointFields {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl From<PointFields> for PointPatch {
    fn from(fields: PointFields) -> Self {
        Self {
            month: fields.month,
            value: fields.value,
            note: fields.note,
        }
    }
}

fn validate_month(month: &str) -> ChartNotesResult<String> {
    let month = month.trim();
    if month.is_empty() {
        return Err(ChartNotesError::validation("month", "label must not be empty"));
    }
    Ok(month.to_string())
}

fn validate_value(value: f64) -> ChartNotesResult<f64> {
    if !value.is_finite() {
        return Err(ChartNotesError::validation("value", "value must be a finite number"));
    }
    Ok(value)
}

/// Trim a note, map blank notes to `None` and cut it to [`MAX_NOTE_CHARS`]
pub fn normalize_note(note: Option<&str>) -> Option<String> {
    let note = note?.trim();
    if note.is_empty() {
        return None;
    }
    Some(truncate_chars(note, MAX_NOTE_CHARS).to_string())
}

/// Prefix of `text` holding at most `max` characters (not bytes)
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
