//! Shared types for Chart Notes
//!
//! This crate contains the types passed between the renderer, the data
//! manager, the HTTP server and the CLI: data points and their drafts,
//! chart settings and the common error type.

pub mod chart_config;
pub mod data_types;
pub mod errors;

pub use chart_config::{ChartSettings, LineStyle, Theme, ThemePalette};
pub use data_types::{
    normalize_note, truncate_chars, DataPoint, PointDraft, PointFields, PointPatch,
    MAX_NOTE_CHARS,
};
pub use errors::{ChartNotesError, ChartNotesResult, ErrorResponse};
