//! Chart settings persisted once per deployment

use serde::{Deserialize, Serialize};

use crate::errors::{ChartNotesError, ChartNotesResult};

/// Interpolation used for the series line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Curved,
    Straight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Colors derived from the theme rather than stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub background: &'static str,
    pub axis_text: &'static str,
    pub grid: &'static str,
    pub title: &'static str,
}

impl Theme {
    pub fn palette(self) -> ThemePalette {
        match self {
            Theme::Light => ThemePalette {
                background: "#ffffff",
                axis_text: "#666666",
                grid: "#e0e0e0",
                title: "#333333",
            },
            Theme::Dark => ThemePalette {
                background: "#1a1a2e",
                axis_text: "#e0e0e0",
                grid: "#444444",
                title: "#e0e0e0",
            },
        }
    }
}

/// Singleton chart configuration.
///
/// Deserializing a partial document fills every absent key from
/// [`ChartSettings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartSettings {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub line_style: LineStyle,
    pub theme: Theme,
    pub line_color: String,
    pub dot_color: String,
    pub bubble_color: String,
    pub show_grid: bool,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            title: String::new(),
            x_axis_title: String::new(),
            y_axis_title: String::new(),
            line_style: LineStyle::Curved,
            theme: Theme::Light,
            line_color: "#3498db".to_string(),
            dot_color: "#3498db".to_string(),
            bubble_color: "#333333".to_string(),
            show_grid: true,
        }
    }
}

impl ChartSettings {
    /// Merge a stored JSON object over the defaults
    pub fn from_stored(value: serde_json::Value) -> ChartNotesResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Set one field by its wire name, e.g. `("lineStyle", "straight")`
    pub fn set_field(&mut self, key: &str, value: &str) -> ChartNotesResult<()> {
        match key {
            "title" => self.title = value.to_string(),
            "xAxisTitle" => self.x_axis_title = value.to_string(),
            "yAxisTitle" => self.y_axis_title = value.to_string(),
            "lineStyle" => {
                self.line_style = match value {
                    "curved" => LineStyle::Curved,
                    "straight" => LineStyle::Straight,
                    other => return Err(invalid_choice(key, other)),
                }
            }
            "theme" => {
                self.theme = match value {
                    "light" => Theme::Light,
                    "dark" => Theme::Dark,
                    other => return Err(invalid_choice(key, other)),
                }
            }
            "lineColor" => self.line_color = value.to_string(),
            "dotColor" => self.dot_color = value.to_string(),
            "bubbleColor" => self.bubble_color = value.to_string(),
            "showGrid" => {
                self.show_grid = value
                    .parse()
                    .map_err(|_| ChartNotesError::validation(key, "expected true or false"))?
            }
            _ => {
                return Err(ChartNotesError::validation(
                    key,
                    "unknown setting".to_string(),
                ))
            }
        }
        Ok(())
    }
}

fn invalid_choice(key: &str, value: &str) -> ChartNotesError {
    ChartNotesError::validation(key, format!("unsupported value '{value}'"))
}
