//! Scale mapping from labels and values to pixel coordinates

use std::collections::HashMap;

use chartnotes_shared::{ChartNotesError, ChartNotesResult, DataPoint};
use serde::{Deserialize, Serialize};

/// Width reserved left of the plot for y-axis tick labels
pub const Y_AXIS_GUTTER: f64 = 60.0;
/// Height reserved below the plot for x-axis tick labels
pub const X_AXIS_BAND: f64 = 30.0;

/// Pixel margins around the plot area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    /// Margins for a chart. Bubbles get extra room at the top and right so
    /// callouts over edge points are not clipped.
    pub fn for_chart(show_notes: bool, has_x_title: bool, has_y_title: bool) -> Self {
        Self {
            top: if show_notes { 60.0 } else { 20.0 },
            right: if show_notes { 80.0 } else { 30.0 },
            bottom: if has_x_title { 50.0 } else { 20.0 },
            left: if has_y_title { 60.0 } else { 20.0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
}

impl Viewport {
    pub fn new(width: f64, height: f64, margins: Margins) -> Self {
        Self {
            width,
            height,
            margins,
        }
    }

    /// Rectangle the series is drawn into
    pub fn plot_area(&self) -> ChartNotesResult<PlotArea> {
        let area = PlotArea {
            left: self.margins.left + Y_AXIS_GUTTER,
            top: self.margins.top,
            right: self.width - self.margins.right,
            bottom: self.height - self.margins.bottom - X_AXIS_BAND,
        };
        if !(area.width() > 0.0 && area.height() > 0.0) {
            return Err(ChartNotesError::validation(
                "viewport",
                format!(
                    "{}x{} leaves no room for a plot area",
                    self.width, self.height
                ),
            ));
        }
        Ok(area)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl PlotArea {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.left && x <= self.right
    }
}

/// Band scale over distinct labels plus an inverted linear value scale.
///
/// Coordinates are only valid for the viewport the scale was built with.
#[derive(Debug, Clone)]
pub struct ChartScale {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    y_min: f64,
    y_max: f64,
    area: PlotArea,
}

impl ChartScale {
    /// Build scales for a point sequence
    pub fn for_points(points: &[DataPoint], viewport: &Viewport) -> ChartNotesResult<Self> {
        if points.is_empty() {
            return Err(ChartNotesError::EmptyDomain);
        }
        let (min, max) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.value), hi.max(p.value))
            });
        Self::from_domain(points.iter().map(|p| p.month.as_str()), (min, max), viewport)
    }

    /// Build scales from an explicit x-domain and value range.
    ///
    /// Repeated labels collapse onto the band of their first appearance.
    pub fn from_domain<'a>(
        labels: impl IntoIterator<Item = &'a str>,
        (min, max): (f64, f64),
        viewport: &Viewport,
    ) -> ChartNotesResult<Self> {
        let mut ordered = Vec::new();
        let mut index = HashMap::new();
        for label in labels {
            if !index.contains_key(label) {
                index.insert(label.to_string(), ordered.len());
                ordered.push(label.to_string());
            }
        }
        if ordered.is_empty() || !min.is_finite() || !max.is_finite() {
            return Err(ChartNotesError::EmptyDomain);
        }

        let (y_min, y_max) = widen_degenerate(min.min(max), max.max(min));
        Ok(Self {
            labels: ordered,
            index,
            y_min,
            y_max,
            area: viewport.plot_area()?,
        })
    }

    pub fn plot_area(&self) -> PlotArea {
        self.area
    }

    /// Distinct labels in band order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn y_domain(&self) -> (f64, f64) {
        (self.y_min, self.y_max)
    }

    pub fn bandwidth(&self) -> f64 {
        self.area.width() / self.labels.len() as f64
    }

    /// Centre of the band holding `label`
    pub fn x(&self, label: &str) -> Option<f64> {
        self.index.get(label).map(|&i| self.band_center(i))
    }

    pub fn band_center(&self, band: usize) -> f64 {
        let bw = self.bandwidth();
        self.area.left + band as f64 * bw + bw / 2.0
    }

    /// Larger values map to smaller pixel y
    pub fn y(&self, value: f64) -> f64 {
        // Halved operands keep the span finite across the whole f64 range
        let span = self.y_max / 2.0 - self.y_min / 2.0;
        let t = (value / 2.0 - self.y_min / 2.0) / span;
        self.area.bottom - t * self.area.height()
    }

    /// Band index under a horizontal pixel position, if inside the plot
    pub fn band_at(&self, px: f64) -> Option<usize> {
        if !px.is_finite() || !self.area.contains_x(px) {
            return None;
        }
        let band = ((px - self.area.left) / self.bandwidth()).floor() as usize;
        Some(band.min(self.labels.len() - 1))
    }

    pub fn label_at(&self, px: f64) -> Option<&str> {
        self.band_at(px).map(|i| self.labels[i].as_str())
    }
}

/// Widen a zero-height domain symmetrically so the scale never divides by zero
fn widen_degenerate(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        return (min, max);
    }
    let pad = (min.abs() * 0.1).max(1.0);
    ((min - pad).max(f64::MIN), (max + pad).min(f64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn point(id: i64, month: &str, value: f64) -> DataPoint {
        DataPoint {
            id,
            month: month.to_string(),
            value,
            note: None,
            created_at: Utc::now(),
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(800.0, 400.0, Margins::for_chart(false, false, false))
    }

    #[test]
    fn test_y_extremes_hit_plot_bounds() {
        let points = vec![point(1, "Jan", 10.0), point(2, "Feb", 40.0), point(3, "Mar", 25.0)];
        let scale = ChartScale::for_points(&points, &viewport()).unwrap();
        let area = scale.plot_area();

        assert_eq!(scale.y(40.0), area.top);
        assert_eq!(scale.y(10.0), area.bottom);
        // Same input, same output
        assert_eq!(scale.y(25.0), scale.y(25.0));
        assert!(scale.y(25.0) > area.top && scale.y(25.0) < area.bottom);
    }

    #[test]
    fn test_degenerate_domain() {
        let points = vec![point(1, "Jan", 5.0), point(2, "Feb", 5.0)];
        let scale = ChartScale::for_points(&points, &viewport()).unwrap();

        let (lo, hi) = scale.y_domain();
        assert!(hi > lo);
        assert!(scale.y(5.0).is_finite());
        assert_ne!(scale.x("Jan").unwrap(), scale.x("Feb").unwrap());
    }

    #[test]
    fn test_extreme_finite_domain_stays_finite() {
        let scale =
            ChartScale::from_domain(["a", "b"], (-f64::MAX, f64::MAX), &viewport()).unwrap();
        let area = scale.plot_area();

        assert_eq!(scale.y(-f64::MAX), area.bottom);
        assert_eq!(scale.y(f64::MAX), area.top);
        assert_eq!(scale.y(0.0), area.bottom - area.height() / 2.0);

        let flat = ChartScale::from_domain(["a"], (f64::MAX, f64::MAX), &viewport()).unwrap();
        let (lo, hi) = flat.y_domain();
        assert!(lo.is_finite() && hi.is_finite() && hi > lo);
        assert!(flat.y(f64::MAX).is_finite());
    }

    #[test]
    fn test_band_centers_are_evenly_spaced() {
        let points = vec![point(1, "Q1", 1.0), point(2, "Q2", 2.0), point(3, "Q3", 3.0)];
        let scale = ChartScale::for_points(&points, &viewport()).unwrap();
        let area = scale.plot_area();

        let xs: Vec<f64> = ["Q1", "Q2", "Q3"].iter().map(|l| scale.x(l).unwrap()).collect();
        assert!((xs[1] - xs[0] - (xs[2] - xs[1])).abs() < 1e-9);
        assert_eq!(xs[0], area.left + scale.bandwidth() / 2.0);
        assert_eq!(scale.x("Q4"), None);
    }

    #[test]
    fn test_duplicate_labels_share_a_band() {
        let points = vec![point(1, "Jan", 1.0), point(2, "Feb", 2.0), point(3, "Jan", 3.0)];
        let scale = ChartScale::for_points(&points, &viewport()).unwrap();
        assert_eq!(scale.labels(), &["Jan".to_string(), "Feb".to_string()]);
    }

    #[test]
    fn test_band_lookup() {
        let points = vec![point(1, "A", 1.0), point(2, "B", 2.0)];
        let scale = ChartScale::for_points(&points, &viewport()).unwrap();
        let area = scale.plot_area();

        assert_eq!(scale.label_at(area.left + 1.0), Some("A"));
        assert_eq!(scale.label_at(area.right), Some("B"));
        assert_eq!(scale.label_at(area.left - 1.0), None);
        assert_eq!(scale.label_at(f64::NAN), None);
    }

    #[test]
    fn test_empty_domain() {
        assert_eq!(
            ChartScale::for_points(&[], &viewport()).unwrap_err(),
            ChartNotesError::EmptyDomain
        );
    }

    #[test]
    fn test_margins_grow_with_notes_and_titles() {
        let plain = Margins::for_chart(false, false, false);
        let full = Margins::for_chart(true, true, true);
        assert_eq!((plain.top, plain.right), (20.0, 30.0));
        assert_eq!((full.top, full.right, full.bottom, full.left), (60.0, 80.0, 50.0, 60.0));
    }

    #[test]
    fn test_tiny_viewport_is_rejected() {
        let tiny = Viewport::new(50.0, 50.0, Margins::for_chart(true, true, true));
        assert!(matches!(
            ChartScale::for_points(&[point(1, "Jan", 1.0)], &tiny),
            Err(ChartNotesError::Validation { .. })
        ));
    }
}
