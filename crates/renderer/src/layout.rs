//! Full chart layout: anchors, line path, ticks and note callouts for one
//! viewport, plus hit-testing of clicks back to points.

use chartnotes_shared::{ChartNotesResult, ChartSettings, DataPoint};
use serde::{Deserialize, Serialize};

use crate::annotation::{layout_annotation, AnnotationBox};
use crate::curve::{line_path, PathSegment};
use crate::scale::{ChartScale, Margins, PlotArea, Viewport};
use crate::ticks::y_ticks;

/// Default chart height, matching the fixed-height chart container
pub const DEFAULT_HEIGHT: f64 = 400.0;

/// Pixel position of one point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointAnchor {
    pub point_id: i64,
    pub x: f64,
    pub y: f64,
}

/// Options that influence layout but are not persisted settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub width: f64,
    pub height: f64,
    pub show_notes: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: DEFAULT_HEIGHT,
            show_notes: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChartLayout {
    pub viewport: Viewport,
    pub scale: ChartScale,
    pub anchors: Vec<PointAnchor>,
    pub path: Vec<PathSegment>,
    pub y_ticks: Vec<(f64, f64)>,
    pub annotations: Vec<AnnotationBox>,
}

impl ChartLayout {
    /// Lay out `points` (in series order) for the given settings and viewport.
    ///
    /// Fails with `EmptyDomain` when there are no points; callers should skip
    /// rendering in that case.
    pub fn compute(
        points: &[DataPoint],
        settings: &ChartSettings,
        options: LayoutOptions,
    ) -> ChartNotesResult<Self> {
        let margins = Margins::for_chart(
            options.show_notes,
            !settings.x_axis_title.is_empty(),
            !settings.y_axis_title.is_empty(),
        );
        let viewport = Viewport::new(options.width, options.height, margins);
        let scale = ChartScale::for_points(points, &viewport)?;

        let anchors: Vec<PointAnchor> = points
            .iter()
            .filter_map(|p| {
                let x = scale.x(&p.month)?;
                let y = scale.y(p.value);
                (x.is_finite() && y.is_finite()).then_some(PointAnchor {
                    point_id: p.id,
                    x,
                    y,
                })
            })
            .collect();

        let coords: Vec<(f64, f64)> = anchors.iter().map(|a| (a.x, a.y)).collect();
        let path = line_path(&coords, settings.line_style);

        let (lo, hi) = scale.y_domain();
        let y_ticks = y_ticks(lo, hi)
            .into_iter()
            .map(|v| (v, scale.y(v)))
            .collect();

        let annotations = if options.show_notes {
            points
                .iter()
                .zip(anchors_by_point(points, &anchors))
                .filter_map(|(p, anchor)| {
                    let anchor = anchor?;
                    layout_annotation(p.id, (anchor.x, anchor.y), p.note.as_deref()?, options.width)
                })
                .collect()
        } else {
            Vec::new()
        };

        log::debug!(
            "laid out {} points, {} annotations in {}x{}",
            anchors.len(),
            annotations.len(),
            options.width,
            options.height
        );

        Ok(Self {
            viewport,
            scale,
            anchors,
            path,
            y_ticks,
            annotations,
        })
    }

    pub fn plot_area(&self) -> PlotArea {
        self.scale.plot_area()
    }

    pub fn anchor(&self, point_id: i64) -> Option<&PointAnchor> {
        self.anchors.iter().find(|a| a.point_id == point_id)
    }

    /// Map a click back to the point it targets.
    ///
    /// The click selects the x band under `px`; among the points sharing that
    /// band the one vertically closest to `py` wins.
    pub fn hit_test(&self, px: f64, py: f64) -> Option<i64> {
        let band = self.scale.band_at(px)?;
        let band_x = self.scale.band_center(band);
        self.anchors
            .iter()
            .filter(|a| (a.x - band_x).abs() < 1e-6)
            .min_by(|a, b| (a.y - py).abs().total_cmp(&(b.y - py).abs()))
            .map(|a| a.point_id)
    }
}

/// Pair every point with its anchor (points without one get `None`)
fn anchors_by_point<'a>(
    points: &'a [DataPoint],
    anchors: &'a [PointAnchor],
) -> impl Iterator<Item = Option<&'a PointAnchor>> + 'a {
    points
        .iter()
        .map(move |p| anchors.iter().find(|a| a.point_id == p.id))
}
