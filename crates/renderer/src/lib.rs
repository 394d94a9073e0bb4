//! Chart geometry for Chart Notes
//!
//! Maps a point sequence into pixel space ([`scale`]), lays out note callouts
//! that never clip the chart edges ([`annotation`]), assembles the full chart
//! ([`layout`]) and renders it to SVG ([`svg`]). Everything here is pure and
//! recomputed per viewport.

pub mod annotation;
pub mod curve;
pub mod layout;
pub mod scale;
pub mod svg;
pub mod ticks;

pub use annotation::{layout_annotation, AnnotationBox, PointerTriangle};
pub use curve::PathSegment;
pub use layout::{ChartLayout, LayoutOptions, PointAnchor};
pub use scale::{ChartScale, Margins, PlotArea, Viewport};
pub use svg::render_svg;
