//! SVG rendering of a computed chart layout

use chartnotes_shared::{ChartSettings, DataPoint};

use crate::annotation::AnnotationBox;
use crate::curve::to_svg_path;
use crate::layout::ChartLayout;
use crate::ticks::format_tick;

const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";
const DOT_RADIUS: f64 = 6.0;
const TITLE_BAND: f64 = 36.0;

/// Render the chart as a standalone SVG document.
///
/// `points` must be the sequence the layout was computed from.
pub fn render_svg(layout: &ChartLayout, points: &[DataPoint], settings: &ChartSettings) -> String {
    let palette = settings.theme.palette();
    let area = layout.plot_area();
    let width = layout.viewport.width;
    let chart_height = layout.viewport.height;
    let title_offset = if settings.title.is_empty() { 0.0 } else { TITLE_BAND };
    let height = chart_height + title_offset;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" font-family=\"{FONT_FAMILY}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        palette.background
    ));
    if !settings.title.is_empty() {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"24\" text-anchor=\"middle\" font-size=\"20\" font-weight=\"600\" fill=\"{}\">{}</text>",
            width / 2.0,
            palette.title,
            escape_xml(&settings.title)
        ));
    }
    svg.push_str(&format!("<g transform=\"translate(0 {title_offset})\">"));

    if settings.show_grid {
        svg.push_str(&format!(
            "<g stroke=\"{}\" stroke-dasharray=\"3 3\">",
            palette.grid
        ));
        for (_, y) in &layout.y_ticks {
            svg.push_str(&format!(
                "<line x1=\"{:.2}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{y:.2}\"/>",
                area.left, area.right
            ));
        }
        for band in 0..layout.scale.labels().len() {
            let x = layout.scale.band_center(band);
            svg.push_str(&format!(
                "<line x1=\"{x:.2}\" y1=\"{:.2}\" x2=\"{x:.2}\" y2=\"{:.2}\"/>",
                area.top, area.bottom
            ));
        }
        svg.push_str("</g>");
    }

    // Axes
    svg.push_str(&format!(
        "<path d=\"M {:.2} {:.2} L {:.2} {:.2} L {:.2} {:.2}\" fill=\"none\" stroke=\"{}\"/>",
        area.left, area.top, area.left, area.bottom, area.right, area.bottom, palette.grid
    ));
    for (value, y) in &layout.y_ticks {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"12\" fill=\"{}\">{}</text>",
            area.left - 8.0,
            y + 4.0,
            palette.axis_text,
            format_tick(*value)
        ));
    }
    for (band, label) in layout.scale.labels().iter().enumerate() {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"12\" fill=\"{}\">{}</text>",
            layout.scale.band_center(band),
            area.bottom + 18.0,
            palette.axis_text,
            escape_xml(label)
        ));
    }
    if !settings.x_axis_title.is_empty() {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"13\" fill=\"{}\">{}</text>",
            (area.left + area.right) / 2.0,
            chart_height - 12.0,
            palette.axis_text,
            escape_xml(&settings.x_axis_title)
        ));
    }
    if !settings.y_axis_title.is_empty() {
        let cy = (area.top + area.bottom) / 2.0;
        svg.push_str(&format!(
            "<text x=\"20\" y=\"{cy:.2}\" transform=\"rotate(-90 20 {cy:.2})\" text-anchor=\"middle\" font-size=\"13\" fill=\"{}\">{}</text>",
            palette.axis_text,
            escape_xml(&settings.y_axis_title)
        ));
    }

    // Series
    svg.push_str(&format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>",
        to_svg_path(&layout.path),
        escape_xml(&settings.line_color)
    ));
    for anchor in &layout.anchors {
        let tooltip = points
            .iter()
            .find(|p| p.id == anchor.point_id)
            .map(tooltip_text)
            .unwrap_or_default();
        svg.push_str(&format!(
            "<circle data-point-id=\"{}\" cx=\"{:.2}\" cy=\"{:.2}\" r=\"{DOT_RADIUS}\" fill=\"{}\"><title>{}</title></circle>",
            anchor.point_id,
            anchor.x,
            anchor.y,
            escape_xml(&settings.dot_color),
            escape_xml(&tooltip)
        ));
    }

    for annotation in &layout.annotations {
        svg.push_str(&bubble_svg(annotation, &settings.bubble_color));
    }

    svg.push_str("</g></svg>");
    svg
}

fn bubble_svg(b: &AnnotationBox, color: &str) -> String {
    let pointer = b.pointer();
    let color = escape_xml(color);
    format!(
        "<g class=\"note-bubble\" data-point-id=\"{}\"><title>{}</title>\
<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{color}\"/>\
<polygon points=\"{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}\" fill=\"{color}\"/>\
<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" fill=\"white\" font-size=\"11\" font-weight=\"500\">{}</text></g>",
        b.point_id,
        escape_xml(&b.full_text),
        b.box_x,
        b.box_y,
        b.width,
        b.height,
        pointer.base_left.0,
        pointer.base_left.1,
        pointer.base_right.0,
        pointer.base_right.1,
        pointer.tip.0,
        pointer.tip.1,
        b.center_x(),
        b.box_y + b.height / 2.0 + 4.0,
        escape_xml(&b.display_text)
    )
}

/// Hover text: label, value and the full note
pub fn tooltip_text(point: &DataPoint) -> String {
    match &point.note {
        Some(note) if !note.is_empty() => {
            format!("{}\nValue: {}\nNote: {}", point.month, point.value, note)
        }
        _ => format!("{}\nValue: {}", point.month, point.value),
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
