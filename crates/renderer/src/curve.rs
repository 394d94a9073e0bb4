//! Line path construction for the series (straight or monotone curve)

use chartnotes_shared::LineStyle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CubicTo {
        c1: (f64, f64),
        c2: (f64, f64),
        to: (f64, f64),
    },
}

/// Build the path through `points` in series order
pub fn line_path(points: &[(f64, f64)], style: LineStyle) -> Vec<PathSegment> {
    match style {
        LineStyle::Straight => straight_path(points),
        LineStyle::Curved => monotone_path(points),
    }
}

fn straight_path(points: &[(f64, f64)]) -> Vec<PathSegment> {
    points
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            if i == 0 {
                PathSegment::MoveTo(x, y)
            } else {
                PathSegment::LineTo(x, y)
            }
        })
        .collect()
}

/// Monotone cubic interpolation in x (Steffen's method): the curve never
/// overshoots between two neighbouring values.
fn monotone_path(points: &[(f64, f64)]) -> Vec<PathSegment> {
    if points.len() < 3 {
        return straight_path(points);
    }

    let n = points.len();
    let mut tangents = vec![0.0; n];
    for i in 1..n - 1 {
        tangents[i] = interior_tangent(points[i - 1], points[i], points[i + 1]);
    }
    tangents[0] = end_tangent(points[0], points[1], tangents[1]);
    tangents[n - 1] = end_tangent(points[n - 2], points[n - 1], tangents[n - 2]);

    let mut path = Vec::with_capacity(n);
    path.push(PathSegment::MoveTo(points[0].0, points[0].1));
    for i in 0..n - 1 {
        let (x0, y0) = points[i];
        let (x1, y1) = points[i + 1];
        let dx = (x1 - x0) / 3.0;
        path.push(PathSegment::CubicTo {
            c1: (x0 + dx, y0 + dx * tangents[i]),
            c2: (x1 - dx, y1 - dx * tangents[i + 1]),
            to: (x1, y1),
        });
    }
    path
}

fn interior_tangent(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let h0 = p1.0 - p0.0;
    let h1 = p2.0 - p1.0;
    let s0 = (p1.1 - p0.1) / h0;
    let s1 = (p2.1 - p1.1) / h1;
    let p = (s0 * h1 + s1 * h0) / (h0 + h1);
    let t = (sign(s0) + sign(s1)) * s0.abs().min(s1.abs()).min(0.5 * p.abs());
    finite_or_zero(t)
}

fn end_tangent(p0: (f64, f64), p1: (f64, f64), neighbour: f64) -> f64 {
    let h = p1.0 - p0.0;
    if h == 0.0 {
        return neighbour;
    }
    finite_or_zero((3.0 * (p1.1 - p0.1) / h - neighbour) / 2.0)
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// SVG path data (`d` attribute)
pub fn to_svg_path(path: &[PathSegment]) -> String {
    let mut d = String::new();
    for segment in path {
        if !d.is_empty() {
            d.push(' ');
        }
        match segment {
            PathSegment::MoveTo(x, y) => d.push_str(&format!("M {x:.2} {y:.2}")),
            PathSegment::LineTo(x, y) => d.push_str(&format!("L {x:.2} {y:.2}")),
            PathSegment::CubicTo { c1, c2, to } => d.push_str(&format!(
                "C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                c1.0, c1.1, c2.0, c2.1, to.0, to.1
            )),
        }
    }
    d
}
