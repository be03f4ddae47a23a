use std::f64::consts::PI;

use image::GrayImage;
use imageproc::{
    contours::{find_contours, BorderType, Contour},
    geometry::{arc_length, convex_hull},
    point::Point,
};

const EPS: f64 = 1e-7;

/// A circle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

impl Circle {
    fn contains(&self, p: (f64, f64)) -> bool {
        (p.0 - self.cx).hypot(p.1 - self.cy) <= self.radius + EPS
    }

    fn from_two(a: (f64, f64), b: (f64, f64)) -> Circle {
        Circle {
            cx: (a.0 + b.0) / 2.0,
            cy: (a.1 + b.1) / 2.0,
            radius: (a.0 - b.0).hypot(a.1 - b.1) / 2.0,
        }
    }

    fn from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Circle {
        let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
        if d.abs() < EPS {
            // Collinear: the widest pair spans the others
            let (ab, ac, bc) = (
                Circle::from_two(a, b),
                Circle::from_two(a, c),
                Circle::from_two(b, c),
            );
            return [ac, bc]
                .into_iter()
                .fold(ab, |best, c| if c.radius > best.radius { c } else { best });
        }
        let a2 = a.0 * a.0 + a.1 * a.1;
        let b2 = b.0 * b.0 + b.1 * b.1;
        let c2 = c.0 * c.0 + c.1 * c.1;
        let cx = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
        let cy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
        Circle {
            cx,
            cy,
            radius: (a.0 - cx).hypot(a.1 - cy),
        }
    }
}

/// Shape measurements of one connected region of a mask.
#[derive(Clone, Debug)]
pub struct Blob {
    /// Polygon area enclosed by the border, in px²
    pub area: f64,
    /// Closed border length, in px
    pub perimeter: f64,
    /// `4π·area/perimeter²`, 0 for a degenerate border
    pub circularity: f64,
    /// Smallest circle containing the whole border
    pub circle: Circle,
}

impl Blob {
    fn from_contour(contour: &Contour<i32>) -> Blob {
        let area = polygon_area(&contour.points);
        let perimeter = arc_length(&contour.points, true);
        let circularity = if perimeter > 0.0 {
            4.0 * PI * area / (perimeter * perimeter)
        } else {
            0.0
        };
        Blob {
            area,
            perimeter,
            circularity,
            circle: enclosing_circle(&contour.points),
        }
    }

    pub fn translate(mut self, dx: f64, dy: f64) -> Blob {
        self.circle.cx += dx;
        self.circle.cy += dy;
        self
    }
}

/// Measure every outermost region of `mask`, largest area first.
///
/// Regions nested inside a hole of another region are skipped.
pub fn external_blobs(mask: &GrayImage) -> Vec<Blob> {
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }
    let mut blobs: Vec<Blob> = find_contours::<i32>(mask)
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(Blob::from_contour)
        .collect();
    blobs.sort_by(|a, b| b.area.total_cmp(&a.area));
    blobs
}

/// Smallest circle enclosing all `points`.
///
/// Runs the incremental Welzl construction on the convex hull, which is small for
/// blob-shaped contours. An empty slice gives a zero circle at the origin.
pub fn enclosing_circle(points: &[Point<i32>]) -> Circle {
    let hull = if points.len() < 3 {
        points.to_vec()
    } else {
        convex_hull(points)
    };
    let hull: Vec<(f64, f64)> = hull.iter().map(|p| (p.x as f64, p.y as f64)).collect();

    let Some(&first) = hull.first() else {
        return Circle {
            cx: 0.0,
            cy: 0.0,
            radius: 0.0,
        };
    };

    let mut circle = Circle {
        cx: first.0,
        cy: first.1,
        radius: 0.0,
    };
    for i in 1..hull.len() {
        if circle.contains(hull[i]) {
            continue;
        }
        circle = Circle {
            cx: hull[i].0,
            cy: hull[i].1,
            radius: 0.0,
        };
        for j in 0..i {
            if circle.contains(hull[j]) {
                continue;
            }
            circle = Circle::from_two(hull[i], hull[j]);
            for k in 0..j {
                if !circle.contains(hull[k]) {
                    circle = Circle::from_three(hull[i], hull[j], hull[k]);
                }
            }
        }
    }
    circle
}

fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}
