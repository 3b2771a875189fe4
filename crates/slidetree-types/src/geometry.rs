//! GeoJSON-style geometries used as object regions of interest.
//!
//! Only the validity rules needed to vet imported records are implemented.
//! [`Geometry::repaired`] fixes the cheap problems (unclosed rings, duplicate
//! or non-finite positions, degenerate rings) and leaves self-intersections
//! alone, so a repaired geometry may still be invalid.

use serde::{Deserialize, Serialize};

/// A 2-D position `[x, y]`.
pub type Position = [f64; 2];

/// A region of interest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// Why a geometry failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GeometryIssue {
    #[error("non-finite coordinate")]
    NonFinite,
    #[error("line string needs at least two distinct positions")]
    DegenerateLine,
    #[error("ring is not closed")]
    UnclosedRing,
    #[error("ring has fewer than four positions")]
    TooFewPositions,
    #[error("ring encloses no area")]
    ZeroArea,
    #[error("ring self-intersects")]
    SelfIntersection,
}

impl Geometry {
    /// Axis-aligned rectangle polygon.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::Polygon(vec![vec![
            [x, y],
            [x + width, y],
            [x + width, y + height],
            [x, y + height],
            [x, y],
        ]])
    }

    /// The GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::MultiPoint(_) => "MultiPoint",
            Self::LineString(_) => "LineString",
            Self::MultiLineString(_) => "MultiLineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Returns `true` if the geometry has no positions at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Point(_) => false,
            Self::MultiPoint(points) | Self::LineString(points) => points.is_empty(),
            Self::MultiLineString(lines) | Self::Polygon(lines) => lines.iter().all(Vec::is_empty),
            Self::MultiPolygon(polygons) => polygons.iter().flatten().all(Vec::is_empty),
        }
    }

    /// Returns `true` if [`validate`](Self::validate) finds no issue.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check the geometry and report the first issue found.
    ///
    /// Empty geometries are valid.
    pub fn validate(&self) -> Result<(), GeometryIssue> {
        match self {
            Self::Point(p) => check_finite(std::slice::from_ref(p)),
            Self::MultiPoint(points) => check_finite(points),
            Self::LineString(line) => check_line(line),
            Self::MultiLineString(lines) => lines.iter().try_for_each(|l| check_line(l)),
            Self::Polygon(rings) => rings.iter().try_for_each(|r| check_ring(r)),
            Self::MultiPolygon(polygons) => polygons
                .iter()
                .flatten()
                .try_for_each(|r| check_ring(r)),
        }
    }

    /// Run one repair pass and return the result.
    pub fn repaired(&self) -> Geometry {
        match self {
            Self::Point(p) => Self::Point(*p),
            Self::MultiPoint(points) => Self::MultiPoint(finite(points)),
            Self::LineString(line) => Self::LineString(dedup(&finite(line))),
            Self::MultiLineString(lines) => Self::MultiLineString(
                lines
                    .iter()
                    .map(|l| dedup(&finite(l)))
                    .filter(|l| l.len() >= 2)
                    .collect(),
            ),
            Self::Polygon(rings) => Self::Polygon(repair_polygon(rings).unwrap_or_default()),
            Self::MultiPolygon(polygons) => Self::MultiPolygon(
                polygons.iter().filter_map(|rings| repair_polygon(rings)).collect(),
            ),
        }
    }
}

fn check_finite(points: &[Position]) -> Result<(), GeometryIssue> {
    if points.iter().flatten().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(GeometryIssue::NonFinite)
    }
}

fn check_line(line: &[Position]) -> Result<(), GeometryIssue> {
    check_finite(line)?;
    if !line.is_empty() && dedup(line).len() < 2 {
        return Err(GeometryIssue::DegenerateLine);
    }
    Ok(())
}

fn check_ring(ring: &[Position]) -> Result<(), GeometryIssue> {
    if ring.is_empty() {
        return Ok(());
    }
    check_finite(ring)?;
    if ring.len() < 4 {
        return Err(GeometryIssue::TooFewPositions);
    }
    if ring.first() != ring.last() {
        return Err(GeometryIssue::UnclosedRing);
    }
    if signed_area(ring) == 0.0 {
        return Err(GeometryIssue::ZeroArea);
    }
    if self_intersects(ring) {
        return Err(GeometryIssue::SelfIntersection);
    }
    Ok(())
}

fn finite(points: &[Position]) -> Vec<Position> {
    points
        .iter()
        .copied()
        .filter(|p| p.iter().all(|c| c.is_finite()))
        .collect()
}

fn dedup(points: &[Position]) -> Vec<Position> {
    let mut out: Vec<Position> = Vec::with_capacity(points.len());
    for p in points {
        if out.last() != Some(p) {
            out.push(*p);
        }
    }
    out
}

/// Repair every ring; `None` when the exterior ring is beyond saving.
fn repair_polygon(rings: &[Vec<Position>]) -> Option<Vec<Vec<Position>>> {
    let mut repaired = rings.iter().map(|r| repair_ring(r));
    let exterior = repaired.next()??;
    let mut out = vec![exterior];
    out.extend(repaired.flatten());
    Some(out)
}

fn repair_ring(ring: &[Position]) -> Option<Vec<Position>> {
    let mut ring = dedup(&finite(ring));
    if ring.len() > 1 && ring.first() != ring.last() {
        ring.push(ring[0]);
    }
    if ring.len() < 4 || signed_area(&ring) == 0.0 {
        return None;
    }
    Some(ring)
}

fn signed_area(ring: &[Position]) -> f64 {
    ring.windows(2)
        .map(|w| w[0][0] * w[1][1] - w[1][0] * w[0][1])
        .sum::<f64>()
        / 2.0
}

fn self_intersects(ring: &[Position]) -> bool {
    let edges = ring.len() - 1;
    for i in 0..edges {
        for j in (i + 1)..edges {
            let adjacent = j == i + 1 || (i == 0 && j == edges - 1);
            let (a, b) = (ring[i], ring[i + 1]);
            let (c, d) = (ring[j], ring[j + 1]);
            if adjacent {
                // Adjacent edges share one endpoint; they may only overlap
                // if they fold back onto each other.
                let shared = if j == i + 1 { b } else { a };
                let (p, q) = if j == i + 1 { (a, d) } else { (b, c) };
                if orientation(p, shared, q) == 0.0 && folds_back(p, shared, q) {
                    return true;
                }
            } else if segments_intersect(a, b, c, d) {
                return true;
            }
        }
    }
    false
}

fn orientation(a: Position, b: Position, c: Position) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn folds_back(p: Position, shared: Position, q: Position) -> bool {
    let dot = (p[0] - shared[0]) * (q[0] - shared[0]) + (p[1] - shared[1]) * (q[1] - shared[1]);
    dot > 0.0
}

fn on_segment(a: Position, b: Position, p: Position) -> bool {
    p[0] >= a[0].min(b[0]) && p[0] <= a[0].max(b[0]) && p[1] >= a[1].min(b[1]) && p[1] <= a[1].max(b[1])
}

fn segments_intersect(a: Position, b: Position, c: Position, d: Position) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if o1 * o2 < 0.0 && o3 * o4 < 0.0 {
        return true;
    }
    (o1 == 0.0 && on_segment(a, b, c))
        || (o2 == 0.0 && on_segment(a, b, d))
        || (o3 == 0.0 && on_segment(c, d, a))
        || (o4 == 0.0 && on_segment(c, d, b))
}
