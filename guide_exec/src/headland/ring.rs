//! Boundary rings

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use super::HeadlandError;
use crate::{geom, revision::next_revision};
use comms_if::files::BoundaryFile;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A closed ring of points, such as the outer boundary of a field.
///
/// The closing point is not repeated. Either winding is accepted and kept as given, consumers
/// take the interior side from the sign of the area. Rings are assumed not to intersect
/// themselves.
#[derive(Debug, Clone, Serialize)]
pub struct BoundaryRing {
    points_m: Vec<Vector2<f64>>,
    revision: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BoundaryRing {
    /// Create a new ring with a fresh revision.
    ///
    /// Repeated consecutive points and a repeated closing point are removed. Rings enclosing no
    /// area, such as collinear points, are rejected.
    pub fn new(points_m: Vec<Vector2<f64>>) -> Result<Self, HeadlandError> {
        Self::with_revision(points_m, next_revision())
    }

    pub(crate) fn with_revision(
        points_m: Vec<Vector2<f64>>,
        revision: u64,
    ) -> Result<Self, HeadlandError> {
        if points_m.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(HeadlandError::NonFinitePoint);
        }

        let points_m = geom::dedup_points(&points_m, geom::EPSILON, true);

        if points_m.len() < 3 {
            return Err(HeadlandError::TooFewRingPoints(points_m.len()));
        }

        if geom::signed_area(&points_m).abs() < geom::EPSILON {
            return Err(HeadlandError::ZeroArea);
        }

        Ok(Self { points_m, revision })
    }

    /// Load a ring from a boundary file.
    pub fn from_file(file: &BoundaryFile) -> Result<Self, HeadlandError> {
        Self::new(
            file.points
                .iter()
                .map(|p| Vector2::new(p[0], p[1]))
                .collect(),
        )
    }

    pub fn to_file(&self) -> BoundaryFile {
        BoundaryFile {
            points: self.points_m.iter().map(|p| [p.x, p.y]).collect(),
        }
    }

    pub fn points(&self) -> &[Vector2<f64>] {
        &self.points_m
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.points_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }

    /// Get the edge starting at the given vertex index, wrapping around the ring.
    pub fn edge(&self, index: usize) -> (Vector2<f64>, Vector2<f64>) {
        let n = self.points_m.len();
        (self.points_m[index % n], self.points_m[(index + 1) % n])
    }

    /// Iterate over all edges, including the closing one.
    pub fn edges(&self) -> impl Iterator<Item = (Vector2<f64>, Vector2<f64>)> + '_ {
        (0..self.points_m.len()).map(move |i| self.edge(i))
    }

    pub fn signed_area(&self) -> f64 {
        geom::signed_area(&self.points_m)
    }

    pub fn perimeter_m(&self) -> f64 {
        geom::polyline_length(&self.points_m, true)
    }

    pub fn contains(&self, point_m: &Vector2<f64>) -> bool {
        geom::point_in_polygon(point_m, &self.points_m)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::headland::JoinType;

    #[test]
    fn test_new_ring() {
        let ring = BoundaryRing::new(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 0.0),
        ])
        .unwrap();

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.edge(2), (Vector2::new(10.0, 10.0), Vector2::new(0.0, 0.0)));
        assert_eq!(ring.edges().count(), 3);
        assert!(ring.signed_area() > 0.0);

        let other = BoundaryRing::new(ring.points().to_vec()).unwrap();
        assert_ne!(other.revision(), ring.revision());
    }

    #[test]
    fn test_bad_rings() {
        assert_eq!(
            BoundaryRing::new(vec![Vector2::new(0.0, 0.0), Vector2::new(0.0, 0.0)]).unwrap_err(),
            HeadlandError::TooFewRingPoints(1)
        );
        assert_eq!(
            BoundaryRing::new(vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(std::f64::NAN, 0.0),
                Vector2::new(1.0, 1.0)
            ])
            .unwrap_err(),
            HeadlandError::NonFinitePoint
        );
        assert_eq!(
            BoundaryRing::new(vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(5.0, 5.0),
                Vector2::new(10.0, 10.0),
                Vector2::new(2.0, 2.0),
            ])
            .unwrap_err(),
            HeadlandError::ZeroArea
        );
    }

    #[test]
    fn test_either_winding() {
        let anticlockwise = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(100.0, 0.0),
            Vector2::new(100.0, 100.0),
            Vector2::new(0.0, 100.0),
        ];
        let mut clockwise = anticlockwise.clone();
        clockwise.reverse();

        let a = BoundaryRing::new(anticlockwise).unwrap();
        let c = BoundaryRing::new(clockwise).unwrap();

        assert!(a.signed_area() > 0.0);
        assert!(c.signed_area() < 0.0);

        for ring in [a, c].iter() {
            assert!(ring.contains(&Vector2::new(50.0, 50.0)));
            assert!(!ring.contains(&Vector2::new(150.0, 50.0)));

            let line = crate::headland::build_headland(ring, 10.0, JoinType::Miter).unwrap();
            assert!((line.length_m() - 320.0).abs() < 1e-6);
            assert!(line
                .points()
                .iter()
                .all(|p| ring.contains(&p.position_m)));
        }
    }
}
