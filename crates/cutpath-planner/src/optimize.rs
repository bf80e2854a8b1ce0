//! Path optimization: reorder, orient and merge polylines to cut travel.
//!
//! Uses a greedy nearest-neighbor heuristic over polyline *entry points*.
//! An open polyline can be entered at either end (and is reversed when
//! entered at its last point). A closed polyline can be entered at any of
//! its vertices and is re-rooted to start and finish there.
//!
//! Entry points live in an R\*-tree keyed by coordinate so each step is a
//! nearest-neighbor query rather than a scan. Polylines stay in the input
//! slice and are referred to by index until they are emitted.
//!
//! When a polyline starts exactly where the previous output path ended,
//! the two are merged into a single path, saving a tool lift.

use std::collections::HashMap;

use rstar::primitives::GeomWithData;
use rstar::{PointDistance, RTree};
use tracing::debug;

use crate::types::{PlanError, Point, Polyline};

/// Exact coordinate key. `-0.0` and `0.0` share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PointKey(u64, u64);

impl PointKey {
    fn new(p: Point) -> Self {
        // Adding 0.0 folds -0.0 into 0.0 and leaves everything else alone.
        Self((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
    }
}

/// R-tree entry: an entry point tagged with its insertion sequence number.
type IndexedEntry = GeomWithData<[f64; 2], u64>;

/// Polylines that may be entered at one coordinate.
#[derive(Debug)]
struct Bucket {
    point: Point,
    seq: u64,
    lines: Vec<usize>,
}

impl Bucket {
    fn entry(&self) -> IndexedEntry {
        GeomWithData::new([self.point.x, self.point.y], self.seq)
    }
}

/// Multi-map from entry coordinate to polyline indices, with spatial lookup.
#[derive(Debug, Default)]
struct EntryPoints {
    buckets: HashMap<PointKey, Bucket>,
    tree: RTree<IndexedEntry>,
    next_seq: u64,
}

impl EntryPoints {
    fn insert(&mut self, point: Point, line: usize) {
        let key = PointKey::new(point);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.lines.push(line);
            return;
        }
        let bucket = Bucket {
            point,
            seq: self.next_seq,
            lines: vec![line],
        };
        self.next_seq += 1;
        self.tree.insert(bucket.entry());
        self.buckets.insert(key, bucket);
    }

    /// Remove one occurrence of `line` at `point`, dropping the bucket
    /// once it is empty.
    fn remove(&mut self, point: Point, line: usize) {
        let key = PointKey::new(point);
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return;
        };
        if let Some(pos) = bucket.lines.iter().position(|&l| l == line) {
            bucket.lines.remove(pos);
        }
        if bucket.lines.is_empty()
            && let Some(bucket) = self.buckets.remove(&key)
        {
            self.tree.remove(&bucket.entry());
        }
    }

    /// The entry point nearest `from`, earliest inserted among equals,
    /// with the first polyline listed there.
    fn nearest(&self, from: Point) -> Option<(Point, usize)> {
        let query = [from.x, from.y];
        let mut candidates = self.tree.nearest_neighbor_iter(&query);
        let first = candidates.next()?;
        let best_distance = first.distance_2(&query);
        let best = candidates
            .take_while(|entry| entry.distance_2(&query) <= best_distance)
            .fold(first, |best, entry| {
                if entry.data < best.data { entry } else { best }
            });

        let [x, y] = *best.geom();
        let point = Point::new(x, y);
        let line = self
            .buckets
            .get(&PointKey::new(point))
            .and_then(|bucket| bucket.lines.first().copied())?;
        Some((point, line))
    }
}

/// Rotate a closed ring so it starts and ends at `entry`.
fn reroot(points: &[Point], entry: Point) -> Vec<Point> {
    let n = points.len();
    let start = points.iter().position(|&p| p == entry).unwrap_or(0);
    let mut out = Vec::with_capacity(n);
    out.extend_from_slice(&points[start..n - 1]);
    out.extend_from_slice(&points[..=start]);
    out
}

/// Reorder, orient and merge polylines to reduce tool travel.
///
/// Starting at `start`, repeatedly moves to the nearest remaining entry
/// point and emits the polyline available there. Every input polyline is
/// emitted exactly once, possibly reversed (open) or re-rooted (closed).
/// The result is deterministic for a given input and start.
///
/// # Errors
///
/// Returns [`PlanError::EmptyPolyline`] if any polyline has no points,
/// [`PlanError::NonFiniteCoordinate`] if one has a NaN or infinite
/// coordinate, or [`PlanError::InvalidConfig`] if `start` is not finite.
///
/// # Examples
///
/// ```
/// use cutpath_planner::optimize::optimize_path_order;
/// use cutpath_planner::{Point, Polyline};
///
/// let far = Polyline::new(vec![Point::new(2.0, 0.0), Point::new(3.0, 0.0)]);
/// let near = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
/// let ordered = optimize_path_order(&[far.clone(), near.clone()], Point::ORIGIN).unwrap();
/// assert_eq!(ordered, vec![near, far]);
/// ```
pub fn optimize_path_order(
    polylines: &[Polyline],
    start: Point,
) -> Result<Vec<Polyline>, PlanError> {
    if !start.is_finite() {
        return Err(PlanError::InvalidConfig(
            "start position must have finite coordinates".to_string(),
        ));
    }
    let mut entries = EntryPoints::default();
    for (index, polyline) in polylines.iter().enumerate() {
        let (Some(&first), Some(&last)) = (polyline.first(), polyline.last()) else {
            return Err(PlanError::EmptyPolyline { index });
        };
        if !polyline.points().iter().all(|p| p.is_finite()) {
            return Err(PlanError::NonFiniteCoordinate { index });
        }
        if polyline.is_closed() {
            for &p in polyline.points() {
                entries.insert(p, index);
            }
        } else {
            entries.insert(first, index);
            entries.insert(last, index);
        }
    }

    let mut out: Vec<Vec<Point>> = Vec::new();
    let mut current = start;
    let mut merged = 0_usize;
    while let Some((entry, index)) = entries.nearest(current) {
        let polyline = &polylines[index];
        let points = if polyline.is_closed() {
            for &p in polyline.points() {
                entries.remove(p, index);
            }
            reroot(polyline.points(), entry)
        } else {
            let points = if polyline.first() == Some(&entry) {
                polyline.points().to_vec()
            } else {
                polyline.reversed().into_points()
            };
            if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
                entries.remove(first, index);
                entries.remove(last, index);
            }
            points
        };

        if let Some(&last) = points.last() {
            current = last;
        }
        match out.last_mut() {
            Some(path) if path.last() == Some(&entry) => {
                path.extend_from_slice(&points[1..]);
                merged += 1;
            }
            _ => out.push(points),
        }
    }

    debug!(
        input = polylines.len(),
        output = out.len(),
        merged,
        "optimized path order"
    );
    Ok(out.into_iter().map(Polyline::new).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pl(coords: &[(f64, f64)]) -> Polyline {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn optimize(lines: &[&[(f64, f64)]]) -> Vec<Polyline> {
        let polylines: Vec<Polyline> = lines.iter().map(|l| pl(l)).collect();
        optimize_path_order(&polylines, Point::ORIGIN).unwrap()
    }

    #[test]
    fn no_lines() {
        assert!(optimize(&[]).is_empty());
    }

    #[test]
    fn single_point() {
        assert_eq!(optimize(&[&[(0.0, 0.0)]]), vec![pl(&[(0.0, 0.0)])]);
    }

    #[test]
    fn already_in_order() {
        assert_eq!(
            optimize(&[&[(0.0, 0.0), (1.0, 0.0)], &[(2.0, 0.0), (3.0, 0.0)]]),
            vec![pl(&[(0.0, 0.0), (1.0, 0.0)]), pl(&[(2.0, 0.0), (3.0, 0.0)])]
        );
    }

    #[test]
    fn wrong_order() {
        assert_eq!(
            optimize(&[&[(2.0, 0.0), (3.0, 0.0)], &[(0.0, 0.0), (1.0, 0.0)]]),
            vec![pl(&[(0.0, 0.0), (1.0, 0.0)]), pl(&[(2.0, 0.0), (3.0, 0.0)])]
        );
    }

    #[test]
    fn given_backwards() {
        assert_eq!(
            optimize(&[&[(3.0, 0.0), (2.0, 0.0)], &[(1.0, 0.0), (0.0, 0.0)]]),
            vec![pl(&[(0.0, 0.0), (1.0, 0.0)]), pl(&[(2.0, 0.0), (3.0, 0.0)])]
        );
    }

    #[test]
    fn touching_lines_merge() {
        assert_eq!(
            optimize(&[&[(0.0, 0.0), (1.0, 0.0)], &[(1.0, 0.0), (2.0, 0.0)]]),
            vec![pl(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])]
        );
    }

    #[test]
    fn closed_path_unchanged() {
        assert_eq!(
            optimize(&[&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]]),
            vec![pl(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)])]
        );
    }

    #[test]
    fn joins_closed_path_at_nearest_vertex() {
        assert_eq!(
            optimize(&[
                &[(0.0, 0.0), (1.0, 1.0)],
                &[(1.0, 0.0), (1.0, 1.0), (2.0, 0.0), (1.0, 0.0)],
            ]),
            vec![pl(&[
                (0.0, 0.0),
                (1.0, 1.0),
                (2.0, 0.0),
                (1.0, 0.0),
                (1.0, 1.0)
            ])]
        );
    }

    #[test]
    fn respects_start_position() {
        let a = pl(&[(0.0, 0.0), (1.0, 0.0)]);
        let b = pl(&[(10.0, 0.0), (11.0, 0.0)]);
        let out = optimize_path_order(&[a, b], Point::new(12.0, 0.0)).unwrap();
        assert_eq!(
            out,
            vec![pl(&[(11.0, 0.0), (10.0, 0.0)]), pl(&[(1.0, 0.0), (0.0, 0.0)])]
        );
    }

    #[test]
    fn equal_distance_prefers_first_inserted() {
        let left = pl(&[(-1.0, 0.0), (-2.0, 0.0)]);
        let right = pl(&[(1.0, 0.0), (2.0, 0.0)]);
        let out = optimize_path_order(&[right.clone(), left.clone()], Point::ORIGIN).unwrap();
        assert_eq!(out[0], right);
        let out = optimize_path_order(&[left.clone(), right], Point::ORIGIN).unwrap();
        assert_eq!(out[0], left);
    }

    #[test]
    fn shared_endpoint_picks_first_listed_line() {
        let a = pl(&[(0.0, 0.0), (0.0, 5.0)]);
        let b = pl(&[(0.0, 0.0), (5.0, 0.0)]);
        let out = optimize_path_order(&[a.clone(), b.clone()], Point::ORIGIN).unwrap();
        // `a` first, then back to the origin for `b`.
        assert_eq!(out, vec![a, b]);
    }

    #[test]
    fn negative_zero_matches_zero() {
        let a = pl(&[(5.0, 0.0), (-0.0, 0.0)]);
        let b = pl(&[(0.0, 0.0), (0.0, 3.0)]);
        let out = optimize_path_order(&[a, b], Point::new(5.0, 0.0)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 3);
    }

    #[test]
    fn square_entered_at_corner_nearest_start() {
        let square = pl(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
        ]);
        let out = optimize_path_order(&[square], Point::new(11.0, 11.0)).unwrap();
        assert_eq!(
            out,
            vec![pl(&[
                (10.0, 10.0),
                (0.0, 10.0),
                (0.0, 0.0),
                (10.0, 0.0),
                (10.0, 10.0)
            ])]
        );
    }

    #[test]
    fn every_line_emitted_once() {
        let lines: Vec<Polyline> = (0..20)
            .map(|i| {
                let x = f64::from((i * 7) % 20);
                pl(&[(x, 0.0), (x, 1.0)])
            })
            .collect();
        let out = optimize_path_order(&lines, Point::ORIGIN).unwrap();
        let total: usize = out.iter().map(Polyline::len).sum();
        assert_eq!(total, 40);
    }

    #[test]
    fn deterministic() {
        let lines = vec![
            pl(&[(3.0, 3.0), (4.0, 4.0)]),
            pl(&[(1.0, 1.0), (2.0, 0.0), (1.0, 1.0)]),
            pl(&[(4.0, 4.0), (9.0, 0.0)]),
            pl(&[(0.5, 0.5), (0.5, 7.0)]),
        ];
        let a = optimize_path_order(&lines, Point::ORIGIN).unwrap();
        let b = optimize_path_order(&lines, Point::ORIGIN).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_polyline_is_an_error() {
        let lines = vec![pl(&[(0.0, 0.0), (1.0, 0.0)]), Polyline::new(vec![])];
        assert_eq!(
            optimize_path_order(&lines, Point::ORIGIN),
            Err(PlanError::EmptyPolyline { index: 1 })
        );
    }

    #[test]
    fn non_finite_coordinates_are_an_error() {
        let lines = vec![
            pl(&[(5.0, 0.0), (6.0, 0.0)]),
            pl(&[(f64::NAN, 0.0), (1.0, 0.0)]),
            pl(&[(2.0, 0.0), (3.0, 0.0)]),
        ];
        assert_eq!(
            optimize_path_order(&lines, Point::ORIGIN),
            Err(PlanError::NonFiniteCoordinate { index: 1 })
        );

        let ring = pl(&[(0.0, 0.0), (f64::INFINITY, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert_eq!(
            optimize_path_order(&[ring], Point::ORIGIN),
            Err(PlanError::NonFiniteCoordinate { index: 0 })
        );
    }

    #[test]
    fn non_finite_start_is_an_error() {
        let lines = [pl(&[(0.0, 0.0), (1.0, 0.0)])];
        assert!(matches!(
            optimize_path_order(&lines, Point::new(f64::NAN, 0.0)),
            Err(PlanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn reroot_rotates_ring() {
        let ring = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        assert_eq!(
            reroot(&ring, Point::new(1.0, 1.0)),
            vec![
                Point::new(1.0, 1.0),
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
            ]
        );
    }
}
