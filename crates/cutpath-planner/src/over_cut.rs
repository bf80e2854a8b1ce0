//! Over-cutting closed paths.
//!
//! A blade lowered and raised at the same spot often leaves a nick of
//! uncut material where a closed outline starts and ends. Retracing the
//! start of the outline for a short distance closes the gap.

use crate::types::{Point, Polyline};

/// The first `distance` (mm) of a line.
///
/// Returns the vertices up to `distance` along the line plus the exact
/// interpolated point at `distance`. If the line is shorter than
/// `distance` the whole line is returned. A non-positive distance yields
/// no points.
///
/// # Examples
///
/// ```
/// use cutpath_planner::Point;
/// use cutpath_planner::over_cut::first_part_of_line;
///
/// let line = [Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(4.0, 4.0)];
/// assert_eq!(
///     first_part_of_line(&line, 5.0),
///     vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(4.0, 1.0)],
/// );
/// ```
#[must_use]
pub fn first_part_of_line(points: &[Point], distance: f64) -> Vec<Point> {
    if distance <= 0.0 {
        return Vec::new();
    }

    let mut remaining = distance;
    let mut out = Vec::new();
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        out.push(a);
        let length = a.distance(b);
        if length < remaining {
            remaining -= length;
        } else {
            let t = remaining / length;
            out.push(Point::new(
                (b.x - a.x).mul_add(t, a.x),
                (b.y - a.y).mul_add(t, a.y),
            ));
            return out;
        }
    }
    // Shorter than `distance`: stop at the end rather than go round again.
    out.extend(points.last());
    out
}

/// Extend every closed polyline by retracing its first `distance` mm.
///
/// Open polylines are returned unchanged. A non-positive distance leaves
/// every polyline unchanged.
#[must_use = "returns the over-cut polylines"]
pub fn over_cut(polylines: &[Polyline], distance: f64) -> Vec<Polyline> {
    polylines
        .iter()
        .map(|polyline| {
            if !polyline.is_closed() {
                return polyline.clone();
            }
            let prefix = first_part_of_line(polyline.points(), distance);
            polyline
                .points()
                .iter()
                .chain(prefix.iter().skip(1))
                .copied()
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn rectangle() -> Vec<Point> {
        pts(&[
            (10.0, 100.0),
            (12.0, 100.0),
            (12.0, 103.0),
            (10.0, 103.0),
            (10.0, 100.0),
        ])
    }

    #[test]
    fn first_part_of_empty_line() {
        assert!(first_part_of_line(&[], 0.0).is_empty());
        assert!(first_part_of_line(&[], 1.0).is_empty());
    }

    #[test]
    fn zero_distance_is_empty() {
        assert!(first_part_of_line(&pts(&[(0.0, 0.0)]), 0.0).is_empty());
        assert!(first_part_of_line(&pts(&[(0.0, 0.0), (1.0, 2.0), (3.0, 4.0)]), 0.0).is_empty());
    }

    #[test]
    fn single_point_line() {
        assert_eq!(
            first_part_of_line(&pts(&[(1.0, 1.0)]), 3.0),
            pts(&[(1.0, 1.0)])
        );
    }

    #[test]
    fn exactly_on_vertex() {
        let line = rectangle();
        assert_eq!(first_part_of_line(&line, 2.0), line[..2]);
        assert_eq!(first_part_of_line(&line, 5.0), line[..3]);
        assert_eq!(first_part_of_line(&line, 7.0), line[..4]);
        assert_eq!(first_part_of_line(&line, 10.0), line[..5]);
    }

    #[test]
    fn beyond_ends_of_line() {
        let line = rectangle();
        assert!(first_part_of_line(&line, -1.0).is_empty());
        assert_eq!(first_part_of_line(&line, 100.0), line);
    }

    #[test]
    fn midpoint_in_segment() {
        let line = rectangle();
        assert_eq!(
            first_part_of_line(&line, 0.5),
            pts(&[(10.0, 100.0), (10.5, 100.0)])
        );
        assert_eq!(
            first_part_of_line(&line, 2.5),
            pts(&[(10.0, 100.0), (12.0, 100.0), (12.0, 100.5)])
        );
    }

    #[test]
    fn zero_length_segments_are_skipped() {
        let line = pts(&[(0.0, 0.0), (0.0, 0.0), (2.0, 0.0)]);
        assert_eq!(
            first_part_of_line(&line, 1.0),
            pts(&[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0)])
        );
    }

    #[test]
    fn over_cut_empty() {
        assert!(over_cut(&[], 0.0).is_empty());
        assert!(over_cut(&[], 1.0).is_empty());
    }

    #[test]
    fn open_lines_unchanged() {
        let open = vec![Polyline::new(pts(&[(100.0, 200.0), (300.0, 400.0)]))];
        assert_eq!(over_cut(&open, 1.0), open);
    }

    #[test]
    fn closed_lines_extended() {
        let closed = vec![Polyline::new(rectangle())];
        assert_eq!(
            over_cut(&closed, 1.5),
            vec![Polyline::new(pts(&[
                (10.0, 100.0),
                (12.0, 100.0),
                (12.0, 103.0),
                (10.0, 103.0),
                (10.0, 100.0),
                (11.5, 100.0),
            ]))]
        );
    }

    #[test]
    fn zero_distance_is_identity() {
        let lines = vec![
            Polyline::new(rectangle()),
            Polyline::new(pts(&[(0.0, 0.0), (5.0, 5.0)])),
        ];
        assert_eq!(over_cut(&lines, 0.0), lines);
        assert_eq!(over_cut(&over_cut(&lines, 0.0), 1.5), over_cut(&lines, 1.5));
    }

    #[test]
    fn over_cut_longer_than_perimeter_stops_at_start() {
        let closed = vec![Polyline::new(rectangle())];
        let out = over_cut(&closed, 50.0);
        let mut expected = rectangle();
        expected.extend_from_slice(&rectangle()[1..]);
        assert_eq!(out, vec![Polyline::new(expected)]);
    }
}
