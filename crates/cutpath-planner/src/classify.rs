//! Registration mark component classification.
//!
//! A registration mark is drawn as three separately stroked shapes: a
//! closed square box at the top-left, an L-shaped bracket at the
//! bottom-left and a mirrored bracket at the top-right. [`classify`]
//! decides which of these (if any) a single polyline could be.
//!
//! Only polylines described with the minimum number of points are
//! considered: 3 for a bracket, 5 (closed) for a box. Every segment must
//! be exactly horizontal or exactly vertical, orientations must
//! alternate, and all segments must share one length (within
//! [`RELATIVE_TOLERANCE`]).
//!
//! Reported coordinates are the *outer* corner of the stroked shape, so
//! they are offset by half the stroke thickness.

use tracing::trace;

use crate::types::{Point, Rgba};

/// Relative tolerance for fiducial measurements.
///
/// Marks pass through document transforms and may carry rounding error,
/// so derived lengths and coordinates are compared relative to their
/// magnitude. Orientation and closure checks remain exact.
pub const RELATIVE_TOLERANCE: f64 = 1e-6;

/// `a` and `b` are equal within [`RELATIVE_TOLERANCE`].
#[must_use]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= RELATIVE_TOLERANCE * a.abs().max(b.abs())
}

/// `a` is less than, or approximately equal to, `b`.
#[must_use]
pub fn approx_le(a: f64, b: f64) -> bool {
    a <= b || approx_eq(a, b)
}

/// A registration mark's top-left filled box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegmarkBox {
    /// X coordinate of the top-left corner (outside the stroke).
    pub x: f64,
    /// Y coordinate of the top-left corner (outside the stroke).
    pub y: f64,
    /// Width and height of the box, including stroke.
    pub size: f64,
    /// Stroke thickness of the box outline.
    pub thickness: f64,
}

/// A registration mark's bottom-left or top-right bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegmarkBracket {
    /// X coordinate of the bracket's outer corner.
    pub x: f64,
    /// Y coordinate of the bracket's outer corner.
    pub y: f64,
    /// Length of each arm.
    pub length: f64,
    /// Stroke thickness.
    pub thickness: f64,
}

/// What part of a registration mark a polyline could be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegmarkComponent {
    /// The closed top-left box.
    Box(RegmarkBox),
    /// An `L` bracket with its corner at the bottom-left.
    BottomLeftBracket(RegmarkBracket),
    /// A `7` bracket with its corner at the top-right.
    TopRightBracket(RegmarkBracket),
    /// Not part of a registration mark.
    None,
}

/// Orientation summary of a polyline whose segments passed the
/// axis-aligned, alternating, equal-length checks.
struct SegmentWalk {
    /// Orientation of the final segment.
    last_is_horizontal: bool,
    /// Length shared by every segment.
    length: f64,
    /// Per segment: `true` if the coordinate increases along it.
    polarities: Vec<bool>,
}

/// Classify a stroked polyline as a registration mark component.
///
/// Never fails: anything that is not an exact box or bracket drawn in
/// opaque black with a non-zero stroke is [`RegmarkComponent::None`].
///
/// # Examples
///
/// ```
/// use cutpath_planner::classify::{RegmarkBracket, RegmarkComponent, classify};
/// use cutpath_planner::{Point, Rgba};
///
/// let bracket = [
///     Point::new(21.0, 50.0),
///     Point::new(21.0, 70.0),
///     Point::new(41.0, 70.0),
/// ];
/// assert_eq!(
///     classify(Some(Rgba::BLACK), Some(2.0), &bracket),
///     RegmarkComponent::BottomLeftBracket(RegmarkBracket {
///         x: 20.0,
///         y: 71.0,
///         length: 20.0,
///         thickness: 2.0,
///     }),
/// );
/// ```
#[must_use]
pub fn classify(
    colour: Option<Rgba>,
    thickness: Option<f64>,
    points: &[Point],
) -> RegmarkComponent {
    if !colour.is_some_and(Rgba::is_opaque_black) {
        return RegmarkComponent::None;
    }
    let Some(thickness) = thickness.filter(|t| t.is_finite() && *t > 0.0) else {
        return RegmarkComponent::None;
    };
    if points.len() != 3 && points.len() != 5 {
        return RegmarkComponent::None;
    }

    let walk = match walk_segments(points) {
        Ok(walk) => walk,
        Err(reason) => {
            trace!(reason, points = points.len(), "not a registration mark component");
            return RegmarkComponent::None;
        }
    };

    let half = thickness / 2.0;
    if points.len() == 3 {
        classify_bracket(points, &walk, thickness, half)
    } else if points[0] == points[4] {
        RegmarkComponent::Box(RegmarkBox {
            x: points[0].x.min(points[2].x) - half,
            y: points[0].y.min(points[2].y) - half,
            size: walk.length + thickness,
            thickness,
        })
    } else {
        trace!(reason = "box is not closed", "not a registration mark component");
        RegmarkComponent::None
    }
}

/// Decide a bracket's corner from its segment polarities.
///
/// ```text
///   valid:                     1        2      222      111
///                              1        2         1        2
///                               222      111      1        2
///   last horizontal            T        F        T        F
///   polarities                 TT       FF       FF       TT
///                              bottom-left       top-right
/// ```
///
/// Mixed polarities describe top-left or bottom-right corners, which
/// registration marks never use.
fn classify_bracket(
    points: &[Point],
    walk: &SegmentWalk,
    thickness: f64,
    half: f64,
) -> RegmarkComponent {
    let (first, last) = (points[0], points[2]);
    let (p1, p2) = (walk.polarities[0], walk.polarities[1]);
    if p1 != p2 {
        trace!(reason = "wrong-corner bracket", "not a registration mark component");
        return RegmarkComponent::None;
    }

    let bracket = |x: f64, y: f64| RegmarkBracket {
        x,
        y,
        length: walk.length,
        thickness,
    };
    if walk.last_is_horizontal == p1 {
        RegmarkComponent::BottomLeftBracket(bracket(
            first.x.min(last.x) - half,
            first.y.max(last.y) + half,
        ))
    } else {
        RegmarkComponent::TopRightBracket(bracket(
            first.x.max(last.x) + half,
            first.y.min(last.y) - half,
        ))
    }
}

/// Walk consecutive point pairs checking the shape constraints shared by
/// boxes and brackets.
#[allow(clippy::float_cmp)]
fn walk_segments(points: &[Point]) -> Result<SegmentWalk, &'static str> {
    let mut last_is_horizontal: Option<bool> = None;
    let mut length: Option<f64> = None;
    let mut polarities = Vec::with_capacity(points.len() - 1);

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        // Exact: a zero-length segment is both, a diagonal is neither.
        let is_horizontal = a.y == b.y;
        let is_vertical = a.x == b.x;
        if is_horizontal == is_vertical {
            return Err("segment is not horizontal or vertical");
        }

        if last_is_horizontal == Some(is_horizontal) {
            return Err("segment has the same orientation as the previous one");
        }
        last_is_horizontal = Some(is_horizontal);

        let directed = if is_horizontal { b.x - a.x } else { b.y - a.y };
        match length {
            None => length = Some(directed.abs()),
            Some(first) if !approx_eq(first, directed.abs()) => {
                return Err("segments have different lengths");
            }
            Some(_) => {}
        }
        polarities.push(directed >= 0.0);
    }

    match (last_is_horizontal, length) {
        (Some(last_is_horizontal), Some(length)) => Ok(SegmentWalk {
            last_is_horizontal,
            length,
            polarities,
        }),
        _ => Err("no segments"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn black(thickness: f64, coords: &[(f64, f64)]) -> RegmarkComponent {
        classify(Some(Rgba::BLACK), Some(thickness), &pts(coords))
    }

    // --- Tolerance helpers ---

    #[test]
    fn approx_eq_is_relative() {
        assert!(approx_eq(100.0, 100.0 + 1e-5));
        assert!(!approx_eq(100.0, 100.0 + 1e-3));
        assert!(approx_eq(0.0, 0.0));
        assert!(!approx_eq(0.0, 1e-12));
    }

    #[test]
    fn approx_le_accepts_near_equal() {
        assert!(approx_le(1.0, 2.0));
        assert!(approx_le(20.000_001, 20.0));
        assert!(!approx_le(20.1, 20.0));
    }

    // --- Accepted shapes ---

    #[test]
    fn boxes_in_every_rotation_and_direction() {
        for &thickness in &[0.5, 1.0] {
            for &(x, y) in &[(0.0, 0.0), (50.0, 100.0)] {
                for &size in &[5.0, 8.5] {
                    let corners = [(x, y), (x + size, y), (x + size, y + size), (x, y + size)];
                    for rotation in 0..4 {
                        for reverse in [false, true] {
                            let mut ring: Vec<(f64, f64)> = corners.to_vec();
                            ring.rotate_left(rotation);
                            if reverse {
                                ring.reverse();
                            }
                            ring.push(ring[0]);

                            assert_eq!(
                                black(thickness, &ring),
                                RegmarkComponent::Box(RegmarkBox {
                                    x: x - thickness / 2.0,
                                    y: y - thickness / 2.0,
                                    size: size + thickness,
                                    thickness,
                                }),
                                "ring {ring:?}",
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn bottom_left_brackets_in_both_directions() {
        for &thickness in &[0.5, 1.0] {
            for &(x, y) in &[(0.0, 0.0), (50.0, 100.0)] {
                for &length in &[15.5, 20.0] {
                    let mut line = vec![(x, y - length), (x, y), (x + length, y)];
                    for _ in 0..2 {
                        assert_eq!(
                            black(thickness, &line),
                            RegmarkComponent::BottomLeftBracket(RegmarkBracket {
                                x: x - thickness / 2.0,
                                y: y + thickness / 2.0,
                                length,
                                thickness,
                            }),
                            "line {line:?}",
                        );
                        line.reverse();
                    }
                }
            }
        }
    }

    #[test]
    fn top_right_brackets_in_both_directions() {
        for &thickness in &[0.5, 1.0] {
            for &(x, y) in &[(0.0, 0.0), (50.0, 100.0)] {
                for &length in &[15.5, 20.0] {
                    let mut line = vec![(x - length, y), (x, y), (x, y + length)];
                    for _ in 0..2 {
                        assert_eq!(
                            black(thickness, &line),
                            RegmarkComponent::TopRightBracket(RegmarkBracket {
                                x: x + thickness / 2.0,
                                y: y - thickness / 2.0,
                                length,
                                thickness,
                            }),
                            "line {line:?}",
                        );
                        line.reverse();
                    }
                }
            }
        }
    }

    #[test]
    fn lengths_within_tolerance_are_equal() {
        let result = black(1.0, &[(0.0, 0.0), (20.0, 0.0), (20.0, 20.000_000_1)]);
        assert!(matches!(result, RegmarkComponent::TopRightBracket(_)));
    }

    // --- Rejections ---

    #[test]
    fn empty_line_is_none() {
        for colour in [Some(Rgba::BLACK), Some(Rgba::new(1.0, 1.0, 1.0, 1.0)), None] {
            for thickness in [Some(0.0), Some(0.5), None] {
                assert_eq!(classify(colour, thickness, &[]), RegmarkComponent::None);
            }
        }
    }

    #[test]
    fn colour_rules_out_lines() {
        let line = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        for colour in [
            None,
            Some(Rgba::new(1.0, 1.0, 1.0, 1.0)),
            Some(Rgba::new(0.0, 0.0, 0.0, 0.0)),
        ] {
            assert_eq!(classify(colour, Some(1.0), &line), RegmarkComponent::None);
        }
    }

    #[test]
    fn thickness_rules_out_lines() {
        let line = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        for thickness in [None, Some(0.0)] {
            assert_eq!(
                classify(Some(Rgba::BLACK), thickness, &line),
                RegmarkComponent::None
            );
        }
    }

    #[test]
    fn vertex_count_rules_out_lines() {
        let lines: &[&[(f64, f64)]] = &[
            &[(0.0, 0.0)],
            &[(0.0, 0.0), (10.0, 0.0)],
            // Too many for a bracket, too few for a box.
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (10.0, 10.0)],
            // Too many for a box.
            &[
                (0.0, 0.0),
                (10.0, 0.0),
                (10.0, 10.0),
                (0.0, 10.0),
                (0.0, 5.0),
                (0.0, 0.0),
            ],
        ];
        for line in lines {
            assert_eq!(black(1.0, line), RegmarkComponent::None, "line {line:?}");
        }
    }

    #[test]
    fn non_axis_aligned_segments_are_none() {
        let lines: &[&[(f64, f64)]] = &[
            // Coincident vertices.
            &[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)],
            &[(0.0, 0.0), (0.0, 0.0), (10.0, 0.0)],
            // Diagonal first segment.
            &[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)],
            &[(0.0, 0.0), (1.0, -1.0), (0.0, 0.0)],
            &[(0.0, 0.0), (-1.0, -1.0), (0.0, 0.0)],
            &[(0.0, 0.0), (-1.0, 1.0), (0.0, 0.0)],
            // Diagonal second segment.
            &[(0.0, 0.0), (2.0, 0.0), (1.0, 1.0)],
            &[(0.0, 0.0), (2.0, 0.0), (1.0, -1.0)],
            &[(0.0, 0.0), (2.0, 0.0), (-1.0, -1.0)],
            &[(0.0, 0.0), (2.0, 0.0), (-1.0, 1.0)],
            // Diagonal edge in an otherwise closed box.
            &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0 + 1e-9), (0.0, 0.0)],
        ];
        for line in lines {
            assert_eq!(black(1.0, line), RegmarkComponent::None, "line {line:?}");
        }
    }

    #[test]
    fn repeated_orientation_is_none() {
        assert_eq!(
            black(1.0, &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
            RegmarkComponent::None
        );
        assert_eq!(
            black(1.0, &[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]),
            RegmarkComponent::None
        );
    }

    #[test]
    fn differing_lengths_are_none() {
        let lines: &[&[(f64, f64)]] = &[
            &[(0.0, 0.0), (0.0, 2.0), (3.0, 2.0)],
            &[(0.0, 0.0), (2.0, 0.0), (2.0, 3.0)],
            &[(0.0, 0.0), (2.0, 0.0), (2.0, 3.0), (0.0, 3.0), (0.0, 0.0)],
            &[(0.0, 0.0), (20.0, 0.0), (20.0, 20.001)],
        ];
        for line in lines {
            assert_eq!(black(1.0, line), RegmarkComponent::None, "line {line:?}");
        }
    }

    #[test]
    fn wrong_corner_brackets_are_none() {
        let lines: &[&[(f64, f64)]] = &[
            // Top-left.
            &[(0.0, 2.0), (0.0, 0.0), (2.0, 0.0)],
            &[(2.0, 0.0), (0.0, 0.0), (0.0, 2.0)],
            // Bottom-right.
            &[(2.0, 0.0), (2.0, 2.0), (0.0, 2.0)],
            &[(0.0, 2.0), (2.0, 2.0), (2.0, 0.0)],
        ];
        for line in lines {
            assert_eq!(black(1.0, line), RegmarkComponent::None, "line {line:?}");
        }
    }

    #[test]
    fn unclosed_box_is_none() {
        assert_eq!(
            black(
                1.0,
                &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (4.0, 2.0), (4.0, 0.0)]
            ),
            RegmarkComponent::None
        );
    }
}
