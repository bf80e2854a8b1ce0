//! Inside-first grouping.
//!
//! When cutting, a shape must not be cut free of the sheet before the
//! shapes inside it have been cut, otherwise it may shift and spoil them.
//! This module orders polylines into groups so that anything whose
//! bounding box lies strictly inside another's is planned in an earlier
//! group.
//!
//! Grouping is a layered topological sort (Kahn's algorithm) over the
//! strict bounding-box containment relation. Strict containment is a
//! strict partial order, so the relation is acyclic and every layer is
//! non-empty.

use geo::{BoundingRect, LineString, Rect};

use crate::types::{PlanError, Point, Polyline};

const fn point_to_coord(p: Point) -> geo::Coord<f64> {
    geo::Coord { x: p.x, y: p.y }
}

/// Axis-aligned bounding box of a polyline.
fn bounding_rect(index: usize, polyline: &Polyline) -> Result<Rect<f64>, PlanError> {
    if !polyline.points().iter().all(|p| p.is_finite()) {
        return Err(PlanError::NonFiniteCoordinate { index });
    }
    polyline
        .points()
        .iter()
        .copied()
        .map(point_to_coord)
        .collect::<LineString<f64>>()
        .bounding_rect()
        .ok_or(PlanError::EmptyPolyline { index })
}

/// Is `inner` strictly inside `outer` on all four sides?
fn strictly_contains(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    outer.min().x < inner.min().x
        && outer.min().y < inner.min().y
        && outer.max().x > inner.max().x
        && outer.max().y > inner.max().y
}

/// For every polyline, the indices of the polylines strictly inside it.
///
/// Inner index lists are in ascending order.
///
/// # Errors
///
/// Returns [`PlanError::EmptyPolyline`] if any polyline has no points, or
/// [`PlanError::NonFiniteCoordinate`] if one has a NaN or infinite
/// coordinate.
pub fn find_dependencies(polylines: &[Polyline]) -> Result<Vec<Vec<usize>>, PlanError> {
    let rects = polylines
        .iter()
        .enumerate()
        .map(|(i, pl)| bounding_rect(i, pl))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rects
        .iter()
        .map(|outer| {
            rects
                .iter()
                .enumerate()
                .filter(|(_, inner)| strictly_contains(outer, inner))
                .map(|(j, _)| j)
                .collect()
        })
        .collect())
}

/// Layer indices so each index comes after everything it depends on.
///
/// `dependencies[i]` lists the indices that must be placed before `i`.
fn layers(dependencies: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = dependencies.len();
    let mut in_degree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (outer, inners) in dependencies.iter().enumerate() {
        for &inner in inners {
            dependents[inner].push(outer);
        }
    }

    let mut placed = vec![false; n];
    let mut remaining = n;
    let mut result = Vec::new();
    while remaining > 0 {
        let layer: Vec<usize> = (0..n)
            .filter(|&i| !placed[i] && in_degree[i] == 0)
            .collect();
        if layer.is_empty() {
            // Unreachable for a containment relation; keep every item.
            result.push((0..n).filter(|&i| !placed[i]).collect());
            break;
        }
        for &i in &layer {
            placed[i] = true;
            for &outer in &dependents[i] {
                in_degree[outer] -= 1;
            }
        }
        remaining -= layer.len();
        result.push(layer);
    }
    result
}

/// Group polylines so nested shapes come before their enclosures.
///
/// The first group holds every polyline with nothing strictly inside it.
/// Each following group holds the polylines whose contents have all been
/// placed in earlier groups. Within a group polylines keep their input
/// order. Polylines whose boxes merely touch or overlap are unordered and
/// may share a group.
///
/// # Errors
///
/// Returns [`PlanError::EmptyPolyline`] if any polyline has no points, or
/// [`PlanError::NonFiniteCoordinate`] if one has a NaN or infinite
/// coordinate.
///
/// # Examples
///
/// ```
/// use cutpath_planner::inside_first::group_inside_first;
/// use cutpath_planner::{Point, Polyline};
///
/// let outer = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]);
/// let inner = Polyline::new(vec![Point::new(5.0, 5.0), Point::new(7.0, 7.0)]);
/// let groups = group_inside_first(&[outer.clone(), inner.clone()]).unwrap();
/// assert_eq!(groups, vec![vec![inner], vec![outer]]);
/// ```
pub fn group_inside_first(polylines: &[Polyline]) -> Result<Vec<Vec<Polyline>>, PlanError> {
    let dependencies = find_dependencies(polylines)?;
    Ok(layers(&dependencies)
        .into_iter()
        .map(|layer| layer.into_iter().map(|i| polylines[i].clone()).collect())
        .collect())
}
