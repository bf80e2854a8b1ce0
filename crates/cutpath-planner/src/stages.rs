//! The individual planning stages.
//!
//! [`crate::plan`] and [`crate::diagnostics::plan_with_diagnostics`] run
//! these in order:
//!
//! 1. [`validate`] the outlines and configuration
//! 2. [`resolve_regmarks`] on the unfiltered outlines
//! 3. [`select_polylines`] by colour, stripping registration marks
//! 4. [`offset_to_regmarks`] so the mark's corner is the origin
//! 5. [`group`] nested shapes inside-first
//! 6. [`order`] each group to reduce travel
//! 7. [`extend`] closed paths by the over-cut distance
//!
//! Each stage is a pure function of its inputs.

use tracing::{debug, info};

use crate::inside_first::group_inside_first;
use crate::optimize::optimize_path_order;
use crate::over_cut::over_cut;
use crate::regmarks::{RegmarkCandidates, RegmarkRequirements, RegmarkSpecification};
use crate::types::{Outline, PlanConfig, PlanError, Point, Polyline, RegmarkMode};

/// Reject outlines and configuration the planner cannot use.
///
/// # Errors
///
/// Returns [`PlanError::EmptyPolyline`] or
/// [`PlanError::NonFiniteCoordinate`] for the first offending outline,
/// or [`PlanError::InvalidConfig`] from [`PlanConfig::validate`].
pub fn validate(outlines: &[Outline], config: &PlanConfig) -> Result<(), PlanError> {
    config.validate()?;
    for (index, outline) in outlines.iter().enumerate() {
        if outline.polyline.is_empty() {
            return Err(PlanError::EmptyPolyline { index });
        }
        if !outline.polyline.points().iter().all(|p| p.is_finite()) {
            return Err(PlanError::NonFiniteCoordinate { index });
        }
    }
    Ok(())
}

/// The locator constraints configured in `config`.
#[must_use]
pub const fn regmark_requirements(config: &PlanConfig) -> RegmarkRequirements {
    RegmarkRequirements {
        box_size: config.required_box_size,
        line_length: config.required_line_length,
        line_thickness: config.required_line_thickness,
    }
}

/// Work out which registration mark, if any, the plan is relative to.
///
/// # Errors
///
/// Returns [`PlanError::RegmarksNotFound`] in [`RegmarkMode::Required`]
/// when no complete mark is present.
pub fn resolve_regmarks(
    outlines: &[Outline],
    config: &PlanConfig,
) -> Result<Option<RegmarkSpecification>, PlanError> {
    let resolved = match config.regmarks {
        RegmarkMode::Disabled => None,
        RegmarkMode::Manual(spec) => Some(spec),
        RegmarkMode::Auto => {
            RegmarkCandidates::collect(outlines, &regmark_requirements(config)).best()
        }
        RegmarkMode::Required => {
            let candidates = RegmarkCandidates::collect(outlines, &regmark_requirements(config));
            let Some(spec) = candidates.best() else {
                return Err(PlanError::RegmarksNotFound {
                    boxes: candidates.boxes().len(),
                    bottom_left_brackets: candidates.bottom_left_brackets().len(),
                    top_right_brackets: candidates.top_right_brackets().len(),
                });
            };
            Some(spec)
        }
    };

    match resolved {
        Some(spec) => info!(
            x = spec.x,
            y = spec.y,
            width = spec.width,
            height = spec.height,
            "using registration marks"
        ),
        None => debug!(mode = ?config.regmarks, "no registration marks"),
    }
    Ok(resolved)
}

/// Keep the outlines that should be planned.
///
/// Drops outlines not stroked in one of `config.colours` (when set) and,
/// unless `config.include_regmarks`, outlines that belong to `regmarks`.
#[must_use]
pub fn select_polylines(
    outlines: &[Outline],
    config: &PlanConfig,
    regmarks: Option<&RegmarkSpecification>,
) -> Vec<Polyline> {
    let selected: Vec<Polyline> = outlines
        .iter()
        .filter(|outline| {
            config
                .colours
                .as_ref()
                .is_none_or(|colours| outline.colour.is_some_and(|c| colours.contains(&c)))
        })
        .filter(|outline| {
            config.include_regmarks || regmarks.is_none_or(|spec| !spec.contains_outline(outline))
        })
        .map(|outline| outline.polyline.clone())
        .collect();
    debug!(
        input = outlines.len(),
        selected = selected.len(),
        "selected outlines"
    );
    selected
}

/// Shift every point so the registration mark's corner is the origin.
#[must_use]
pub fn offset_to_regmarks(
    polylines: Vec<Polyline>,
    regmarks: Option<&RegmarkSpecification>,
) -> Vec<Polyline> {
    match regmarks {
        Some(spec) => polylines
            .iter()
            .map(|pl| pl.translated(-spec.x, -spec.y))
            .collect(),
        None => polylines,
    }
}

/// Split polylines into groups to be planned one after another.
///
/// # Errors
///
/// Returns [`PlanError::EmptyPolyline`] if any polyline has no points.
pub fn group(
    polylines: Vec<Polyline>,
    config: &PlanConfig,
) -> Result<Vec<Vec<Polyline>>, PlanError> {
    let groups = if config.resolved_inside_first() {
        group_inside_first(&polylines)?
    } else {
        vec![polylines]
    };
    debug!(groups = groups.len(), "grouped polylines");
    Ok(groups)
}

/// Flatten the groups into a single drawing order.
///
/// With `config.fast_order` each group is optimized starting from where
/// the previous group finished; otherwise polylines keep their order.
///
/// # Errors
///
/// Returns [`PlanError::EmptyPolyline`] if any polyline has no points.
pub fn order(groups: &[Vec<Polyline>], config: &PlanConfig) -> Result<Vec<Polyline>, PlanError> {
    if !config.fast_order {
        return Ok(groups.iter().flatten().cloned().collect());
    }

    let mut ordered: Vec<Polyline> = Vec::new();
    let mut current = config.start_position;
    for polylines in groups {
        ordered.extend(optimize_path_order(polylines, current)?);
        current = end_position(&ordered, current);
    }
    Ok(ordered)
}

/// Over-cut closed paths by the configured distance.
#[must_use]
pub fn extend(paths: &[Polyline], config: &PlanConfig) -> Vec<Polyline> {
    let distance = config.resolved_over_cut();
    debug!(distance, "over-cutting closed paths");
    over_cut(paths, distance)
}

/// Last point of a drawing order, or `fallback` if it is empty.
#[must_use]
pub fn end_position(paths: &[Polyline], fallback: Point) -> Point {
    paths.last().and_then(Polyline::last).copied().unwrap_or(fallback)
}
