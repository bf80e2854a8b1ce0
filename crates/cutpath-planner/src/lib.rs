//! cutpath-planner: Pure toolpath planning for pen plotters and blade cutters (sans-IO).
//!
//! Turns stroked outlines extracted from a vector document into an ordered
//! list of paths ready for a device driver:
//! registration marks -> colour filter -> offset -> inside-first grouping ->
//! path ordering -> over-cut.
//!
//! This crate has **no I/O dependencies**. Document parsing and device
//! communication live elsewhere; everything here operates on in-memory
//! geometry in millimetres.

pub mod classify;
pub mod diagnostics;
pub mod inside_first;
pub mod optimize;
pub mod over_cut;
mod plot_mode;
pub mod regmarks;
pub mod stages;
pub mod types;

pub use regmarks::{RegmarkRequirements, RegmarkSpecification, find_regmarks};
pub use types::{
    Outline, PlanConfig, PlanError, PlotMode, Point, Polyline, RegmarkMode, Rgba, Toolpath,
};

/// Plan a toolpath from stroked outlines.
///
/// # Pipeline steps
///
/// 1. Validate the outlines and configuration
/// 2. Resolve registration marks (search, manual, or none)
/// 3. Keep outlines in the selected colours, dropping mark geometry
/// 4. Offset so the mark's top-left corner is the origin
/// 5. Group nested shapes inside-first (cut mode default)
/// 6. Reorder and merge paths to reduce travel
/// 7. Over-cut closed paths (cut mode default)
///
/// # Errors
///
/// Returns [`PlanError::EmptyPolyline`] or [`PlanError::NonFiniteCoordinate`]
/// for unusable outlines, [`PlanError::InvalidConfig`] for unusable
/// configuration, and [`PlanError::RegmarksNotFound`] when registration
/// marks are [`RegmarkMode::Required`] but absent.
///
/// # Examples
///
/// ```
/// use cutpath_planner::{Outline, PlanConfig, Point, Polyline, plan};
///
/// let square = |x: f64, size: f64| {
///     Polyline::new(vec![
///         Point::new(x, x),
///         Point::new(x + size, x),
///         Point::new(x + size, x + size),
///         Point::new(x, x + size),
///         Point::new(x, x),
///     ])
/// };
/// let outlines = [
///     Outline::new(None, None, square(0.0, 10.0)),
///     Outline::new(None, None, square(4.0, 2.0)),
/// ];
/// let toolpath = plan(&outlines, &PlanConfig::default()).unwrap();
///
/// // The inner square is cut first, and both are over-cut by 1mm.
/// assert_eq!(toolpath.paths[0].first(), Some(&Point::new(4.0, 4.0)));
/// assert_eq!(toolpath.paths[1].last(), Some(&Point::new(1.0, 0.0)));
/// ```
pub fn plan(outlines: &[Outline], config: &PlanConfig) -> Result<Toolpath, PlanError> {
    stages::validate(outlines, config)?;
    let regmarks = stages::resolve_regmarks(outlines, config)?;
    let selected = stages::select_polylines(outlines, config, regmarks.as_ref());
    let adjusted = stages::offset_to_regmarks(selected, regmarks.as_ref());
    let groups = stages::group(adjusted, config)?;
    let ordered = stages::order(&groups, config)?;
    let paths = stages::extend(&ordered, config);
    Ok(Toolpath {
        paths,
        regmarks,
        mode: config.mode,
    })
}
