//! Shared types for the cutpath toolpath planner.

use serde::{Deserialize, Serialize};

use crate::regmarks::RegmarkSpecification;

/// A 2D point in document coordinates (millimetres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (mm from the left edge).
    pub x: f64,
    /// Vertical position (mm from the top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The document origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// This point shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A sequence of connected points forming a path segment.
///
/// A polyline is *closed* when its first and last points are exactly
/// equal, otherwise it is *open*.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Returns `true` if the first and last points are coordinate-identical.
    ///
    /// Empty polylines are neither open nor closed and return `false`.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!((self.first(), self.last()), (Some(a), Some(b)) if a == b)
    }

    /// The same points in reverse order.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().copied().collect())
    }

    /// Every point shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self(self.0.iter().map(|p| p.translated(dx, dy)).collect())
    }

    /// Total length of all segments.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

impl From<Vec<Point>> for Polyline {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl FromIterator<Point> for Polyline {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A stroke colour with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red channel.
    pub r: f64,
    /// Green channel.
    pub g: f64,
    /// Blue channel.
    pub b: f64,
    /// Alpha channel (1.0 is opaque).
    pub a: f64,
}

impl Rgba {
    /// Opaque black, the only colour registration marks are drawn in.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Create a new colour.
    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Exactly opaque black.
    #[must_use]
    pub fn is_opaque_black(self) -> bool {
        self == Self::BLACK
    }
}

/// A stroked polyline extracted from a vector document.
///
/// Stroke attributes are only consulted for colour filtering and
/// registration mark classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    /// Stroke colour, `None` for unstroked or gradient/pattern strokes.
    pub colour: Option<Rgba>,
    /// Stroke width in millimetres.
    pub stroke_width: Option<f64>,
    /// The flattened outline geometry.
    pub polyline: Polyline,
}

impl Outline {
    /// Create a new outline.
    #[must_use]
    pub const fn new(colour: Option<Rgba>, stroke_width: Option<f64>, polyline: Polyline) -> Self {
        Self {
            colour,
            stroke_width,
            polyline,
        }
    }
}

/// Whether the device carries a pen or a blade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlotMode {
    /// Blade cutting: inside-first ordering and over-cut by default.
    #[default]
    Cut,
    /// Pen plotting.
    Plot,
}

/// How registration marks are resolved before planning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum RegmarkMode {
    /// Never look for registration marks.
    Disabled,
    /// Use registration marks if the outlines contain some.
    #[default]
    Auto,
    /// Fail with [`PlanError::RegmarksNotFound`] if no mark is found.
    Required,
    /// Use a caller-supplied mark without searching.
    Manual(RegmarkSpecification),
}

/// Configuration for toolpath planning.
///
/// `None` for [`inside_first`](Self::inside_first) and
/// [`over_cut`](Self::over_cut) defers to the [`PlotMode`] default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Pen or blade.
    pub mode: PlotMode,

    /// Plan shapes nested inside others before their enclosures.
    pub inside_first: Option<bool>,

    /// Reorder and merge paths to reduce travel. When `false` paths are
    /// emitted in input order.
    pub fast_order: bool,

    /// Keep only outlines stroked in one of these colours.
    pub colours: Option<Vec<Rgba>>,

    /// Registration mark handling.
    pub regmarks: RegmarkMode,

    /// Ignore marks whose box is not this size (mm, including stroke).
    pub required_box_size: Option<f64>,

    /// Ignore marks whose brackets are not this long (mm).
    pub required_line_length: Option<f64>,

    /// Ignore marks whose brackets are not this thick (mm).
    pub required_line_thickness: Option<f64>,

    /// Keep registration mark geometry in the planned output.
    pub include_regmarks: bool,

    /// Distance (mm) to retrace past the start of closed paths.
    pub over_cut: Option<f64>,

    /// Pen position before the first path.
    pub start_position: Point,
}

impl PlanConfig {
    /// Default for [`fast_order`](Self::fast_order).
    pub const DEFAULT_FAST_ORDER: bool = true;

    /// Default for [`required_box_size`](Self::required_box_size) in mm.
    pub const DEFAULT_REQUIRED_BOX_SIZE: f64 = 5.0;

    /// Over-cut distance (mm) used in [`PlotMode::Cut`] when
    /// [`over_cut`](Self::over_cut) is `None`.
    pub const DEFAULT_CUT_OVER_CUT: f64 = 1.0;

    /// Inside-first setting after applying the mode default.
    #[must_use]
    pub fn resolved_inside_first(&self) -> bool {
        self.inside_first
            .unwrap_or(matches!(self.mode, PlotMode::Cut))
    }

    /// Over-cut distance after applying the mode default.
    #[must_use]
    pub fn resolved_over_cut(&self) -> f64 {
        self.over_cut.unwrap_or(match self.mode {
            PlotMode::Cut => Self::DEFAULT_CUT_OVER_CUT,
            PlotMode::Plot => 0.0,
        })
    }

    /// Check the configuration for values the planner cannot use.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidConfig`] for a negative or non-finite
    /// over-cut distance, non-finite start position, or a manual
    /// registration mark without a positive width and height.
    pub fn validate(&self) -> Result<(), PlanError> {
        if let Some(d) = self.over_cut
            && !(d.is_finite() && d >= 0.0)
        {
            return Err(PlanError::InvalidConfig(format!(
                "over-cut distance must be finite and non-negative, got {d}"
            )));
        }
        if !self.start_position.is_finite() {
            return Err(PlanError::InvalidConfig(
                "start position must be finite".to_string(),
            ));
        }
        if let RegmarkMode::Manual(ref spec) = self.regmarks
            && !(spec.width > 0.0 && spec.height > 0.0)
        {
            return Err(PlanError::InvalidConfig(format!(
                "manual registration mark area must be positive, got {}x{}",
                spec.width, spec.height
            )));
        }
        Ok(())
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            mode: PlotMode::default(),
            inside_first: None,
            fast_order: Self::DEFAULT_FAST_ORDER,
            colours: None,
            regmarks: RegmarkMode::default(),
            required_box_size: Some(Self::DEFAULT_REQUIRED_BOX_SIZE),
            required_line_length: None,
            required_line_thickness: None,
            include_regmarks: false,
            over_cut: None,
            start_position: Point::ORIGIN,
        }
    }
}

/// A planned toolpath ready to hand to a device driver.
///
/// The tool is lowered at the first point of each path and raised after
/// its last point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toolpath {
    /// Paths in the order they should be drawn or cut.
    pub paths: Vec<Polyline>,

    /// The registration mark the paths are relative to, if any.
    ///
    /// When present, path coordinates are offset so the mark's top-left
    /// corner is the origin.
    pub regmarks: Option<RegmarkSpecification>,

    /// The mode the toolpath was planned for.
    pub mode: PlotMode,
}

impl Toolpath {
    /// Number of times the tool is raised between paths.
    #[must_use]
    pub const fn pen_lifts(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Total points across all paths.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.paths.iter().map(Polyline::len).sum()
    }

    /// Total length travelled with the tool down.
    #[must_use]
    pub fn draw_length(&self) -> f64 {
        self.paths.iter().map(Polyline::length).sum()
    }

    /// Total length travelled with the tool raised, starting from `start`.
    #[must_use]
    pub fn travel_distance(&self, start: Point) -> f64 {
        let mut position = start;
        let mut travel = 0.0;
        for path in &self.paths {
            if let (Some(&first), Some(&last)) = (path.first(), path.last()) {
                travel += position.distance(first);
                position = last;
            }
        }
        travel
    }
}

/// Errors that can occur while planning a toolpath.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    /// An input polyline has no points.
    #[error("polyline {index} has no points")]
    EmptyPolyline {
        /// Position of the offending polyline in the input.
        index: usize,
    },

    /// An input polyline contains a NaN or infinite coordinate.
    #[error("polyline {index} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Position of the offending polyline in the input.
        index: usize,
    },

    /// Registration marks were required but none matched up.
    #[error(
        "no registration marks found (found {boxes} boxes, {bottom_left_brackets} \
         bottom-left brackets and {top_right_brackets} top-right brackets which \
         don't match up correctly)"
    )]
    RegmarksNotFound {
        /// Candidate boxes seen.
        boxes: usize,
        /// Candidate bottom-left brackets seen.
        bottom_left_brackets: usize,
        /// Candidate top-right brackets seen.
        top_right_brackets: usize,
    },

    /// Planner configuration is invalid.
    #[error("invalid planner configuration: {0}")]
    InvalidConfig(String),
}
