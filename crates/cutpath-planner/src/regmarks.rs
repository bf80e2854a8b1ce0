//! Registration mark location.
//!
//! Classifies every outline with [`classify`], buckets the resulting
//! boxes and brackets, then pairs them into complete marks. A mark is a
//! box with a bottom-left bracket directly below it (same x) and a
//! top-right bracket directly to its right (same y), where both brackets
//! share arm length and stroke thickness.
//!
//! When several complete marks are present the outermost one wins; see
//! [`RegmarkCandidates::best`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{
    RegmarkBox, RegmarkBracket, RegmarkComponent, approx_eq, approx_le, classify,
};
use crate::types::{Outline, Point, Rgba};

/// The key measurements of a registration mark.
///
/// `width` and `height` span from the box's top-left corner to the outer
/// edges of the top-right and bottom-left brackets respectively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegmarkSpecification {
    /// X coordinate (mm) of the box's top-left corner.
    pub x: f64,
    /// Y coordinate (mm) of the box's top-left corner.
    pub y: f64,
    /// Width (mm) of the registered area.
    pub width: f64,
    /// Height (mm) of the registered area.
    pub height: f64,
    /// Size (mm) of the square box, including stroke.
    pub box_size: f64,
    /// Length (mm) of the bracket arms.
    pub line_length: f64,
    /// Stroke thickness (mm) of the brackets.
    pub line_thickness: f64,
}

impl RegmarkSpecification {
    /// Standard box size in mm.
    pub const DEFAULT_BOX_SIZE: f64 = 5.0;
    /// Standard bracket arm length in mm.
    pub const DEFAULT_LINE_LENGTH: f64 = 20.0;
    /// Standard bracket stroke thickness in mm.
    pub const DEFAULT_LINE_THICKNESS: f64 = 0.5;

    /// A mark at a known position drawn with the standard dimensions.
    #[must_use]
    pub const fn manual(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            box_size: Self::DEFAULT_BOX_SIZE,
            line_length: Self::DEFAULT_LINE_LENGTH,
            line_thickness: Self::DEFAULT_LINE_THICKNESS,
        }
    }

    /// Top-left corner of the box, the origin of the registered area.
    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Is the given stroked polyline part of this registration mark?
    ///
    /// A component counts if it sits exactly where this mark's
    /// component would and is no larger (or thicker) than it. Smaller
    /// components hidden under this mark's strokes are therefore also
    /// treated as part of it.
    #[must_use]
    pub fn is_part_of(
        &self,
        colour: Option<Rgba>,
        thickness: Option<f64>,
        points: &[Point],
    ) -> bool {
        match classify(colour, thickness, points) {
            RegmarkComponent::Box(b) => {
                approx_eq(b.x, self.x) && approx_eq(b.y, self.y) && approx_le(b.size, self.box_size)
            }
            RegmarkComponent::BottomLeftBracket(b) => {
                approx_eq(b.x, self.x)
                    && approx_eq(b.y, self.y + self.height)
                    && self.covers_bracket(&b)
            }
            RegmarkComponent::TopRightBracket(b) => {
                approx_eq(b.x, self.x + self.width)
                    && approx_eq(b.y, self.y)
                    && self.covers_bracket(&b)
            }
            RegmarkComponent::None => false,
        }
    }

    /// [`is_part_of`](Self::is_part_of) for an [`Outline`].
    #[must_use]
    pub fn contains_outline(&self, outline: &Outline) -> bool {
        self.is_part_of(outline.colour, outline.stroke_width, outline.polyline.points())
    }

    fn covers_bracket(&self, bracket: &RegmarkBracket) -> bool {
        approx_le(bracket.length, self.line_length)
            && approx_le(bracket.thickness, self.line_thickness)
    }
}

/// Optional constraints on the marks [`find_regmarks`] will accept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegmarkRequirements {
    /// Required box size (mm, including stroke).
    pub box_size: Option<f64>,
    /// Required bracket arm length (mm).
    pub line_length: Option<f64>,
    /// Required bracket stroke thickness (mm).
    pub line_thickness: Option<f64>,
}

impl RegmarkRequirements {
    fn accepts_box(&self, candidate: &RegmarkBox) -> bool {
        self.box_size.is_none_or(|size| approx_eq(candidate.size, size))
    }

    fn accepts_bracket(&self, candidate: &RegmarkBracket) -> bool {
        self.line_length
            .is_none_or(|length| approx_eq(candidate.length, length))
            && self
                .line_thickness
                .is_none_or(|thickness| approx_eq(candidate.thickness, thickness))
    }
}

/// Classified registration mark components, bucketed by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegmarkCandidates {
    boxes: Vec<RegmarkBox>,
    bottom_left: Vec<RegmarkBracket>,
    top_right: Vec<RegmarkBracket>,
}

impl RegmarkCandidates {
    /// Classify every outline, keeping components that satisfy
    /// `requirements`.
    #[must_use]
    pub fn collect<'a, I>(outlines: I, requirements: &RegmarkRequirements) -> Self
    where
        I: IntoIterator<Item = &'a Outline>,
    {
        let mut candidates = Self::default();
        for outline in outlines {
            match classify(
                outline.colour,
                outline.stroke_width,
                outline.polyline.points(),
            ) {
                RegmarkComponent::Box(b) if requirements.accepts_box(&b) => {
                    candidates.boxes.push(b);
                }
                RegmarkComponent::BottomLeftBracket(b) if requirements.accepts_bracket(&b) => {
                    candidates.bottom_left.push(b);
                }
                RegmarkComponent::TopRightBracket(b) if requirements.accepts_bracket(&b) => {
                    candidates.top_right.push(b);
                }
                _ => {}
            }
        }
        debug!(
            boxes = candidates.boxes.len(),
            bottom_left_brackets = candidates.bottom_left.len(),
            top_right_brackets = candidates.top_right.len(),
            "classified registration mark candidates"
        );
        candidates
    }

    /// Candidate boxes.
    #[must_use]
    pub fn boxes(&self) -> &[RegmarkBox] {
        &self.boxes
    }

    /// Candidate bottom-left brackets.
    #[must_use]
    pub fn bottom_left_brackets(&self) -> &[RegmarkBracket] {
        &self.bottom_left
    }

    /// Candidate top-right brackets.
    #[must_use]
    pub fn top_right_brackets(&self) -> &[RegmarkBracket] {
        &self.top_right
    }

    /// Every complete mark that can be assembled from the candidates.
    pub fn specifications(&self) -> impl Iterator<Item = RegmarkSpecification> + '_ {
        self.boxes.iter().flat_map(move |b| {
            self.bottom_left.iter().flat_map(move |bl| {
                self.top_right
                    .iter()
                    .filter(move |tr| forms_mark(b, bl, tr))
                    .map(move |tr| RegmarkSpecification {
                        x: b.x,
                        y: b.y,
                        width: tr.x - b.x,
                        height: bl.y - b.y,
                        box_size: b.size,
                        line_length: bl.length,
                        line_thickness: bl.thickness,
                    })
            })
        })
    }

    /// The outermost complete mark, if any.
    ///
    /// Prefers the smallest `x`, then smallest `y`, then the largest
    /// area, then the longest and thickest bracket lines. Ties keep the
    /// first mark found.
    #[must_use]
    pub fn best(&self) -> Option<RegmarkSpecification> {
        self.specifications().min_by(outermost_first)
    }
}

/// Find the outermost registration mark in a set of outlines.
///
/// Returns `None` when no box and bracket pair up; this is a normal
/// outcome for documents without marks.
///
/// # Examples
///
/// ```
/// use cutpath_planner::regmarks::{RegmarkRequirements, find_regmarks};
/// use cutpath_planner::{Outline, Point, Rgba};
///
/// let black = |points: &[(f64, f64)]| {
///     Outline::new(
///         Some(Rgba::BLACK),
///         Some(2.0),
///         points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
///     )
/// };
/// let outlines = [
///     black(&[(21.0, 11.0), (24.0, 11.0), (24.0, 14.0), (21.0, 14.0), (21.0, 11.0)]),
///     black(&[(80.0, 11.0), (100.0, 11.0), (100.0, 31.0)]),
///     black(&[(21.0, 50.0), (21.0, 70.0), (41.0, 70.0)]),
/// ];
/// let spec = find_regmarks(&outlines, &RegmarkRequirements::default()).unwrap();
/// assert_eq!((spec.x, spec.y, spec.width, spec.height), (20.0, 10.0, 81.0, 61.0));
/// ```
#[must_use]
pub fn find_regmarks(
    outlines: &[Outline],
    requirements: &RegmarkRequirements,
) -> Option<RegmarkSpecification> {
    RegmarkCandidates::collect(outlines, requirements).best()
}

/// Do these three components line up as one mark?
fn forms_mark(b: &RegmarkBox, bl: &RegmarkBracket, tr: &RegmarkBracket) -> bool {
    approx_eq(bl.x, b.x)
        && b.y + b.size < bl.y - bl.length
        && approx_eq(tr.y, b.y)
        && b.x + b.size < tr.x - tr.length
        && approx_eq(bl.length, tr.length)
        && approx_eq(bl.thickness, tr.thickness)
}

fn outermost_first(a: &RegmarkSpecification, b: &RegmarkSpecification) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(b.width.total_cmp(&a.width))
        .then(b.height.total_cmp(&a.height))
        .then(b.line_length.total_cmp(&a.line_length))
        .then(b.line_thickness.total_cmp(&a.line_thickness))
}
