//! Planner diagnostics: timing and counts for each stage.
//!
//! [`plan_with_diagnostics`] runs the same stages as [`crate::plan`] and
//! records how long each took and what it did. Time is read through the
//! [`Clock`] trait so the crate itself never touches a system clock.
//!
//! Durations are serialized as fractional seconds (`f64`) since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stages;
use crate::types::{Outline, PlanConfig, PlanError, Polyline, RegmarkMode, Toolpath};

/// A monotonic time source.
pub trait Clock {
    /// A point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom("duration seconds must be finite and non-negative")
        })
    }
}

/// Diagnostics collected from a single planner run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDiagnostics {
    /// Registration mark resolution.
    pub regmarks: StageDiagnostics,
    /// Colour filtering, mark stripping and offsetting.
    pub select: StageDiagnostics,
    /// Inside-first grouping.
    pub group: StageDiagnostics,
    /// Path ordering.
    pub order: StageDiagnostics,
    /// Over-cutting.
    pub over_cut: StageDiagnostics,
    /// Wall-clock duration of the whole run, validation included.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Figures describing the final toolpath.
    pub summary: PlanSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// The [`RegmarkMode`] variant a run used, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegmarkSource {
    /// Detection was switched off.
    Disabled,
    /// Searched, optional.
    Auto,
    /// Searched, mandatory.
    Required,
    /// Supplied by the caller.
    Manual,
}

impl From<&RegmarkMode> for RegmarkSource {
    fn from(mode: &RegmarkMode) -> Self {
        match mode {
            RegmarkMode::Disabled => Self::Disabled,
            RegmarkMode::Auto => Self::Auto,
            RegmarkMode::Required => Self::Required,
            RegmarkMode::Manual(_) => Self::Manual,
        }
    }
}

impl std::fmt::Display for RegmarkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disabled => "disabled",
            Self::Auto => "auto",
            Self::Required => "required",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Registration mark resolution.
    Regmarks {
        /// How the mark was resolved.
        mode: RegmarkSource,
        /// Whether a mark was resolved.
        found: bool,
    },
    /// Outline selection.
    Select {
        /// Outlines supplied.
        input_outlines: usize,
        /// Polylines kept for planning.
        polyline_count: usize,
        /// Points across the kept polylines.
        point_count: usize,
    },
    /// Inside-first grouping.
    Group {
        /// Whether inside-first grouping was applied.
        inside_first: bool,
        /// Number of groups.
        group_count: usize,
        /// Polylines in the largest group.
        largest_group: usize,
    },
    /// Path ordering.
    Order {
        /// Whether paths were reordered and merged.
        fast_order: bool,
        /// Polylines before ordering.
        input_polyline_count: usize,
        /// Paths after ordering (fewer when paths were merged).
        output_path_count: usize,
    },
    /// Over-cutting.
    OverCut {
        /// Distance retraced (mm).
        distance: f64,
        /// Closed paths that were extended.
        closed_path_count: usize,
        /// Points before over-cutting.
        points_before: usize,
        /// Points after over-cutting.
        points_after: usize,
    },
}

/// Figures describing the final toolpath.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Paths in the toolpath.
    pub path_count: usize,
    /// Tool lifts between paths.
    pub pen_lifts: usize,
    /// Total points.
    pub point_count: usize,
    /// Distance with the tool down (mm).
    pub draw_length: f64,
    /// Distance with the tool up, from the start position (mm).
    pub travel_distance: f64,
}

impl PlanDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Planner Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Paths: {}  |  Lifts: {}  |  Points: {}",
            self.summary.path_count, self.summary.pen_lifts, self.summary.point_count,
        ));
        lines.push(format!(
            "Draw: {:.1}mm  |  Travel: {:.1}mm",
            self.summary.draw_length, self.summary.travel_distance,
        ));

        lines.join("\n")
    }

    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Regmarks", &self.regmarks),
            ("Select", &self.select),
            ("Group", &self.group),
            ("Order", &self.order),
            ("Over-cut", &self.over_cut),
        ]
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Regmarks { mode, found } => {
            format!("{mode} ({})", if *found { "found" } else { "none" })
        }
        StageMetrics::Select {
            input_outlines,
            polyline_count,
            point_count,
        } => format!("{input_outlines} outlines -> {polyline_count} polys, {point_count} pts"),
        StageMetrics::Group {
            inside_first,
            group_count,
            largest_group,
        } => {
            if *inside_first {
                format!("inside-first {group_count} groups (largest {largest_group})")
            } else {
                format!("single group of {largest_group}")
            }
        }
        StageMetrics::Order {
            fast_order,
            input_polyline_count,
            output_path_count,
        } => format!(
            "{} {input_polyline_count} -> {output_path_count} paths",
            if *fast_order { "greedy" } else { "native" },
        ),
        StageMetrics::OverCut {
            distance,
            closed_path_count,
            points_before,
            points_after,
        } => format!(
            "d={distance:.2}mm closed={closed_path_count} pts={points_before}->{points_after}"
        ),
    }
}

fn total_points(polylines: &[Polyline]) -> usize {
    polylines.iter().map(Polyline::len).sum()
}

/// Run [`crate::plan`] while recording per-stage diagnostics.
///
/// # Errors
///
/// Fails exactly when [`crate::plan`] would.
pub fn plan_with_diagnostics<C: Clock>(
    outlines: &[Outline],
    config: &PlanConfig,
    clock: &C,
) -> Result<(Toolpath, PlanDiagnostics), PlanError> {
    let run_start = clock.now();
    stages::validate(outlines, config)?;

    let t = clock.now();
    let regmarks = stages::resolve_regmarks(outlines, config)?;
    let regmarks_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Regmarks {
            mode: RegmarkSource::from(&config.regmarks),
            found: regmarks.is_some(),
        },
    };

    let t = clock.now();
    let selected = stages::offset_to_regmarks(
        stages::select_polylines(outlines, config, regmarks.as_ref()),
        regmarks.as_ref(),
    );
    let select_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Select {
            input_outlines: outlines.len(),
            polyline_count: selected.len(),
            point_count: total_points(&selected),
        },
    };

    let input_polyline_count = selected.len();
    let t = clock.now();
    let groups = stages::group(selected, config)?;
    let group_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Group {
            inside_first: config.resolved_inside_first(),
            group_count: groups.len(),
            largest_group: groups.iter().map(Vec::len).max().unwrap_or(0),
        },
    };

    let t = clock.now();
    let ordered = stages::order(&groups, config)?;
    let order_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Order {
            fast_order: config.fast_order,
            input_polyline_count,
            output_path_count: ordered.len(),
        },
    };

    let t = clock.now();
    let paths = stages::extend(&ordered, config);
    let over_cut_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::OverCut {
            distance: config.resolved_over_cut(),
            closed_path_count: ordered.iter().filter(|p| p.is_closed()).count(),
            points_before: total_points(&ordered),
            points_after: total_points(&paths),
        },
    };

    let toolpath = Toolpath {
        paths,
        regmarks,
        mode: config.mode,
    };
    let summary = PlanSummary {
        path_count: toolpath.paths.len(),
        pen_lifts: toolpath.pen_lifts(),
        point_count: toolpath.point_count(),
        draw_length: toolpath.draw_length(),
        travel_distance: toolpath.travel_distance(config.start_position),
    };
    let diagnostics = PlanDiagnostics {
        regmarks: regmarks_diag,
        select: select_diag,
        group: group_diag,
        order: order_diag,
        over_cut: over_cut_diag,
        total_duration: clock.elapsed(&run_start),
        summary,
    };
    Ok((toolpath, diagnostics))
}
