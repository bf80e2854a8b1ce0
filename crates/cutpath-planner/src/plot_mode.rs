//! Guessing the [`PlotMode`] from a document's layer names.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::PlotMode;

#[allow(clippy::expect_used)]
static CUT_LAYER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcut(s|ting|out)?|\bedges?").expect("valid cut regex"));

#[allow(clippy::expect_used)]
static PLOT_LAYER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bplo?ts?").expect("valid plot regex"));

impl PlotMode {
    /// Guess the mode from layer names such as `"Cut"` or `"Plot lines"`.
    ///
    /// Returns `None` when no name suggests either mode, or when names
    /// suggest both.
    ///
    /// # Examples
    ///
    /// ```
    /// use cutpath_planner::PlotMode;
    ///
    /// assert_eq!(PlotMode::guess(["Layer 1", "Edges"]), Some(PlotMode::Cut));
    /// assert_eq!(PlotMode::guess(["Plot", "Cut"]), None);
    /// ```
    pub fn guess<I>(layer_names: I) -> Option<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let (mut cut, mut plot) = (false, false);
        for name in layer_names {
            let name = name.as_ref();
            cut |= CUT_LAYER.is_match(name);
            plot |= PLOT_LAYER.is_match(name);
        }
        match (cut, plot) {
            (true, false) => Some(Self::Cut),
            (false, true) => Some(Self::Plot),
            _ => None,
        }
    }
}
