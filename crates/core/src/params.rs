//! Engine parameters.
//!
//! Contains the `Param` struct controlling spacing tolerances and the
//! text optimization pass.

/// Parameters for the layout compression engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Maximum horizontal offset (in px) treated as zero when emitting
    /// positioning elements, and the tolerance used when matching an
    /// offset against a single space advance.
    pub h_eps: f64,

    /// Vertical tolerance (in px) for merging baseline shifts and line
    /// geometry values.
    pub v_eps: f64,

    /// An offset wider than `em_size * space_threshold` is considered a
    /// word break.
    pub space_threshold: f64,

    /// Whether the spacing optimization pass runs before serialization.
    pub optimize_text: bool,
}

impl Default for Param {
    fn default() -> Self {
        Self {
            h_eps: 1.0,
            v_eps: 1.0,
            space_threshold: 0.125,
            optimize_text: true,
        }
    }
}
