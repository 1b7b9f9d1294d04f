//! Miscellaneous routines: geometry aliases, epsilon arithmetic and
//! HTML escaping helpers shared across the engine.

use std::borrow::Cow;

/// Small epsilon for floating-point comparisons.
pub const EPS: f64 = 1e-6;

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A rectangle defined by (x0, y0, x1, y1) where (x0, y0) is bottom-left
/// and (x1, y1) is top-right.
pub type Rect = (f64, f64, f64, f64);

/// The linear part (a, b, c, d) of a text transformation matrix.
///
/// Translation never participates: the line anchor already carries it,
/// so transform classes only describe rotation/scale/shear.
pub type Matrix = (f64, f64, f64, f64);

/// Identity transformation matrix.
pub const MATRIX_IDENTITY: Matrix = (1.0, 0.0, 0.0, 1.0);

/// Snaps values within [`EPS`] of zero to exactly zero.
#[inline]
pub fn snap_zero(x: f64) -> f64 {
    if x.abs() > EPS { x } else { 0.0 }
}

/// Compares two floats for approximate equality within [`EPS`].
#[inline]
pub fn equal(x: f64, y: f64) -> bool {
    (x - y).abs() <= EPS
}

/// Returns true if x is positive beyond [`EPS`].
#[inline]
pub fn is_positive(x: f64) -> bool {
    x > EPS
}

/// Compares two matrices component-wise within [`EPS`].
#[inline]
pub fn matrix_equal(m1: Matrix, m2: Matrix) -> bool {
    equal(m1.0, m2.0) && equal(m1.1, m2.1) && equal(m1.2, m2.2) && equal(m1.3, m2.3)
}

/// Encodes a string for HTML text content by escaping special characters.
///
/// Returns `Cow::Borrowed` if no escaping is needed (zero allocation).
pub fn enc(x: &str) -> Cow<'_, str> {
    html_escape::encode_text(x)
}

/// Formats a CSS numeric value: near-zero snaps to `0`, otherwise the
/// shortest round-trip decimal representation.
pub fn fmt_css_num(x: f64) -> String {
    let v = snap_zero(x);
    if v == 0.0 {
        // avoid "-0"
        "0".to_string()
    } else {
        format!("{}", v)
    }
}
