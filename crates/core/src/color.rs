//! RGB color with an explicit transparent flag.

use std::fmt;

/// A device RGB color as used by fill/stroke style dimensions.
///
/// Colors are discrete values: two colors are equal only when their
/// byte components match exactly (or both are transparent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub transparent: bool,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Creates an opaque RGB color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            transparent: false,
            r,
            g,
            b,
        }
    }

    /// Creates the transparent color.
    pub fn transparent() -> Self {
        Self {
            transparent: true,
            r: 0,
            g: 0,
            b: 0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::transparent()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.transparent {
            write!(f, "transparent")
        } else {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        }
    }
}
