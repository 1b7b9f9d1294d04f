//! Style state tracked per character range.
//!
//! A `Snapshot` pins the id of every per-character style dimension for a
//! range of glyphs within a line. Dimensions whose concrete value has no
//! visual effect at that point are marked *free*, which lets the
//! serializer reuse a deeper ancestor.

use std::rc::Rc;

use crate::color::Color;
use crate::registry::{
    FILL_COLOR_CN, FONT_CN, FONT_SIZE_CN, LETTER_SPACE_CN, STROKE_COLOR_CN, WORD_SPACE_CN,
};
use crate::utils::Matrix;

/// One axis of visual state, tracked independently.
///
/// The first six dimensions participate in the snapshot hash; vertical
/// align is kept apart because its value is relative to whichever
/// ancestor the serializer ends up choosing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleDimension {
    Font = 0,
    FontSize = 1,
    FillColor = 2,
    StrokeColor = 3,
    LetterSpacing = 4,
    WordSpacing = 5,
    VerticalAlign = 6,
}

impl StyleDimension {
    /// Dimensions covered by the snapshot hash.
    pub const HASHED: [StyleDimension; 6] = [
        StyleDimension::Font,
        StyleDimension::FontSize,
        StyleDimension::FillColor,
        StyleDimension::StrokeColor,
        StyleDimension::LetterSpacing,
        StyleDimension::WordSpacing,
    ];

    /// Total number of per-character dimensions.
    pub const COUNT: usize = 7;

    /// Free-mask byte for this dimension.
    #[inline]
    pub fn mask(self) -> u64 {
        0xff << (8 * self as u64)
    }

    /// Single-letter class prefix for this dimension.
    pub fn class_prefix(self) -> &'static str {
        match self {
            StyleDimension::Font => FONT_CN,
            StyleDimension::FontSize => FONT_SIZE_CN,
            StyleDimension::FillColor => FILL_COLOR_CN,
            StyleDimension::StrokeColor => STROKE_COLOR_CN,
            StyleDimension::LetterSpacing => LETTER_SPACE_CN,
            StyleDimension::WordSpacing => WORD_SPACE_CN,
            StyleDimension::VerticalAlign => crate::registry::VERTICAL_ALIGN_CN,
        }
    }
}

/// Already-resolved metrics for one font, supplied by the font
/// collaborator. The id doubles as the font's class id.
#[derive(Debug, Clone, PartialEq)]
pub struct FontInfo {
    pub id: usize,
    /// Design units per em; zero for fonts with no usable metrics.
    pub em_size: f64,
    /// Advance of the space glyph, in design units.
    pub space_width: f64,
    /// Ascent as a fraction of the em.
    pub ascent: f64,
    /// Descent as a fraction of the em (non-positive).
    pub descent: f64,
    /// Correction factor applied to the nominal font size.
    pub font_size_scale: f64,
}

impl FontInfo {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            em_size: 1000.0,
            space_width: 0.0,
            ascent: 0.0,
            descent: 0.0,
            font_size_scale: 1.0,
        }
    }
}

/// Concrete style values in effect at one point of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    pub font_info: Rc<FontInfo>,
    pub font_size: f64,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub letter_space: f64,
    pub word_space: f64,
    /// Baseline rise relative to the previous state.
    pub vertical_align: f64,
}

impl TextState {
    pub fn new(font_info: Rc<FontInfo>) -> Self {
        Self {
            font_info,
            font_size: 0.0,
            fill_color: Color::transparent(),
            stroke_color: Color::transparent(),
            letter_space: 0.0,
            word_space: 0.0,
            vertical_align: 0.0,
        }
    }

    /// The horizontal advance produced by a single `' '` character.
    ///
    /// A zero em-size yields no glyph advance; the caller must not match
    /// offsets against the result in that case.
    pub fn single_space_offset(&self) -> f64 {
        let glyph_advance = if self.font_info.em_size != 0.0 {
            self.font_info.space_width / self.font_info.em_size * self.font_size
        } else {
            0.0
        };
        self.word_space + self.letter_space + glyph_advance
    }

    /// Em size of this state: (ascent - descent) scaled by font size.
    pub fn em_size(&self) -> f64 {
        self.font_size * (self.font_info.ascent - self.font_info.descent)
    }
}

/// Position and orientation of a line: anchor plus the linear part of
/// the text matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct LineState {
    pub x: f64,
    pub y: f64,
    pub transform: Matrix,
}

/// A style snapshot applying from `start_idx` up to the next snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Index of the first glyph using this state.
    pub start_idx: usize,
    /// Concrete values (needed by the optimizer and serializer).
    pub state: TextState,
    /// Registry id per dimension, filled when the line is flushed.
    pub ids: [u32; StyleDimension::COUNT],
    /// Low 8 bits of each hashed dimension id, packed for quick diffs.
    hash: u64,
    /// Byte mask of dimensions whose value is irrelevant here.
    free_mask: u64,
}

impl Snapshot {
    pub fn new(start_idx: usize, state: TextState) -> Self {
        Self {
            start_idx,
            state,
            ids: [0; StyleDimension::COUNT],
            hash: 0,
            free_mask: 0,
        }
    }

    #[inline]
    pub fn is_free(&self, dim: StyleDimension) -> bool {
        self.free_mask & dim.mask() != 0
    }

    #[inline]
    pub fn set_free(&mut self, dim: StyleDimension) {
        self.free_mask |= dim.mask();
    }

    #[inline]
    pub fn clear_free(&mut self, dim: StyleDimension) {
        self.free_mask &= !dim.mask();
    }

    /// Recomputes the packed hash from the current ids.
    ///
    /// Must be called whenever a hashed dimension id changes, or the
    /// quick-reject in [`Snapshot::diff`] may report stale equality.
    pub fn rehash(&mut self) {
        let mut h: u64 = 0;
        for dim in StyleDimension::HASHED {
            h |= ((self.ids[dim as usize] & 0xff) as u64) << (8 * dim as u64);
        }
        self.hash = h;
    }

    /// Counts dimensions that differ and are not free in either state.
    ///
    /// The hash comparison is a quick accept: with more than 256 classes
    /// in one dimension it can collide, which costs optimality but never
    /// well-formedness.
    pub fn diff(&self, other: &Snapshot) -> u32 {
        let common_mask = !(self.free_mask | other.free_mask);
        if (self.hash & common_mask) == (other.hash & common_mask) {
            return 0;
        }

        let mut d = 0;
        for dim in StyleDimension::HASHED {
            if common_mask & dim.mask() != 0 && self.ids[dim as usize] != other.ids[dim as usize] {
                d += 1;
            }
        }
        d
    }
}
