//! One line of text: glyphs, mid-line offsets and style snapshots.
//!
//! The rendering engine pushes events into a [`LineAccumulator`] in
//! document order; `flush` freezes the buffers into an immutable
//! [`Line`] ready for optimization and serialization.

use smallvec::SmallVec;
use tracing::warn;

use crate::registry::StyleRegistries;
use crate::state::{LineState, Snapshot, StyleDimension, TextState};
use crate::utils::MATRIX_IDENTITY;

/// One logical character of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Glyph {
    /// A single Unicode scalar.
    Char(char),
    /// A decomposed multi-scalar sequence, e.g. an expanded ligature.
    Composed(SmallVec<[char; 4]>),
    /// A zero-width placeholder; offsets never anchor inside a padding run.
    Padding,
}

impl Glyph {
    pub fn is_padding(&self) -> bool {
        matches!(self, Glyph::Padding)
    }

    pub fn is_space(&self) -> bool {
        matches!(self, Glyph::Char(' '))
    }

    /// Appends the glyph's scalars to a string buffer.
    pub fn push_to(&self, buf: &mut String) {
        match self {
            Glyph::Char(c) => buf.push(*c),
            Glyph::Composed(cs) => buf.extend(cs.iter()),
            Glyph::Padding => {}
        }
    }
}

/// A signed horizontal displacement anchored right before `start_idx`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    pub start_idx: usize,
    pub width: f64,
}

/// A frozen line, never mutated after `flush`.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub state: LineState,
    pub glyphs: Vec<Glyph>,
    pub snapshots: Vec<Snapshot>,
    pub offsets: Vec<Offset>,
    /// Highest baseline-relative extent over all snapshots; becomes the
    /// height of the line container.
    pub ascent: f64,
    /// Lowest baseline-relative extent over all snapshots.
    pub descent: f64,
}

/// Accumulates one line's events; reusable across lines.
#[derive(Debug)]
pub struct LineAccumulator {
    state: LineState,
    glyphs: Vec<Glyph>,
    snapshots: Vec<Snapshot>,
    offsets: Vec<Offset>,
    width: f64,
}

impl Default for LineAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self {
            state: LineState {
                x: 0.0,
                y: 0.0,
                transform: MATRIX_IDENTITY,
            },
            glyphs: Vec::new(),
            snapshots: Vec::new(),
            offsets: Vec::new(),
            width: 0.0,
        }
    }

    /// Starts a new line at the given anchor, clearing all buffers.
    pub fn open(&mut self, state: LineState) {
        self.state = state;
        self.glyphs.clear();
        self.snapshots.clear();
        self.offsets.clear();
        self.width = 0.0;
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Accumulated glyph advance plus offsets, in px.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Appends one logical character (one or more scalars) advancing by
    /// `width` px.
    pub fn append_char(&mut self, scalars: &[char], width: f64) {
        match scalars {
            [] => {}
            [c] => self.glyphs.push(Glyph::Char(*c)),
            _ => self
                .glyphs
                .push(Glyph::Composed(SmallVec::from_slice(scalars))),
        }
        self.width += width;
    }

    /// Appends a zero-width padding placeholder.
    pub fn append_padding(&mut self) {
        self.glyphs.push(Glyph::Padding);
    }

    /// Records a horizontal displacement not explained by glyph advance.
    ///
    /// The anchor is pulled back past any trailing padding so the offset
    /// sits immediately after the last real character; otherwise the
    /// spacing optimizer may misread offsets at a line start as word
    /// spacing. Consecutive offsets at one anchor are summed.
    pub fn append_offset(&mut self, width: f64) {
        let mut idx = self.glyphs.len();
        while idx > 0 && self.glyphs[idx - 1].is_padding() {
            idx -= 1;
        }
        match self.offsets.last_mut() {
            Some(last) if last.start_idx == idx => last.width += width,
            _ => self.offsets.push(Offset {
                start_idx: idx,
                width,
            }),
        }
        self.width += width;
    }

    /// Records a style state change taking effect at the current text
    /// position. A pending snapshot covering zero characters is
    /// overwritten in place.
    pub fn append_state(&mut self, state: &TextState) {
        let idx = self.glyphs.len();
        let mut state = state.clone();
        state.font_size *= state.font_info.font_size_scale;
        match self.snapshots.last_mut() {
            Some(last) if last.start_idx == idx => {
                last.state = state;
            }
            _ => self.snapshots.push(Snapshot::new(idx, state)),
        }
    }

    /// Freezes the accumulated buffers into a [`Line`], resetting the
    /// accumulator for the next line.
    ///
    /// Installs the style ids for every snapshot and derives the line's
    /// ascent/descent extremes. Returns `None` for an empty line, or if
    /// the first retained snapshot does not start at index 0 (the text
    /// would have undefined styling, so it is dropped instead).
    pub fn flush(&mut self, registries: &mut StyleRegistries) -> Option<Line> {
        // unused trailing states
        while self
            .snapshots
            .last()
            .is_some_and(|s| s.start_idx >= self.glyphs.len())
        {
            self.snapshots.pop();
        }

        if self.glyphs.is_empty() {
            self.reset();
            return None;
        }

        if self.snapshots.first().is_none_or(|s| s.start_idx != 0) {
            warn!("text without a style state; dropping line");
            self.reset();
            return None;
        }

        let mut ascent: f64 = 0.0;
        let mut descent: f64 = 0.0;
        let mut accum_vertical_align = 0.0;
        for snap in &mut self.snapshots {
            snap.ids[StyleDimension::Font as usize] = snap.state.font_info.id as u32;
            snap.ids[StyleDimension::FontSize as usize] =
                registries.font_size.install(snap.state.font_size).0 as u32;
            snap.ids[StyleDimension::FillColor as usize] =
                registries.fill_color.install(snap.state.fill_color) as u32;
            snap.ids[StyleDimension::StrokeColor as usize] =
                registries.stroke_color.install(snap.state.stroke_color) as u32;
            snap.ids[StyleDimension::LetterSpacing as usize] =
                registries.letter_space.install(snap.state.letter_space).0 as u32;
            snap.ids[StyleDimension::WordSpacing as usize] =
                registries.word_space.install(snap.state.word_space).0 as u32;
            snap.rehash();

            accum_vertical_align += snap.state.vertical_align;
            let cur_ascent =
                accum_vertical_align + snap.state.font_info.ascent * snap.state.font_size;
            let cur_descent =
                accum_vertical_align + snap.state.font_info.descent * snap.state.font_size;
            ascent = ascent.max(cur_ascent);
            descent = descent.min(cur_descent);
        }

        let line = Line {
            state: self.state.clone(),
            glyphs: std::mem::take(&mut self.glyphs),
            snapshots: std::mem::take(&mut self.snapshots),
            offsets: std::mem::take(&mut self.offsets),
            ascent,
            descent,
        };
        self.reset();
        Some(line)
    }

    fn reset(&mut self) {
        self.glyphs.clear();
        self.snapshots.clear();
        self.offsets.clear();
        self.width = 0.0;
    }
}

impl Line {
    /// End index (exclusive) of the glyph range covered by snapshot `i`.
    pub fn snapshot_end(&self, i: usize) -> usize {
        self.snapshots
            .get(i + 1)
            .map_or(self.glyphs.len(), |s| s.start_idx)
    }
}
