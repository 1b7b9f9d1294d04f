//! Spacing optimization pre-pass.
//!
//! Some PDF producers implement letter spacing and word spacing as an
//! explicit position shift between every pair of glyphs. Folding the
//! modal shift of a styled range into the range's letter-spacing (and,
//! when possible, expressing word breaks through word-spacing) removes
//! most of the explicit positioning elements the serializer would
//! otherwise emit.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::line::{Line, Offset};
use crate::params::Param;
use crate::registry::StyleRegistries;
use crate::state::StyleDimension;
use crate::utils::{EPS, equal, is_positive};

/// Rewrites a flushed line's offsets and spacing dimensions in place.
/// Glyph content and snapshot start indices are never touched.
#[derive(Debug)]
pub struct SpacingOptimizer<'a> {
    param: &'a Param,
}

impl<'a> SpacingOptimizer<'a> {
    pub fn new(param: &'a Param) -> Self {
        Self { param }
    }

    pub fn optimize(&self, line: &mut Line, registries: &mut StyleRegistries) {
        let mut new_offsets: Vec<Offset> = Vec::with_capacity(line.offsets.len());
        // offset width histogram for the current range, ε-bucketed
        let mut width_map: BTreeMap<OrderedFloat<f64>, usize> = BTreeMap::new();

        let mut off1 = 0;
        for si in 0..line.snapshots.len() {
            let text_idx1 = line.snapshots[si].start_idx;
            let text_idx2 = line.snapshot_end(si);
            let text_count = text_idx2 - text_idx1;

            // offsets anchored at or before the range start belong to no
            // range and pass through untouched
            while off1 < line.offsets.len() && line.offsets[off1].start_idx <= text_idx1 {
                new_offsets.push(line.offsets[off1]);
                off1 += 1;
            }

            let mut off2 = off1;
            while off2 < line.offsets.len() && line.offsets[off2].start_idx <= text_idx2 {
                off2 += 1;
            }
            let mut offset_count = off2 - off1;

            // how much letter_space changed; feeds the word-space step
            let mut letter_space_diff = 0.0;
            width_map.clear();

            if offset_count > 0 {
                // implicit bucket: characters not followed by an offset
                if text_count > offset_count {
                    width_map.insert(OrderedFloat(0.0), text_count - offset_count);
                }
                for off in &line.offsets[off1..off2] {
                    bucket_insert(&mut width_map, off.width);
                }

                let (most_used_width, max_count) = mode_of(&width_map);

                let snap = &mut line.snapshots[si];
                if max_count <= text_count / 2
                    || !is_positive(snap.state.letter_space + most_used_width)
                {
                    // folding would not pay off, or would drive letter
                    // spacing non-positive; keep the original offsets
                    new_offsets.extend_from_slice(&line.offsets[off1..off2]);
                } else {
                    let old_ls = snap.state.letter_space;
                    let (id, canonical) =
                        registries.letter_space.install(old_ls + most_used_width);
                    snap.ids[StyleDimension::LetterSpacing as usize] = id as u32;
                    snap.state.letter_space = canonical;
                    letter_space_diff = old_ls - canonical;
                    debug!(
                        range = si,
                        fold = most_used_width,
                        "folded offsets into letter spacing"
                    );

                    // rebuild the range's offsets with the fold subtracted
                    let mut oi = off1;
                    offset_count = 0;
                    for cur in text_idx1..text_idx2 {
                        let w = if oi < off2 && line.offsets[oi].start_idx == cur + 1 {
                            oi += 1;
                            line.offsets[oi - 1].width + letter_space_diff
                        } else {
                            letter_space_diff
                        };
                        if !equal(w, 0.0) {
                            new_offsets.push(Offset {
                                start_idx: cur + 1,
                                width: w,
                            });
                            offset_count += 1;
                        }
                    }
                }
            }

            // Word spacing can only be repurposed when the range contains
            // no literal space whose advance it would also change.
            if !line.glyphs[text_idx1..text_idx2]
                .iter()
                .any(|g| g.is_space())
            {
                let snap = &mut line.snapshots[si];
                if offset_count > 0 {
                    let threshold = snap.state.em_size() * self.param.space_threshold;
                    // post-fold modal offset wide enough to be a word break
                    let mut most_used: Option<f64> = None;
                    let mut max_count = 0usize;
                    for (w, count) in &width_map {
                        let fixed = w.0 + letter_space_diff;
                        if fixed >= threshold - EPS && *count > max_count {
                            max_count = *count;
                            most_used = Some(fixed);
                        }
                    }
                    if let Some(width) = most_used {
                        snap.state.word_space = 0.0;
                        let new_word_space = width - snap.state.single_space_offset();
                        let (id, canonical) = registries.word_space.install(new_word_space);
                        snap.ids[StyleDimension::WordSpacing as usize] = id as u32;
                        snap.state.word_space = canonical;
                        snap.clear_free(StyleDimension::WordSpacing);
                    }
                } else {
                    // no offsets at all: the value is irrelevant, leave it
                    // unconstrained to maximize ancestor reuse
                    snap.set_free(StyleDimension::WordSpacing);
                }
            }

            line.snapshots[si].rehash();
            off1 = off2;
        }

        // trailing offsets past the last range
        new_offsets.extend_from_slice(&line.offsets[off1..]);
        line.offsets = new_offsets;
    }
}

/// Inserts a width into the histogram, merging with a bucket within EPS.
fn bucket_insert(map: &mut BTreeMap<OrderedFloat<f64>, usize>, width: f64) {
    if let Some((&k, _)) = map.range(OrderedFloat(width - EPS)..).next()
        && (k.0 - width).abs() <= EPS
    {
        *map.get_mut(&k).unwrap() += 1;
        return;
    }
    map.insert(OrderedFloat(width), 1);
}

/// Most frequent bucket; ties resolve to the smaller width.
fn mode_of(map: &BTreeMap<OrderedFloat<f64>, usize>) -> (f64, usize) {
    let mut best = (0.0, 0);
    for (w, count) in map {
        if *count > best.1 {
            best = (w.0, *count);
        }
    }
    best
}
