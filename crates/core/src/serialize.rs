//! Nested-element serialization of a line.
//!
//! Walks the line's style snapshots in order and emits a minimal nested
//! `<span>` tree inside the line's `<div>`, choosing for each snapshot
//! the open ancestor with the fewest differing non-free dimensions.
//! Finding the true minimum-cost tree is NP-hard; the greedy
//! closest-ancestor diff is near-optimal on real documents and linear in
//! the stack depth.

use std::fmt::Write;

use crate::line::Line;
use crate::params::Param;
use crate::registry::{
    BOTTOM_CN, HEIGHT_CN, LEFT_CN, LINE_CN, StyleRegistries, TRANSFORM_CN, WHITESPACE_CN,
};
use crate::state::{Snapshot, StyleDimension};
use crate::utils::{EPS, Point, enc, equal, is_positive};

/// Serializes frozen, optimized lines into markup.
#[derive(Debug)]
pub struct NestingSerializer<'a> {
    param: &'a Param,
}

/// An open element on the serializer stack.
struct OpenElement {
    /// Index into the working snapshot vector.
    snap: usize,
    /// False when the snapshot was a pure continuation of its parent and
    /// no tag was actually emitted.
    need_close: bool,
}

impl<'a> NestingSerializer<'a> {
    pub fn new(param: &'a Param) -> Self {
        Self { param }
    }

    /// Appends the line's markup to `out`.
    ///
    /// `clip_origin` is the origin the line's anchor is rebased to (the
    /// enclosing clip rectangle's corner, or the page origin). The line
    /// itself is not mutated; serializing the same line twice produces
    /// identical output.
    pub fn serialize(
        &self,
        line: &Line,
        clip_origin: Point,
        registries: &mut StyleRegistries,
        out: &mut String,
    ) {
        if line.glyphs.is_empty() {
            return;
        }

        // the ancestor search rewrites vertical aligns and free bits as
        // it inherits values, so work on a copy of the snapshots
        let mut snaps = line.snapshots.clone();

        let tm_id = registries.transform.install(line.state.transform);
        let (left_id, _) = registries.left.install(line.state.x - clip_origin.0);
        let (height_id, _) = registries.height.install(line.ascent);
        let (bottom_id, _) = registries.bottom.install(line.state.y - clip_origin.1);
        let _ = write!(
            out,
            "<div class=\"{LINE_CN} {TRANSFORM_CN}{tm_id:x} {LEFT_CN}{left_id:x} \
             {HEIGHT_CN}{height_id:x} {BOTTOM_CN}{bottom_id:x}",
        );
        // the class attribute stays open; the first snapshot appends its
        // own classes and closes it

        let mut stack: Vec<OpenElement> = Vec::new();
        // rounding error carried between consecutive offsets
        let mut dx = 0.0;
        // popping past this anchor would cancel an emitted negative margin
        let mut last_negative_offset_anchor = 0usize;
        let mut cur_text_idx = 0usize;
        let mut cur_off = 0usize;

        for si in 0..snaps.len() {
            // pick the closest ancestor, popping deeper elements
            let mut vertical_align = snaps[si].state.vertical_align;
            let mut best_cost = StyleDimension::HASHED.len() as u32 + 1;
            let mut depth = stack.len();
            while depth > 0 {
                let cand = stack[depth - 1].snap;
                let mut cost = snaps[si].diff(&snaps[cand]);
                if !equal(vertical_align, 0.0) {
                    cost += 1;
                }
                if cost < best_cost {
                    while stack.len() > depth {
                        close_element(stack.pop().unwrap(), out);
                    }
                    best_cost = cost;
                    snaps[si].state.vertical_align = vertical_align;
                    if best_cost == 0 {
                        break;
                    }
                }
                // never search past an ancestor whose range begins at or
                // before the last negative offset
                if snaps[cand].start_idx <= last_negative_offset_anchor {
                    break;
                }
                vertical_align += snaps[cand].state.vertical_align;
                depth -= 1;
            }

            let (va_id, _) = registries
                .vertical_align
                .install(snaps[si].state.vertical_align);
            snaps[si].ids[StyleDimension::VerticalAlign as usize] = va_id as u32;

            let parent = stack.last().map(|e| e.snap);
            let need_close = open_element(&mut snaps, si, parent, out);
            stack.push(OpenElement {
                snap: si,
                need_close,
            });

            // emit glyphs and offsets covered by this snapshot
            let text_idx2 = line.snapshot_end(si);
            loop {
                if cur_off < line.offsets.len() && line.offsets[cur_off].start_idx <= cur_text_idx {
                    if line.offsets[cur_off].start_idx > text_idx2 {
                        break;
                    }
                    let target = line.offsets[cur_off].width + dx;
                    let mut actual = 0.0;

                    if target.abs() > self.param.h_eps {
                        let mut done = false;
                        // an offset matching a single space advance is
                        // cheaper (and copy/paste-faithful) as a literal ' '
                        if snaps[si].state.font_info.em_size != 0.0 {
                            // a free word-spacing emits no class on this
                            // element, so the value actually in effect is 0
                            let ws_free = snaps[si].is_free(StyleDimension::WordSpacing);
                            let mut space_off = snaps[si].state.single_space_offset();
                            if ws_free {
                                space_off -= snaps[si].state.word_space;
                            }
                            if (target - space_off).abs() <= self.param.h_eps {
                                out.push(' ');
                                actual = space_off;
                                if ws_free {
                                    // the space's advance now depends on
                                    // word-spacing staying at zero
                                    let (id, canonical) = registries.word_space.install(0.0);
                                    snaps[si].ids[StyleDimension::WordSpacing as usize] =
                                        id as u32;
                                    snaps[si].state.word_space = canonical;
                                    snaps[si].clear_free(StyleDimension::WordSpacing);
                                    snaps[si].rehash();
                                }
                                done = true;
                            }
                        }

                        if !done {
                            let (wid, canonical) = registries.whitespace.install(target);
                            actual = canonical;
                            if !equal(actual, 0.0) {
                                if is_positive(-actual) {
                                    last_negative_offset_anchor = cur_text_idx;
                                }
                                let threshold =
                                    snaps[si].state.em_size() * self.param.space_threshold;
                                let _ = write!(
                                    out,
                                    "<span class=\"{WHITESPACE_CN} {WHITESPACE_CN}{wid:x}\">{}</span>",
                                    if target > threshold - EPS { " " } else { "" },
                                );
                            }
                        }
                    }
                    dx = target - actual;
                    cur_off += 1;
                } else {
                    if cur_text_idx >= text_idx2 {
                        break;
                    }
                    let mut next_text_idx = text_idx2;
                    if cur_off < line.offsets.len()
                        && line.offsets[cur_off].start_idx < next_text_idx
                    {
                        next_text_idx = line.offsets[cur_off].start_idx;
                    }
                    emit_glyphs(line, cur_text_idx, next_text_idx, out);
                    cur_text_idx = next_text_idx;
                }
            }
        }

        while let Some(open) = stack.pop() {
            close_element(open, out);
        }
        out.push_str("</div>");
    }
}

/// Emits the open tag for snapshot `si` as a child of `parent`,
/// inheriting ancestor values for locally free dimensions. Returns
/// whether a tag was actually written.
fn open_element(
    snaps: &mut [Snapshot],
    si: usize,
    parent: Option<usize>,
    out: &mut String,
) -> bool {
    let Some(pi) = parent else {
        // first snapshot: its classes go onto the still-open line <div>
        let snap = &snaps[si];
        for dim in StyleDimension::HASHED {
            if snap.is_free(dim) {
                continue;
            }
            let _ = write!(
                out,
                " {}{:x}",
                dim.class_prefix(),
                snap.ids[dim as usize]
            );
        }
        // vertical-align has no effect on the block-level line element,
        // so the first snapshot never emits it
        out.push_str("\">");
        return false;
    };

    let mut first = true;
    let mut inherited = false;
    for dim in StyleDimension::HASHED {
        if snaps[si].is_free(dim) {
            if snaps[pi].is_free(dim) {
                continue;
            }
            // inherit the ancestor's concrete value so later diffs
            // against this node compare real ids
            let parent_id = snaps[pi].ids[dim as usize];
            snaps[si].ids[dim as usize] = parent_id;
            snaps[si].clear_free(dim);
            inherit_value(snaps, si, pi, dim);
            inherited = true;
        }

        if !snaps[pi].is_free(dim) && snaps[pi].ids[dim as usize] == snaps[si].ids[dim as usize] {
            continue;
        }

        if first {
            out.push_str("<span class=\"");
            first = false;
        } else {
            out.push(' ');
        }
        let _ = write!(
            out,
            "{}{:x}",
            dim.class_prefix(),
            snaps[si].ids[dim as usize]
        );
    }
    if inherited {
        snaps[si].rehash();
    }

    if !equal(snaps[si].state.vertical_align, 0.0) {
        if first {
            out.push_str("<span class=\"");
            first = false;
        } else {
            out.push(' ');
        }
        let _ = write!(
            out,
            "{}{:x}",
            StyleDimension::VerticalAlign.class_prefix(),
            snaps[si].ids[StyleDimension::VerticalAlign as usize]
        );
    }

    if first {
        // nothing differs: pure continuation of the ancestor
        false
    } else {
        out.push_str("\">");
        true
    }
}

fn inherit_value(snaps: &mut [Snapshot], si: usize, pi: usize, dim: StyleDimension) {
    let parent_state = snaps[pi].state.clone();
    let state = &mut snaps[si].state;
    match dim {
        StyleDimension::Font => state.font_info = parent_state.font_info,
        StyleDimension::FontSize => state.font_size = parent_state.font_size,
        StyleDimension::FillColor => state.fill_color = parent_state.fill_color,
        StyleDimension::StrokeColor => state.stroke_color = parent_state.stroke_color,
        StyleDimension::LetterSpacing => state.letter_space = parent_state.letter_space,
        StyleDimension::WordSpacing => state.word_space = parent_state.word_space,
        StyleDimension::VerticalAlign => {}
    }
}

fn close_element(open: OpenElement, out: &mut String) {
    if open.need_close {
        out.push_str("</span>");
    }
}

fn emit_glyphs(line: &Line, begin: usize, end: usize, out: &mut String) {
    let mut buf = String::new();
    for glyph in &line.glyphs[begin..end] {
        glyph.push_to(&mut buf);
    }
    out.push_str(&enc(&buf));
}
