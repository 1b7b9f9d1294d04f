//! Page assembly: serialized lines grouped by clip rectangle.
//!
//! Lines under the trivial whole-page clip are emitted bare; a maximal
//! consecutive run of lines sharing one non-trivial clip rectangle is
//! wrapped in a single bounding element, with each contained line's
//! anchor rebased to the rectangle's origin.

use std::io::Write;

use crate::error::Result;
use crate::line::LineAccumulator;
use crate::params::Param;
use crate::registry::{BOTTOM_CN, CLIP_CN, HEIGHT_CN, LEFT_CN, StyleRegistries, WIDTH_CN};
use crate::serialize::NestingSerializer;
use crate::spacing::SpacingOptimizer;
use crate::state::LineState;
use crate::utils::{EPS, Point, Rect};

/// A clip rectangle covering a half-open range of lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRegion {
    pub rect: Rect,
    /// Index of the first line assigned to this region.
    pub start_line: usize,
}

/// One already-serialized line plus the region it belongs to.
#[derive(Debug)]
struct SerializedLine {
    markup: String,
    region: usize,
}

/// Assembles one page of serialized text lines.
pub struct HtmlTextPage {
    param: Param,
    page_box: Rect,
    accumulator: LineAccumulator,
    line_open: bool,
    lines: Vec<SerializedLine>,
    clips: Vec<ClipRegion>,
}

impl HtmlTextPage {
    pub fn new(param: Param, page_box: Rect) -> Self {
        Self {
            param,
            page_box,
            accumulator: LineAccumulator::new(),
            line_open: false,
            lines: Vec::new(),
            clips: vec![ClipRegion {
                rect: page_box,
                start_line: 0,
            }],
        }
    }

    pub fn page_box(&self) -> Rect {
        self.page_box
    }

    /// Number of serialized lines so far.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn clips(&self) -> &[ClipRegion] {
        &self.clips
    }

    /// Declares the clip rectangle for subsequently opened lines.
    ///
    /// A region nobody has used yet is replaced rather than kept, so
    /// consecutive clip changes without intervening text collapse into
    /// one region. Re-declaring the current rectangle is a no-op.
    pub fn set_clip(&mut self, rect: Rect, registries: &mut StyleRegistries) {
        if self.line_open {
            self.close_line(registries);
        }
        if let Some(last) = self.clips.last_mut() {
            if last.start_line == self.lines.len() {
                last.rect = rect;
                return;
            }
            if rect_equal(last.rect, rect) {
                return;
            }
        }
        self.clips.push(ClipRegion {
            rect,
            start_line: self.lines.len(),
        });
    }

    /// Opens a new line at the given anchor, closing any pending one.
    pub fn open_line(&mut self, state: LineState, registries: &mut StyleRegistries) {
        if self.line_open {
            self.close_line(registries);
        }
        self.accumulator.open(state);
        self.line_open = true;
    }

    /// The accumulator for the currently open line, if any.
    pub fn current_line(&mut self) -> Option<&mut LineAccumulator> {
        self.line_open.then_some(&mut self.accumulator)
    }

    /// Freezes, optimizes and serializes the pending line.
    pub fn close_line(&mut self, registries: &mut StyleRegistries) {
        if !self.line_open {
            return;
        }
        self.line_open = false;
        let Some(mut line) = self.accumulator.flush(registries) else {
            return;
        };
        if self.param.optimize_text {
            SpacingOptimizer::new(&self.param).optimize(&mut line, registries);
        }
        let region = self.clips.len() - 1;
        let mut markup = String::new();
        NestingSerializer::new(&self.param).serialize(
            &line,
            self.clip_origin(region),
            registries,
            &mut markup,
        );
        self.lines.push(SerializedLine { markup, region });
    }

    /// Writes the page's text markup, wrapping clipped line runs.
    pub fn dump_text(
        &mut self,
        registries: &mut StyleRegistries,
        out: &mut impl Write,
    ) -> Result<()> {
        self.close_line(registries);

        let mut open_region: Option<usize> = None;
        for line in &self.lines {
            if open_region != Some(line.region) {
                if open_region.is_some_and(|r| !self.is_trivial(r)) {
                    out.write_all(b"</div>")?;
                }
                if !self.is_trivial(line.region) {
                    let rect = self.clips[line.region].rect;
                    let (left_id, _) = registries.left.install(rect.0 - self.page_box.0);
                    let (bottom_id, _) = registries.bottom.install(rect.1 - self.page_box.1);
                    let (width_id, _) = registries.width.install(rect.2 - rect.0);
                    let (height_id, _) = registries.height.install(rect.3 - rect.1);
                    write!(
                        out,
                        "<div class=\"{CLIP_CN} {LEFT_CN}{left_id:x} {BOTTOM_CN}{bottom_id:x} \
                         {WIDTH_CN}{width_id:x} {HEIGHT_CN}{height_id:x}\">",
                    )?;
                }
                open_region = Some(line.region);
            }
            out.write_all(line.markup.as_bytes())?;
        }
        if open_region.is_some_and(|r| !self.is_trivial(r)) {
            out.write_all(b"</div>")?;
        }
        Ok(())
    }

    /// Origin line anchors are rebased to for the given region.
    fn clip_origin(&self, region: usize) -> Point {
        if self.is_trivial(region) {
            (self.page_box.0, self.page_box.1)
        } else {
            let rect = self.clips[region].rect;
            (rect.0, rect.1)
        }
    }

    /// A region covering the whole page box needs no wrapper.
    fn is_trivial(&self, region: usize) -> bool {
        let rect = self.clips[region].rect;
        rect.0 <= self.page_box.0 + EPS
            && rect.1 <= self.page_box.1 + EPS
            && rect.2 >= self.page_box.2 - EPS
            && rect.3 >= self.page_box.3 - EPS
    }
}

fn rect_equal(a: Rect, b: Rect) -> bool {
    crate::utils::equal(a.0, b.0)
        && crate::utils::equal(a.1, b.1)
        && crate::utils::equal(a.2, b.2)
        && crate::utils::equal(a.3, b.3)
}
