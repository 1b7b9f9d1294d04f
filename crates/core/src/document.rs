//! Document-level façade over the compression pipeline.
//!
//! The external rendering engine drives an [`HtmlDocument`] through the
//! narrow [`RenderingEventSink`] interface in strict document order:
//! open line, interleaved text/offset/state events, close line. The
//! document owns the per-document style registries, so style classes
//! are shared and deduplicated across all pages.

use std::io::Write;

use crate::error::{Result, WeaveError};
use crate::page::HtmlTextPage;
use crate::params::Param;
use crate::registry::StyleRegistries;
use crate::state::{LineState, TextState};
use crate::utils::Rect;

/// Push interface the rendering engine drives, in increasing
/// text-position order. Violating monotonic ordering is undefined
/// behavior upstream; the engine assumes it.
pub trait RenderingEventSink {
    /// Declares the clip rectangle for subsequent lines.
    fn set_clip(&mut self, rect: Rect);
    /// Starts a new text line at the given anchor/transform.
    fn open_line(&mut self, state: LineState);
    /// Appends one logical character advancing by `width` px.
    fn append_char(&mut self, scalars: &[char], width: f64);
    /// Appends a zero-width padding placeholder.
    fn append_padding(&mut self);
    /// Appends a horizontal displacement in px.
    fn append_offset(&mut self, width: f64);
    /// Applies a style state change at the current position.
    fn set_state(&mut self, state: &TextState);
    /// Ends the current line.
    fn close_line(&mut self);
}

/// Owns the registries and the page being assembled.
pub struct HtmlDocument {
    param: Param,
    registries: StyleRegistries,
    page: Option<HtmlTextPage>,
}

impl HtmlDocument {
    pub fn new(param: Param) -> Self {
        let registries = StyleRegistries::new(&param);
        Self {
            param,
            registries,
            page: None,
        }
    }

    pub fn param(&self) -> &Param {
        &self.param
    }

    pub fn registries(&self) -> &StyleRegistries {
        &self.registries
    }

    /// Begins a new page. Any page still open is discarded.
    pub fn begin_page(&mut self, page_box: Rect) {
        self.page = Some(HtmlTextPage::new(self.param.clone(), page_box));
    }

    /// Finishes the current page, writing its text markup.
    pub fn end_page(&mut self, out: &mut impl Write) -> Result<()> {
        let mut page = self.page.take().ok_or(WeaveError::NoOpenPage)?;
        page.dump_text(&mut self.registries, out)
    }

    /// Writes every style class rule installed so far.
    pub fn dump_css(&self, out: &mut impl Write) -> Result<()> {
        self.registries.dump_css(out)
    }
}

impl RenderingEventSink for HtmlDocument {
    fn set_clip(&mut self, rect: Rect) {
        if let Some(page) = self.page.as_mut() {
            page.set_clip(rect, &mut self.registries);
        }
    }

    fn open_line(&mut self, state: LineState) {
        if let Some(page) = self.page.as_mut() {
            page.open_line(state, &mut self.registries);
        }
    }

    fn append_char(&mut self, scalars: &[char], width: f64) {
        if let Some(line) = self.page.as_mut().and_then(|p| p.current_line()) {
            line.append_char(scalars, width);
        }
    }

    fn append_padding(&mut self) {
        if let Some(line) = self.page.as_mut().and_then(|p| p.current_line()) {
            line.append_padding();
        }
    }

    fn append_offset(&mut self, width: f64) {
        if let Some(line) = self.page.as_mut().and_then(|p| p.current_line()) {
            line.append_offset(width);
        }
    }

    fn set_state(&mut self, state: &TextState) {
        if let Some(line) = self.page.as_mut().and_then(|p| p.current_line()) {
            line.append_state(state);
        }
    }

    fn close_line(&mut self) {
        if let Some(page) = self.page.as_mut() {
            page.close_line(&mut self.registries);
        }
    }
}
