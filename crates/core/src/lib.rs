//! textweave - a text layout compression engine.
//!
//! Converts a page-rendering instruction stream (glyph draws, position
//! shifts and style changes, as produced by a PDF rendering engine) into
//! compact, visually faithful HTML: nested text containers whose styling
//! is expressed through a minimal set of deduplicated, reusable CSS
//! classes.

pub mod color;
pub mod document;
pub mod error;
pub mod line;
pub mod page;
pub mod params;
pub mod registry;
pub mod serialize;
pub mod spacing;
pub mod state;
pub mod utils;

pub use color::Color;
pub use document::{HtmlDocument, RenderingEventSink};
pub use error::{Result, WeaveError};
pub use line::{Glyph, Line, LineAccumulator, Offset};
pub use page::{ClipRegion, HtmlTextPage};
pub use params::Param;
pub use registry::StyleRegistries;
pub use serialize::NestingSerializer;
pub use spacing::SpacingOptimizer;
pub use state::{FontInfo, LineState, Snapshot, StyleDimension, TextState};
