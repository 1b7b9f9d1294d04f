//! Reusable CSS class registries.
//!
//! Every continuous or discrete style value (font size, colors, spacing,
//! transform matrices, line geometry) is deduplicated into a dense
//! integer id per dimension. The class rule for an id is formatted
//! exactly once, at first insertion, and buffered until the stylesheet
//! is dumped. Ids are append-only and never renumbered.

use std::collections::BTreeMap;
use std::io::Write;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use crate::color::Color;
use crate::error::Result;
use crate::params::Param;
use crate::utils::{EPS, Matrix, fmt_css_num, matrix_equal};

// Single-letter class prefixes; the full class name is prefix + hex id.
pub const LINE_CN: &str = "l";
pub const TRANSFORM_CN: &str = "t";
pub const FONT_CN: &str = "f";
pub const FONT_SIZE_CN: &str = "s";
pub const FILL_COLOR_CN: &str = "c";
pub const STROKE_COLOR_CN: &str = "C";
pub const LETTER_SPACE_CN: &str = "l";
pub const WORD_SPACE_CN: &str = "w";
pub const VERTICAL_ALIGN_CN: &str = "v";
pub const WHITESPACE_CN: &str = "_";
pub const LEFT_CN: &str = "L";
pub const HEIGHT_CN: &str = "h";
pub const BOTTOM_CN: &str = "B";
pub const WIDTH_CN: &str = "W";
pub const CLIP_CN: &str = "g";

/// The CSS property a scalar registry renders its values as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarProperty {
    FontSize,
    LetterSpacing,
    WordSpacing,
    VerticalAlign,
    /// Positive values render as a fixed width, negative values as a
    /// negative left margin.
    Whitespace,
    Width,
    Left,
    Bottom,
    Height,
}

impl ScalarProperty {
    fn css_body(self, value: f64) -> String {
        let v = fmt_css_num(value);
        match self {
            ScalarProperty::FontSize => format!("font-size:{v}px;"),
            ScalarProperty::LetterSpacing => format!("letter-spacing:{v}px;"),
            ScalarProperty::WordSpacing => format!("word-spacing:{v}px;"),
            ScalarProperty::VerticalAlign => format!("vertical-align:{v}px;"),
            ScalarProperty::Whitespace => {
                if value > 0.0 {
                    format!("width:{v}px;")
                } else {
                    format!("margin-left:{v}px;")
                }
            }
            ScalarProperty::Width => format!("width:{v}px;"),
            ScalarProperty::Left => format!("left:{v}px;"),
            ScalarProperty::Bottom => format!("bottom:{v}px;"),
            ScalarProperty::Height => format!("height:{v}px;"),
        }
    }
}

/// Registry for a continuous (f64-valued) style dimension.
///
/// Values within `eps` of an installed value are treated as identical
/// and resolve to the earlier id and its canonical stored value.
#[derive(Debug)]
pub struct ScalarRegistry {
    prefix: &'static str,
    property: ScalarProperty,
    eps: f64,
    value_map: BTreeMap<OrderedFloat<f64>, usize>,
    rules: String,
}

impl ScalarRegistry {
    pub fn new(prefix: &'static str, property: ScalarProperty, eps: f64) -> Self {
        Self {
            prefix,
            property,
            eps,
            value_map: BTreeMap::new(),
            rules: String::new(),
        }
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Number of distinct values installed so far.
    pub fn len(&self) -> usize {
        self.value_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value_map.is_empty()
    }

    /// Installs a value, returning its id and the canonical stored value.
    ///
    /// Output must always use the canonical value, not the caller's raw
    /// one, or rounding drift accumulates across reused classes.
    pub fn install(&mut self, value: f64) -> (usize, f64) {
        // exact lookup first: NaN compares unequal to everything under
        // the epsilon test but must still resolve to a stable id
        if let Some((k, &id)) = self.value_map.get_key_value(&OrderedFloat(value)) {
            return (id, k.0);
        }
        if let Some((k, &id)) = self.value_map.range(OrderedFloat(value - self.eps)..).next()
            && (k.0 - value).abs() <= self.eps
        {
            return (id, k.0);
        }

        let id = self.value_map.len();
        self.value_map.insert(OrderedFloat(value), id);
        let body = self.property.css_body(value);
        self.rules
            .push_str(&format!(".{}{:x}{{{}}}\n", self.prefix, id, body));
        (id, value)
    }

    /// Writes the buffered class rules to the stylesheet sink.
    pub fn dump_css(&self, out: &mut impl Write) -> Result<()> {
        out.write_all(self.rules.as_bytes())?;
        Ok(())
    }
}

/// Registry for a discrete color dimension (exact equality, no epsilon).
#[derive(Debug)]
pub struct ColorRegistry {
    prefix: &'static str,
    stroke: bool,
    value_map: FxHashMap<Color, usize>,
    rules: String,
}

impl ColorRegistry {
    pub fn new(prefix: &'static str, stroke: bool) -> Self {
        Self {
            prefix,
            stroke,
            value_map: FxHashMap::default(),
            rules: String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.value_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value_map.is_empty()
    }

    pub fn install(&mut self, color: Color) -> usize {
        if let Some(&id) = self.value_map.get(&color) {
            return id;
        }
        let id = self.value_map.len();
        self.value_map.insert(color, id);
        let body = if self.stroke {
            // rendered as a text outline; 0.015em is a reasonable default
            // stroke width in the absence of the real graphics state
            if color.transparent {
                "text-shadow:none;".to_string()
            } else {
                format!(
                    "text-shadow:-0.015em 0 {c},0 0.015em {c},0.015em 0 {c},0 -0.015em {c};",
                    c = color
                )
            }
        } else {
            format!("color:{color};")
        };
        self.rules
            .push_str(&format!(".{}{:x}{{{}}}\n", self.prefix, id, body));
        id
    }

    pub fn dump_css(&self, out: &mut impl Write) -> Result<()> {
        out.write_all(self.rules.as_bytes())?;
        Ok(())
    }
}

/// Registry for line-level transform matrices.
///
/// Only the linear components are compared; translation lives in the
/// line anchor. NaN or otherwise degenerate matrices fall back to exact
/// key equality and simply occupy their own id.
#[derive(Debug, Default)]
pub struct MatrixRegistry {
    value_map: BTreeMap<[OrderedFloat<f64>; 4], usize>,
    rules: String,
}

impl MatrixRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.value_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value_map.is_empty()
    }

    pub fn install(&mut self, m: Matrix) -> usize {
        let key = [
            OrderedFloat(m.0),
            OrderedFloat(m.1),
            OrderedFloat(m.2),
            OrderedFloat(m.3),
        ];
        // exact lookup first so NaN components cannot defeat the
        // epsilon comparison below
        if let Some(&id) = self.value_map.get(&key) {
            return id;
        }
        if let Some((k, &id)) = self.value_map.range(key..).next()
            && matrix_equal(m, (k[0].0, k[1].0, k[2].0, k[3].0))
        {
            return id;
        }

        let id = self.value_map.len();
        self.value_map.insert(key, id);
        let body = if matrix_equal(m, crate::utils::MATRIX_IDENTITY) {
            "transform:none;".to_string()
        } else {
            // flip the signs of b and c: PDF device space is y-up,
            // CSS is y-down
            format!(
                "transform:matrix({},{},{},{},0,0);",
                fmt_css_num(m.0),
                fmt_css_num(-m.1),
                fmt_css_num(-m.2),
                fmt_css_num(m.3)
            )
        };
        self.rules
            .push_str(&format!(".{}{:x}{{{}}}\n", TRANSFORM_CN, id, body));
        id
    }

    pub fn dump_css(&self, out: &mut impl Write) -> Result<()> {
        out.write_all(self.rules.as_bytes())?;
        Ok(())
    }
}

/// All per-document registries, one per style or geometry dimension.
#[derive(Debug)]
pub struct StyleRegistries {
    pub font_size: ScalarRegistry,
    pub letter_space: ScalarRegistry,
    pub word_space: ScalarRegistry,
    pub vertical_align: ScalarRegistry,
    pub whitespace: ScalarRegistry,
    pub width: ScalarRegistry,
    pub left: ScalarRegistry,
    pub bottom: ScalarRegistry,
    pub height: ScalarRegistry,
    pub fill_color: ColorRegistry,
    pub stroke_color: ColorRegistry,
    pub transform: MatrixRegistry,
}

impl StyleRegistries {
    pub fn new(param: &Param) -> Self {
        Self {
            font_size: ScalarRegistry::new(FONT_SIZE_CN, ScalarProperty::FontSize, EPS),
            letter_space: ScalarRegistry::new(LETTER_SPACE_CN, ScalarProperty::LetterSpacing, EPS),
            word_space: ScalarRegistry::new(WORD_SPACE_CN, ScalarProperty::WordSpacing, EPS),
            vertical_align: ScalarRegistry::new(
                VERTICAL_ALIGN_CN,
                ScalarProperty::VerticalAlign,
                param.v_eps,
            ),
            whitespace: ScalarRegistry::new(WHITESPACE_CN, ScalarProperty::Whitespace, param.h_eps),
            width: ScalarRegistry::new(WIDTH_CN, ScalarProperty::Width, param.h_eps),
            left: ScalarRegistry::new(LEFT_CN, ScalarProperty::Left, param.h_eps),
            bottom: ScalarRegistry::new(BOTTOM_CN, ScalarProperty::Bottom, param.v_eps),
            height: ScalarRegistry::new(HEIGHT_CN, ScalarProperty::Height, param.v_eps),
            fill_color: ColorRegistry::new(FILL_COLOR_CN, false),
            stroke_color: ColorRegistry::new(STROKE_COLOR_CN, true),
            transform: MatrixRegistry::new(),
        }
    }

    /// Writes every buffered class rule, grouped by dimension.
    pub fn dump_css(&self, out: &mut impl Write) -> Result<()> {
        self.transform.dump_css(out)?;
        self.vertical_align.dump_css(out)?;
        self.stroke_color.dump_css(out)?;
        self.letter_space.dump_css(out)?;
        self.whitespace.dump_css(out)?;
        self.word_space.dump_css(out)?;
        self.fill_color.dump_css(out)?;
        self.font_size.dump_css(out)?;
        self.bottom.dump_css(out)?;
        self.height.dump_css(out)?;
        self.width.dump_css(out)?;
        self.left.dump_css(out)?;
        Ok(())
    }
}
