//! Tests for nested-element serialization: ancestor reuse, whitespace
//! elements, literal space substitution and the negative-offset barrier.

use std::rc::Rc;

use textweave_core::utils::MATRIX_IDENTITY;
use textweave_core::{
    Color, FontInfo, Glyph, Line, LineAccumulator, LineState, NestingSerializer, Offset, Param,
    SpacingOptimizer, Snapshot, StyleDimension, StyleRegistries, TextState,
};

fn font() -> Rc<FontInfo> {
    Rc::new(FontInfo {
        id: 0,
        em_size: 1000.0,
        space_width: 500.0,
        ascent: 0.8,
        descent: -0.2,
        font_size_scale: 1.0,
    })
}

fn black_state(font: &Rc<FontInfo>, size: f64) -> TextState {
    TextState {
        font_info: font.clone(),
        font_size: size,
        fill_color: Color::rgb(0, 0, 0),
        stroke_color: Color::transparent(),
        letter_space: 0.0,
        word_space: 0.0,
        vertical_align: 0.0,
    }
}

fn line_at(x: f64, y: f64) -> LineState {
    LineState {
        x,
        y,
        transform: MATRIX_IDENTITY,
    }
}

/// Installs the hashed dimension ids for a hand-built snapshot the same
/// way a line flush would.
fn install_ids(snap: &mut Snapshot, regs: &mut StyleRegistries) {
    let st = snap.state.clone();
    snap.ids[StyleDimension::Font as usize] = st.font_info.id as u32;
    snap.ids[StyleDimension::FontSize as usize] = regs.font_size.install(st.font_size).0 as u32;
    snap.ids[StyleDimension::FillColor as usize] = regs.fill_color.install(st.fill_color) as u32;
    snap.ids[StyleDimension::StrokeColor as usize] =
        regs.stroke_color.install(st.stroke_color) as u32;
    snap.ids[StyleDimension::LetterSpacing as usize] =
        regs.letter_space.install(st.letter_space).0 as u32;
    snap.ids[StyleDimension::WordSpacing as usize] =
        regs.word_space.install(st.word_space).0 as u32;
    snap.rehash();
}

fn render(line: &Line, param: &Param, regs: &mut StyleRegistries) -> String {
    let mut out = String::new();
    NestingSerializer::new(param).serialize(line, (0.0, 0.0), regs, &mut out);
    out
}

/// Accumulates, flushes and optimizes a simple multi-state line.
fn build_line(
    regs: &mut StyleRegistries,
    param: &Param,
    parts: &[(&TextState, &str)],
) -> Line {
    let mut acc = LineAccumulator::new();
    acc.open(line_at(0.0, 0.0));
    for (state, text) in parts {
        acc.append_state(state);
        for c in text.chars() {
            acc.append_char(&[c], 5.0);
        }
    }
    let mut line = acc.flush(regs).unwrap();
    SpacingOptimizer::new(param).optimize(&mut line, regs);
    line
}

// ============================================================================
// Basic structure
// ============================================================================

#[test]
fn test_single_state_line_has_no_spans() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let state = black_state(&font(), 12.0);
    let line = build_line(&mut regs, &param, &[(&state, "Hi")]);
    let out = render(&line, &param, &mut regs);

    // word-spacing is free, so only the five pinned dimensions appear
    assert_eq!(out, "<div class=\"l t0 L0 h0 B0 f0 s0 c0 C0 l0\">Hi</div>");
}

#[test]
fn test_text_is_html_escaped() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let state = black_state(&font(), 12.0);
    let line = build_line(&mut regs, &param, &[(&state, "a<b&c")]);
    let out = render(&line, &param, &mut regs);

    assert!(out.contains(">a&lt;b&amp;c</div>"));
}

#[test]
fn test_composed_glyph_and_padding() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let state = black_state(&font(), 12.0);
    let mut acc = LineAccumulator::new();
    acc.open(line_at(0.0, 0.0));
    acc.append_state(&state);
    acc.append_char(&['f', 'i'], 6.0);
    acc.append_padding();
    acc.append_char(&['n'], 5.0);
    let mut line = acc.flush(&mut regs).unwrap();
    SpacingOptimizer::new(&param).optimize(&mut line, &mut regs);
    let out = render(&line, &param, &mut regs);

    assert!(out.contains(">fin</div>"));
}

#[test]
fn test_serializing_twice_is_identical() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let a = black_state(&font(), 12.0);
    let mut b = black_state(&font(), 12.0);
    b.fill_color = Color::rgb(255, 0, 0);
    let line = build_line(&mut regs, &param, &[(&a, "x"), (&b, "y")]);

    let first = render(&line, &param, &mut regs);
    let second = render(&line, &param, &mut regs);
    assert_eq!(first, second);
}

// ============================================================================
// Ancestor reuse
// ============================================================================

#[test]
fn test_single_dimension_change_opens_one_span() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let a = black_state(&font(), 12.0);
    let mut b = black_state(&font(), 12.0);
    b.fill_color = Color::rgb(255, 0, 0);
    let line = build_line(&mut regs, &param, &[(&a, "a"), (&b, "b")]);
    let out = render(&line, &param, &mut regs);

    assert_eq!(out.matches("<span").count(), 1);
    assert!(out.contains("a<span class=\"c1\">b</span></div>"));
}

#[test]
fn test_identical_state_continues_without_span() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let a = black_state(&font(), 12.0);
    let b = black_state(&font(), 12.0);
    let line = build_line(&mut regs, &param, &[(&a, "a"), (&b, "b")]);
    let out = render(&line, &param, &mut regs);

    assert!(!out.contains("<span"));
    assert!(out.contains(">ab</div>"));
}

#[test]
fn test_reverted_state_closes_back_to_ancestor() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let a = black_state(&font(), 12.0);
    let mut b = black_state(&font(), 12.0);
    b.fill_color = Color::rgb(255, 0, 0);
    let c = black_state(&font(), 12.0);
    let line = build_line(&mut regs, &param, &[(&a, "a"), (&b, "b"), (&c, "c")]);
    let out = render(&line, &param, &mut regs);

    // c matches the line root, so the red span is closed instead of nested
    assert!(out.contains("a<span class=\"c1\">b</span>c</div>"));
}

#[test]
fn test_vertical_align_opens_span() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let a = black_state(&font(), 12.0);
    let mut b = black_state(&font(), 12.0);
    b.vertical_align = 3.0;
    let line = build_line(&mut regs, &param, &[(&a, "a"), (&b, "b")]);
    let out = render(&line, &param, &mut regs);

    assert!(out.contains("a<span class=\"v1\">b</span></div>"));
}

#[test]
fn test_first_snapshot_vertical_align_not_on_line_div() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let mut state = black_state(&font(), 12.0);
    state.vertical_align = 3.0;
    let line = build_line(&mut regs, &param, &[(&state, "x")]);
    let out = render(&line, &param, &mut regs);

    // vertical-align is meaningless on the block-level line container
    assert_eq!(out, "<div class=\"l t0 L0 h0 B0 f0 s0 c0 C0 l0\">x</div>");
}

#[test]
fn test_negative_offset_blocks_ancestor_reuse() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let f = font();
    let a = black_state(&f, 12.0);
    let mut b = black_state(&f, 12.0);
    b.fill_color = Color::rgb(255, 0, 0);
    let c = black_state(&f, 12.0);

    let mut acc = LineAccumulator::new();
    acc.open(line_at(0.0, 0.0));
    acc.append_state(&a);
    acc.append_char(&['a'], 5.0);
    acc.append_offset(-3.0);
    acc.append_state(&b);
    acc.append_char(&['b'], 5.0);
    acc.append_state(&c);
    acc.append_char(&['c'], 5.0);
    let mut line = acc.flush(&mut regs).unwrap();
    SpacingOptimizer::new(&param).optimize(&mut line, &mut regs);
    let out = render(&line, &param, &mut regs);

    // closing the red span would cancel the negative margin, so the
    // reverted state nests inside it instead
    assert!(out.contains("<span class=\"c1\">b<span class=\"c0\">c</span></span></div>"));
}

// ============================================================================
// Offsets and whitespace elements
// ============================================================================

#[test]
fn test_offset_within_h_eps_is_dropped() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let mut acc = LineAccumulator::new();
    acc.open(line_at(0.0, 0.0));
    acc.append_state(&black_state(&font(), 12.0));
    acc.append_char(&['a'], 5.0);
    acc.append_offset(1.0);
    acc.append_char(&['b'], 5.0);
    let line = acc.flush(&mut regs).unwrap();
    let out = render(&line, &param, &mut regs);

    assert!(out.contains(">ab</div>"));
    assert!(!out.contains("<span"));
}

#[test]
fn test_small_gap_emits_empty_whitespace_span() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let mut acc = LineAccumulator::new();
    acc.open(line_at(0.0, 0.0));
    acc.append_state(&black_state(&font(), 12.0));
    acc.append_char(&['a'], 5.0);
    acc.append_offset(1.2);
    acc.append_char(&['b'], 5.0);
    let line = acc.flush(&mut regs).unwrap();
    let out = render(&line, &param, &mut regs);

    // 1.2px is under the em_size/8 word gap threshold: no inner space
    assert!(out.contains("a<span class=\"_ _0\"></span>b"));
}

#[test]
fn test_wide_gap_contains_breakable_space() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let mut acc = LineAccumulator::new();
    acc.open(line_at(0.0, 0.0));
    acc.append_state(&black_state(&font(), 12.0));
    acc.append_char(&['a'], 5.0);
    acc.append_offset(9.0);
    acc.append_char(&['b'], 5.0);
    let line = acc.flush(&mut regs).unwrap();
    let out = render(&line, &param, &mut regs);

    assert!(out.contains("a<span class=\"_ _0\"> </span>b"));
}

#[test]
fn test_rounding_carry_reuses_whitespace_class() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let mut acc = LineAccumulator::new();
    acc.open(line_at(0.0, 0.0));
    acc.append_state(&black_state(&font(), 12.0));
    acc.append_char(&['a'], 5.0);
    acc.append_offset(1.4);
    acc.append_char(&['b'], 5.0);
    acc.append_offset(1.45);
    acc.append_char(&['c'], 5.0);
    let line = acc.flush(&mut regs).unwrap();
    let out = render(&line, &param, &mut regs);

    // 1.45 resolves to the canonical 1.4 class; the 0.05px error is
    // carried, not lost
    assert_eq!(regs.whitespace.len(), 1);
    assert_eq!(out.matches("_0\"></span>").count(), 2);
}

// ============================================================================
// Literal space substitution
// ============================================================================

#[test]
fn test_offset_matching_space_advance_becomes_space() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let state = black_state(&font(), 12.0);
    // space advance: 500/1000 * 12 = 6px
    let mut snap = Snapshot::new(0, state.clone());
    install_ids(&mut snap, &mut regs);
    snap.set_free(StyleDimension::WordSpacing);
    snap.rehash();
    let line = Line {
        state: line_at(0.0, 0.0),
        glyphs: vec![Glyph::Char('a'), Glyph::Char('b')],
        snapshots: vec![snap],
        offsets: vec![Offset {
            start_idx: 1,
            width: 6.0,
        }],
        ascent: 9.6,
        descent: -2.4,
    };
    let out = render(&line, &param, &mut regs);

    assert!(out.contains(">a b</div>"));
    assert!(!out.contains("<span"));
    assert!(regs.whitespace.is_empty());
}

#[test]
fn test_substitution_tolerates_h_eps() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let state = black_state(&font(), 12.0);
    let mut snap = Snapshot::new(0, state);
    install_ids(&mut snap, &mut regs);
    let line = Line {
        state: line_at(0.0, 0.0),
        glyphs: vec![Glyph::Char('a'), Glyph::Char('b')],
        snapshots: vec![snap],
        offsets: vec![Offset {
            start_idx: 1,
            width: 6.8,
        }],
        ascent: 9.6,
        descent: -2.4,
    };
    let out = render(&line, &param, &mut regs);

    assert!(out.contains(">a b</div>"));
}

#[test]
fn test_freed_word_space_is_ignored_for_substitution() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let mut state = black_state(&font(), 12.0);
    state.word_space = 3.0;
    let mut acc = LineAccumulator::new();
    acc.open(line_at(0.0, 0.0));
    acc.append_state(&state);
    // a 9px indent happens to equal word_space + space advance, but the
    // freed dimension emits no class, so a space would only advance 6px
    acc.append_offset(9.0);
    acc.append_char(&['a'], 5.0);
    acc.append_char(&['b'], 5.0);
    let mut line = acc.flush(&mut regs).unwrap();
    SpacingOptimizer::new(&param).optimize(&mut line, &mut regs);
    assert!(line.snapshots[0].is_free(StyleDimension::WordSpacing));

    let out = render(&line, &param, &mut regs);
    assert!(out.contains("<span class=\"_ _0\"> </span>ab</div>"));
    assert!(!out.contains("\"> ab"));
    assert_eq!(regs.whitespace.len(), 1);
}

#[test]
fn test_freed_word_space_substitutes_at_zero_advance() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let mut state = black_state(&font(), 12.0);
    state.word_space = 3.0;
    let mut acc = LineAccumulator::new();
    acc.open(line_at(0.0, 0.0));
    acc.append_state(&state);
    // 6px matches the bare glyph advance, which is what a space really
    // moves when no word-spacing class applies
    acc.append_offset(6.0);
    acc.append_char(&['a'], 5.0);
    acc.append_char(&['b'], 5.0);
    let mut line = acc.flush(&mut regs).unwrap();
    SpacingOptimizer::new(&param).optimize(&mut line, &mut regs);

    let out = render(&line, &param, &mut regs);
    assert!(out.contains("\"> ab</div>"));
    assert!(regs.whitespace.is_empty());
}

#[test]
fn test_no_substitution_without_font_metrics() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let f = Rc::new(FontInfo {
        id: 0,
        em_size: 0.0,
        space_width: 0.0,
        ascent: 0.8,
        descent: -0.2,
        font_size_scale: 1.0,
    });
    let state = black_state(&f, 12.0);
    let mut snap = Snapshot::new(0, state);
    install_ids(&mut snap, &mut regs);
    let line = Line {
        state: line_at(0.0, 0.0),
        glyphs: vec![Glyph::Char('a'), Glyph::Char('b')],
        snapshots: vec![snap],
        offsets: vec![Offset {
            start_idx: 1,
            width: 6.0,
        }],
        ascent: 9.6,
        descent: -2.4,
    };
    let out = render(&line, &param, &mut regs);

    // a zero em-size font cannot render a space of known width
    assert!(out.contains("a<span class=\"_ _0\">"));
}

// ============================================================================
// Clip origin rebasing
// ============================================================================

#[test]
fn test_anchor_rebased_to_clip_origin() {
    let param = Param::default();
    let mut regs = StyleRegistries::new(&param);
    let state = black_state(&font(), 12.0);
    let mut acc = LineAccumulator::new();
    acc.open(line_at(150.0, 130.0));
    acc.append_state(&state);
    acc.append_char(&['x'], 5.0);
    let line = acc.flush(&mut regs).unwrap();

    let mut out = String::new();
    NestingSerializer::new(&param).serialize(&line, (100.0, 100.0), &mut regs, &mut out);
    let mut css = Vec::new();
    regs.dump_css(&mut css).unwrap();
    let css = String::from_utf8(css).unwrap();

    assert!(css.contains("left:50px;"));
    assert!(css.contains("bottom:30px;"));
}
