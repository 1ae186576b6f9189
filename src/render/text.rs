//! Single-line text layout and painting with `ab_glyph`.
//!
//! Layout produces glyph positions relative to the line's start and its
//! total advance width. Painting rasterizes the glyphs into a coverage mask
//! (clamped at 1.0 so overlapping glyphs never double-darken) and then
//! composites the mask onto the canvas in one pass.

use ab_glyph::{Font, FontArc, GlyphId, OutlinedGlyph, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};

use crate::layer::{Alignment, Color};

/// A glyph placed on the line, `x` relative to the line start.
#[derive(Debug, Clone, Copy)]
pub struct LineGlyph {
    pub id: GlyphId,
    pub x: f32,
}

/// Laid-out line of text.
#[derive(Debug, Clone)]
pub struct LineLayout {
    pub glyphs: Vec<LineGlyph>,
    /// Total advance width in pixels.
    pub width: f32,
    pub scale: PxScale,
    /// Distance from baseline to the top of the line box (positive).
    pub ascent: f32,
    /// Distance from baseline to the bottom of the line box (negative).
    pub descent: f32,
}

/// Convert a CSS-style font size (pixels per em) to an `ab_glyph` scale,
/// which measures the full ascent-to-descent height instead.
pub fn em_to_scale(font: &FontArc, px_per_em: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(px_per_em * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(px_per_em),
    }
}

/// Lay out `text` on one line.
///
/// With zero `letter_spacing`, kerning pairs from the font are applied. With
/// non-zero spacing every character advances by its own advance plus the
/// spacing, with spacing only between characters (n-1 gaps).
pub fn layout_line(font: &FontArc, text: &str, px_per_em: f32, letter_spacing: f32) -> LineLayout {
    let scale = em_to_scale(font, px_per_em);
    let scaled = font.as_scaled(scale);
    let manual = letter_spacing != 0.0;

    let mut glyphs = Vec::with_capacity(text.len());
    let mut caret = 0.0f32;
    let mut previous: Option<GlyphId> = None;

    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = previous {
            if manual {
                caret += letter_spacing;
            } else {
                caret += scaled.kern(prev, id);
            }
        }
        glyphs.push(LineGlyph { id, x: caret });
        caret += scaled.h_advance(id);
        previous = Some(id);
    }

    LineLayout {
        glyphs,
        width: caret,
        scale,
        ascent: scaled.ascent(),
        descent: scaled.descent(),
    }
}

/// Left edge of a line of `width` anchored at `anchor_x`.
pub fn line_start(align: Alignment, anchor_x: f32, width: f32) -> f32 {
    match align {
        Alignment::Left => anchor_x,
        Alignment::Center => anchor_x - width / 2.0,
        Alignment::Right => anchor_x - width,
    }
}

/// Baseline that puts the middle of the line box on `anchor_y`.
pub fn middle_baseline(anchor_y: f32, ascent: f32, descent: f32) -> f32 {
    anchor_y + (ascent + descent) / 2.0
}

/// Paint a laid-out line with its left edge at `start_x` and baseline at `baseline_y`.
///
/// `opacity` multiplies the color's own alpha.
pub fn paint_line(
    canvas: &mut RgbaImage,
    font: &FontArc,
    layout: &LineLayout,
    start_x: f32,
    baseline_y: f32,
    color: Color,
    opacity: f32,
) {
    let outlines: Vec<OutlinedGlyph> = layout
        .glyphs
        .iter()
        .filter_map(|g| {
            let glyph = g
                .id
                .with_scale_and_position(layout.scale, point(start_x + g.x, baseline_y));
            font.outline_glyph(glyph)
        })
        .collect();

    if outlines.is_empty() {
        return;
    }

    // Union of glyph bounds, clipped to the canvas.
    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for outlined in &outlines {
        let b = outlined.px_bounds();
        min_x = min_x.min(b.min.x.floor() as i32);
        min_y = min_y.min(b.min.y.floor() as i32);
        max_x = max_x.max(b.max.x.ceil() as i32);
        max_y = max_y.max(b.max.y.ceil() as i32);
    }
    let min_x = min_x.max(0);
    let min_y = min_y.max(0);
    let max_x = max_x.min(canvas.width() as i32);
    let max_y = max_y.min(canvas.height() as i32);
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let mask_w = (max_x - min_x) as usize;
    let mask_h = (max_y - min_y) as usize;
    let mut mask = vec![0.0f32; mask_w * mask_h];

    for outlined in &outlines {
        let bounds = outlined.px_bounds();
        outlined.draw(|px, py, coverage| {
            let x = px as i32 + bounds.min.x as i32;
            let y = py as i32 + bounds.min.y as i32;
            if x >= min_x && x < max_x && y >= min_y && y < max_y {
                let idx = (y - min_y) as usize * mask_w + (x - min_x) as usize;
                mask[idx] = (mask[idx] + coverage).min(1.0);
            }
        });
    }

    let alpha_scale = opacity.clamp(0.0, 1.0) * (color.a as f32 / 255.0);
    if alpha_scale <= 0.0 {
        return;
    }

    for my in 0..mask_h {
        for mx in 0..mask_w {
            let coverage = mask[my * mask_w + mx];
            if coverage <= 0.0 {
                continue;
            }
            let x = min_x as u32 + mx as u32;
            let y = min_y as u32 + my as u32;
            let dst = canvas.get_pixel_mut(x, y);
            *dst = blend_over(*dst, color, coverage * alpha_scale);
        }
    }
}

/// Source-over composite of `color` at `alpha` onto `dst`.
fn blend_over(dst: Rgba<u8>, color: Color, alpha: f32) -> Rgba<u8> {
    let src_a = alpha.clamp(0.0, 1.0);
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |src: u8, dst: u8| {
        let v = (src as f32 * src_a + dst as f32 * dst_a * (1.0 - src_a)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(color.r, dst[0]),
        channel(color.g, dst[1]),
        channel(color.b, dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
