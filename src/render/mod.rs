//! # Rendering Module
//!
//! Composites text layers onto a template.
//!
//! ## Pipeline
//!
//! ```text
//! Template ──► RGBA canvas ──► brightness/contrast ──► for each layer:
//!                                                       resolve text
//!                                                       resolve font
//!                                                       lay out + position
//!                                                       paint
//!          ──► encode (PNG / JPEG)
//! ```
//!
//! ## Modules
//!
//! - [`adjust`]: global brightness/contrast
//! - [`fonts`]: font discovery and face cache
//! - [`text`]: line layout and glyph painting
//!
//! ## Example
//!
//! ```no_run
//! use laurel::layer::LayerStack;
//! use laurel::render::{FontBook, Renderer};
//! use laurel::template::Template;
//!
//! let fonts = FontBook::system();
//! let template = Template::open("template.png")?;
//! let layers = LayerStack::with_defaults();
//!
//! let renderer = Renderer::new(&fonts);
//! let canvas = renderer.render(&template, layers.as_slice(), "Ada Lovelace")?;
//! assert_eq!(canvas.dimensions(), template.dimensions());
//! # Ok::<(), laurel::LaurelError>(())
//! ```

pub mod adjust;
pub mod fonts;
pub mod text;

pub use fonts::FontBook;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::codec::{self, EncodeOptions};
use crate::error::LaurelError;
use crate::layer::Layer;
use crate::template::Template;

use text::LineLayout;

/// Passes that shrink an over-wide line before giving up.
const FIT_PASSES: usize = 4;

/// Global adjustments applied to the template before any text is painted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// -100..=100
    pub brightness: i32,
    /// -100..=100
    pub contrast: i32,
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), LaurelError> {
        for (name, value) in [("brightness", self.brightness), ("contrast", self.contrast)] {
            if !(-100..=100).contains(&value) {
                return Err(LaurelError::Validation(format!(
                    "{} must be within -100..=100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Where a layer's text lands on the canvas.
#[derive(Debug, Clone)]
pub struct PlacedLine {
    /// Text as painted (after recipient substitution and case folding).
    pub text: String,
    /// Font size actually used, after any shrink-to-fit.
    pub font_size: f32,
    pub start_x: f32,
    pub baseline_y: f32,
    /// Total advance width.
    pub width: f32,
    layout: LineLayout,
    font: ab_glyph::FontArc,
}

impl PlacedLine {
    /// Horizontal midpoint of the advance box.
    pub fn center_x(&self) -> f32 {
        self.start_x + self.width / 2.0
    }

    /// Vertical middle of the line box.
    pub fn middle_y(&self) -> f32 {
        self.baseline_y - (self.layout.ascent + self.layout.descent) / 2.0
    }
}

/// Composites layers onto templates using faces from a [`FontBook`].
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    fonts: &'a FontBook,
    options: RenderOptions,
}

impl<'a> Renderer<'a> {
    pub fn new(fonts: &'a FontBook) -> Self {
        Self {
            fonts,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(fonts: &'a FontBook, options: RenderOptions) -> Self {
        Self { fonts, options }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Render one certificate: template, adjustments, then every layer in order.
    ///
    /// Every layer whose kind is recipient receives `recipient`; all other
    /// layers paint their literal text.
    pub fn render(
        &self,
        template: &Template,
        layers: &[Layer],
        recipient: &str,
    ) -> Result<RgbaImage, LaurelError> {
        self.options.validate()?;

        let mut canvas = template.image().clone();
        adjust::brightness_contrast(&mut canvas, self.options.brightness, self.options.contrast);

        let dimensions = canvas.dimensions();
        for layer in layers {
            let Some(line) = self.place(layer, recipient, dimensions)? else {
                continue;
            };
            text::paint_line(
                &mut canvas,
                &line.font,
                &line.layout,
                line.start_x,
                line.baseline_y,
                layer.color,
                layer.opacity,
            );
        }

        Ok(canvas)
    }

    /// Render and encode.
    pub fn render_encoded(
        &self,
        template: &Template,
        layers: &[Layer],
        recipient: &str,
        encode: &EncodeOptions,
    ) -> Result<Vec<u8>, LaurelError> {
        let canvas = self.render(template, layers, recipient)?;
        codec::encode(&canvas, encode)
    }

    /// Lay out and position one layer on a canvas of `(width, height)`.
    ///
    /// Returns `None` for layers with nothing to paint (empty text or zero
    /// opacity), without touching the font book.
    pub fn place(
        &self,
        layer: &Layer,
        recipient: &str,
        (width, height): (u32, u32),
    ) -> Result<Option<PlacedLine>, LaurelError> {
        layer.validate()?;

        let text = layer.resolve_text(recipient);
        if text.trim().is_empty() || layer.opacity <= 0.0 {
            return Ok(None);
        }

        let font = self.fonts.resolve(&layer.family, layer.weight, layer.style)?;

        let mut font_size = layer.font_size;
        let mut layout = text::layout_line(&font, &text, font_size, layer.letter_spacing);

        if let Some(fraction) = layer.max_width {
            let limit = fraction * width as f32;
            for _ in 0..FIT_PASSES {
                if layout.width <= limit || layout.width <= 0.0 {
                    break;
                }
                font_size *= limit / layout.width;
                layout = text::layout_line(&font, &text, font_size, layer.letter_spacing);
            }
        }

        let (anchor_x, anchor_y) = layer.position.to_pixels(width, height);
        let start_x = text::line_start(layer.align, anchor_x, layout.width);
        let baseline_y = text::middle_baseline(anchor_y, layout.ascent, layout.descent);

        tracing::trace!(
            layer = %layer.name,
            text = %text,
            font_size,
            start_x,
            baseline_y,
            "placed layer"
        );

        Ok(Some(PlacedLine {
            text,
            font_size,
            start_x,
            baseline_y,
            width: layout.width,
            layout,
            font,
        }))
    }
}
