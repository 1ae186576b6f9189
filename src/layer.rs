//! Text layer model.
//!
//! A [`Layer`] is a positioned, styled piece of text painted onto the
//! template. Positions are normalized to `[0, 1]` on both axes so one layer
//! set works for any template resolution. Layers live in a [`LayerStack`]
//! and are painted in stack order (first layer at the bottom).
//!
//! All types derive `Serialize + Deserialize` (camelCase) so the same layer
//! set can be loaded from a JSON file by the CLI or posted to the server.

use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::LaurelError;

/// Stable layer identifier within a [`LayerStack`].
pub type LayerId = u32;

/// Largest accepted font size in pixels. Glyph rasterization cost grows with
/// the square of the size.
pub const MAX_FONT_SIZE: f32 = 2000.0;

/// Largest accepted letter spacing magnitude in pixels.
pub const MAX_LETTER_SPACING: f32 = 1000.0;

/// Size cap of the classic recipient layer.
pub const RECIPIENT_FONT_SIZE: f32 = 60.0;

/// What a layer's text is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Substituted with the recipient's name for each certificate.
    Recipient,
    /// Fixed label (course title, signature line, ...).
    #[default]
    Static,
    /// Issue date. Literal text, prefilled with today's date.
    Date,
    /// Certificate or course identifier. Literal text.
    Identifier,
}

impl LayerKind {
    /// Human-readable display label.
    pub fn label(self) -> &'static str {
        match self {
            LayerKind::Recipient => "Recipient Name",
            LayerKind::Static => "Text",
            LayerKind::Date => "Date",
            LayerKind::Identifier => "Certificate ID",
        }
    }
}

/// Horizontal anchor of the text line relative to the layer position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl FromStr for Alignment {
    type Err = LaurelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" | "start" => Ok(Alignment::Left),
            "center" | "centre" | "middle" => Ok(Alignment::Center),
            "right" | "end" => Ok(Alignment::Right),
            other => Err(LaurelError::Validation(format!("Unknown alignment '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    #[serde(alias = "oblique")]
    Italic,
}

/// CSS-style font weight (100-900).
///
/// Deserializes from `"normal"`, `"bold"` or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: FontWeight = FontWeight(400);
    pub const BOLD: FontWeight = FontWeight(700);

    pub fn is_bold(self) -> bool {
        self.0 >= 600
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        FontWeight::NORMAL
    }
}

impl FromStr for FontWeight {
    type Err = LaurelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let weight = match s.as_str() {
            "thin" => 100,
            "light" => 300,
            "normal" | "regular" => 400,
            "medium" => 500,
            "semibold" => 600,
            "bold" => 700,
            "black" | "heavy" => 900,
            n => n
                .parse::<u16>()
                .map_err(|_| LaurelError::Validation(format!("Unknown font weight '{}'", s)))?,
        };
        if !(100..=900).contains(&weight) {
            return Err(LaurelError::Validation(format!(
                "Font weight {} out of range (100-900)",
                weight
            )));
        }
        Ok(FontWeight(weight))
    }
}

impl Serialize for FontWeight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.0)
    }
}

impl<'de> Deserialize<'de> for FontWeight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WeightValue {
            Number(u16),
            Name(String),
        }

        match WeightValue::deserialize(deserializer)? {
            WeightValue::Number(n) => n.to_string().parse().map_err(serde::de::Error::custom),
            WeightValue::Name(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// 8-bit RGBA color, written as `#rgb`, `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl FromStr for Color {
    type Err = LaurelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LaurelError::Validation(format!("Invalid color '{}'", s));
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| invalid())
        };

        match hex.len() {
            3 => Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Normalized position: `(0, 0)` is the top-left corner, `(1, 1)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Build a position, clamping both axes into `[0, 1]`.
    pub fn clamped(x: f32, y: f32) -> Self {
        let clamp = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 };
        Self {
            x: clamp(x),
            y: clamp(y),
        }
    }

    /// Pixel anchor on a canvas of the given size.
    pub fn to_pixels(self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

/// A positioned, styled text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    /// Display name shown in layer lists.
    pub name: String,
    /// Literal text. Ignored for recipient layers.
    pub text: String,
    pub kind: LayerKind,
    pub position: Position,
    /// Font size in pixels.
    pub font_size: f32,
    pub color: Color,
    pub weight: FontWeight,
    /// Font family name, or a generic family (`serif`, `sans-serif`, `monospace`).
    pub family: String,
    pub style: FontStyle,
    pub align: Alignment,
    /// 0.0 = invisible, 1.0 = opaque.
    pub opacity: f32,
    /// Extra pixels between characters. Zero uses kerned advances.
    pub letter_spacing: f32,
    pub uppercase: bool,
    /// Shrink the font until the line fits in this fraction of the canvas width.
    pub max_width: Option<f32>,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            id: 0,
            name: LayerKind::Static.label().to_string(),
            text: String::new(),
            kind: LayerKind::Static,
            position: Position::default(),
            font_size: 48.0,
            color: Color::BLACK,
            weight: FontWeight::NORMAL,
            family: "sans-serif".to_string(),
            style: FontStyle::Normal,
            align: Alignment::Center,
            opacity: 1.0,
            letter_spacing: 0.0,
            uppercase: false,
            max_width: None,
        }
    }
}

impl Layer {
    /// Starter layer for the given kind, with example content so a new layer
    /// is immediately visible.
    pub fn editor_default(kind: LayerKind) -> Self {
        let base = Layer {
            name: kind.label().to_string(),
            kind,
            ..Default::default()
        };

        match kind {
            LayerKind::Recipient => Layer {
                position: Position { x: 0.5, y: 0.6 },
                font_size: RECIPIENT_FONT_SIZE,
                weight: FontWeight::BOLD,
                family: "Arial".to_string(),
                ..base
            },
            LayerKind::Static => Layer {
                text: "Certificate of Achievement".to_string(),
                position: Position { x: 0.5, y: 0.3 },
                ..base
            },
            LayerKind::Date => Layer {
                text: Local::now().format("%B %-d, %Y").to_string(),
                position: Position { x: 0.25, y: 0.85 },
                font_size: 28.0,
                ..base
            },
            LayerKind::Identifier => Layer {
                text: "No. 0001".to_string(),
                position: Position { x: 0.75, y: 0.85 },
                font_size: 24.0,
                ..base
            },
        }
    }

    /// Text painted for this layer when rendering for `recipient`.
    pub fn resolve_text(&self, recipient: &str) -> String {
        let raw = match self.kind {
            LayerKind::Recipient => recipient,
            _ => self.text.as_str(),
        };
        if self.uppercase {
            raw.to_uppercase()
        } else {
            raw.to_string()
        }
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Position::clamped(x, y);
    }

    /// Check every numeric field is in range.
    pub fn validate(&self) -> Result<(), LaurelError> {
        let fail = |what: &str| {
            Err(LaurelError::Validation(format!(
                "Layer '{}': {}",
                self.name, what
            )))
        };

        let in_unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(self.position.x) || !in_unit(self.position.y) {
            return fail("position must be within [0, 1]");
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return fail("font size must be positive");
        }
        if self.font_size > MAX_FONT_SIZE {
            return fail(&format!("font size must be at most {}px", MAX_FONT_SIZE));
        }
        if !in_unit(self.opacity) {
            return fail("opacity must be within [0, 1]");
        }
        if !self.letter_spacing.is_finite() || self.letter_spacing.abs() > MAX_LETTER_SPACING {
            return fail(&format!(
                "letter spacing must be within ±{}px",
                MAX_LETTER_SPACING
            ));
        }
        if let Some(max_width) = self.max_width {
            if !max_width.is_finite() || max_width <= 0.0 || max_width > 1.0 {
                return fail("max width must be within (0, 1]");
            }
        }
        Ok(())
    }
}

/// Ordered collection of layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStack {
    layers: Vec<Layer>,
    next_id: LayerId,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The starting stack: a single recipient layer.
    pub fn with_defaults() -> Self {
        let mut stack = Self::new();
        stack.add(LayerKind::Recipient);
        stack
    }

    /// Adopt layers loaded from JSON, keeping their ids. Duplicate ids are rejected.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self, LaurelError> {
        let mut seen = std::collections::HashSet::new();
        for layer in &layers {
            if !seen.insert(layer.id) {
                return Err(LaurelError::Validation(format!(
                    "Duplicate layer id {}",
                    layer.id
                )));
            }
        }
        let next_id = match layers.iter().map(|l| l.id).max() {
            Some(max) => max.checked_add(1).ok_or_else(|| {
                LaurelError::Validation(format!("Layer id {} is too large", max))
            })?,
            None => 0,
        };
        Ok(Self { layers, next_id })
    }

    /// Append an editor-default layer of `kind`.
    pub fn add(&mut self, kind: LayerKind) -> LayerId {
        self.push(Layer::editor_default(kind))
    }

    /// Append a layer, assigning it a fresh id.
    pub fn push(&mut self, mut layer: Layer) -> LayerId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        layer.id = id;
        self.layers.push(layer);
        id
    }

    pub fn remove(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.index_of(id)?;
        Some(self.layers.remove(index))
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// Move a layer to `index` (clamped to the end of the stack).
    pub fn move_to(&mut self, id: LayerId, index: usize) -> Result<(), LaurelError> {
        let from = self
            .index_of(id)
            .ok_or_else(|| LaurelError::Validation(format!("No layer with id {}", id)))?;
        let layer = self.layers.remove(from);
        let to = index.min(self.layers.len());
        self.layers.insert(to, layer);
        Ok(())
    }

    /// Swap with the previous layer. Returns false at the bottom.
    pub fn move_down(&mut self, id: LayerId) -> bool {
        match self.index_of(id) {
            Some(i) if i > 0 => {
                self.layers.swap(i, i - 1);
                true
            }
            _ => false,
        }
    }

    /// Swap with the next layer. Returns false at the top.
    pub fn move_up(&mut self, id: LayerId) -> bool {
        match self.index_of(id) {
            Some(i) if i + 1 < self.layers.len() => {
                self.layers.swap(i, i + 1);
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn as_slice(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn recipient_layer_count(&self) -> usize {
        count_recipient_layers(&self.layers)
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

pub(crate) fn count_recipient_layers(layers: &[Layer]) -> usize {
    layers
        .iter()
        .filter(|l| l.kind == LayerKind::Recipient)
        .count()
}

/// A batch varies exactly one layer per name.
pub fn ensure_single_recipient_layer(layers: &[Layer]) -> Result<(), LaurelError> {
    match count_recipient_layers(layers) {
        1 => Ok(()),
        0 => Err(LaurelError::Validation(
            "Add a recipient name layer before generating".to_string(),
        )),
        n => Err(LaurelError::Validation(format!(
            "Only one recipient name layer is allowed, found {}",
            n
        ))),
    }
}

/// Font size for a name that should fit a canvas of `canvas_width`: roughly
/// 0.7em per character, capped at `max_size`, never below 1px.
pub fn name_font_size(name: &str, canvas_width: u32, max_size: f32) -> f32 {
    let chars = name.trim().chars().count();
    if chars == 0 {
        return max_size;
    }
    (canvas_width as f32 / (chars as f32 * 0.7))
        .floor()
        .clamp(1.0, max_size)
}
