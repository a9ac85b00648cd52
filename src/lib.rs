use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod figure;
pub mod surface;
pub mod utils;

pub use figure::*;
pub use surface::*;
pub use utils::*;

pub const DEFAULT_TRACK_HEIGHT: i32 = 50;
pub const DEFAULT_TRACK_SPACING: i32 = 50;
pub const DEFAULT_CANVAS_WIDTH: i32 = 800;
pub const DEFAULT_MARGIN: i32 = 50;
pub const DEFAULT_OUTLINE_WIDTH: i32 = 2;
pub const DEFAULT_LABEL_SIZE: i32 = 16;
pub const LABEL_INSET_FACTOR: f32 = 0.8;

#[derive(Debug, Error)]
pub enum Error {
    #[error("degenerate coordinate range {min}..{max} cannot be rescaled")]
    DegenerateRange { min: i64, max: i64 },
    #[error("{what}: expected {expected} entries to match the track count, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("a track group needs at least one track")]
    NoTracks,
    #[error("track {index} has no exon intervals")]
    EmptyTrack { index: usize },
    #[error("no usable font for label rendering: {0}")]
    FontUnavailable(String),
    #[error("failed to build SVG output: {0}")]
    Svg(String),
    #[error("failed to render PNG output: {0}")]
    Png(String),
}

impl From<std::fmt::Error> for Error {
    fn from(_: std::fmt::Error) -> Self {
        Error::Svg("formatting an SVG element failed".to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn svg(&self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Color::rgb(r, g, b)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackStyle {
    pub fill: Color,
    pub outline: Color,
    pub outline_width: i32,
}

impl Default for TrackStyle {
    fn default() -> Self {
        Self {
            fill: Color::WHITE,
            outline: Color::BLACK,
            outline_width: DEFAULT_OUTLINE_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExonStyleOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline_width: Option<i32>,
}

impl ExonStyleOverride {
    pub fn is_empty(&self) -> bool {
        self.fill.is_none() && self.outline.is_none() && self.outline_width.is_none()
    }

    pub fn apply(&self, base: TrackStyle) -> TrackStyle {
        TrackStyle {
            fill: self.fill.unwrap_or(base.fill),
            outline: self.outline.unwrap_or(base.outline),
            outline_width: self.outline_width.unwrap_or(base.outline_width),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LabelOptions {
    pub size: i32,
    pub color: Color,
    pub font_file: Option<PathBuf>,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_LABEL_SIZE,
            color: Color::BLACK,
            font_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i32,
    pub x2: i32,
    pub y: i32,
    pub height: i32,
}

impl PixelBox {
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBounds {
    pub width: i32,
    pub height: i32,
}
