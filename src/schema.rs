use std::path::PathBuf;

use image::Rgb;
use serde::Deserialize;

use crate::error::RenderError;

pub const DEFAULT_FONT_PATH: &str = "assets/fonts/DejaVuSansMono-Bold.ttf";
pub const DEFAULT_NUM_COLS: u32 = 100;
pub const DEFAULT_OVERLAY_RATIO: f32 = 0.2;
pub const DEFAULT_CODEC: &str = "mp4v";
const BASE_POINT_SIZE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Charset {
    #[default]
    Simple,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Background {
    #[default]
    Black,
    White,
}

impl Background {
    /// Intensity the canvas is cleared with.
    pub fn code(self) -> u8 {
        match self {
            Self::Black => 0,
            Self::White => 255,
        }
    }

    /// Glyph fill, always the polarity opposite the background.
    pub fn ink(self) -> u8 {
        255 - self.code()
    }

    pub fn rgb(self) -> Rgb<u8> {
        let code = self.code();
        Rgb([code, code, code])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderVariant {
    #[default]
    Mono,
    Color,
}

/// Which font file a job rasterizes with, plus the per-font constants the
/// renderer derives geometry from. Built once per job and shared read-only.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontProfile {
    #[serde(default = "default_font_path")]
    pub path: PathBuf,
    /// Character measured once to derive the uniform glyph cell.
    #[serde(default = "default_sample_char")]
    pub sample_char: char,
    /// Cell height as a multiple of cell width (glyphs are roughly 1:2).
    #[serde(default = "default_height_scale")]
    pub height_scale: f32,
    /// Point size before the job's `scale` multiplier.
    #[serde(default = "default_point_size")]
    pub point_size: f32,
}

fn default_font_path() -> PathBuf {
    PathBuf::from(DEFAULT_FONT_PATH)
}

fn default_sample_char() -> char {
    'A'
}

fn default_height_scale() -> f32 {
    2.0
}

fn default_point_size() -> f32 {
    BASE_POINT_SIZE
}

impl Default for FontProfile {
    fn default() -> Self {
        Self {
            path: default_font_path(),
            sample_char: default_sample_char(),
            height_scale: default_height_scale(),
            point_size: default_point_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderOptions {
    #[serde(default)]
    pub charset: Charset,
    #[serde(default)]
    pub background: Background,
    /// Target mosaic width in glyph cells.
    #[serde(default = "default_num_cols")]
    pub num_cols: u32,
    /// Integer multiplier on the font point size.
    #[serde(default = "default_scale")]
    pub scale: u32,
    #[serde(default)]
    pub font: FontProfile,
}

fn default_num_cols() -> u32 {
    DEFAULT_NUM_COLS
}

fn default_scale() -> u32 {
    1
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            charset: Charset::default(),
            background: Background::default(),
            num_cols: DEFAULT_NUM_COLS,
            scale: 1,
            font: FontProfile::default(),
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.num_cols == 0 {
            return Err(RenderError::InvalidGeometry(
                "num_cols must be greater than zero".to_owned(),
            ));
        }
        if self.scale == 0 {
            return Err(RenderError::InvalidGeometry(
                "scale must be greater than zero".to_owned(),
            ));
        }
        if self.font.height_scale <= 0.0 || !self.font.height_scale.is_finite() {
            return Err(RenderError::InvalidGeometry(format!(
                "font height_scale must be positive, got {}",
                self.font.height_scale
            )));
        }
        if self.font.point_size <= 0.0 || !self.font.point_size.is_finite() {
            return Err(RenderError::InvalidGeometry(format!(
                "font point_size must be positive, got {}",
                self.font.point_size
            )));
        }
        Ok(())
    }

    /// Effective rasterization size in pixels.
    pub fn px_size(&self) -> f32 {
        self.font.point_size * self.scale as f32
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoOptions {
    #[serde(default)]
    pub render: RenderOptions,
    #[serde(default)]
    pub variant: RenderVariant,
    /// Output frame rate; 0 inherits the source's native rate.
    #[serde(default)]
    pub fps: u32,
    /// Width ratio of the original-frame overlay; 0 disables it.
    #[serde(default = "default_overlay_ratio")]
    pub overlay_ratio: f32,
    /// FourCC for the intermediate container.
    #[serde(default = "default_codec")]
    pub codec: String,
}

fn default_overlay_ratio() -> f32 {
    DEFAULT_OVERLAY_RATIO
}

fn default_codec() -> String {
    DEFAULT_CODEC.to_owned()
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            variant: RenderVariant::default(),
            fps: 0,
            overlay_ratio: DEFAULT_OVERLAY_RATIO,
            codec: DEFAULT_CODEC.to_owned(),
        }
    }
}

impl VideoOptions {
    pub fn validate(&self) -> Result<(), RenderError> {
        self.render.validate()?;
        if !(0.0..=1.0).contains(&self.overlay_ratio) {
            return Err(RenderError::InvalidGeometry(format!(
                "overlay_ratio must be within [0, 1], got {}",
                self.overlay_ratio
            )));
        }
        if self.codec.len() != 4 || !self.codec.is_ascii() {
            return Err(RenderError::WriterInitFailure(format!(
                "codec must be a 4-character fourcc, got '{}'",
                self.codec
            )));
        }
        Ok(())
    }
}
