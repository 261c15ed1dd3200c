use crate::schema::{Background, Charset};

/// 10-glyph ramp, dense to sparse.
pub const SIMPLE_RAMP: &str = "@%#*+=-:. ";

/// 70-glyph ramp, dense to sparse.
pub const COMPLEX_RAMP: &str =
    "$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/\\|()1{}[]?-_+~<>i!lI;:,\"^`'. ";

/// Ordered character ramp shared read-only across all cells and frames of
/// one job. Index 0 is the visually densest glyph.
#[derive(Debug, Clone)]
pub struct GlyphRamp {
    chars: Vec<char>,
}

impl GlyphRamp {
    pub fn for_charset(charset: Charset) -> Self {
        let source = match charset {
            Charset::Simple => SIMPLE_RAMP,
            Charset::Complex => COMPLEX_RAMP,
        };
        Self {
            chars: source.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn glyph(&self, index: usize) -> char {
        self.chars[index.min(self.chars.len() - 1)]
    }

    /// Linear intensity bucket: `floor(mean * len / 256)`, clamped to the
    /// last index.
    pub fn index_for_mean(&self, mean: f64) -> usize {
        let raw = (mean * self.chars.len() as f64 / 256.0) as usize;
        raw.min(self.chars.len() - 1)
    }

    /// Glyph used for cells with no pixels: the minimal-ink end of the
    /// ramp for the given background polarity.
    pub fn minimal_ink_index(&self, background: Background) -> usize {
        match background {
            Background::Black => 0,
            Background::White => self.chars.len() - 1,
        }
    }
}
