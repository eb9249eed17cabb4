//! Font backends — per-character metrics and glyph rasterization.
//!
//! A [`FontBackend`] rasterizes at one fixed base size; display sizes are
//! applied later as a geometric scale during layout, trading a small
//! quality loss for never re-rasterizing per requested size.
//!
//! [`FontdueFont`] is the stock backend, wrapping `fontdue`. [`FontAtlas`]
//! pairs a backend with the [`TextureAtlas`] its glyphs are packed into.

use thiserror::Error;

use crate::atlas::{AtlasError, AtlasSource, Bitmap, GlyphEntry, TextureAtlas, TextureId};
use crate::layout::GlyphProvider;

/// Horizontal metrics for one character, in base-size pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharMetrics {
    /// Leftmost extent of the glyph relative to the pen position.
    pub min_x: f32,
    /// Rightmost extent of the glyph relative to the pen position.
    pub max_x: f32,
    /// Lowest extent relative to the baseline.
    pub min_y: f32,
    /// Highest extent relative to the baseline.
    pub max_y: f32,
    /// Distance to advance the pen after this character.
    pub advance: f32,
}

/// A font rasterizer at a fixed base size.
pub trait FontBackend {
    /// Per-character metrics for `text`, one entry per `char` in order.
    fn metrics(&self, text: &str) -> Vec<CharMetrics>;

    /// Baseline-relative descent. Negative: the distance below the
    /// baseline to the font's lowest extent.
    fn descent(&self) -> f32;

    /// The fixed rasterization size in pixels.
    fn base_size(&self) -> f32;

    /// Rasterize one character as an alpha-coverage bitmap at the base
    /// size. The bitmap must be achromatic; tint is applied per-vertex.
    fn render(&mut self, ch: char) -> Bitmap;
}

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to parse font: {0}")]
    Parse(String),
}

/// `fontdue`-backed font at a fixed base rasterization size.
pub struct FontdueFont {
    font: fontdue::Font,
    base_size: f32,
}

impl FontdueFont {
    /// Base size used when none is given, matching the engine's default
    /// atlas rasterization quality.
    pub const DEFAULT_BASE_SIZE: f32 = 48.0;

    /// Load a font from raw TTF/OTF bytes.
    pub fn from_bytes(bytes: &[u8], base_size: f32) -> Result<Self, FontError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontError::Parse(e.to_string()))?;
        Ok(Self { font, base_size })
    }
}

impl FontBackend for FontdueFont {
    fn metrics(&self, text: &str) -> Vec<CharMetrics> {
        text.chars()
            .map(|ch| {
                let m = self.font.metrics(ch, self.base_size);
                CharMetrics {
                    min_x: m.xmin as f32,
                    max_x: m.xmin as f32 + m.width as f32,
                    min_y: m.ymin as f32,
                    max_y: m.ymin as f32 + m.height as f32,
                    advance: m.advance_width,
                }
            })
            .collect()
    }

    fn descent(&self) -> f32 {
        self.font
            .horizontal_line_metrics(self.base_size)
            .map(|lm| lm.descent)
            .unwrap_or(0.0)
    }

    fn base_size(&self) -> f32 {
        self.base_size
    }

    fn render(&mut self, ch: char) -> Bitmap {
        let (m, data) = self.font.rasterize(ch, self.base_size);
        Bitmap {
            width: m.width as u32,
            height: m.height as u32,
            data,
        }
    }
}

/// The combination of a font and the texture atlas its glyphs pack into.
///
/// Shared by every label using the font; the atlas memoizes one
/// [`GlyphEntry`] per character, anchored at the glyph's bottom-left so
/// that horizontal concatenation and baseline alignment are additions.
pub struct FontAtlas {
    atlas: TextureAtlas<char>,
    backend: Box<dyn FontBackend>,
}

/// Adapter feeding `FontBackend::render` to the atlas on cache misses.
struct GlyphSource<'a> {
    backend: &'a mut dyn FontBackend,
}

impl AtlasSource<char> for GlyphSource<'_> {
    fn rasterize(&mut self, key: &char) -> Bitmap {
        self.backend.render(*key)
    }
}

impl FontAtlas {
    pub fn new(backend: Box<dyn FontBackend>, atlas_size: u32) -> Self {
        Self {
            atlas: TextureAtlas::new(atlas_size),
            backend,
        }
    }

    /// Atlas edge length in pixels.
    pub fn atlas_size(&self) -> u32 {
        self.atlas.size()
    }

    /// The full atlas RGBA image, for GPU upload.
    pub fn image(&self) -> &[u8] {
        self.atlas.image()
    }

    /// Consume the atlas dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        self.atlas.take_dirty()
    }

    /// Number of glyphs cached so far.
    pub fn glyph_count(&self) -> usize {
        self.atlas.entry_count()
    }
}

impl GlyphProvider for FontAtlas {
    fn metrics(&self, text: &str) -> Vec<CharMetrics> {
        self.backend.metrics(text)
    }

    fn descent(&self) -> f32 {
        self.backend.descent()
    }

    fn base_size(&self) -> f32 {
        self.backend.base_size()
    }

    fn texture(&self) -> TextureId {
        self.atlas.texture()
    }

    fn glyph(&mut self, ch: char) -> Result<GlyphEntry, AtlasError> {
        self.atlas.get(
            ch,
            &mut GlyphSource {
                backend: &mut *self.backend,
            },
        )
    }
}

// ===================================================================
// Tests
// ===================================================================
