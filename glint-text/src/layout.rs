//! Single-line text layout — turns a normalized string into quad geometry.
//!
//! For each character, in string order: look up its metrics, place its
//! quad at the cumulative advance of everything before it, resolve its
//! atlas entry, and emit 4 vertices + 6 indices. All quads are shifted to
//! a shared baseline and finally scaled by display size / base size.
//!
//! Layout is all-or-nothing: any error leaves no partial output, so a
//! caller's previously laid-out geometry stays valid.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::atlas::{AtlasError, GlyphEntry, TextureId};
use crate::fonts::CharMetrics;

/// Triangle indices for one quad, in the atlas corner order
/// (bottom-left, bottom-right, top-left, top-right).
pub const QUAD: [u32; 6] = [0, 1, 2, 2, 1, 3];

/// Normalize text to NFKC composed form.
///
/// Layout assumes one visual glyph per `char`; composing first keeps
/// combining sequences from splitting across quads.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect()
}

/// Source of metrics and glyph entries for layout.
///
/// [`FontAtlas`](crate::fonts::FontAtlas) is the stock implementation.
pub trait GlyphProvider {
    /// Per-character metrics, one entry per `char` in string order.
    fn metrics(&self, text: &str) -> Vec<CharMetrics>;

    /// Baseline-relative descent (negative below the baseline).
    fn descent(&self) -> f32;

    /// Base rasterization size in pixels.
    fn base_size(&self) -> f32;

    /// Texture that glyphs resolve into when none have been requested yet.
    fn texture(&self) -> TextureId;

    /// Resolve (rasterizing if needed) the entry for one character.
    fn glyph(&mut self, ch: char) -> Result<GlyphEntry, AtlasError>;
}

#[derive(Error, Debug)]
pub enum LayoutError {
    /// The font backend broke its contract: metrics count != char count.
    #[error("font backend returned {got} metrics for {expected} characters")]
    MalformedMetrics { expected: usize, got: usize },
    /// Glyphs resolved to more than one atlas texture; a single label
    /// must draw from one texture in one draw call.
    #[error("glyphs resolved to more than one atlas texture")]
    MultiTexture,
    #[error(transparent)]
    Atlas(#[from] AtlasError),
}

/// Geometry for one laid-out string: 4 vertices and 6 indices per glyph,
/// plus the single texture every glyph resolved to.
#[derive(Clone, Debug, PartialEq)]
pub struct LaidOutText {
    /// Homogeneous 2D positions (x, y, 1), 4 per glyph.
    pub verts: Vec<[f32; 3]>,
    /// Atlas UVs, parallel to `verts`.
    pub uvs: Vec<[f32; 2]>,
    /// Triangle indices, 6 per glyph, local to this layout.
    pub indices: Vec<u32>,
    /// The one atlas texture this geometry samples.
    pub texture: TextureId,
}

impl LaidOutText {
    pub fn glyph_count(&self) -> usize {
        self.verts.len() / 4
    }
}

/// Lay out `text` (already NFKC-normalized) at `display_size`.
///
/// The quad x-position of character `i` is its own min-x bearing plus the
/// sum of advances of characters `0..i`. Quads are translated by
/// `(x, -descent)` so every glyph shares the baseline, then uniformly
/// scaled by `display_size / base_size`.
pub fn layout<P: GlyphProvider + ?Sized>(
    text: &str,
    font: &mut P,
    display_size: f32,
) -> Result<LaidOutText, LayoutError> {
    let n_chars = text.chars().count();
    let metrics = font.metrics(text);
    if metrics.len() != n_chars {
        return Err(LayoutError::MalformedMetrics {
            expected: n_chars,
            got: metrics.len(),
        });
    }

    let descent = font.descent();
    let scale = display_size / font.base_size();

    let mut verts = Vec::with_capacity(4 * n_chars);
    let mut uvs = Vec::with_capacity(4 * n_chars);
    let mut indices = Vec::with_capacity(6 * n_chars);
    let mut texture: Option<TextureId> = None;
    let mut pen = 0.0f32;

    for (idx, ch) in text.chars().enumerate() {
        let m = &metrics[idx];
        // Bearing plus the advances accumulated *before* this character.
        let x = m.min_x + pen;
        pen += m.advance;

        let entry = font.glyph(ch)?;
        match texture {
            None => texture = Some(entry.texture),
            Some(t) if t != entry.texture => return Err(LayoutError::MultiTexture),
            Some(_) => {}
        }

        let base = (idx * 4) as u32;
        for (corner, v) in entry.verts.iter().enumerate() {
            verts.push([(v[0] + x) * scale, (v[1] - descent) * scale, v[2]]);
            uvs.push(entry.uvs[corner]);
        }
        indices.extend(QUAD.iter().map(|q| q + base));
    }

    Ok(LaidOutText {
        verts,
        uvs,
        indices,
        texture: texture.unwrap_or_else(|| font.texture()),
    })
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasError, GlyphEntry};
    use std::cell::Cell;
    use std::collections::HashMap;

    /// Scriptable provider: per-char metrics and bitmap sizes, with call
    /// counters and an optional per-char texture override.
    struct MockProvider {
        base: f32,
        descent: f32,
        default_texture: TextureId,
        // (metrics, bitmap w/h, texture)
        glyphs: HashMap<char, (CharMetrics, (f32, f32), TextureId)>,
        metrics_calls: Cell<usize>,
        glyph_calls: usize,
        /// When set, `metrics` returns this many entries regardless of input.
        force_metrics_len: Option<usize>,
    }

    impl MockProvider {
        fn new(base: f32, descent: f32) -> Self {
            Self {
                base,
                descent,
                default_texture: TextureId::fresh(),
                glyphs: HashMap::new(),
                metrics_calls: Cell::new(0),
                glyph_calls: 0,
                force_metrics_len: None,
            }
        }

        fn glyph_on(
            mut self,
            ch: char,
            metrics: CharMetrics,
            size: (f32, f32),
            texture: TextureId,
        ) -> Self {
            self.glyphs.insert(ch, (metrics, size, texture));
            self
        }

        fn with_glyph(self, ch: char, metrics: CharMetrics, size: (f32, f32)) -> Self {
            let tex = self.default_texture;
            self.glyph_on(ch, metrics, size, tex)
        }
    }

    fn simple_metrics(bearing: f32, width: f32, advance: f32) -> CharMetrics {
        CharMetrics {
            min_x: bearing,
            max_x: bearing + width,
            min_y: 0.0,
            max_y: width,
            advance,
        }
    }

    impl GlyphProvider for MockProvider {
        fn metrics(&self, text: &str) -> Vec<CharMetrics> {
            self.metrics_calls.set(self.metrics_calls.get() + 1);
            let mut out: Vec<CharMetrics> = text
                .chars()
                .map(|ch| self.glyphs.get(&ch).expect("unscripted char").0)
                .collect();
            if let Some(len) = self.force_metrics_len {
                out.truncate(len);
            }
            out
        }

        fn descent(&self) -> f32 {
            self.descent
        }

        fn base_size(&self) -> f32 {
            self.base
        }

        fn texture(&self) -> TextureId {
            self.default_texture
        }

        fn glyph(&mut self, ch: char) -> Result<GlyphEntry, AtlasError> {
            self.glyph_calls += 1;
            let (_, (w, h), texture) = self.glyphs[&ch];
            Ok(GlyphEntry {
                texture,
                uvs: [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
                verts: [
                    [0.0, 0.0, 1.0],
                    [w, 0.0, 1.0],
                    [0.0, h, 1.0],
                    [w, h, 1.0],
                ],
            })
        }
    }

    fn quad_min_x(laid: &LaidOutText, glyph: usize) -> f32 {
        laid.verts[glyph * 4..glyph * 4 + 4]
            .iter()
            .map(|v| v[0])
            .fold(f32::INFINITY, f32::min)
    }

    #[test]
    fn test_one_quad_per_char_in_order() {
        let mut font = MockProvider::new(48.0, 0.0)
            .with_glyph('a', simple_metrics(0.0, 8.0, 10.0), (8.0, 8.0))
            .with_glyph('b', simple_metrics(0.0, 8.0, 10.0), (8.0, 8.0))
            .with_glyph('c', simple_metrics(0.0, 8.0, 10.0), (8.0, 8.0));

        let laid = layout("abc", &mut font, 48.0).unwrap();
        assert_eq!(laid.glyph_count(), 3);
        assert_eq!(laid.verts.len(), 12);
        assert_eq!(laid.uvs.len(), 12);
        assert_eq!(laid.indices.len(), 18);
        // Indices for glyph i live in 4i..4i+4.
        assert_eq!(&laid.indices[6..12], &[4, 5, 6, 6, 5, 7]);
        // Monotone left-to-right placement.
        assert!(quad_min_x(&laid, 0) < quad_min_x(&laid, 1));
        assert!(quad_min_x(&laid, 1) < quad_min_x(&laid, 2));
    }

    #[test]
    fn test_bearing_plus_prior_advances() {
        // 'A': advance 10, bearing (1, 9); 'B': advance 8, bearing (0, 8).
        let mut font = MockProvider::new(48.0, 0.0)
            .with_glyph(
                'A',
                CharMetrics {
                    min_x: 1.0,
                    max_x: 9.0,
                    min_y: 0.0,
                    max_y: 9.0,
                    advance: 10.0,
                },
                (8.0, 9.0),
            )
            .with_glyph(
                'B',
                CharMetrics {
                    min_x: 0.0,
                    max_x: 8.0,
                    min_y: 0.0,
                    max_y: 8.0,
                    advance: 8.0,
                },
                (8.0, 8.0),
            );

        let laid = layout("AB", &mut font, 48.0).unwrap();
        assert_eq!(quad_min_x(&laid, 0), 1.0, "'A' x-min = own bearing");
        assert_eq!(quad_min_x(&laid, 1), 10.0, "'B' x-min = A's advance + 0");
    }

    #[test]
    fn test_display_scale_applied_after_placement() {
        // Base 48, 30x40 glyph, display 24 => quad height 40 * 0.5 = 20.
        let mut font = MockProvider::new(48.0, 0.0)
            .with_glyph('A', simple_metrics(0.0, 30.0, 32.0), (30.0, 40.0));

        let laid = layout("A", &mut font, 24.0).unwrap();
        let ys: Vec<f32> = laid.verts.iter().map(|v| v[1]).collect();
        let height = ys.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b))
            - ys.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        assert_eq!(height, 20.0);
    }

    #[test]
    fn test_baseline_shift_by_descent() {
        let mut font = MockProvider::new(48.0, -6.0)
            .with_glyph('g', simple_metrics(0.0, 8.0, 10.0), (8.0, 8.0));

        let laid = layout("g", &mut font, 48.0).unwrap();
        // Quad bottom sits at -descent = +6 above the cell bottom.
        let min_y = laid.verts.iter().map(|v| v[1]).fold(f32::INFINITY, f32::min);
        assert_eq!(min_y, 6.0);
    }

    #[test]
    fn test_malformed_metrics_rejected() {
        let mut font = MockProvider::new(48.0, 0.0)
            .with_glyph('a', simple_metrics(0.0, 8.0, 10.0), (8.0, 8.0))
            .with_glyph('b', simple_metrics(0.0, 8.0, 10.0), (8.0, 8.0));
        font.force_metrics_len = Some(1);

        let err = layout("ab", &mut font, 48.0).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::MalformedMetrics { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn test_multi_texture_fails_loudly() {
        let other = TextureId::fresh();
        let mut font = MockProvider::new(48.0, 0.0)
            .with_glyph('a', simple_metrics(0.0, 8.0, 10.0), (8.0, 8.0));
        font = font.glyph_on('b', simple_metrics(0.0, 8.0, 10.0), (8.0, 8.0), other);

        let err = layout("ab", &mut font, 48.0).unwrap_err();
        assert!(matches!(err, LayoutError::MultiTexture));
    }

    #[test]
    fn test_empty_text() {
        let mut font = MockProvider::new(48.0, 0.0);
        let laid = layout("", &mut font, 24.0).unwrap();
        assert_eq!(laid.glyph_count(), 0);
        assert!(laid.indices.is_empty());
        assert_eq!(laid.texture, font.texture());
    }

    #[test]
    fn test_layout_deterministic() {
        let mut font = MockProvider::new(48.0, -3.0)
            .with_glyph('a', simple_metrics(1.0, 8.0, 10.0), (8.0, 8.0))
            .with_glyph('b', simple_metrics(0.5, 7.0, 9.0), (7.0, 9.0));

        let first = layout("ab", &mut font, 20.0).unwrap();
        let second = layout("ab", &mut font, 20.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_idempotent() {
        // U+FB01 LATIN SMALL LIGATURE FI decomposes under NFKC.
        let once = normalize("ﬁn");
        let twice = normalize(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "fin");
    }

    #[test]
    fn test_normalize_composes_combining_sequences() {
        // 'e' + COMBINING ACUTE composes to U+00E9.
        let composed = normalize("e\u{0301}");
        assert_eq!(composed, "\u{00e9}");
        assert_eq!(composed.chars().count(), 1);
    }
}
