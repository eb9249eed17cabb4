//! Label — a single-line text block bound to a font atlas and a
//! geometry pool.
//!
//! Setting the text normalizes it (NFKC), runs layout, and caches the
//! resulting local-space geometry; nothing touches the pool until
//! [`Label::sync`], which migrates the allocation when the glyph count
//! or resolved texture changed and then rewrites the transformed
//! vertices. Transform and color changes only flag the label — they
//! never re-run layout or call back into the font.

use glint_text::layout::{layout, normalize, GlyphProvider, LaidOutText, LayoutError};

use crate::pool::{GeometryPool, PoolError, PoolHandle};
use crate::vertex::TextVertex;

/// Apply `scale`, then `rotation` (radians), then `translation` to a
/// local-space point.
pub fn transform_point(
    p: [f32; 2],
    scale: f32,
    rotation: f32,
    translation: [f32; 2],
) -> [f32; 2] {
    let (sin, cos) = rotation.sin_cos();
    let x = p[0] * scale;
    let y = p[1] * scale;
    [
        x * cos - y * sin + translation[0],
        x * sin + y * cos + translation[1],
    ]
}

/// A single-line text block with no wrapping.
pub struct Label {
    /// NFKC-normalized text.
    text: String,
    /// Display size in pixels; layout scales glyphs by
    /// `font_size / base_size`.
    font_size: f32,
    pos: [f32; 2],
    rotation: f32,
    scale: f32,
    color: [f32; 4],
    laid_out: Option<LaidOutText>,
    handle: Option<PoolHandle>,
    needs_migrate: bool,
}

impl Label {
    pub fn new(font_size: f32) -> Self {
        Self {
            text: String::new(),
            font_size,
            pos: [0.0, 0.0],
            rotation: 0.0,
            scale: 1.0,
            color: [1.0, 1.0, 1.0, 1.0],
            laid_out: None,
            handle: None,
            needs_migrate: false,
        }
    }

    /// The normalized text currently laid out.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    pub fn set_transform(&mut self, pos: [f32; 2], rotation: f32, scale: f32) {
        self.pos = pos;
        self.rotation = rotation;
        self.scale = scale;
    }

    /// The cached layout, if any text has been set successfully.
    pub fn laid_out(&self) -> Option<&LaidOutText> {
        self.laid_out.as_ref()
    }

    /// Replace the label's text: normalize, lay out, cache.
    ///
    /// All-or-nothing: on error the previous text, layout, and pool
    /// allocation are left untouched.
    pub fn set_text<P: GlyphProvider + ?Sized>(
        &mut self,
        text: &str,
        font: &mut P,
    ) -> Result<(), LayoutError> {
        let normalized = normalize(text);
        let laid = layout(&normalized, font, self.font_size)?;

        self.needs_migrate = match &self.laid_out {
            Some(prev) => prev.verts.len() != laid.verts.len() || prev.texture != laid.texture,
            None => true,
        };
        self.text = normalized;
        self.laid_out = Some(laid);
        Ok(())
    }

    /// Push the label's current state into the pool.
    ///
    /// Runs the pending migration first (free the old allocation, bind
    /// the resolved texture, allocate and write indices), then rewrites
    /// the region's vertices as
    /// `local · scale · rotation · translation` with the current color.
    pub fn sync(&mut self, pool: &mut GeometryPool) -> Result<(), PoolError> {
        let Some(laid) = &self.laid_out else {
            return Ok(());
        };

        if self.needs_migrate {
            if let Some(old) = self.handle.take() {
                pool.free(old)?;
            }
            pool.bind_texture(laid.texture)?;
            let handle = pool.alloc(laid.verts.len(), laid.indices.len());
            pool.write_indices(handle, &laid.indices)?;
            self.handle = Some(handle);
            self.needs_migrate = false;
            log::debug!(
                "label migrated: {} glyphs on texture {}",
                laid.glyph_count(),
                laid.texture.index()
            );
        }

        let Some(handle) = self.handle else {
            return Ok(());
        };

        let verts: Vec<TextVertex> = laid
            .verts
            .iter()
            .zip(&laid.uvs)
            .map(|(v, uv)| {
                TextVertex::new(
                    transform_point([v[0], v[1]], self.scale, self.rotation, self.pos),
                    self.color,
                    *uv,
                )
            })
            .collect();
        pool.write_vertices(handle, &verts)
    }

    /// Release the pool allocation. Terminal: the label renders nothing
    /// until its text is set again.
    pub fn release(&mut self, pool: &mut GeometryPool) -> Result<(), PoolError> {
        if let Some(handle) = self.handle.take() {
            pool.free(handle)?;
        }
        self.laid_out = None;
        self.needs_migrate = false;
        Ok(())
    }
}

// ===================================================================
// Tests
// ===================================================================
