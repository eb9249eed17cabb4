//! Texture atlas — shelf-packed storage for rasterized glyph bitmaps.
//!
//! The atlas is generic over its key type: each key maps to one cached
//! [`GlyphEntry`] (UV rectangle + local quad geometry). Entries are
//! rasterized lazily on first request through an [`AtlasSource`] and are
//! immutable for the lifetime of the atlas, so repeat lookups return the
//! cached entry with no side effects.
//!
//! Packing uses a row-based "shelf" algorithm: each shelf has a fixed
//! height determined by the tallest bitmap placed on it, and a new shelf
//! is started when a bitmap does not fit the current one. Pixel data is
//! kept CPU-side as a single RGBA image with a dirty flag that drives the
//! eventual GPU upload.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

/// Opaque identifier for a backing atlas texture.
///
/// Two entries render in one draw call only if their `TextureId`s match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(u32);

static NEXT_TEXTURE_ID: AtomicU32 = AtomicU32::new(0);

impl TextureId {
    /// Allocate a new process-unique texture identifier.
    pub fn fresh() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw index, for labelling GPU resources.
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("atlas full: no room for a {width}x{height} bitmap in a {size}px atlas")]
    AtlasFull { width: u32, height: u32, size: u32 },
}

/// An alpha-coverage bitmap produced by a rasterizer, one byte per pixel.
///
/// Glyph shape only — color is applied later via per-vertex tint, so the
/// atlas stores every bitmap as a white glyph with this alpha.
#[derive(Clone, Debug, Default)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Supplies bitmaps (and optional quad anchoring) for a [`TextureAtlas`].
pub trait AtlasSource<K> {
    /// Rasterize the bitmap for `key`. Called once per key.
    fn rasterize(&mut self, key: &K) -> Bitmap;

    /// Position the local quad relative to the key's origin.
    ///
    /// The quad arrives spanning `(0,0)..(w,h)` with its origin at the
    /// bottom-left corner, which is what glyph layout wants; override to
    /// shift it.
    fn anchor(&self, verts: &mut [[f32; 3]; 4], w: f32, h: f32) {
        let _ = (verts, w, h);
    }
}

/// Cached result of rasterizing one key.
///
/// Corner order is bottom-left, bottom-right, top-left, top-right (y up),
/// matching [`QUAD`](crate::layout::QUAD) indexing. Immutable once created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphEntry {
    /// Backing texture this entry was packed into.
    pub texture: TextureId,
    /// Normalized UV coordinates of the packed rectangle, per corner.
    pub uvs: [[f32; 2]; 4],
    /// Local quad positions (homogeneous 2D: x, y, 1), per corner.
    pub verts: [[f32; 3]; 4],
}

/// Pixel-space rectangle within the atlas.
#[derive(Clone, Copy, Debug)]
struct AtlasRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Shelf (row) in the atlas.
struct Shelf {
    /// Y offset of this shelf.
    y: u32,
    /// Height of this shelf (tallest bitmap placed on it).
    height: u32,
    /// Next free X position.
    cursor_x: u32,
}

/// Shelf-packed texture atlas, generic over the glyph key.
pub struct TextureAtlas<K> {
    texture: TextureId,
    /// Atlas width and height in pixels (always square).
    size: u32,
    /// RGBA pixel data (size * size * 4 bytes).
    data: Vec<u8>,
    /// Whether pixel data changed since the last GPU upload.
    dirty: bool,
    entries: HashMap<K, GlyphEntry>,
    shelves: Vec<Shelf>,
    /// Padding between bitmaps in pixels.
    padding: u32,
}

impl<K: Eq + Hash + Copy> TextureAtlas<K> {
    /// Create a new atlas with the given size (width = height = size).
    ///
    /// Common sizes: 512, 1024, 2048. The size is fixed for the lifetime
    /// of the atlas; exhaustion surfaces as [`AtlasError::AtlasFull`].
    pub fn new(size: u32) -> Self {
        let pixel_count = (size as usize) * (size as usize) * 4;
        Self {
            texture: TextureId::fresh(),
            size,
            data: vec![0u8; pixel_count],
            dirty: false,
            entries: HashMap::new(),
            shelves: Vec::new(),
            padding: 1,
        }
    }

    /// Identifier of the backing texture.
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Atlas edge length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The full RGBA image, for GPU upload.
    pub fn image(&self) -> &[u8] {
        &self.data
    }

    /// Number of entries currently cached.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Consume the dirty flag. Returns whether pixel data changed since
    /// the previous call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Resolve the entry for `key`, rasterizing and packing on first use.
    ///
    /// Cache hits are side-effect free and return the memoized entry
    /// bit-for-bit. A cache miss rasterizes via `source`, packs the bitmap,
    /// blits it into the atlas image, and derives the UV rectangle and
    /// anchored local quad from the packed pixel rectangle.
    pub fn get(
        &mut self,
        key: K,
        source: &mut dyn AtlasSource<K>,
    ) -> Result<GlyphEntry, AtlasError> {
        if let Some(entry) = self.entries.get(&key) {
            return Ok(*entry);
        }

        let bitmap = source.rasterize(&key);
        let rect = self
            .allocate(bitmap.width, bitmap.height)
            .ok_or(AtlasError::AtlasFull {
                width: bitmap.width,
                height: bitmap.height,
                size: self.size,
            })?;

        self.blit(&rect, &bitmap);

        let w = bitmap.width as f32;
        let h = bitmap.height as f32;
        let mut verts = [
            [0.0, 0.0, 1.0], // bottom-left
            [w, 0.0, 1.0],   // bottom-right
            [0.0, h, 1.0],   // top-left
            [w, h, 1.0],     // top-right
        ];
        source.anchor(&mut verts, w, h);

        let entry = GlyphEntry {
            texture: self.texture,
            uvs: self.rect_to_uvs(&rect),
            verts,
        };
        self.entries.insert(key, entry);
        self.dirty = true;
        log::trace!(
            "atlas {}: packed {}x{} at ({}, {}), {} entries",
            self.texture.index(),
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            self.entries.len()
        );

        Ok(entry)
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    /// Allocate a rect on the atlas using shelf packing.
    fn allocate(&mut self, width: u32, height: u32) -> Option<AtlasRect> {
        // Zero-area bitmaps (e.g. whitespace) need no atlas space.
        if width == 0 || height == 0 {
            return Some(AtlasRect {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            });
        }

        let padded_w = width + self.padding;
        let padded_h = height + self.padding;

        // Try existing shelves.
        for shelf in &mut self.shelves {
            if shelf.height >= padded_h && shelf.cursor_x + padded_w <= self.size {
                let rect = AtlasRect {
                    x: shelf.cursor_x,
                    y: shelf.y,
                    width,
                    height,
                };
                shelf.cursor_x += padded_w;
                return Some(rect);
            }
        }

        // Start a new shelf.
        let shelf_y = self.shelves.last().map(|s| s.y + s.height).unwrap_or(0);

        if shelf_y + padded_h > self.size || padded_w > self.size {
            return None;
        }

        let rect = AtlasRect {
            x: 0,
            y: shelf_y,
            width,
            height,
        };

        self.shelves.push(Shelf {
            y: shelf_y,
            height: padded_h,
            cursor_x: padded_w,
        });

        Some(rect)
    }

    /// Blit an alpha-coverage bitmap into the atlas as a white RGBA glyph.
    fn blit(&mut self, rect: &AtlasRect, bitmap: &Bitmap) {
        for row in 0..rect.height {
            for col in 0..rect.width {
                let src_idx = (row * bitmap.width + col) as usize;
                let alpha = bitmap.data.get(src_idx).copied().unwrap_or(0);

                let dst_x = rect.x + col;
                let dst_y = rect.y + row;
                let dst_idx = ((dst_y * self.size + dst_x) * 4) as usize;

                self.data[dst_idx] = 255;
                self.data[dst_idx + 1] = 255;
                self.data[dst_idx + 2] = 255;
                self.data[dst_idx + 3] = alpha;
            }
        }
    }

    /// Per-corner UVs for a pixel rect, in the atlas quad's corner order.
    ///
    /// The atlas image is y-down, so the quad's bottom corners sample the
    /// rect's bottom row (v_max).
    fn rect_to_uvs(&self, rect: &AtlasRect) -> [[f32; 2]; 4] {
        let inv = 1.0 / self.size as f32;
        let u_min = rect.x as f32 * inv;
        let v_min = rect.y as f32 * inv;
        let u_max = (rect.x + rect.width) as f32 * inv;
        let v_max = (rect.y + rect.height) as f32 * inv;
        [
            [u_min, v_max], // bottom-left
            [u_max, v_max], // bottom-right
            [u_min, v_min], // top-left
            [u_max, v_min], // top-right
        ]
    }
}

// ===================================================================
// Tests
// ===================================================================
