//! # glint-text
//!
//! CPU side of the glint text engine: font backends, a shelf-packed
//! glyph texture atlas, and single-line layout producing GPU-ready quad
//! geometry.
//!
//! ## Architecture
//!
//! ```text
//! FontBackend (fontdue)          TextureAtlas<char>
//!        │                             │
//!        └────────► FontAtlas ◄────────┘
//!                       │
//!                       ▼
//! layout(str, font, size) ──► LaidOutText { verts, uvs, indices, texture }
//! ```
//!
//! - **`fonts`** — per-character metrics/rasterization trait + fontdue impl.
//! - **`atlas`** — generic shelf-packed texture atlas with memoized entries.
//! - **`layout`** — cumulative-advance layout, NFKC normalization.

pub mod atlas;
pub mod fonts;
pub mod layout;

// Re-exports for ergonomic use.
pub use atlas::{AtlasError, Bitmap, GlyphEntry, TextureAtlas, TextureId};
pub use fonts::{CharMetrics, FontAtlas, FontBackend, FontdueFont};
pub use layout::{layout, normalize, GlyphProvider, LaidOutText, LayoutError, QUAD};
