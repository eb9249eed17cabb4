//! # glint-render
//!
//! GPU side of the glint text engine, built on `wgpu`.
//!
//! ## Architecture
//!
//! ```text
//!  TextLayer (labels + dirty queue)
//!       │  set_text / set_color / set_transform
//!       ▼
//!  Label.sync()            ◀─── migrate + rewrite pool region
//!       │
//!       ▼
//!  GeometryPool             ◀─── shared vertex/index arrays, one texture
//!       │
//!       ▼
//!  Renderer.prepare()       ◀─── conditional atlas/pool upload
//!       │
//!       ▼
//!  Renderer.render_to_texture()   ◀─── single draw call
//! ```
//!
//! ## Crate modules
//!
//! - [`context`] — headless GPU device/queue initialisation
//! - [`vertex`] — vertex and screen-uniform data types
//! - [`pool`] — sub-allocating shared geometry store
//! - [`label`] — single-line text blocks with transform and tint
//! - [`layer`] — label ownership + per-frame dirty queue
//! - [`pipelines`] — wgpu render pipeline for textured glyph quads
//! - [`renderer`] — high-level frame orchestration

pub mod context;
pub mod label;
pub mod layer;
pub mod pipelines;
pub mod pool;
pub mod renderer;
pub mod vertex;

// Re-exports for convenience
pub use context::GpuContext;
pub use label::{transform_point, Label};
pub use layer::{DirtyQueue, LabelId, LayerError, TextLayer};
pub use pool::{GeometryPool, PoolError, PoolHandle};
pub use renderer::{FrameStats, RenderError, Renderer};
pub use vertex::{ScreenUniform, TextVertex};
