//! GPU vertex and uniform data types for the glint renderer.
//!
//! All types derive `bytemuck::Pod` + `Zeroable` for zero-copy upload
//! to GPU buffers.

use bytemuck::{Pod, Zeroable};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

// ───────────────────────────────────────────────────────────────────
// Text vertex
// ───────────────────────────────────────────────────────────────────

/// One glyph-quad vertex: transformed position, tint color, atlas UV.
///
/// 32 bytes — a 10,000-glyph pool is 1.28 MB of vertex data.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    /// Final (post-transform) position in pixels.
    pub position: [f32; 2],
    /// RGBA tint, each channel in [0.0, 1.0].
    pub color: [f32; 4],
    /// Normalized atlas UV.
    pub uv: [f32; 2],
}

impl TextVertex {
    pub fn new(position: [f32; 2], color: [f32; 4], uv: [f32; 2]) -> Self {
        Self { position, color, uv }
    }

    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(0) = position
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x2,
            },
            // location(1) = color
            VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: VertexFormat::Float32x4,
            },
            // location(2) = uv
            VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: VertexFormat::Float32x2,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<TextVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Screen uniform
// ───────────────────────────────────────────────────────────────────

/// Viewport uniform sent to the GPU once per frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ScreenUniform {
    /// 4×4 orthographic projection matrix (column-major).
    pub view_proj: [[f32; 4]; 4],
}

impl ScreenUniform {
    /// Orthographic projection for a `width × height` pixel viewport.
    ///
    /// Maps (0,0) to the top-left, (width, height) to the bottom-right.
    pub fn orthographic(width: f32, height: f32) -> Self {
        let sx = 2.0 / width;
        let sy = -2.0 / height; // flip Y for top-left origin
        Self {
            view_proj: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [-1.0, 1.0, 0.0, 1.0],
            ],
        }
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_vertex_size() {
        assert_eq!(std::mem::size_of::<TextVertex>(), 32);
    }

    #[test]
    fn test_screen_uniform_size() {
        assert_eq!(std::mem::size_of::<ScreenUniform>(), 64);
    }

    #[test]
    fn test_vertex_layout_locations() {
        let layout = TextVertex::layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[0].shader_location, 0); // position
        assert_eq!(layout.attributes[1].shader_location, 1); // color
        assert_eq!(layout.attributes[2].shader_location, 2); // uv
        assert_eq!(layout.step_mode, VertexStepMode::Vertex);
    }

    #[test]
    fn test_vertex_bytemuck_cast() {
        let v = TextVertex::new([1.0, 2.0], [0.5, 0.5, 0.5, 1.0], [0.25, 0.75]);
        let bytes = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 32);
        let back: &TextVertex = bytemuck::from_bytes(bytes);
        assert_eq!(*back, v);
    }

    #[test]
    fn test_ortho_corners() {
        let screen = ScreenUniform::orthographic(800.0, 600.0);
        let vp = screen.view_proj;

        // Top-left (0,0) -> NDC (-1, 1).
        let ndc_x = 0.0 * vp[0][0] + vp[3][0];
        let ndc_y = 0.0 * vp[1][1] + vp[3][1];
        assert!((ndc_x + 1.0).abs() < 1e-5);
        assert!((ndc_y - 1.0).abs() < 1e-5);

        // Bottom-right (800,600) -> NDC (1, -1).
        let ndc_x = 800.0 * vp[0][0] + vp[3][0];
        let ndc_y = 600.0 * vp[1][1] + vp[3][1];
        assert!((ndc_x - 1.0).abs() < 1e-5);
        assert!((ndc_y + 1.0).abs() < 1e-5);
    }
}
