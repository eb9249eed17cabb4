//! High-level renderer — per-frame orchestration of layer sync, GPU
//! uploads, and the offscreen render pass.

use thiserror::Error;
use wgpu::{
    Color, CommandEncoderDescriptor, LoadOp, Operations, RenderPassColorAttachment,
    RenderPassDescriptor, StoreOp,
};

use glint_text::FontAtlas;

use crate::context::GpuContext;
use crate::layer::{LayerError, TextLayer};
use crate::pipelines::text::TextPipeline;
use crate::vertex::ScreenUniform;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// Frame statistics returned after each render.
#[derive(Clone, Copy, Debug)]
pub struct FrameStats {
    /// Number of glyph quads drawn.
    pub glyph_count: u32,
    /// Number of draw calls.
    pub draw_calls: u32,
}

/// Ties the GPU context, text pipeline, and a layer's geometry together
/// into a prepare/render pair.
///
/// # Usage
///
/// ```ignore
/// let mut renderer = Renderer::new(&gpu, font.atlas_size());
/// renderer.prepare(&gpu, &mut layer, &mut font, &screen)?;
/// let stats = renderer.render_to_texture(&gpu, &target_view);
/// ```
pub struct Renderer {
    pipeline: TextPipeline,
    clear_color: Color,
}

impl Renderer {
    /// Create a renderer whose atlas texture is `atlas_size` pixels
    /// square (matching the font atlas it will display).
    pub fn new(gpu: &GpuContext, atlas_size: u32) -> Self {
        Self {
            pipeline: TextPipeline::new(&gpu.device, gpu.target_format, atlas_size),
            clear_color: Color::TRANSPARENT,
        }
    }

    /// Set the background clear color.
    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.clear_color = Color { r, g, b, a };
    }

    /// Run the frame's deferred work and upload whatever changed.
    ///
    /// Order matters: the layer's dirty labels migrate and rewrite their
    /// pool regions first, then the atlas image and pool buffers are
    /// uploaded only if their dirty flags say so.
    pub fn prepare(
        &mut self,
        gpu: &GpuContext,
        layer: &mut TextLayer,
        font: &mut FontAtlas,
        screen: &ScreenUniform,
    ) -> Result<(), RenderError> {
        layer.sync_dirty()?;

        if font.take_dirty() {
            log::debug!("uploading atlas image ({} glyphs)", font.glyph_count());
            self.pipeline
                .upload_atlas(&gpu.queue, font.image(), font.atlas_size());
        }

        let pool = layer.pool_mut();
        if pool.take_dirty() {
            self.pipeline.upload_geometry(
                &gpu.device,
                &gpu.queue,
                pool.vertices(),
                pool.indices(),
            );
        }

        self.pipeline.upload_screen(&gpu.queue, screen);
        Ok(())
    }

    /// Render to an off-screen texture view. Returns frame statistics.
    pub fn render_to_texture(&self, gpu: &GpuContext, target_view: &wgpu::TextureView) -> FrameStats {
        let mut encoder = gpu.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("glint_frame_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("glint_text_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.clear_color),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.pipeline.draw(&mut pass);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));

        let index_count = self.pipeline.index_count();
        FrameStats {
            glyph_count: index_count / 6,
            draw_calls: if index_count > 0 { 1 } else { 0 },
        }
    }

    /// Create an offscreen render target in the context's format.
    pub fn create_target(gpu: &GpuContext, width: u32, height: u32) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glint_offscreen_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.target_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

// ===================================================================
// Tests
// ===================================================================
