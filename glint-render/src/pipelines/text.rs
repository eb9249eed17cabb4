//! Text render pipeline — one indexed draw call over a geometry pool's
//! vertex/index arrays, sampling a single glyph atlas texture.

use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState,
    Buffer, BufferBindingType, BufferDescriptor, BufferUsages, ColorTargetState, ColorWrites,
    Device, Extent3d, FilterMode, FragmentState, FrontFace, IndexFormat, MultisampleState,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PolygonMode, PrimitiveState,
    PrimitiveTopology, Queue, RenderPass, RenderPipeline, RenderPipelineDescriptor,
    SamplerBindingType, SamplerDescriptor, ShaderModuleDescriptor, ShaderStages, Texture,
    TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType, TextureUsages,
    TextureViewDimension, VertexState,
};

use crate::vertex::{ScreenUniform, TextVertex};

/// Initial buffer capacities; buffers grow by doubling when exceeded.
const INITIAL_VERTEX_CAPACITY: usize = 4 * 1024;
const INITIAL_INDEX_CAPACITY: usize = 6 * 1024;

/// Owns the wgpu pipeline, geometry buffers, atlas texture, and bind
/// groups for text.
pub struct TextPipeline {
    pipeline: RenderPipeline,

    vertex_buffer: Buffer,
    vertex_capacity: usize,
    index_buffer: Buffer,
    index_capacity: usize,
    index_count: u32,

    screen_buffer: Buffer,
    screen_bind_group: BindGroup,

    atlas_texture: Texture,
    atlas_bind_group: BindGroup,
    atlas_size: u32,
}

impl TextPipeline {
    /// Create the text pipeline and allocate GPU buffers.
    ///
    /// `atlas_size` is the width = height of the glyph atlas texture.
    pub fn new(device: &Device, target_format: TextureFormat, atlas_size: u32) -> Self {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("glint_text_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/text.wgsl").into()),
        });

        // ── Screen bind group layout (group 0) ──────────────────
        let screen_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("glint_screen_bgl"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // ── Atlas bind group layout (group 1) ───────────────────
        let atlas_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("glint_atlas_bgl"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("glint_text_pipeline_layout"),
            bind_group_layouts: &[&screen_bgl, &atlas_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("glint_text_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[TextVertex::layout()],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: target_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = Self::make_vertex_buffer(device, INITIAL_VERTEX_CAPACITY);
        let index_buffer = Self::make_index_buffer(device, INITIAL_INDEX_CAPACITY);

        let screen_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("glint_screen_ub"),
            size: std::mem::size_of::<ScreenUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let screen_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("glint_screen_bg"),
            layout: &screen_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: screen_buffer.as_entire_binding(),
            }],
        });

        let atlas_texture = Self::make_atlas_texture(device, atlas_size);
        let atlas_bind_group = Self::make_atlas_bind_group(device, &atlas_bgl, &atlas_texture);

        Self {
            pipeline,
            vertex_buffer,
            vertex_capacity: INITIAL_VERTEX_CAPACITY,
            index_buffer,
            index_capacity: INITIAL_INDEX_CAPACITY,
            index_count: 0,
            screen_buffer,
            screen_bind_group,
            atlas_texture,
            atlas_bind_group,
            atlas_size,
        }
    }

    fn make_vertex_buffer(device: &Device, capacity: usize) -> Buffer {
        device.create_buffer(&BufferDescriptor {
            label: Some("glint_text_vb"),
            size: (capacity * std::mem::size_of::<TextVertex>()) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn make_index_buffer(device: &Device, capacity: usize) -> Buffer {
        device.create_buffer(&BufferDescriptor {
            label: Some("glint_text_ib"),
            size: (capacity * std::mem::size_of::<u32>()) as u64,
            usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn make_atlas_texture(device: &Device, size: u32) -> Texture {
        device.create_texture(&TextureDescriptor {
            label: Some("glint_glyph_atlas"),
            size: Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    fn make_atlas_bind_group(
        device: &Device,
        layout: &BindGroupLayout,
        texture: &Texture,
    ) -> BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("glint_glyph_atlas_sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("glint_atlas_bg"),
            layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&sampler),
                },
            ],
        })
    }

    // ───────────────────── Upload ─────────────────────────────────

    /// Upload a geometry pool's vertex and index arrays, growing the GPU
    /// buffers by doubling when they run out of room.
    pub fn upload_geometry(
        &mut self,
        device: &Device,
        queue: &Queue,
        vertices: &[TextVertex],
        indices: &[u32],
    ) {
        if vertices.len() > self.vertex_capacity {
            while vertices.len() > self.vertex_capacity {
                self.vertex_capacity *= 2;
            }
            self.vertex_buffer = Self::make_vertex_buffer(device, self.vertex_capacity);
            log::debug!("text vb grown to {} vertices", self.vertex_capacity);
        }
        if indices.len() > self.index_capacity {
            while indices.len() > self.index_capacity {
                self.index_capacity *= 2;
            }
            self.index_buffer = Self::make_index_buffer(device, self.index_capacity);
            log::debug!("text ib grown to {} indices", self.index_capacity);
        }

        if !vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        }
        if !indices.is_empty() {
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(indices));
        }
        self.index_count = indices.len() as u32;
    }

    /// Upload the screen uniform for this frame.
    pub fn upload_screen(&self, queue: &Queue, screen: &ScreenUniform) {
        queue.write_buffer(&self.screen_buffer, 0, bytemuck::bytes_of(screen));
    }

    /// Upload the full atlas image (RGBA, `atlas_size` × `atlas_size`).
    ///
    /// Call whenever the atlas reports itself dirty. `size` must match
    /// the size the pipeline was created with; atlases never resize.
    pub fn upload_atlas(&self, queue: &Queue, data: &[u8], size: u32) {
        debug_assert_eq!(size, self.atlas_size, "atlas size is fixed at creation");
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.atlas_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size * 4), // RGBA
                rows_per_image: Some(size),
            },
            Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }

    // ───────────────────── Draw ───────────────────────────────────

    /// Record draw commands into the render pass.
    ///
    /// One indexed draw call covering every allocation in the pool.
    pub fn draw<'a>(&'a self, pass: &mut RenderPass<'a>) {
        if self.index_count == 0 {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.screen_bind_group, &[]);
        pass.set_bind_group(1, &self.atlas_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    /// Number of indices the next draw will cover.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
