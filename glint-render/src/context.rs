//! GPU context — owns the `wgpu::Device` and `Queue`.
//!
//! glint renders text into caller-provided texture views; window and
//! surface management belong to the embedding application, so the
//! context here is headless only.

use thiserror::Error;
use wgpu::{
    Adapter, Device, DeviceDescriptor, Instance, InstanceDescriptor, Queue,
    RequestAdapterOptions, TextureFormat,
};

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// Core GPU state shared by the text pipeline.
pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub adapter: Adapter,
    /// Format of the render targets the pipeline draws into.
    pub target_format: TextureFormat,
}

impl GpuContext {
    /// Create a headless context (no window, no surface).
    pub async fn new() -> Result<Self, GpuError> {
        let instance = Instance::new(&InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("glint-device"),
                    ..Default::default()
                },
                None,
            )
            .await?;

        Ok(Self {
            device,
            queue,
            adapter,
            // Rgba8UnormSrgb is universally renderable and matches the
            // offscreen targets created by `Renderer::create_target`.
            target_format: TextureFormat::Rgba8UnormSrgb,
        })
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_context() {
        // May fail in CI without a GPU — skip gracefully.
        if let Ok(ctx) = pollster::block_on(GpuContext::new()) {
            assert_eq!(ctx.target_format, TextureFormat::Rgba8UnormSrgb);
        }
    }
}
