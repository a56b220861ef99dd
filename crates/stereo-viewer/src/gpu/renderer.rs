use std::collections::HashMap;

use wgpu::{Sampler, Texture, TextureView};

use super::context::GpuContext;
use super::pipeline::QuadPipeline;
use super::uniforms::{SurfaceUniforms, UniformBuffer};
use crate::media::DecodedFrame;
use crate::scene::rig::{StereoRig, StereoTexture, TextureHandle};
use crate::scene::{RenderBackend, RenderError};
use crate::session::{ViewBounds, Views};

/// Scene background, 0x101010.
const BACKGROUND_SRGB: f64 = 16.0 / 255.0;

/// Two views times two surfaces.
const UNIFORM_SLOTS: usize = 4;

struct MediaTexture {
    texture: Texture,
    view: TextureView,
    sampler: Sampler,
    width: u32,
    height: u32,
}

/// Pixel rectangle inside the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Centre the negotiated render area inside the window.
pub fn letterbox(window: (u32, u32), render: (u32, u32)) -> PixelRect {
    let width = render.0.min(window.0) as f32;
    let height = render.1.min(window.1) as f32;
    PixelRect {
        x: ((window.0 as f32 - width) * 0.5).floor(),
        y: ((window.1 as f32 - height) * 0.5).floor(),
        width,
        height,
    }
}

/// Sub-rectangle of `area` covered by a view.
pub fn view_rect(area: PixelRect, bounds: ViewBounds) -> PixelRect {
    PixelRect {
        x: area.x + bounds.x * area.width,
        y: area.y + bounds.y * area.height,
        width: bounds.width * area.width,
        height: bounds.height * area.height,
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Clear colour for the background; sRGB targets expect linear values.
pub fn background_color(srgb_target: bool) -> wgpu::Color {
    let c = if srgb_target {
        srgb_to_linear(BACKGROUND_SRGB)
    } else {
        BACKGROUND_SRGB
    };
    wgpu::Color {
        r: c,
        g: c,
        b: c,
        a: 1.0,
    }
}

/// wgpu implementation of the stereo render backend.
pub struct GpuBackend {
    gpu: GpuContext,
    pipeline: QuadPipeline,
    textures: HashMap<TextureHandle, MediaTexture>,
    uniforms: Vec<UniformBuffer>,
    next_handle: u64,
    render_size: (u32, u32),
}

impl GpuBackend {
    pub fn new(gpu: GpuContext) -> Self {
        let pipeline = QuadPipeline::new(&gpu.device, gpu.format);
        let uniforms = (0..UNIFORM_SLOTS)
            .map(|i| UniformBuffer::new(&gpu.device, &format!("eye-surface-uniforms-{i}")))
            .collect();
        let render_size = (gpu.surface_config.width, gpu.surface_config.height);
        Self {
            gpu,
            pipeline,
            textures: HashMap::new(),
            uniforms,
            next_handle: 0,
            render_size,
        }
    }

    /// Reconfigure the swapchain for a new window size.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.gpu.surface_config.width, self.gpu.surface_config.height)
    }
}

impl RenderBackend for GpuBackend {
    fn create_media_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, RenderError> {
        let limit = self.gpu.device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(RenderError::Surface(format!(
                "media {width}x{height} exceeds GPU texture limit {limit}"
            )));
        }

        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stereo-media-texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("stereo-media-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        self.next_handle += 1;
        let handle = TextureHandle(self.next_handle);
        self.textures.insert(
            handle,
            MediaTexture {
                texture,
                view,
                sampler,
                width,
                height,
            },
        );
        log::debug!("Created media texture {handle:?} ({width}x{height})");
        Ok(handle)
    }

    fn update_texture(
        &mut self,
        texture: &StereoTexture,
        frame: &DecodedFrame,
    ) -> Result<(), RenderError> {
        let tex = self
            .textures
            .get(&texture.handle)
            .ok_or(RenderError::UnknownTexture(texture.handle.0))?;
        if frame.width != tex.width || frame.height != tex.height {
            log::warn!(
                "Frame {}x{} does not match texture {}x{}, skipping upload",
                frame.width,
                frame.height,
                tex.width,
                tex.height
            );
            return Ok(());
        }

        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * frame.width),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: frame.width,
                height: frame.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn set_render_size(&mut self, width: u32, height: u32) {
        self.render_size = (width, height);
    }

    fn render(&mut self, rig: &StereoRig, views: &Views) -> Result<(), RenderError> {
        let tex = self
            .textures
            .get(&rig.texture().handle)
            .ok_or(RenderError::UnknownTexture(rig.texture().handle.0))?;

        let output = self.gpu.surface.get_current_texture().map_err(|e| match e {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => RenderError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
            other => RenderError::Surface(other.to_string()),
        })?;
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let device = &self.gpu.device;
        let area = letterbox(self.window_size(), self.render_size);

        // Uniforms and bind groups first; the pass borrows them.
        let mut draws = Vec::with_capacity(UNIFORM_SLOTS);
        for (view_idx, view) in views.iter().enumerate() {
            let rect = view_rect(area, view.bounds);
            let view_proj = view.view_projection();
            for (surface_idx, surface) in rig.surfaces().iter().enumerate() {
                if !view.sees(surface) {
                    continue;
                }
                let slot = &self.uniforms[view_idx * 2 + surface_idx];
                slot.update(
                    &self.gpu.queue,
                    &SurfaceUniforms::new(view_proj * surface.model_matrix(), &surface.uv),
                );
                let bind_group = slot.create_bind_group(
                    device,
                    &self.pipeline.bind_group_layout,
                    &tex.view,
                    &tex.sampler,
                );
                draws.push((rect, bind_group));
            }
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("stereo-frame-encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stereo-frame-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(background_color(self.gpu.format.is_srgb())),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline.pipeline);
            for (rect, bind_group) in &draws {
                if rect.width < 1.0 || rect.height < 1.0 {
                    continue;
                }
                pass.set_viewport(rect.x, rect.y, rect.width, rect.height, 0.0, 1.0);
                pass.set_scissor_rect(
                    rect.x as u32,
                    rect.y as u32,
                    rect.width as u32,
                    rect.height as u32,
                );
                pass.set_bind_group(0, bind_group, &[]);
                pass.draw(0..6, 0..1);
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
