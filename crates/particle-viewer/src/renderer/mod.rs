//! Owns the GPU context, the particle pipeline and the egui renderer.

pub mod context;
pub mod particles;

use self::{
    context::GfxContext,
    particles::{ParticlePipeline, ParticleSink},
};
use particle_morph::DeviceClass;
use std::sync::Arc;
use winit::window::Window;

const CLEAR: wgpu::Color = wgpu::Color {
    r: 0.005,
    g: 0.007,
    b: 0.015,
    a: 1.0,
};

pub struct Renderer {
    pub gfx: GfxContext,
    pub particles: ParticlePipeline,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, device_class: DeviceClass) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window, device_class).await?;
        let particles = ParticlePipeline::new(&gfx.device, gfx.config.format);
        let egui_renderer =
            egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        Ok(Self {
            gfx,
            particles,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.gfx.resize(new_size);
    }

    /// Upload target for this frame's scene tick.
    pub fn sink(&mut self) -> ParticleSink<'_> {
        ParticleSink {
            device: &self.gfx.device,
            queue: &self.gfx.queue,
            particles: &mut self.particles,
        }
    }

    pub fn render(&mut self, swap_view: &wgpu::TextureView) {
        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.particles.draw(&mut pass);
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}
