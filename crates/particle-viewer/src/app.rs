use crate::{
    loading::BackgroundLoad,
    nav::{cursor_to_ndc, digit_gesture, ScrollNavigator, LINE_HEIGHT_PX},
    renderer::Renderer,
    ui::{self, HudState},
};
use anyhow::Result;
use glam::Vec2;
use particle_morph::{Gesture, PointCloudLoader, SceneContext};
use std::{sync::Arc, time::Instant};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::PhysicalKey,
    window::Window,
};

pub struct App {
    pub renderer: Renderer,
    pub scene: SceneContext,
    pub nav: ScrollNavigator,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    started: Instant,
    cursor: Option<PhysicalPosition<f64>>,
    pending: Option<BackgroundLoad>,
}

impl App {
    pub async fn new(window: Arc<Window>, scene: SceneContext) -> Result<Self> {
        let renderer = Renderer::new(window.clone(), scene.device()).await?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        let mut app = Self {
            renderer,
            scene,
            nav: ScrollNavigator::default(),
            egui_ctx,
            egui_state,
            started: Instant::now(),
            cursor: None,
            pending: None,
        };
        app.scene.set_aspect(app.renderer.gfx.aspect());
        Ok(app)
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Start resolving every configured gesture on a worker thread. The HUD
    /// shows the loading state until [`App::poll_loading`] installs the result.
    pub fn begin_load(&mut self, loader: PointCloudLoader) -> Result<()> {
        let table = self
            .scene
            .config()
            .shape_table()
            .map(|(gesture, shape)| (gesture, shape.clone()))
            .collect();
        self.pending = Some(BackgroundLoad::spawn(loader, table)?);
        Ok(())
    }

    /// Install the registry once the worker delivers it. Returns `true` on the
    /// call that installed it.
    pub fn poll_loading(&mut self) -> Result<bool> {
        let Some(done) = self.pending.as_ref().and_then(BackgroundLoad::try_take) else {
            return Ok(false);
        };
        let elapsed = self.pending.take().map(|load| load.elapsed()).unwrap_or_default();

        self.scene.install(done?)?;
        if let Some(current) = self.scene.current() {
            self.nav.jump_to(current);
        }
        log::info!(
            "Scene ready: {} particles in {:.2?}",
            self.scene.particle_count(),
            elapsed
        );
        Ok(true)
    }

    pub fn request(&mut self, gesture: Gesture) {
        let now = self.now_ms();
        match self.scene.request_state(gesture, now) {
            Ok(true) => {
                log::debug!("Requested {}", gesture);
                self.nav.jump_to(gesture);
            }
            Ok(false) => {}
            Err(err) => log::warn!("Cannot switch to {}: {}", gesture, err),
        }
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size);
            self.scene.set_aspect(self.renderer.gfx.aspect());
        }
    }

    fn pixel(pos: PhysicalPosition<f64>) -> Vec2 {
        Vec2::new(pos.x as f32, pos.y as f32)
    }

    /// Returns `true` when the event was consumed.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return true;
        }

        match event {
            WindowEvent::Resized(physical_size) => self.resize(*physical_size),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(*position);
                let size = self.renderer.gfx.size;
                self.scene
                    .set_pointer(cursor_to_ndc(position.x, position.y, size.width, size.height));
                self.scene.pointer_move(Self::pixel(*position));
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.scene.set_pointer(None);
                self.scene.pointer_up();
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    if let Some(pos) = self.cursor {
                        self.scene.pointer_down(Self::pixel(pos));
                    }
                }
                ElementState::Released => self.scene.pointer_up(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y * LINE_HEIGHT_PX,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32,
                };
                // Wheel up reports positive deltas; scrolling down the page is positive here.
                if let Some(gesture) = self.nav.scroll(-dy) {
                    self.request(gesture);
                }
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(gesture) = digit_gesture(code) {
                        self.request(gesture);
                        return true;
                    }
                }
            }
            _ => {}
        }

        false
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let now = self.now_ms();
        self.scene.tick(now, &mut self.renderer.sink());

        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.render(&swap_view);

        let hud = HudState {
            flags: self.scene.flags(),
            current: self.scene.current(),
            morph_progress: self.scene.morph_progress(),
            particle_count: self.scene.particle_count(),
            device: self.scene.device(),
        };

        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);
        let clicked = ui::draw_hud(&self.egui_ctx, &hud);
        let egui_output = self.egui_ctx.end_frame();

        self.egui_state
            .handle_platform_output(window, egui_output.platform_output);

        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.renderer.gfx.config.width,
                self.renderer.gfx.config.height,
            ],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .renderer
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        self.renderer.egui_renderer.update_buffers(
            &self.renderer.gfx.device,
            &self.renderer.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        self.renderer
            .gfx
            .queue
            .submit(std::iter::once(encoder.finish()));
        frame.present();

        if let Some(gesture) = clicked {
            self.request(gesture);
        }

        Ok(())
    }

    /// Tear the scene down and drop its GPU buffers. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.scene.teardown(&mut self.renderer.sink());
    }
}
