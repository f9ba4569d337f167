//! Debug panel overlay drawn with egui-wgpu
//!
//! Renders the egui overlay straight onto the swapchain image, after the
//! output pass and before present.

use egui::ViewportId;
use egui_wgpu::ScreenDescriptor;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::backend::traits::FrameContext;
use crate::backend::wgpu_backend::WgpuBackend;

pub struct WgpuEguiIntegration {
    context: egui::Context,
    input: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    /// Tessellated output of the last [`Self::run`], consumed by [`Self::paint`]
    primitives: Vec<egui::ClippedPrimitive>,
    texture_updates: egui::TexturesDelta,
    /// Surface pixels per window pixel. Below 1 when the pixel ratio is
    /// clamped and the surface is smaller than the window.
    input_scale: f32,
}

impl WgpuEguiIntegration {
    pub fn new(backend: &WgpuBackend, window: &Window) -> Self {
        let context = egui::Context::default();
        let input = egui_winit::State::new(
            context.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );

        // Single-sampled and without depth, like the swapchain it draws on
        let renderer =
            egui_wgpu::Renderer::new(backend.device(), backend.wgpu_surface_format(), None, 1);

        Self {
            context,
            input,
            renderer,
            primitives: Vec::new(),
            texture_updates: egui::TexturesDelta::default(),
            input_scale: 1.0,
        }
    }

    /// Update the window → surface scale after a resize.
    pub fn set_surface_scale(&mut self, window_size: (u32, u32), surface_size: (u32, u32)) {
        if window_size.0 == 0 || window_size.1 == 0 {
            return;
        }
        let scale_x = surface_size.0 as f32 / window_size.0 as f32;
        let scale_y = surface_size.1 as f32 / window_size.1 as f32;
        self.input_scale = scale_x.min(scale_y);
    }

    /// Handle a winit window event. Returns whether egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let scaled = match event {
            WindowEvent::CursorMoved {
                device_id,
                position,
            } if self.input_scale != 1.0 => Some(WindowEvent::CursorMoved {
                device_id: *device_id,
                position: winit::dpi::PhysicalPosition::new(
                    position.x * self.input_scale as f64,
                    position.y * self.input_scale as f64,
                ),
            }),
            _ => None,
        };

        self.input
            .on_window_event(window, scaled.as_ref().unwrap_or(event))
            .consumed
    }

    /// Run one UI frame and tessellate it for [`Self::paint`].
    pub fn run(&mut self, window: &Window, build_ui: impl FnOnce(&egui::Context)) {
        let mut raw_input = self.input.take_egui_input(window);
        if self.input_scale != 1.0 {
            if let Some(rect) = &mut raw_input.screen_rect {
                rect.max.x *= self.input_scale;
                rect.max.y *= self.input_scale;
            }
        }

        let output = self.context.run(raw_input, build_ui);
        self.input.handle_platform_output(window, output.platform_output);
        self.primitives = self.context.tessellate(output.shapes, output.pixels_per_point);
        self.texture_updates = output.textures_delta;
    }

    /// Draw the last UI frame onto the swapchain image of `frame`.
    pub fn paint(&mut self, backend: &mut WgpuBackend, frame: &FrameContext) {
        let screen = ScreenDescriptor {
            size_in_pixels: [frame.width, frame.height],
            pixels_per_point: self.context.pixels_per_point(),
        };
        let updates = std::mem::take(&mut self.texture_updates);

        let (device, queue, encoder) = backend.device_queue_encoder();
        for (id, delta) in &updates.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        if let Some(encoder) = encoder {
            self.renderer
                .update_buffers(device, queue, encoder, &self.primitives, &screen);
        }

        backend.render_egui(&self.renderer, &self.primitives, &screen, frame.swapchain_view);

        // Freed only after the frame that last used them was recorded
        for id in &updates.free {
            self.renderer.free_texture(id);
        }
    }
}
