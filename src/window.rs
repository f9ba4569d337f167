//! Window management using winit

use std::sync::Arc;

use glam::Vec2;
use winit::{
    dpi::LogicalSize,
    error::OsError,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    window::{Window as WinitWindow, WindowBuilder},
};

use crate::frame::FrameHost;
use crate::scene::CameraInput;

/// Pixels per scroll line when the platform reports pixel deltas
const PIXELS_PER_LINE: f32 = 40.0;

/// The viewer window. Frames are scheduled through redraw requests.
pub struct WindowHost {
    window: Arc<WinitWindow>,
}

impl WindowHost {
    /// Create a window whose inner size is `width` x `height` logical pixels.
    pub fn new(
        event_loop: &EventLoop<()>,
        title: &str,
        width: u32,
        height: u32,
    ) -> Result<Self, OsError> {
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(LogicalSize::new(width, height))
            .build(event_loop)?;

        Ok(Self {
            window: Arc::new(window),
        })
    }

    pub fn window(&self) -> &WinitWindow {
        &self.window
    }

    /// Shared handle for the graphics backend
    pub fn window_arc(&self) -> Arc<WinitWindow> {
        Arc::clone(&self.window)
    }

    /// Device pixel ratio
    pub fn scale_factor(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    /// Inner size in logical pixels
    pub fn logical_size(&self) -> (u32, u32) {
        let size: LogicalSize<f64> = self.window.inner_size().to_logical(self.window.scale_factor());
        (size.width.round() as u32, size.height.round() as u32)
    }

    /// Inner size in window pixels
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

impl FrameHost for WindowHost {
    fn request_frame(&self) {
        self.window.request_redraw();
    }
}

/// Turns mouse events into [`CameraInput`].
///
/// Left button orbits, right button pans, the wheel dollies.
#[derive(Debug, Default)]
pub struct PointerTracker {
    last_position: Option<Vec2>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one window event. Returns whether it was a pointer event.
    pub fn handle_event(&mut self, event: &WindowEvent, input: &mut CameraInput) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32), input);
            }
            WindowEvent::CursorLeft { .. } => {
                self.last_position = None;
            }
            WindowEvent::MouseInput { state, button, .. } => {
                Self::button(*button, *state == ElementState::Pressed, input);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                Self::scroll(*delta, input);
            }
            _ => return false,
        }
        true
    }

    pub fn cursor_moved(&mut self, position: Vec2, input: &mut CameraInput) {
        if let Some(last) = self.last_position {
            input.mouse_delta += position - last;
        }
        self.last_position = Some(position);
    }

    pub fn button(button: MouseButton, pressed: bool, input: &mut CameraInput) {
        match button {
            MouseButton::Left => input.rotate_active = pressed,
            MouseButton::Right => input.pan_active = pressed,
            _ => {}
        }
    }

    pub fn scroll(delta: MouseScrollDelta, input: &mut CameraInput) {
        input.scroll_delta += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
        };
    }

    /// Drop held buttons, e.g. when the panel grabs the pointer.
    pub fn release(input: &mut CameraInput) {
        input.rotate_active = false;
        input.pan_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn test_first_cursor_position_has_no_delta() {
        let mut tracker = PointerTracker::new();
        let mut input = CameraInput::new();

        tracker.cursor_moved(Vec2::new(100.0, 100.0), &mut input);
        assert_eq!(input.mouse_delta, Vec2::ZERO);

        tracker.cursor_moved(Vec2::new(110.0, 95.0), &mut input);
        tracker.cursor_moved(Vec2::new(112.0, 95.0), &mut input);
        assert_eq!(input.mouse_delta, Vec2::new(12.0, -5.0));
    }

    #[test]
    fn test_buttons_map_to_orbit_and_pan() {
        let mut input = CameraInput::new();
        PointerTracker::button(MouseButton::Left, true, &mut input);
        PointerTracker::button(MouseButton::Right, true, &mut input);
        assert!(input.rotate_active && input.pan_active);

        PointerTracker::button(MouseButton::Left, false, &mut input);
        assert!(!input.rotate_active);

        PointerTracker::release(&mut input);
        assert!(!input.pan_active);
    }

    #[test]
    fn test_scroll_units() {
        let mut input = CameraInput::new();
        PointerTracker::scroll(MouseScrollDelta::LineDelta(0.0, 1.0), &mut input);
        PointerTracker::scroll(
            MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 80.0)),
            &mut input,
        );
        assert_eq!(input.scroll_delta, 3.0);
    }
}
