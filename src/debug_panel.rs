//! Debug panel bound to the live pipeline parameters
//!
//! The panel holds a weak handle; once the pipeline is gone every edit is
//! dropped. Values are only clamped and snapped to the slider declaration.

use std::cell::RefCell;
use std::rc::Weak;

use crate::frame::FrameStats;
use crate::pipeline::PipelineParameters;
use crate::resources::Color;

/// Range and step of a numeric slider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderSpec {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SliderSpec {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    /// Snap to the step grid anchored at `min`, then clamp.
    pub fn apply(&self, value: f32) -> f32 {
        let snapped = if self.step > 0.0 {
            self.min + ((value - self.min) / self.step).round() * self.step
        } else {
            value
        };
        snapped.clamp(self.min, self.max)
    }
}

pub const BLOOM_STRENGTH: SliderSpec = SliderSpec::new(0.0, 3.0, 0.001);
pub const BLOOM_RADIUS: SliderSpec = SliderSpec::new(0.0, 2.0, 0.001);
pub const BLOOM_THRESHOLD: SliderSpec = SliderSpec::new(0.0, 1.0, 0.001);

/// One change made in the panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterEdit {
    BloomEnabled(bool),
    BloomStrength(f32),
    BloomRadius(f32),
    BloomThreshold(f32),
    /// sRGB bytes as shown by the color picker
    ClearColor([u8; 3]),
}

/// Read-only status shown alongside the controls
#[derive(Debug, Clone, Copy)]
pub struct PanelStatus<'a> {
    pub stats: &'a FrameStats,
    pub load_error: Option<&'a str>,
    pub loading: bool,
}

pub struct DebugPanel {
    params: Weak<RefCell<PipelineParameters>>,
    pub open: bool,
}

impl DebugPanel {
    pub fn new(params: Weak<RefCell<PipelineParameters>>) -> Self {
        Self { params, open: true }
    }

    /// Whether the parameters it edits still exist
    pub fn is_attached(&self) -> bool {
        self.params.strong_count() > 0
    }

    /// Write one edit through to the parameters. Returns `false` when the
    /// pipeline is gone.
    pub fn apply(&self, edit: ParameterEdit) -> bool {
        let Some(params) = self.params.upgrade() else {
            return false;
        };
        let mut params = params.borrow_mut();
        match edit {
            ParameterEdit::BloomEnabled(enabled) => params.bloom_enabled = enabled,
            ParameterEdit::BloomStrength(v) => params.bloom_strength = BLOOM_STRENGTH.apply(v),
            ParameterEdit::BloomRadius(v) => params.bloom_radius = BLOOM_RADIUS.apply(v),
            ParameterEdit::BloomThreshold(v) => params.bloom_threshold = BLOOM_THRESHOLD.apply(v),
            ParameterEdit::ClearColor(rgb) => params.clear_color = Color::from_srgb8(rgb),
        }
        log::trace!("Panel edit {:?}", edit);
        true
    }

    /// Draw the panel. Edits are applied immediately.
    pub fn show(&mut self, ctx: &egui::Context, status: PanelStatus<'_>) {
        let Some(current) = self.params.upgrade().map(|p| p.borrow().clone()) else {
            return;
        };

        let mut edits = Vec::new();
        let mut open = self.open;

        egui::Window::new("Debug")
            .open(&mut open)
            .default_width(260.0)
            .show(ctx, |ui| {
                let mut enabled = current.bloom_enabled;
                if ui.checkbox(&mut enabled, "Bloom").changed() {
                    edits.push(ParameterEdit::BloomEnabled(enabled));
                }

                ui.add_enabled_ui(current.bloom_enabled, |ui| {
                    if let Some(v) = slider(ui, "Strength", current.bloom_strength, BLOOM_STRENGTH) {
                        edits.push(ParameterEdit::BloomStrength(v));
                    }
                    if let Some(v) = slider(ui, "Radius", current.bloom_radius, BLOOM_RADIUS) {
                        edits.push(ParameterEdit::BloomRadius(v));
                    }
                    if let Some(v) = slider(ui, "Threshold", current.bloom_threshold, BLOOM_THRESHOLD) {
                        edits.push(ParameterEdit::BloomThreshold(v));
                    }
                });

                ui.horizontal(|ui| {
                    ui.label("Clear color");
                    let mut rgb = current.clear_color.to_srgb8();
                    if ui.color_edit_button_srgb(&mut rgb).changed() {
                        edits.push(ParameterEdit::ClearColor(rgb));
                    }
                });

                ui.separator();
                ui.label(format!(
                    "{:.0} FPS  |  {:.1}s",
                    status.stats.fps(),
                    status.stats.elapsed().as_secs_f32()
                ));
                if status.loading {
                    ui.label("Loading scene...");
                }
                if let Some(err) = status.load_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }
            });

        self.open = open;
        for edit in edits {
            self.apply(edit);
        }
    }
}

fn slider(ui: &mut egui::Ui, label: &str, value: f32, spec: SliderSpec) -> Option<f32> {
    let mut v = value;
    let response = ui.add(
        egui::Slider::new(&mut v, spec.min..=spec.max)
            .step_by(spec.step as f64)
            .text(label),
    );
    response.changed().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_slider_snaps_and_clamps() {
        let spec = SliderSpec::new(0.0, 1.0, 0.25);
        assert_eq!(spec.apply(0.3), 0.25);
        assert_eq!(spec.apply(0.4), 0.5);
        assert_eq!(spec.apply(7.0), 1.0);
        assert_eq!(spec.apply(-1.0), 0.0);
    }

    #[test]
    fn test_edits_write_through() {
        let params = Rc::new(RefCell::new(PipelineParameters::default()));
        let panel = DebugPanel::new(Rc::downgrade(&params));

        assert!(panel.apply(ParameterEdit::BloomEnabled(true)));
        assert!(panel.apply(ParameterEdit::BloomStrength(5.0)));
        assert!(panel.apply(ParameterEdit::ClearColor([0xff, 0x00, 0x00])));

        let params = params.borrow();
        assert!(params.bloom_enabled);
        assert_eq!(params.bloom_strength, 3.0);
        assert_eq!(params.clear_color.to_hex(), 0xff0000);
    }

    #[test]
    fn test_detached_panel_drops_edits() {
        let params = Rc::new(RefCell::new(PipelineParameters::default()));
        let panel = DebugPanel::new(Rc::downgrade(&params));
        drop(params);

        assert!(!panel.is_attached());
        assert!(!panel.apply(ParameterEdit::BloomEnabled(true)));
    }
}
