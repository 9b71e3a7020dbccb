// The pulse session
//
// A slowly breathing background. Its clock keeps running while it is
// hidden, so switching back to it never shows a jump.
use super::{Session, SessionState};
use crate::input::KeyEvent;
use crate::surface::FrameContent;
use utils::{log, Result};

/// How far the phase advances each iteration
pub const PHASE_STEP: f32 = 0.01;
/// How far a key press moves the hue
pub const HUE_STEP: f32 = 0.1;

pub struct PulseSession;

impl PulseSession {
    pub fn new() -> Self {
        Self
    }
}

impl Session for PulseSession {
    fn name(&self) -> &str {
        "pulse"
    }

    fn setup(&self) -> Result<Box<dyn SessionState>> {
        Ok(Box::new(PulseState::new()))
    }
}

pub(crate) struct PulseState {
    /// Position in the brightness cycle, 0..1
    ps_phase: f32,
    /// 0..1 around the color wheel
    ps_hue: f32,
}

impl PulseState {
    pub(crate) fn new() -> Self {
        Self {
            ps_phase: 0.0,
            ps_hue: 0.0,
        }
    }

    pub(crate) fn phase(&self) -> f32 {
        self.ps_phase
    }

    pub(crate) fn hue(&self) -> f32 {
        self.ps_hue
    }

    fn advance(&mut self) {
        self.ps_phase = (self.ps_phase + PHASE_STEP).fract();
    }

    /// The current color, fully opaque
    pub(crate) fn color(&self) -> [f32; 4] {
        // brightness follows a sine over the phase, 0.2..0.6
        let brightness = 0.4 + 0.2 * (self.ps_phase * std::f32::consts::PI * 2.0).sin();
        let [r, g, b] = hue_to_rgb(self.ps_hue);

        [r * brightness, g * brightness, b * brightness, 1.0]
    }
}

/// Fully saturated color for a hue in 0..1
fn hue_to_rgb(hue: f32) -> [f32; 3] {
    let h = hue.fract() * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();

    match h as u32 {
        0 => [1.0, x, 0.0],
        1 => [x, 1.0, 0.0],
        2 => [0.0, 1.0, x],
        3 => [0.0, x, 1.0],
        4 => [x, 0.0, 1.0],
        _ => [1.0, 0.0, x],
    }
}

impl SessionState for PulseState {
    fn update(&mut self) {
        self.advance();
    }

    fn key_event(&mut self, _ev: &KeyEvent) {
        self.ps_hue = (self.ps_hue + HUE_STEP).fract();
        log::debug!("pulse hue is now {}", self.ps_hue);
    }

    fn draw(&mut self, content: &mut FrameContent) {
        content.clear_color = self.color();
    }

    fn supports_background_update(&self) -> bool {
        true
    }

    fn background_update(&mut self) {
        self.advance();
    }
}
