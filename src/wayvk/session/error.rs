// The error session
//
// A plain red screen telling the user a session died. It is always
// registered so there is somewhere to switch to.
use super::{Session, SessionState};
use crate::input::KeyEvent;
use crate::surface::FrameContent;
use utils::{log, Result};

pub const ERROR_MESSAGE: &str = "The session closed unexpectedly.";
pub const ERROR_COLOR: [f32; 4] = [0.7, 0.0, 0.0, 1.0];

pub struct ErrorSession;

impl ErrorSession {
    pub fn new() -> Self {
        Self
    }
}

impl Session for ErrorSession {
    fn name(&self) -> &str {
        "error"
    }

    fn setup(&self) -> Result<Box<dyn SessionState>> {
        Ok(Box::new(ErrorState {
            es_message: ERROR_MESSAGE,
        }))
    }
}

struct ErrorState {
    es_message: &'static str,
}

impl SessionState for ErrorState {
    fn shown(&mut self) {
        log::error!("{}", self.es_message);
    }

    fn update(&mut self) {}

    fn key_event(&mut self, ev: &KeyEvent) {
        log::debug!("error session ignoring key {} ({:?})", ev.key, ev.mods);
    }

    fn draw(&mut self, content: &mut FrameContent) {
        content.clear_color = ERROR_COLOR;
    }
}
