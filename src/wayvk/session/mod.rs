// Sessions
//
// A session is one independently switchable screen, something like a
// virtual terminal. Many may be registered but only the active one is
// drawn. The registry keeps them in order, tracks which one is active
// and makes sure each sees a consistent shown/hidden/cleanup sequence.
//
// Austin Shafer - 2020
pub mod error;
pub mod pulse;

#[cfg(test)]
mod tests;

use crate::frame::Drained;
use crate::input::KeyEvent;
use crate::surface::FrameContent;
use utils::{log, Context, Result};

pub use error::ErrorSession;
pub use pulse::PulseSession;

/// A session descriptor
///
/// This is the stateless half of a session. It is asked once, at
/// registration, to create the runtime state which does the real work.
pub trait Session {
    fn name(&self) -> &str;

    /// Create this session's private state
    ///
    /// Failing here is fatal to the whole program.
    fn setup(&self) -> Result<Box<dyn SessionState>>;
}

/// The runtime half of a session
///
/// This is exclusively owned by one SessionHandler, which calls into it
/// from the main loop.
pub trait SessionState {
    /// This session became the active one
    fn shown(&mut self) {}
    /// Another session became the active one
    fn hidden(&mut self) {}
    /// Called once per iteration while active
    fn update(&mut self);
    /// A key was pressed while this session was active
    fn key_event(&mut self, ev: &KeyEvent);
    /// Describe what this frame should look like
    fn draw(&mut self, content: &mut FrameContent);

    /// Does this session want `background_update` while inactive
    fn supports_background_update(&self) -> bool {
        false
    }
    /// Called once per iteration while inactive, if supported. This
    /// must not present anything.
    fn background_update(&mut self) {}

    /// Release everything. No GPU work referencing this session is
    /// outstanding when this runs.
    fn cleanup(self: Box<Self>) {}
}

/// Binds a session descriptor to its state
pub struct SessionHandler {
    sh_session: Box<dyn Session>,
    /// None once cleaned up
    sh_state: Option<Box<dyn SessionState>>,
    sh_visible: bool,
}

impl SessionHandler {
    /// Run the session's setup and take ownership of the result
    pub fn new(session: Box<dyn Session>) -> Result<Self> {
        let state = session
            .setup()
            .with_context(|| format!("Could not set up session {}", session.name()))?;

        Ok(Self {
            sh_session: session,
            sh_state: Some(state),
            sh_visible: false,
        })
    }

    pub fn name(&self) -> &str {
        self.sh_session.name()
    }

    pub fn is_visible(&self) -> bool {
        self.sh_visible
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.sh_state.is_none()
    }

    fn show(&mut self) {
        if let Some(state) = self.sh_state.as_mut() {
            state.shown();
            self.sh_visible = true;
        }
    }

    fn hide(&mut self) {
        if let Some(state) = self.sh_state.as_mut() {
            state.hidden();
            self.sh_visible = false;
        }
    }

    fn update(&mut self) {
        if let Some(state) = self.sh_state.as_mut() {
            state.update();
        }
    }

    fn key_event(&mut self, ev: &KeyEvent) {
        if let Some(state) = self.sh_state.as_mut() {
            state.key_event(ev);
        }
    }

    fn draw(&mut self, content: &mut FrameContent) {
        if let Some(state) = self.sh_state.as_mut() {
            state.draw(content);
        }
    }

    /// Returns true if the session had a background update to run
    fn background_update(&mut self) -> bool {
        match self.sh_state.as_mut() {
            Some(state) if state.supports_background_update() => {
                state.background_update();
                true
            }
            _ => false,
        }
    }

    fn cleanup(&mut self) {
        if let Some(state) = self.sh_state.take() {
            log::debug!("Cleaning up session {}", self.name());
            state.cleanup();
            self.sh_visible = false;
        }
    }
}

/// The ordered set of sessions
///
/// Sessions are addressed by their registration index. Exactly one is
/// active once anything has been registered, the first registration
/// becomes active and is shown straight away.
pub struct SessionRegistry {
    sr_handlers: Vec<SessionHandler>,
    sr_active: usize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sr_handlers: Vec::new(),
            sr_active: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.sr_handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sr_handlers.is_empty()
    }

    pub fn active(&self) -> usize {
        self.sr_active
    }

    pub fn get(&self, index: usize) -> Option<&SessionHandler> {
        self.sr_handlers.get(index)
    }

    /// Set up a session and append it, returning its index
    pub fn register(&mut self, session: Box<dyn Session>) -> Result<usize> {
        let mut handler = SessionHandler::new(session)?;
        let index = self.sr_handlers.len();
        log::debug!("Registered session {} as {}", handler.name(), index);

        if index == self.sr_active {
            handler.show();
        }
        self.sr_handlers.push(handler);

        Ok(index)
    }

    /// Make `index` the active session
    ///
    /// Hides the current session and then shows the new one. Returns
    /// false and does nothing if `index` is already active or isn't a
    /// registered session.
    pub fn activate(&mut self, index: usize) -> bool {
        if index == self.sr_active {
            return false;
        }
        if index >= self.sr_handlers.len() {
            log::error!("Tried to activate missing session {}", index);
            return false;
        }

        log::info!(
            "Switching from session {} to {}",
            self.sr_handlers[self.sr_active].name(),
            self.sr_handlers[index].name()
        );
        self.sr_handlers[self.sr_active].hide();
        self.sr_active = index;
        self.sr_handlers[index].show();

        true
    }

    /// Deliver a key press to the active session only
    pub fn dispatch_key(&mut self, ev: &KeyEvent) {
        if let Some(handler) = self.sr_handlers.get_mut(self.sr_active) {
            handler.key_event(ev);
        }
    }

    /// Let the active session describe the next frame
    pub fn draw_active(&mut self, content: &mut FrameContent) {
        if let Some(handler) = self.sr_handlers.get_mut(self.sr_active) {
            handler.draw(content);
        }
    }

    /// Run this iteration's session logic
    ///
    /// The active session gets `update`, then every other session that
    /// supports it gets `background_update`, in registration order.
    pub fn frame_update(&mut self) {
        let active = self.sr_active;
        if let Some(handler) = self.sr_handlers.get_mut(active) {
            handler.update();
        }

        for (i, handler) in self.sr_handlers.iter_mut().enumerate() {
            if i != active {
                handler.background_update();
            }
        }
    }

    /// Clean up every session
    ///
    /// This needs proof that the frame pipeline has no work in flight,
    /// since that work may reference session resources. Each session is
    /// cleaned up exactly once, calling this again does nothing.
    pub fn teardown(&mut self, _drained: &Drained) {
        log::debug!("Tearing down {} sessions", self.sr_handlers.len());
        for handler in self.sr_handlers.iter_mut() {
            handler.cleanup();
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The sessions wayvk starts with when nothing else is asked for
pub fn default_sessions() -> Vec<Box<dyn Session>> {
    vec![Box::new(PulseSession::new()), Box::new(ErrorSession::new())]
}

/// Register every session in order
///
/// A session failing to set up is fatal, so this stops at the first
/// error.
pub fn register_all(
    registry: &mut SessionRegistry,
    sessions: Vec<Box<dyn Session>>,
) -> Result<()> {
    for session in sessions {
        registry.register(session)?;
    }
    Ok(())
}
