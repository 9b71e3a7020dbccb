// Input routing
//
// Raw key records come in from an InputSource, get folded into the
// modifier state, and are either turned into a hotkey action (quit,
// switch session) or handed to the active session.
//
// Austin Shafer - 2020
pub mod codes;
#[cfg(feature = "direct2display")]
pub mod libinput;


use crate::session::SessionRegistry;
use codes::*;
use utils::{log, Result};

use std::ops::RangeInclusive;

bitflags::bitflags! {
    /// The modifier keys currently held down
    ///
    /// Each physical modifier key owns exactly one bit. Shift is only
    /// tracked for the left key.
    pub struct Mods: u32 {
        const NONE = 0;
        const LCTRL = 0b10;
        const RCTRL = 0b100;
        const LALT = 0b1000;
        const RALT = 0b10000;
        const SHIFT = 0b100000;
        const ESC = 0b1000000;
        const CMD = 0b10000000;
    }
}

impl Mods {
    /// Get the modifier bit a key code controls, if any
    pub fn from_key(key: u32) -> Option<Mods> {
        match key {
            KEY_LEFTCTRL => Some(Mods::LCTRL),
            KEY_RIGHTCTRL => Some(Mods::RCTRL),
            KEY_LEFTALT => Some(Mods::LALT),
            KEY_RIGHTALT => Some(Mods::RALT),
            KEY_LEFTSHIFT => Some(Mods::SHIFT),
            KEY_ESC => Some(Mods::ESC),
            KEY_LEFTMETA => Some(Mods::CMD),
            _ => None,
        }
    }
}

/// The keys that select a session while the switch chord is held.
/// F1 selects session 0.
pub const SESSION_HOTKEYS: RangeInclusive<u32> = KEY_F1..=KEY_F10;
/// Pressed with the quit chord, ends the program
pub const QUIT_KEY: u32 = KEY_Q;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// One record from the raw input stream
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawKey {
    /// microseconds, as reported by the source
    pub time: u64,
    /// evdev key code
    pub key: u32,
    pub state: KeyState,
}

/// A key press delivered to a session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: u32,
    /// The modifiers held when the key went down
    pub mods: Mods,
}

/// Something we can pull raw key records out of
///
/// The stream never ends and can't be rewound. `poll` must not block,
/// it appends whatever is pending to `out` and returns.
pub trait InputSource {
    fn poll(&mut self, out: &mut Vec<RawKey>) -> Result<()>;
}

/// What the router did with a record
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Route {
    /// The modifier state changed
    Modifier,
    /// The quit chord was pressed
    Quit,
    /// The switch chord selected this session
    Switch(usize),
    /// The switch chord named a session that doesn't exist
    NoSession(usize),
    /// Delivered to the active session
    Forwarded,
    /// A non-modifier key release
    Ignored,
}

/// Tracks the modifier state and turns key records into actions
///
/// This also owns the loop-continue flag, since the quit chord is the
/// only thing that ever clears it.
pub struct InputRouter {
    ir_mods: Mods,
    /// The modifier that makes up the switch chord
    ir_modkey: Mods,
    ir_running: bool,
    /// records pulled from the source this iteration
    ir_pending: Vec<RawKey>,
}

impl InputRouter {
    pub fn new(modkey: Mods) -> Self {
        Self {
            ir_mods: Mods::NONE,
            ir_modkey: modkey,
            ir_running: true,
            ir_pending: Vec::new(),
        }
    }

    pub fn mods(&self) -> Mods {
        self.ir_mods
    }

    pub fn is_running(&self) -> bool {
        self.ir_running
    }

    /// The modifiers that must be held, and nothing else, to switch sessions
    pub fn switch_chord(&self) -> Mods {
        self.ir_modkey
    }

    /// The modifiers that must be held, and nothing else, to quit
    pub fn quit_chord(&self) -> Mods {
        Mods::SHIFT | self.ir_modkey
    }

    /// Route a single raw key record
    pub fn handle(&mut self, raw: &RawKey, registry: &mut SessionRegistry) -> Route {
        if let Some(bit) = Mods::from_key(raw.key) {
            match raw.state {
                KeyState::Pressed => self.ir_mods.insert(bit),
                // only this bit, every other held modifier stays
                KeyState::Released => self.ir_mods.remove(bit),
            }
            return Route::Modifier;
        }

        // sessions only see presses
        if raw.state == KeyState::Released {
            return Route::Ignored;
        }

        if self.ir_mods == self.quit_chord() && raw.key == QUIT_KEY {
            log::info!("Quit chord pressed, shutting down");
            self.ir_running = false;
            return Route::Quit;
        }

        if self.ir_mods == self.switch_chord() && SESSION_HOTKEYS.contains(&raw.key) {
            let target = (raw.key - SESSION_HOTKEYS.start()) as usize;
            if target >= registry.len() {
                log::debug!(
                    "No session {} to switch to ({} registered)",
                    target,
                    registry.len()
                );
                return Route::NoSession(target);
            }

            registry.activate(target);
            return Route::Switch(target);
        }

        registry.dispatch_key(&KeyEvent {
            key: raw.key,
            mods: self.ir_mods,
        });
        Route::Forwarded
    }

    /// Drain everything the source has pending and route it
    ///
    /// Once the quit chord is seen the rest of the batch is dropped.
    pub fn drain<I: InputSource>(
        &mut self,
        source: &mut I,
        registry: &mut SessionRegistry,
    ) -> Result<()> {
        let mut pending = std::mem::take(&mut self.ir_pending);
        pending.clear();
        source.poll(&mut pending)?;

        for raw in pending.iter() {
            if self.handle(raw, registry) == Route::Quit {
                break;
            }
        }

        self.ir_pending = pending;
        Ok(())
    }
}
