//! # wayvk
//!
//! A bare metal display compositor. wayvk drives a monitor directly
//! through `VK_KHR_display` and multiplexes a handful of sessions onto
//! it, much like virtual terminals. One session is visible at a time and
//! global hotkeys switch between them.
//!
//! * `surface` - the presentation primitives the frame loop needs, and
//!   their implementation on top of `vkdisp`.
//! * `frame` - the frame pipeline. Keeps a fixed ring of in-flight frames
//!   and handles swapchain acquisition results.
//! * `session` - the session traits, their lifecycle handling and the
//!   built in sessions.
//! * `input` - raw key records, modifier tracking and hotkey routing.
//! * `config` - runtime configuration.

// Austin Shafer - 2020
extern crate bitflags;
extern crate utils;
extern crate vkdisp;

mod wayvk;
pub use crate::wayvk::*;
