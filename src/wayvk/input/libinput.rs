/// The libinput raw input source
///
/// There is no window system to hand us key events, so we read them
/// straight from the kernel's evdev nodes through libinput. This needs
/// permission to open the devices, in practice that means root or the
/// input group.
extern crate input;
use input::event::keyboard::{KeyState as LiKeyState, KeyboardEvent, KeyboardEventTrait};
use input::event::Event;
use input::{Libinput, LibinputInterface};

use super::{InputSource, KeyState, RawKey};
use utils::{anyhow, log, Context, Result};

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::OwnedFd;
use std::path::Path;

/// This is sort of like a private userdata struct which
/// is used as an interface to the systems devices
///
/// i.e. this could call consolekit to avoid having to
/// be a root user to get raw input.
struct Inkit {
    // For now we don't have anything special to do,
    // so we are just putting a phantom int here since
    // we need to have something.
    _inner: u32,
}

/// This is the interface that libinput uses to abstract away
/// consolekit and friends.
///
/// In our case we just pass the arguments through to `open`.
impl LibinputInterface for Inkit {
    fn open_restricted(&mut self, path: &Path, flags: i32) -> std::result::Result<OwnedFd, i32> {
        log::debug!("Opening input device {:?}", path);
        match OpenOptions::new()
            // the unix extension's custom_flag field below
            // masks out O_ACCMODE, i.e. read/write, so add
            // them back in
            .read(true)
            .write(true)
            // libinput wants to use O_NONBLOCK
            .custom_flags(flags)
            .open(path)
        {
            Ok(f) => Ok(f.into()),
            Err(e) => {
                // leave this in, it gives great error msgs
                log::error!("Error on opening {:?}: {:?}", path, e);
                Err(-1)
            }
        }
    }

    fn close_restricted(&mut self, fd: OwnedFd) {
        // this will close the file
        drop(File::from(fd));
    }
}

/// Keyboard events from every device on a udev seat
pub struct LibinputSource {
    li_libin: Libinput,
}

impl LibinputSource {
    pub fn new(seat: &str) -> Result<Self> {
        let kit: Inkit = Inkit { _inner: 0 };
        let mut libin = Libinput::new_with_udev(kit);

        // we need to choose a "seat" for udev to listen on
        // the default seat is seat0, which is all input devs
        libin
            .udev_assign_seat(seat)
            .map_err(|_| anyhow!("Could not assign libinput to seat {}", seat))?;
        log::debug!("Listening for input on {}", seat);

        Ok(Self { li_libin: libin })
    }
}

impl InputSource for LibinputSource {
    fn poll(&mut self, out: &mut Vec<RawKey>) -> Result<()> {
        // Let libinput read the device fds. This doesn't block, there
        // just won't be any events if nothing happened.
        self.li_libin
            .dispatch()
            .context("Could not dispatch libinput events")?;

        for ev in &mut self.li_libin {
            if let Event::Keyboard(KeyboardEvent::Key(k)) = ev {
                out.push(RawKey {
                    time: k.time_usec(),
                    key: k.key(),
                    state: match k.key_state() {
                        LiKeyState::Pressed => KeyState::Pressed,
                        LiKeyState::Released => KeyState::Released,
                    },
                });
            }
        }

        Ok(())
    }
}
