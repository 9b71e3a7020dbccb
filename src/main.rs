//! # wayvk
//!
//! Starts the compositor on the first physical display, reading input
//! from every keyboard on the configured seat.
//!
//! Configuration is read from `WAYVK_*` environment variables, see
//! `wayvk::config`.

// Austin Shafer - 2020
extern crate utils;
extern crate vkdisp;
extern crate wayvk;

use utils::timing::StopWatch;
use utils::{log, Context, Result};
use wayvk::config::Config;
use wayvk::input::libinput::LibinputSource;
use wayvk::{session, Wayvk};

fn run() -> Result<()> {
    let config = Config::from_env()?;

    let mut info = vkdisp::CreateInfo::builder();
    info.enable_validation(config.enable_validation);
    let display = vkdisp::Display::new(&info.build()).context("Could not bring up the display")?;
    let input = LibinputSource::new(&config.seat)?;

    let mut wv = Wayvk::new(&config, display, input, session::default_sessions())?;

    println!("Begin render loop...");
    wv.run()
}

fn main() {
    let mut uptime = StopWatch::new();
    uptime.start();
    let res = run();
    uptime.end();

    println!("uptime: {}", uptime.get_duration().as_secs_f32());

    if let Err(e) = res {
        log::critical!("wayvk failed: {:?}", e);
        std::process::exit(1);
    }
}
