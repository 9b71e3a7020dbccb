// Main loop tests, run end to end against the fakes
use super::*;
use crate::config::Config;
use crate::frame::FRAMES_IN_FLIGHT;
use crate::input::codes::*;
use crate::input::{Mods, RawKey};
use crate::testing::*;

fn quit() -> Vec<RawKey> {
    vec![press(KEY_LEFTSHIFT), press(KEY_LEFTMETA), press(KEY_Q)]
}

fn config() -> Config {
    let mut builder = Config::builder();
    builder.modkey(Mods::CMD);
    builder.build()
}

#[test]
fn quit_drains_before_teardown() {
    let journal = journal();
    let provider = FakeProvider::new(3);
    let probe = provider.in_flight_probe.clone();

    let sessions: Vec<Box<dyn Session>> = ["a", "b", "c"]
        .iter()
        .map(|name| {
            let mut s = RecordingSession::new(*name, &journal);
            s.probe = Some(probe.clone());
            s.boxed()
        })
        .collect();
    let input = ScriptedInput::new(vec![vec![], vec![], vec![], quit()]);

    let mut wv = Wayvk::new(&config(), provider, input, sessions).unwrap();
    for _ in 0..3 {
        assert!(wv.iterate().unwrap().is_some());
    }
    // frames are still queued when the quit chord arrives
    assert_eq!(wv.provider().in_flight(), FRAMES_IN_FLIGHT);

    assert!(wv.iterate().unwrap().is_none());
    assert!(!wv.router().is_running());
    wv.shutdown().unwrap();

    for name in ["a", "b", "c"].iter() {
        let cleanups: Vec<Call> = journal
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Cleanup(n, _) if n == name))
            .cloned()
            .collect();
        // exactly once, with nothing in flight
        assert_eq!(cleanups, vec![Call::Cleanup(*name, 0)]);
    }
    assert_eq!(wv.provider().in_flight(), 0);
    assert_eq!(wv.provider().destroyed.get(), FRAMES_IN_FLIGHT * 4);

    // shutting down twice is harmless
    wv.shutdown().unwrap();
    assert_eq!(count(&journal, |c| matches!(c, Call::Cleanup(..))), 3);
}

#[test]
fn run_returns_after_quit() {
    let journal = journal();
    let input = ScriptedInput::new(vec![vec![], vec![], quit()]);
    let mut wv = Wayvk::new(
        &config(),
        FakeProvider::new(2),
        input,
        vec![RecordingSession::new("a", &journal).boxed()],
    )
    .unwrap();

    wv.run().unwrap();
    assert_eq!(wv.provider().presented.len(), 2);
    assert_eq!(count(&journal, |c| *c == Call::Update("a")), 2);
    assert_eq!(count(&journal, |c| matches!(c, Call::Cleanup(..))), 1);
    assert!(wv.iterate().unwrap().is_none());
}

#[test]
fn background_sessions_update_every_tick() {
    let journal = journal();
    let sessions = vec![
        RecordingSession::new("a", &journal).with_background().boxed(),
        RecordingSession::new("b", &journal).with_background().boxed(),
        RecordingSession::new("c", &journal).boxed(),
    ];
    let input = ScriptedInput::new(vec![vec![], vec![], vec![], quit()]);

    let mut wv = Wayvk::new(&config(), FakeProvider::new(3), input, sessions).unwrap();
    wv.run().unwrap();

    assert_eq!(count(&journal, |c| *c == Call::Update("a")), 3);
    assert_eq!(count(&journal, |c| *c == Call::Background("a")), 0);
    assert_eq!(count(&journal, |c| *c == Call::Background("b")), 3);
    assert_eq!(count(&journal, |c| *c == Call::Background("c")), 0);
}

#[test]
fn hotkey_switch_changes_what_is_drawn() {
    let journal = journal();
    let sessions = vec![
        RecordingSession::new("a", &journal).boxed(),
        RecordingSession::new("b", &journal).boxed(),
    ];
    let input = ScriptedInput::new(vec![
        vec![
            press(KEY_LEFTMETA),
            press(KEY_F2),
            release(KEY_F2),
            release(KEY_LEFTMETA),
        ],
        vec![],
        quit(),
    ]);

    let mut wv = Wayvk::new(&config(), FakeProvider::new(3), input, sessions).unwrap();
    wv.run().unwrap();

    assert_eq!(wv.registry().active(), 1);
    let calls = journal.borrow();
    let hidden = calls.iter().position(|c| *c == Call::Hidden("a")).unwrap();
    let shown = calls.iter().position(|c| *c == Call::Shown("b")).unwrap();
    let first_draw = calls.iter().position(|c| *c == Call::Draw("b")).unwrap();
    assert!(hidden < shown && shown < first_draw);
    assert_eq!(calls.iter().filter(|c| **c == Call::Draw("a")).count(), 0);
    assert_eq!(calls.iter().filter(|c| **c == Call::Draw("b")).count(), 2);
}

#[test]
fn needs_a_session() {
    let res = Wayvk::new(
        &config(),
        FakeProvider::new(2),
        ScriptedInput::new(vec![]),
        Vec::new(),
    );
    assert!(res.is_err());
}

#[test]
fn session_setup_failure_is_fatal() {
    let journal = journal();
    let mut bad = RecordingSession::new("bad", &journal);
    bad.fail_setup = true;

    let res = Wayvk::new(
        &config(),
        FakeProvider::new(2),
        ScriptedInput::new(vec![]),
        vec![RecordingSession::new("a", &journal).boxed(), bad.boxed()],
    );
    assert!(res.is_err());
}

fn probed_session(name: &'static str, journal: &Journal, provider: &FakeProvider) -> Box<dyn Session> {
    let mut s = RecordingSession::new(name, journal);
    s.probe = Some(provider.in_flight_probe.clone());
    s.boxed()
}

#[test]
fn dropping_after_a_failed_submit_frees_the_slots() {
    let journal = journal();
    let mut provider = FakeProvider::new(3);
    provider.fail_submit = true;
    let destroyed = provider.destroyed.clone();
    let sessions = vec![probed_session("a", &journal, &provider)];

    let mut wv = Wayvk::new(&config(), provider, ScriptedInput::new(vec![]), sessions).unwrap();
    // the slot's fence was reset but nothing was submitted
    assert!(wv.iterate().is_err());
    drop(wv);

    assert_eq!(destroyed.get(), FRAMES_IN_FLIGHT * 4);
    assert_eq!(
        count(&journal, |c| matches!(c, Call::Cleanup(..))),
        1
    );
}

#[test]
fn dropping_with_frames_in_flight_waits_for_them() {
    let journal = journal();
    let provider = FakeProvider::new(3);
    let destroyed = provider.destroyed.clone();
    let sessions = vec![
        probed_session("a", &journal, &provider),
        probed_session("b", &journal, &provider),
    ];

    let mut wv = Wayvk::new(
        &config(),
        provider,
        ScriptedInput::new(vec![vec![], vec![], vec![]]),
        sessions,
    )
    .unwrap();
    for _ in 0..3 {
        wv.iterate().unwrap();
    }
    assert_eq!(wv.provider().in_flight(), FRAMES_IN_FLIGHT);
    drop(wv);

    assert_eq!(destroyed.get(), FRAMES_IN_FLIGHT * 4);
    assert_eq!(
        journal
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Cleanup(..)))
            .cloned()
            .collect::<Vec<_>>(),
        vec![Call::Cleanup("a", 0), Call::Cleanup("b", 0)]
    );
}
