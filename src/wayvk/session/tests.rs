// Session handler and registry tests
use super::pulse::{PulseState, HUE_STEP, PHASE_STEP};
use super::*;
use crate::config::DegradedPolicy;
use crate::frame::FramePipeline;
use crate::input::Mods;
use crate::testing::*;

fn registry_of(names: &[&'static str], journal: &Journal) -> SessionRegistry {
    let mut registry = SessionRegistry::new();
    for name in names {
        registry
            .register(RecordingSession::new(*name, journal).boxed())
            .unwrap();
    }
    registry
}

/// Get a Drained token from a pipeline that never submitted anything
fn drained() -> Drained {
    let mut provider = FakeProvider::new(2);
    let mut pipeline = FramePipeline::new(&mut provider, 0, DegradedPolicy::Recreate).unwrap();
    pipeline.drain(&mut provider).unwrap()
}

fn key(k: u32) -> KeyEvent {
    KeyEvent {
        key: k,
        mods: Mods::NONE,
    }
}

#[test]
fn first_registration_is_shown() {
    let journal = journal();
    let registry = registry_of(&["a", "b", "c"], &journal);

    assert_eq!(registry.len(), 3);
    assert_eq!(registry.active(), 0);
    assert!(registry.get(0).unwrap().is_visible());
    assert!(!registry.get(1).unwrap().is_visible());
    assert_eq!(
        *journal.borrow(),
        vec![
            Call::Setup("a"),
            Call::Shown("a"),
            Call::Setup("b"),
            Call::Setup("c"),
        ]
    );
}

#[test]
fn activating_the_active_session_does_nothing() {
    let journal = journal();
    let mut registry = registry_of(&["a", "b"], &journal);
    journal.borrow_mut().clear();

    assert!(!registry.activate(0));
    assert!(journal.borrow().is_empty());
    assert_eq!(registry.active(), 0);
}

#[test]
fn activate_hides_then_shows() {
    let journal = journal();
    let mut registry = registry_of(&["a", "b", "c"], &journal);
    journal.borrow_mut().clear();

    assert!(registry.activate(2));
    assert_eq!(
        *journal.borrow(),
        vec![Call::Hidden("a"), Call::Shown("c")]
    );
    assert_eq!(registry.active(), 2);
    assert!(!registry.get(0).unwrap().is_visible());
    assert!(registry.get(2).unwrap().is_visible());

    journal.borrow_mut().clear();
    assert!(registry.activate(1));
    assert_eq!(
        *journal.borrow(),
        vec![Call::Hidden("c"), Call::Shown("b")]
    );
}

#[test]
fn activating_a_missing_session_does_nothing() {
    let journal = journal();
    let mut registry = registry_of(&["a", "b"], &journal);
    journal.borrow_mut().clear();

    assert!(!registry.activate(5));
    assert!(journal.borrow().is_empty());
    assert_eq!(registry.active(), 0);
}

#[test]
fn keys_go_to_the_active_session_only() {
    let journal = journal();
    let mut registry = registry_of(&["a", "b"], &journal);
    registry.activate(1);
    journal.borrow_mut().clear();

    registry.dispatch_key(&key(30));
    assert_eq!(*journal.borrow(), vec![Call::Key("b", key(30))]);
}

#[test]
fn background_updates_skip_the_active_session() {
    let journal = journal();
    let mut registry = SessionRegistry::new();
    registry
        .register(RecordingSession::new("a", &journal).with_background().boxed())
        .unwrap();
    registry
        .register(RecordingSession::new("b", &journal).boxed())
        .unwrap();
    registry
        .register(RecordingSession::new("c", &journal).with_background().boxed())
        .unwrap();
    registry
        .register(RecordingSession::new("d", &journal).with_background().boxed())
        .unwrap();
    registry.activate(2);
    journal.borrow_mut().clear();

    registry.frame_update();
    assert_eq!(
        *journal.borrow(),
        vec![
            Call::Update("c"),
            Call::Background("a"),
            Call::Background("d"),
        ]
    );

    journal.borrow_mut().clear();
    registry.frame_update();
    registry.frame_update();
    assert_eq!(count(&journal, |c| *c == Call::Background("a")), 2);
    assert_eq!(count(&journal, |c| *c == Call::Background("c")), 0);
    assert_eq!(count(&journal, |c| *c == Call::Background("b")), 0);
}

#[test]
fn teardown_cleans_up_each_session_once() {
    let journal = journal();
    let mut registry = registry_of(&["a", "b", "c"], &journal);
    let drained = drained();

    registry.teardown(&drained);
    registry.teardown(&drained);

    for name in ["a", "b", "c"].iter() {
        assert_eq!(
            count(&journal, |c| matches!(c, Call::Cleanup(n, _) if n == name)),
            1
        );
    }
    assert!(registry.get(1).unwrap().is_cleaned_up());

    // cleaned up sessions don't get called anymore
    journal.borrow_mut().clear();
    registry.frame_update();
    registry.dispatch_key(&key(30));
    assert!(journal.borrow().is_empty());
}

#[test]
fn setup_failure_is_fatal() {
    let journal = journal();
    let mut bad = RecordingSession::new("broken", &journal);
    bad.fail_setup = true;

    let mut registry = SessionRegistry::new();
    let err = register_all(
        &mut registry,
        vec![RecordingSession::new("a", &journal).boxed(), bad.boxed()],
    )
    .unwrap_err();

    let msg = format!("{:#}", err);
    assert!(msg.contains("broken"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn default_sessions_start_with_pulse() {
    let names: Vec<String> = default_sessions()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, vec!["pulse", "error"]);
}

#[test]
fn error_session_draws_red() {
    let mut state = ErrorSession::new().setup().unwrap();
    let mut content = FrameContent::default();
    state.shown();
    state.draw(&mut content);

    assert_eq!(content.clear_color, error::ERROR_COLOR);
    assert!(!state.supports_background_update());
}

#[test]
fn pulse_keeps_time_in_the_background() {
    let mut state = PulseState::new();
    assert!(state.supports_background_update());

    state.update();
    state.background_update();
    assert!((state.phase() - 2.0 * PHASE_STEP).abs() < 1e-6);

    // the phase wraps instead of growing forever
    for _ in 0..200 {
        state.background_update();
    }
    assert!(state.phase() < 1.0);
}

#[test]
fn pulse_keys_change_the_hue() {
    let mut state = PulseState::new();
    let before = state.color();

    state.key_event(&key(30));
    assert!((state.hue() - HUE_STEP).abs() < 1e-6);
    assert_ne!(state.color(), before);
    assert_eq!(state.color()[3], 1.0);
}
