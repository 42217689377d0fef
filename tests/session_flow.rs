// Integration tests for the ask session flow
//
// These tests drive the session state machine through full record/stop
// cycles and verify the control invariants and upload accounting that the
// interactive ask command relies on.

use ova::recording::{encode_wav, reduce, Effect, Event, State};
use std::io::Cursor;

/// Runs a sequence of events through the reducer, collecting all effects.
fn run_events(events: Vec<Event>) -> (State, Vec<Effect>) {
    let mut state = State::default();
    let mut all_effects = Vec::new();

    for event in events {
        let (next, effects) = reduce(&state, event);
        state = next;
        all_effects.extend(effects);
    }

    (state, all_effects)
}

fn count_submits(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::Submit { .. }))
        .count()
}

#[test]
fn test_one_cycle_one_upload() {
    let (state, effects) = run_events(vec![
        Event::RecordPressed,
        Event::StopPressed,
        Event::ResponseArrived { session: 1 },
    ]);

    assert!(matches!(state, State::Answered { session: 1 }));
    assert_eq!(count_submits(&effects), 1);
}

#[test]
fn test_repeated_stop_presses_do_not_resubmit() {
    let (state, effects) = run_events(vec![
        Event::RecordPressed,
        Event::StopPressed,
        // Stop control is disabled once Waiting; these must be no-ops
        Event::StopPressed,
        Event::StopPressed,
        Event::ResponseArrived { session: 1 },
    ]);

    assert!(matches!(state, State::Answered { .. }));
    assert_eq!(count_submits(&effects), 1);
}

#[test]
fn test_three_cycles_three_uploads() {
    let mut events = Vec::new();
    for session in 1..=3u64 {
        events.push(Event::RecordPressed);
        events.push(Event::StopPressed);
        events.push(Event::ResponseArrived { session });
    }

    let (state, effects) = run_events(events);

    assert!(matches!(state, State::Answered { session: 3 }));
    assert_eq!(count_submits(&effects), 3);
}

#[test]
fn test_controls_flip_across_the_cycle() {
    let mut state = State::default();

    // Idle: record available, stop not
    assert!(state.controls().record_enabled);
    assert!(!state.controls().stop_enabled);

    // After start: the reverse
    let (next, _) = reduce(&state, Event::RecordPressed);
    state = next;
    assert!(!state.controls().record_enabled);
    assert!(state.controls().stop_enabled);

    // After stop: back again
    let (next, _) = reduce(&state, Event::StopPressed);
    state = next;
    assert!(state.controls().record_enabled);
    assert!(!state.controls().stop_enabled);
}

#[test]
fn test_superseding_session_abandons_previous_upload() {
    let (state, effects) = run_events(vec![
        Event::RecordPressed,
        Event::StopPressed,
        // Start over while the first upload is still in flight
        Event::RecordPressed,
        Event::StopPressed,
        // The stale reply must be dropped, the fresh one rendered
        Event::ResponseArrived { session: 1 },
        Event::ResponseArrived { session: 2 },
    ]);

    assert!(matches!(state, State::Answered { session: 2 }));
    assert_eq!(count_submits(&effects), 2);
    assert!(effects.contains(&Effect::AbandonUpload { session: 1 }));
}

#[test]
fn test_cancelled_recording_submits_nothing() {
    let (state, effects) = run_events(vec![Event::RecordPressed, Event::CancelPressed]);

    assert!(matches!(state, State::Idle { .. }));
    assert_eq!(count_submits(&effects), 0);
    assert!(effects.contains(&Effect::StopCapture));
}

#[test]
fn test_failure_keeps_controls_usable() {
    let (state, _) = run_events(vec![
        Event::RecordPressed,
        Event::StopPressed,
        Event::ResponseFailed {
            session: 1,
            message: "server unreachable".to_string(),
        },
    ]);

    assert!(matches!(state, State::Failed { .. }));
    // The record control is never left stuck disabled after a failure
    assert!(state.controls().record_enabled);

    let (state, effects) = reduce(&state, Event::RecordPressed);
    assert!(matches!(state, State::Recording { session: 2, .. }));
    assert_eq!(effects, vec![Effect::StartCapture { session: 2 }]);
}

#[test]
fn test_packaged_payload_preserves_fragment_order() {
    // Fragments arrive in chunks of varying size; the packaged WAV must
    // contain their concatenation in emission order.
    let fragments: Vec<Vec<i16>> = vec![vec![1, 2, 3], vec![4], vec![5, 6], vec![7, 8, 9, 10]];

    let mut buffer: Vec<i16> = Vec::new();
    for fragment in &fragments {
        buffer.extend_from_slice(fragment);
    }

    let wav = encode_wav(&buffer, 16000).unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let decoded: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();

    let expected: Vec<i16> = fragments.into_iter().flatten().collect();
    assert_eq!(decoded, expected);
}
