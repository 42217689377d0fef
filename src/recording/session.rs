//! Session state for the ask flow.
//!
//! One session runs from record-start to the assistant's reply. All
//! transitions go through the `reduce()` function, which returns the next
//! state and a list of effects for the event loop to execute. Key handling
//! stays dumb: a key press becomes an event, and the reducer decides whether
//! the corresponding control is currently enabled.

/// Whether the record and stop controls accept input.
///
/// Mirrors the enabled/disabled state of physical buttons: a press on a
/// disabled control is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub record_enabled: bool,
    pub stop_enabled: bool,
}

/// Authoritative state of the ask flow.
///
/// Each recording session gets a monotonically increasing number so that
/// replies from superseded uploads can be told apart from the current one.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// No capture, no pending upload. Carries the last used session number.
    Idle { session: u64 },
    /// Microphone capture in progress.
    Recording { session: u64, paused: bool },
    /// Capture done, upload in flight.
    Waiting { session: u64 },
    /// Reply received and rendered.
    Answered { session: u64 },
    /// Upload or server failure, message shown to the user.
    Failed { session: u64, message: String },
}

impl Default for State {
    fn default() -> Self {
        State::Idle { session: 0 }
    }
}

impl State {
    /// The session number this state belongs to.
    pub fn session(&self) -> u64 {
        match self {
            State::Idle { session }
            | State::Recording { session, .. }
            | State::Waiting { session }
            | State::Answered { session }
            | State::Failed { session, .. } => *session,
        }
    }

    /// Control availability in this state.
    ///
    /// While recording, only stop is available. Everywhere else the record
    /// control is live again, including while an upload is still in flight.
    pub fn controls(&self) -> Controls {
        match self {
            State::Recording { .. } => Controls {
                record_enabled: false,
                stop_enabled: true,
            },
            _ => Controls {
                record_enabled: true,
                stop_enabled: false,
            },
        }
    }
}

/// Events that can trigger state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// User pressed the record control
    RecordPressed,
    /// User pressed the stop control
    StopPressed,
    /// User toggled pause while recording
    PausePressed,
    /// User pressed escape: cancel the current activity or leave
    CancelPressed,
    /// Hard exit (ctrl+c)
    QuitRequested,
    /// Upload completed for the given session
    ResponseArrived { session: u64 },
    /// Upload failed for the given session
    ResponseFailed { session: u64, message: String },
}

/// Effects to be executed by the event loop after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Begin microphone capture for a new session
    StartCapture { session: u64 },
    /// End microphone capture
    StopCapture,
    /// Package the session buffer and upload it
    Submit { session: u64 },
    /// Drop the in-flight upload for a superseded or cancelled session
    AbandonUpload { session: u64 },
    /// Toggle the recorder's pause flag
    TogglePause,
    /// Leave the ask flow
    Quit,
}

/// Reducer function: (state, event) -> (next_state, effects)
///
/// Rules:
/// - A press on a disabled control changes nothing
/// - Exactly one Submit is emitted per record/stop cycle
/// - Replies for sessions other than the current one are dropped
pub fn reduce(state: &State, event: Event) -> (State, Vec<Effect>) {
    use Effect::*;
    use Event::*;

    match (state, event) {
        // -----------------
        // Record control
        // -----------------
        (State::Idle { session }, RecordPressed)
        | (State::Answered { session }, RecordPressed)
        | (State::Failed { session, .. }, RecordPressed) => {
            let next = session + 1;
            (
                State::Recording {
                    session: next,
                    paused: false,
                },
                vec![StartCapture { session: next }],
            )
        }
        // Starting over while an upload is in flight supersedes it: the
        // pending reply is abandoned rather than rendered later.
        (State::Waiting { session }, RecordPressed) => {
            let next = session + 1;
            (
                State::Recording {
                    session: next,
                    paused: false,
                },
                vec![
                    AbandonUpload { session: *session },
                    StartCapture { session: next },
                ],
            )
        }
        // Record control is disabled while recording
        (State::Recording { .. }, RecordPressed) => (state.clone(), vec![]),

        // -----------------
        // Stop control
        // -----------------
        (State::Recording { session, .. }, StopPressed) => (
            State::Waiting { session: *session },
            vec![StopCapture, Submit { session: *session }],
        ),
        // Stop control is disabled outside of recording
        (_, StopPressed) => (state.clone(), vec![]),

        // -----------------
        // Pause
        // -----------------
        (State::Recording { session, paused }, PausePressed) => (
            State::Recording {
                session: *session,
                paused: !paused,
            },
            vec![TogglePause],
        ),
        (_, PausePressed) => (state.clone(), vec![]),

        // -----------------
        // Cancel / quit
        // -----------------
        // Cancel during recording discards the buffer without submitting
        (State::Recording { session, .. }, CancelPressed) => (
            State::Idle { session: *session },
            vec![StopCapture],
        ),
        // The upload is never cancelled mid-request: escape is ignored until
        // the response arrives. Only recording again supersedes it.
        (State::Waiting { .. }, CancelPressed) => (state.clone(), vec![]),
        (_, CancelPressed) => (state.clone(), vec![Quit]),

        (State::Recording { .. }, QuitRequested) => (state.clone(), vec![StopCapture, Quit]),
        (State::Waiting { session }, QuitRequested) => (
            state.clone(),
            vec![AbandonUpload { session: *session }, Quit],
        ),
        (_, QuitRequested) => (state.clone(), vec![Quit]),

        // -----------------
        // Upload outcomes
        // -----------------
        (State::Waiting { session }, ResponseArrived { session: id }) if *session == id => {
            (State::Answered { session: *session }, vec![])
        }
        (State::Waiting { session }, ResponseFailed { session: id, message })
            if *session == id =>
        {
            (
                State::Failed {
                    session: *session,
                    message,
                },
                vec![],
            )
        }

        // Stale replies (superseded sessions) are dropped silently
        (_, ResponseArrived { .. }) | (_, ResponseFailed { .. }) => (state.clone(), vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submits(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Submit { .. }))
            .count()
    }

    #[test]
    fn record_starts_capture_and_disables_record_control() {
        let (next, effects) = reduce(&State::default(), Event::RecordPressed);

        assert!(matches!(next, State::Recording { session: 1, .. }));
        assert_eq!(effects, vec![Effect::StartCapture { session: 1 }]);

        let controls = next.controls();
        assert!(!controls.record_enabled);
        assert!(controls.stop_enabled);
    }

    #[test]
    fn stop_reenables_record_control_and_disables_stop() {
        let state = State::Recording {
            session: 1,
            paused: false,
        };
        let (next, _) = reduce(&state, Event::StopPressed);

        let controls = next.controls();
        assert!(controls.record_enabled);
        assert!(!controls.stop_enabled);
    }

    #[test]
    fn stop_submits_exactly_once() {
        let state = State::Recording {
            session: 1,
            paused: false,
        };
        let (next, effects) = reduce(&state, Event::StopPressed);

        assert!(matches!(next, State::Waiting { session: 1 }));
        assert_eq!(
            effects,
            vec![Effect::StopCapture, Effect::Submit { session: 1 }]
        );
    }

    #[test]
    fn full_cycle_issues_a_single_submit() {
        let mut state = State::default();
        let mut total_submits = 0;

        for event in [
            Event::RecordPressed,
            Event::PausePressed,
            Event::PausePressed,
            Event::StopPressed,
            Event::ResponseArrived { session: 1 },
        ] {
            let (next, effects) = reduce(&state, event);
            total_submits += submits(&effects);
            state = next;
        }

        assert!(matches!(state, State::Answered { session: 1 }));
        assert_eq!(total_submits, 1);
    }

    #[test]
    fn record_press_while_recording_is_a_noop() {
        let state = State::Recording {
            session: 1,
            paused: false,
        };
        let (next, effects) = reduce(&state, Event::RecordPressed);

        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    #[test]
    fn stop_press_while_idle_is_a_noop() {
        let (next, effects) = reduce(&State::default(), Event::StopPressed);
        assert_eq!(next, State::default());
        assert!(effects.is_empty());
    }

    #[test]
    fn cancel_during_recording_discards_without_submit() {
        let state = State::Recording {
            session: 1,
            paused: false,
        };
        let (next, effects) = reduce(&state, Event::CancelPressed);

        assert!(matches!(next, State::Idle { .. }));
        assert_eq!(effects, vec![Effect::StopCapture]);
        assert_eq!(submits(&effects), 0);
    }

    #[test]
    fn cancel_during_waiting_is_ignored() {
        let state = State::Waiting { session: 1 };
        let (next, effects) = reduce(&state, Event::CancelPressed);

        // No mid-request cancellation: the upload stays in flight
        assert_eq!(next, State::Waiting { session: 1 });
        assert!(effects.is_empty());
    }

    #[test]
    fn record_during_waiting_supersedes_pending_upload() {
        let state = State::Waiting { session: 1 };
        let (next, effects) = reduce(&state, Event::RecordPressed);

        assert!(matches!(next, State::Recording { session: 2, .. }));
        assert_eq!(
            effects,
            vec![
                Effect::AbandonUpload { session: 1 },
                Effect::StartCapture { session: 2 },
            ]
        );
    }

    #[test]
    fn stale_reply_is_ignored() {
        let state = State::Recording {
            session: 2,
            paused: false,
        };
        let (next, effects) = reduce(&state, Event::ResponseArrived { session: 1 });

        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    #[test]
    fn failed_upload_surfaces_message_and_recovers() {
        let state = State::Waiting { session: 1 };
        let (next, _) = reduce(
            &state,
            Event::ResponseFailed {
                session: 1,
                message: "server unreachable".to_string(),
            },
        );

        assert!(matches!(next, State::Failed { ref message, .. } if message == "server unreachable"));
        // Controls are never left stuck: record is available again
        assert!(next.controls().record_enabled);

        let (next, effects) = reduce(&next, Event::RecordPressed);
        assert!(matches!(next, State::Recording { session: 2, .. }));
        assert_eq!(effects, vec![Effect::StartCapture { session: 2 }]);
    }

    #[test]
    fn pause_toggles_only_while_recording() {
        let state = State::Recording {
            session: 1,
            paused: false,
        };
        let (next, effects) = reduce(&state, Event::PausePressed);
        assert!(matches!(next, State::Recording { paused: true, .. }));
        assert_eq!(effects, vec![Effect::TogglePause]);

        let (idle, effects) = reduce(&State::default(), Event::PausePressed);
        assert_eq!(idle, State::default());
        assert!(effects.is_empty());
    }

    #[test]
    fn quit_during_waiting_abandons_upload() {
        let state = State::Waiting { session: 3 };
        let (_, effects) = reduce(&state, Event::QuitRequested);
        assert_eq!(
            effects,
            vec![Effect::AbandonUpload { session: 3 }, Effect::Quit]
        );
    }
}
