//! The interactive ask flow: record a question, upload it, render the answer.
//!
//! Runs the session event loop. Key presses and an optional SIGUSR1 trigger
//! become session events, the reducer decides the transition, and this loop
//! executes the resulting effects: starting and stopping capture, packaging
//! the WAV, spawning the upload task, and playing the spoken answer.
//! Supports external stop triggers via SIGUSR1 signal.

use crate::assistant::{submit_question, AssistantResponse};
use crate::commands::route_answer;
use crate::config;
use crate::history::{self, ExchangeStore};
use crate::recording::{encode_wav, session, AudioRecorder, Input, OvaTui};
use crate::ui::ErrorScreen;
use chrono::Local;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The reply currently shown on the answer screen.
struct AnswerView {
    transcript: String,
    answer: String,
    duration_secs: Option<f32>,
    audio: Option<PathBuf>,
}

/// Handles the interactive ask flow.
///
/// Records audio with a live volume display, uploads the question to the
/// assistant server, shows the transcript and answer, plays the synthesized
/// speech, and persists the exchange to history.
///
/// # Arguments
/// * `clipboard` - If true, copy the final answer to the clipboard instead of stdout
/// * `output_file` - Optional file path to write the final answer to instead of stdout
pub async fn handle_ask(clipboard: bool, output_file: Option<String>) -> Result<(), anyhow::Error> {
    tracing::info!("=== ova Ask Started ===");

    let config_data = match config::OvaConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            let error_message = format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/ova/ova.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, server={}",
        config_data.audio.device,
        config_data.audio.sample_rate,
        config_data.server.url
    );

    let data_dir = history::data_dir()?;
    let audio_dir = data_dir.join("exchanges");
    fs::create_dir_all(&audio_dir)?;
    let mut store = ExchangeStore::new(&data_dir)?;

    let mut recorder = AudioRecorder::new(
        config_data.audio.sample_rate,
        config_data.audio.device.clone(),
    );

    let mut tui = OvaTui::new(
        config_data.audio.sample_rate,
        config_data.audio.peak_volume_threshold,
        config_data.audio.reference_level_db,
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize UI: {e}"))?;

    // SIGUSR1 acts as the stop control while recording
    let stop_signal = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&stop_signal))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    let mut state = session::State::default();
    let mut pending: Option<(u64, JoinHandle<anyhow::Result<AssistantResponse>>)> = None;
    let mut question_path: Option<PathBuf> = None;
    let mut answered: Option<AnswerView> = None;
    let mut final_answer: Option<String> = None;
    let mut exit_requested = false;

    tracing::debug!("Entering ask loop. Press 'r' to record, 'Enter' to send.");

    while !exit_requested {
        let mut events: Vec<session::Event> = Vec::new();

        if stop_signal.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: stop requested via external trigger");
            events.push(session::Event::StopPressed);
        }

        match tui.poll_input() {
            Ok(Some(Input::Session(event))) => events.push(event),
            Ok(Some(Input::Replay)) => {
                if matches!(state, session::State::Answered { .. }) {
                    if let Some(view) = &answered {
                        play_answer(view.audio.clone(), config_data.server.player.clone());
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Input handling error: {}", e);
                tui.cleanup().ok();
                return Err(anyhow::anyhow!("Input handling error: {e}"));
            }
        }

        // Collect the outcome of the in-flight upload, if it finished.
        // Delivery waits until the events have reduced: a reply landing in
        // the same tick as a superseding key press must be dropped, not
        // played and routed.
        let mut arrived: Option<(u64, AssistantResponse)> = None;
        if pending.as_ref().is_some_and(|(_, handle)| handle.is_finished()) {
            let (session_id, handle) = pending.take().unwrap();
            match handle.await {
                Ok(Ok(response)) => {
                    arrived = Some((session_id, response));
                    events.push(session::Event::ResponseArrived {
                        session: session_id,
                    });
                }
                Ok(Err(e)) => {
                    tracing::error!("Upload failed: {e}");
                    events.push(session::Event::ResponseFailed {
                        session: session_id,
                        message: e.to_string(),
                    });
                }
                Err(e) if e.is_cancelled() => {
                    tracing::debug!("Upload task for session {session_id} abandoned");
                }
                Err(e) => {
                    tracing::error!("Upload task failed: {e}");
                    events.push(session::Event::ResponseFailed {
                        session: session_id,
                        message: format!("Upload task failed: {e}"),
                    });
                }
            }
        }

        for event in events {
            let (next, effects) = session::reduce(&state, event);
            state = next;

            for effect in effects {
                match effect {
                    session::Effect::StartCapture { session } => {
                        tui.begin_session();
                        if let Err(e) = recorder.start_recording() {
                            tracing::error!("Failed to start recording: {e}");
                            state = session::State::Failed {
                                session,
                                message: format!(
                                    "Recording Error:\n\n{e}\n\nCheck the audio configuration and try again."
                                ),
                            };
                        }
                    }
                    session::Effect::StopCapture => {
                        recorder.stop_recording();
                    }
                    session::Effect::Submit { session } => {
                        match package_question(&recorder, &audio_dir) {
                            Ok((wav_bytes, path)) => {
                                question_path = Some(path);
                                let url = config_data.server.url.clone();
                                pending = Some((
                                    session,
                                    tokio::spawn(async move {
                                        submit_question(&url, wav_bytes).await
                                    }),
                                ));
                            }
                            Err(e) => {
                                tracing::error!("Failed to package recording: {e}");
                                state = session::State::Failed {
                                    session,
                                    message: format!("Failed to package the recording:\n\n{e}"),
                                };
                            }
                        }
                    }
                    session::Effect::AbandonUpload { session } => {
                        if let Some((id, handle)) = pending.take() {
                            if id == session {
                                handle.abort();
                                tracing::info!("Abandoned upload for session {session}");
                            } else {
                                pending = Some((id, handle));
                            }
                        }
                        question_path = None;
                    }
                    session::Effect::TogglePause => {
                        recorder.toggle_pause();
                        tui.note_pause_toggled(recorder.is_paused());
                    }
                    session::Effect::Quit => {
                        exit_requested = true;
                    }
                }
            }
        }

        if let Some((session_id, response)) = arrived {
            if reply_is_current(&state, session_id) {
                let view = accept_response(
                    response,
                    &audio_dir,
                    &mut store,
                    question_path.take(),
                    &config_data,
                );
                final_answer = Some(view.answer.clone());
                answered = Some(view);
            } else {
                tracing::debug!("Dropped superseded reply for session {session_id}");
            }
        }

        match &state {
            session::State::Idle { .. } => tui.render_idle()?,
            session::State::Recording { paused, .. } => {
                let samples = recorder.samples();
                tui.render_recording(&samples, *paused)?;
            }
            session::State::Waiting { .. } => tui.render_waiting()?,
            session::State::Answered { .. } => {
                if let Some(view) = &answered {
                    tui.render_answer(&view.transcript, &view.answer, view.duration_secs)?;
                }
            }
            session::State::Failed { message, .. } => tui.render_failure(message)?,
        }
    }

    recorder.stop_recording();
    tui.cleanup()
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;

    if let Some(answer) = final_answer {
        route_answer(&answer, clipboard, output_file.as_deref())?;
    }

    tracing::info!("=== ova Ask Exited Successfully ===");
    Ok(())
}

/// A harvested reply is delivered only when the session it belongs to is
/// still the one on screen after the tick's events have reduced.
fn reply_is_current(state: &session::State, session_id: u64) -> bool {
    matches!(state, session::State::Answered { session } if *session == session_id)
}

/// Packages the session buffer as WAV bytes and writes the question file.
fn package_question(
    recorder: &AudioRecorder,
    audio_dir: &std::path::Path,
) -> anyhow::Result<(Vec<u8>, PathBuf)> {
    let samples = recorder.samples();
    if samples.is_empty() {
        return Err(anyhow::anyhow!("Nothing was recorded"));
    }

    let wav_bytes = encode_wav(&samples, recorder.sample_rate())?;

    let path = audio_dir.join(format!("q-{}.wav", Local::now().format("%Y%m%d-%H%M%S")));
    fs::write(&path, &wav_bytes)?;
    tracing::debug!(
        "Question packaged: {} bytes at {}",
        wav_bytes.len(),
        path.display()
    );

    Ok((wav_bytes, path))
}

/// Stores the reply, persists the exchange, and starts answer playback.
fn accept_response(
    response: AssistantResponse,
    audio_dir: &std::path::Path,
    store: &mut ExchangeStore,
    question_path: Option<PathBuf>,
    config_data: &config::OvaConfig,
) -> AnswerView {
    let duration_secs = response.answer_duration_secs();

    let answer_path = match response.answer_audio() {
        Ok(wav_bytes) => {
            let path = audio_dir.join(format!("a-{}.wav", Local::now().format("%Y%m%d-%H%M%S")));
            match fs::write(&path, wav_bytes) {
                Ok(()) => Some(path),
                Err(e) => {
                    tracing::warn!("Failed to write answer audio: {e}");
                    None
                }
            }
        }
        Err(e) => {
            tracing::warn!("Answer audio could not be decoded: {e}");
            None
        }
    };

    if let Err(e) = store.save_exchange(
        &response.transcript,
        &response.answer,
        question_path.as_deref(),
        answer_path.as_deref(),
    ) {
        tracing::warn!("Failed to save exchange to history: {e}");
    }

    if config_data.server.playback {
        play_answer(answer_path.clone(), config_data.server.player.clone());
    }

    AnswerView {
        transcript: response.transcript,
        answer: response.answer,
        duration_secs,
        audio: answer_path,
    }
}

/// Plays the answer WAV on a background thread so the TUI stays responsive.
fn play_answer(path: Option<PathBuf>, pinned: Option<String>) {
    let Some(path) = path else {
        tracing::debug!("No answer audio to play");
        return;
    };
    std::thread::spawn(move || {
        if let Err(e) = crate::playback::play_wav(&path, pinned.as_deref()) {
            tracing::warn!("Answer playback failed: {e}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_events(events: Vec<session::Event>) -> session::State {
        let mut state = session::State::default();
        for event in events {
            let (next, _) = session::reduce(&state, event);
            state = next;
        }
        state
    }

    #[test]
    fn reply_for_the_answered_session_is_delivered() {
        let state = run_events(vec![
            session::Event::RecordPressed,
            session::Event::StopPressed,
            session::Event::ResponseArrived { session: 1 },
        ]);

        assert!(reply_is_current(&state, 1));
    }

    #[test]
    fn reply_superseded_in_the_same_tick_is_not_delivered() {
        // The first upload finishes in the same tick as a superseding
        // record press: the events reduce first, so by delivery time the
        // screen belongs to session 2 and the stale reply must be dropped.
        let state = run_events(vec![
            session::Event::RecordPressed,
            session::Event::StopPressed,
            session::Event::RecordPressed,
            session::Event::ResponseArrived { session: 1 },
        ]);

        assert!(matches!(
            state,
            session::State::Recording { session: 2, .. }
        ));
        assert!(!reply_is_current(&state, 1));
    }

    #[test]
    fn reply_is_not_delivered_to_a_different_session() {
        let state = run_events(vec![
            session::Event::RecordPressed,
            session::Event::StopPressed,
            session::Event::ResponseArrived { session: 1 },
        ]);

        assert!(!reply_is_current(&state, 2));
    }
}
