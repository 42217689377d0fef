//! Audio capture and the ask session flow.
//!
//! Provides microphone capture, the session state machine that drives the
//! record/stop controls, and the terminal UI for the ask workflow.

pub mod audio;
pub mod session;
pub mod ui;

pub use audio::{encode_wav, save_wav, AudioRecorder};
pub use session::{reduce, Controls, Effect, Event, State};
pub use ui::{Input, OvaTui};
