//! Assistant server integration.
//!
//! Uploading a recorded question and decoding the reply. The server does all
//! speech recognition, answering and speech synthesis; this module treats it
//! as a black box behind `POST /process_audio/`.

pub mod client;
pub mod response;

pub use client::submit_question;
pub use response::AssistantResponse;
