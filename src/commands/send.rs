//! Submit a pre-recorded audio file as a question without recording.
//!
//! Accepts an audio file path and submits it to the assistant server,
//! reusing the same upload and delivery pipeline as the `ask` command.

use crate::assistant::submit_question;
use crate::commands::route_answer;
use crate::config::OvaConfig;
use crate::history::{self, ExchangeStore};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Handles submission of a pre-recorded audio file.
///
/// Uploads the given audio file as one question, prints (or routes) the
/// answer, plays the synthesized speech, and saves the exchange to history.
///
/// # Arguments
/// * `file` - Path to the audio file to submit
/// * `clipboard` - If true, copy the answer to the clipboard instead of stdout
/// * `output_file` - Optional file path to write the answer to instead of stdout
pub async fn handle_send(
    file: PathBuf,
    clipboard: bool,
    output_file: Option<String>,
) -> Result<(), anyhow::Error> {
    tracing::info!("=== ova Send Command ===");

    if !file.exists() {
        return Err(anyhow::anyhow!("Audio file not found: {}", file.display()));
    }

    tracing::info!("Submitting file: {}", file.display());

    let config_data = OvaConfig::load().map_err(|err| {
        tracing::error!("Failed to load configuration: {err}");
        anyhow::anyhow!("Configuration error: {err}")
    })?;

    let wav_bytes = fs::read(&file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;

    // The file stays where the user put it; only the answer audio is
    // retained under the data directory.
    submit_and_deliver(&config_data, wav_bytes, None, clipboard, output_file).await
}

/// Uploads question audio and delivers the reply: routes the answer text,
/// plays the spoken answer, and persists the exchange.
///
/// `question_audio` is the history path for the question, when one should be
/// recorded alongside the exchange.
pub(crate) async fn submit_and_deliver(
    config_data: &OvaConfig,
    wav_bytes: Vec<u8>,
    question_audio: Option<PathBuf>,
    clipboard: bool,
    output_file: Option<String>,
) -> Result<(), anyhow::Error> {
    let response = submit_question(&config_data.server.url, wav_bytes).await?;

    tracing::info!("Question understood as: {}", response.transcript);
    eprintln!("Q: {}", response.transcript);

    let answer_path = write_answer_audio(&response)?;

    let data_dir = history::data_dir()?;
    let mut store = ExchangeStore::new(&data_dir)?;
    if let Err(e) = store.save_exchange(
        &response.transcript,
        &response.answer,
        question_audio.as_deref(),
        answer_path.as_deref(),
    ) {
        tracing::warn!("Failed to save exchange to history: {e}");
    }

    route_answer(&response.answer, clipboard, output_file.as_deref())?;

    if config_data.server.playback {
        if let Some(path) = &answer_path {
            if let Err(e) = crate::playback::play_wav(path, config_data.server.player.as_deref()) {
                tracing::warn!("Answer playback failed: {e}");
            }
        }
    }

    Ok(())
}

/// Decodes the spoken answer and writes it to the data directory.
///
/// Returns `None` when the reply carried no decodable audio; that is logged
/// but never fatal to the displayed text.
fn write_answer_audio(
    response: &crate::assistant::AssistantResponse,
) -> anyhow::Result<Option<PathBuf>> {
    let wav_bytes = match response.answer_audio() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Answer audio could not be decoded: {e}");
            return Ok(None);
        }
    };

    let audio_dir = history::data_dir()?.join("exchanges");
    fs::create_dir_all(&audio_dir)?;
    let path = audio_dir.join(format!("a-{}.wav", Local::now().format("%Y%m%d-%H%M%S")));
    fs::write(&path, wav_bytes)?;
    tracing::debug!("Answer audio written to {}", path.display());
    Ok(Some(path))
}

/// Copies question audio into the data directory so history retention owns it.
pub(crate) fn retain_question_audio(source: &Path) -> anyhow::Result<PathBuf> {
    let audio_dir = history::data_dir()?.join("exchanges");
    fs::create_dir_all(&audio_dir)?;
    let path = audio_dir.join(format!("q-{}.wav", Local::now().format("%Y%m%d-%H%M%S")));
    fs::copy(source, &path)?;
    Ok(path)
}
