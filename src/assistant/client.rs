//! HTTP client for the assistant server.
//!
//! One recorded question becomes one multipart POST to the server's
//! `/process_audio/` endpoint. The server runs speech recognition, picks an
//! answer and synthesizes speech; the client only ships bytes and renders
//! what comes back.

use crate::assistant::response::AssistantResponse;
use anyhow::anyhow;
use reqwest::StatusCode;
use std::sync::OnceLock;

/// Multipart field name the server reads the audio from.
const UPLOAD_FIELD: &str = "audio";

/// Filename attached to the uploaded audio part.
const UPLOAD_FILENAME: &str = "input.wav";

/// Shared HTTP client, initialized on first use.
static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP_CLIENT.get_or_init(reqwest::Client::new)
}

/// Builds the process_audio endpoint URL from the configured base URL.
fn endpoint_url(base_url: &str) -> String {
    format!("{}/process_audio/", base_url.trim_end_matches('/'))
}

/// Uploads one recorded question and awaits the assistant's reply.
///
/// The audio is sent as a single multipart part named `audio` with filename
/// `input.wav`. Exactly one request is issued per call; there is no retry.
///
/// # Errors
/// - If the server is unreachable
/// - If the server answers with a non-success status
/// - If the reply is not the expected JSON shape
pub async fn submit_question(
    base_url: &str,
    wav_bytes: Vec<u8>,
) -> anyhow::Result<AssistantResponse> {
    let url = endpoint_url(base_url);
    let payload_size = wav_bytes.len();

    let file_part = reqwest::multipart::Part::bytes(wav_bytes)
        .file_name(UPLOAD_FILENAME)
        .mime_str("audio/wav")
        .map_err(|e| anyhow!("Failed to create upload part: {e}"))?;

    let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, file_part);

    tracing::debug!(
        "Assistant request:\n  URL: {}\n  Method: POST\n  Body: multipart, field '{}', {} bytes",
        url,
        UPLOAD_FIELD,
        payload_size
    );

    let response = match http_client().post(&url).multipart(form).send().await {
        Ok(resp) => resp,
        Err(e) => {
            let error_msg = if e.is_connect() {
                format!("Failed to connect to the assistant server at {base_url}. Is it running?")
            } else if e.is_timeout() {
                "The assistant server did not respond in time.".to_string()
            } else {
                format!("Assistant server network error: {e}")
            };
            return Err(anyhow!(error_msg));
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow!(status_error_message(status, &error_body)));
    }

    let reply: AssistantResponse = response
        .json()
        .await
        .map_err(|e| anyhow!("Assistant reply was not the expected JSON: {e}"))?;

    tracing::info!(
        "Assistant replied: transcript {} chars, answer {} chars, audio {} base64 chars",
        reply.transcript.len(),
        reply.answer.len(),
        reply.tts_audio.len()
    );

    Ok(reply)
}

/// Maps a non-success status to a human-readable message.
fn status_error_message(status: StatusCode, body: &str) -> String {
    match status.as_u16() {
        400 => "The assistant server could not read the audio upload (status 400).".to_string(),
        404 => "The assistant server has no /process_audio/ endpoint. Check the server url in ova.toml."
            .to_string(),
        413 => "The recording is too large for the assistant server.".to_string(),
        500..=504 => {
            "The assistant server failed while processing the question. Please try again."
                .to_string()
        }
        _ => format!("Assistant server error (status {status}): {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_base() {
        assert_eq!(
            endpoint_url("http://127.0.0.1:8000"),
            "http://127.0.0.1:8000/process_audio/"
        );
    }

    #[test]
    fn test_endpoint_url_tolerates_trailing_slash() {
        assert_eq!(
            endpoint_url("http://assistant.local:9000/"),
            "http://assistant.local:9000/process_audio/"
        );
    }

    #[test]
    fn test_status_messages_are_human_readable() {
        let not_found = status_error_message(StatusCode::NOT_FOUND, "");
        assert!(not_found.contains("/process_audio/"));

        let server_error = status_error_message(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(server_error.contains("failed while processing"));

        let teapot = status_error_message(StatusCode::IM_A_TEAPOT, "short and stout");
        assert!(teapot.contains("418"));
        assert!(teapot.contains("short and stout"));
    }
}
