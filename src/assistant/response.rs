//! Assistant server reply.
//!
//! The server answers one multipart upload with one JSON object carrying the
//! recognized question, the answer text, and the spoken answer as base64 WAV.

use anyhow::anyhow;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::io::Cursor;

/// One reply from the assistant server.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantResponse {
    /// What the server heard in the uploaded audio
    pub transcript: String,
    /// The assistant's answer text
    pub answer: String,
    /// Spoken answer, base64-encoded 16-bit PCM WAV
    pub tts_audio: String,
}

impl AssistantResponse {
    /// Decodes the spoken answer into WAV bytes.
    ///
    /// # Errors
    /// - If the `tts_audio` field is not valid base64
    pub fn answer_audio(&self) -> anyhow::Result<Vec<u8>> {
        STANDARD
            .decode(&self.tts_audio)
            .map_err(|e| anyhow!("Spoken answer is not valid base64: {e}"))
    }

    /// Duration of the spoken answer in seconds, when the WAV header is
    /// readable. Used for display only.
    pub fn answer_duration_secs(&self) -> Option<f32> {
        let bytes = self.answer_audio().ok()?;
        let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return None;
        }
        Some(reader.duration() as f32 / spec.sample_rate as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_fields_deserialize() {
        let response: AssistantResponse =
            serde_json::from_str(r#"{"transcript":"hi","answer":"ok","tts_audio":"QUJD"}"#)
                .unwrap();

        assert_eq!(response.transcript, "hi");
        assert_eq!(response.answer, "ok");
        assert_eq!(response.answer_audio().unwrap(), b"ABC");
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let result: Result<AssistantResponse, _> =
            serde_json::from_str(r#"{"transcript":"hi","answer":"ok"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_base64_is_an_error() {
        let response = AssistantResponse {
            transcript: String::new(),
            answer: String::new(),
            tts_audio: "not base64!!!".to_string(),
        };
        assert!(response.answer_audio().is_err());
    }

    #[test]
    fn test_answer_duration_from_wav_header() {
        // One second of silence at 16kHz
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..16000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let response = AssistantResponse {
            transcript: String::new(),
            answer: String::new(),
            tts_audio: STANDARD.encode(cursor.into_inner()),
        };

        let duration = response.answer_duration_secs().unwrap();
        assert!((duration - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_answer_duration_of_garbage_is_none() {
        let response = AssistantResponse {
            transcript: String::new(),
            answer: String::new(),
            tts_audio: STANDARD.encode(b"definitely not a wav"),
        };
        assert_eq!(response.answer_duration_secs(), None);
    }
}
