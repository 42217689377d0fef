// Integration tests for assistant reply handling
//
// These tests verify the wire contract: the JSON reply shape, the base64
// answer audio decoding, and the rendering inputs derived from a reply.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ova::assistant::AssistantResponse;

#[test]
fn test_spec_fixture_reply() {
    // The canonical fixture: transcript "hi", answer "ok", audio bytes "ABC"
    let reply: AssistantResponse =
        serde_json::from_str(r#"{"transcript":"hi","answer":"ok","tts_audio":"QUJD"}"#).unwrap();

    assert_eq!(reply.transcript, "hi");
    assert_eq!(reply.answer, "ok");
    assert_eq!(reply.answer_audio().unwrap(), b"ABC");
}

#[test]
fn test_reply_with_real_wav_audio() {
    // Build a small valid WAV and ship it through the base64 field
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for i in 0..22050 {
        writer.write_sample((i % 128) as i16).unwrap();
    }
    writer.finalize().unwrap();
    let wav_bytes = cursor.into_inner();

    let json = serde_json::json!({
        "transcript": "what is the capital of France",
        "answer": "The capital of France is Paris.",
        "tts_audio": STANDARD.encode(&wav_bytes),
    });
    let reply: AssistantResponse = serde_json::from_value(json).unwrap();

    assert_eq!(reply.answer_audio().unwrap(), wav_bytes);
    let duration = reply.answer_duration_secs().unwrap();
    assert!((duration - 1.0).abs() < 0.01);
}

#[test]
fn test_missing_fields_are_parse_errors() {
    for json in [
        r#"{"answer":"ok","tts_audio":"QUJD"}"#,
        r#"{"transcript":"hi","tts_audio":"QUJD"}"#,
        r#"{"transcript":"hi","answer":"ok"}"#,
        r#"{}"#,
    ] {
        let result: Result<AssistantResponse, _> = serde_json::from_str(json);
        assert!(result.is_err(), "expected parse failure for {json}");
    }
}

#[test]
fn test_non_json_body_is_a_parse_error() {
    let result: Result<AssistantResponse, _> = serde_json::from_str("<html>502 Bad Gateway</html>");
    assert!(result.is_err());
}

#[test]
fn test_empty_audio_field_decodes_to_no_bytes() {
    let reply: AssistantResponse =
        serde_json::from_str(r#"{"transcript":"hi","answer":"ok","tts_audio":""}"#).unwrap();

    assert!(reply.answer_audio().unwrap().is_empty());
    // No WAV header in zero bytes, so no duration either
    assert_eq!(reply.answer_duration_secs(), None);
}

#[test]
fn test_extra_fields_are_tolerated() {
    // A newer server may add fields; the client must not choke on them
    let reply: AssistantResponse = serde_json::from_str(
        r#"{"transcript":"hi","answer":"ok","tts_audio":"QUJD","model":"tts-v2"}"#,
    )
    .unwrap();

    assert_eq!(reply.answer, "ok");
}
