//! `/detect-voice` request body and base64 transport decoding
//!
//! Clients disagree on field names, so several spellings are accepted for
//! the audio payload, the language and the container format. The core only
//! ever sees the decoded bytes.
//!
//! Decoding is lenient: characters outside the base64 alphabet are dropped,
//! padding is optional and non-zero trailing bits are accepted.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

const DATA_URI_SCAN_CHARS: usize = 100;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectVoiceRequest {
    #[serde(default, rename = "Audio Base64 Format")]
    audio_base64_format_spaced: Option<String>,
    #[serde(default, rename = "audioBase64Format")]
    audio_base64_format: Option<String>,
    #[serde(default, rename = "audioBase64")]
    audio_base64_camel: Option<String>,
    #[serde(default)]
    audio_base64: Option<String>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    base64: Option<String>,
    #[serde(default)]
    audio_data: Option<String>,
    #[serde(default, rename = "audioData")]
    audio_data_camel: Option<String>,
    #[serde(default)]
    file: Option<String>,

    #[serde(default, rename = "Language")]
    language_title: Option<String>,
    #[serde(default)]
    language: Option<String>,

    #[serde(default, rename = "Audio Format")]
    audio_format_spaced: Option<String>,
    #[serde(default, rename = "audioFormat")]
    audio_format_camel: Option<String>,
    #[serde(default)]
    audio_format: Option<String>,
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("missing audio content: provide base64 audio in one of: audio_base64, audioBase64, audio, base64, audio_data, audioData, file")]
    MissingAudio,
    #[error("audio payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

impl PayloadError {
    pub fn code(&self) -> &'static str {
        match self {
            PayloadError::MissingAudio => "missing_audio",
            PayloadError::InvalidBase64(_) => "invalid_base64",
        }
    }
}

fn first_present<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|v| !v.is_empty())
}

impl DetectVoiceRequest {
    /// First non-empty audio field, in precedence order.
    pub fn audio_field(&self) -> Option<&str> {
        first_present(&[
            &self.audio_base64_format_spaced,
            &self.audio_base64,
            &self.audio_base64_format,
            &self.audio_base64_camel,
            &self.audio,
            &self.base64,
            &self.audio_data,
            &self.audio_data_camel,
            &self.file,
        ])
    }

    pub fn language(&self) -> &str {
        first_present(&[&self.language_title, &self.language]).unwrap_or("Unknown")
    }

    /// Container hint for the decoder, lowercased (`"mp3"`, `"wav"`, ...).
    pub fn format_hint(&self) -> Option<String> {
        first_present(&[
            &self.audio_format_spaced,
            &self.audio_format_camel,
            &self.audio_format,
        ])
        .map(|f| f.trim_start_matches('.').to_ascii_lowercase())
    }

    /// Clean and decode the audio field into raw container bytes.
    pub fn decode_audio(&self) -> Result<Vec<u8>, PayloadError> {
        let raw = self.audio_field().ok_or(PayloadError::MissingAudio)?;
        let bytes = LENIENT.decode(clean_base64(raw))?;
        if bytes.is_empty() {
            return Err(PayloadError::MissingAudio);
        }
        Ok(bytes)
    }
}

/// Strip a data-URI prefix, then keep only base64 alphabet characters.
///
/// A prefix is only recognised when its comma falls inside the first 100
/// characters. Padding is dropped too; the decoder does not need it.
pub fn clean_base64(raw: &str) -> String {
    let body = match raw
        .char_indices()
        .take(DATA_URI_SCAN_CHARS)
        .find(|&(_, c)| c == ',')
    {
        Some((idx, _)) => &raw[idx + 1..],
        None => raw,
    };
    body.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> DetectVoiceRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn spaced_field_takes_precedence() {
        let req = parse(serde_json::json!({
            "file": "ZmlsZQ==",
            "Audio Base64 Format": "c3BhY2Vk",
        }));
        assert_eq!(req.audio_field(), Some("c3BhY2Vk"));
    }

    #[test]
    fn snake_case_field_precedes_camel_case() {
        let req = parse(serde_json::json!({
            "audioBase64": "Y2FtZWw=",
            "audioBase64Format": "Zm9ybWF0",
            "audio_base64": "c25ha2U=",
        }));
        assert_eq!(req.audio_field(), Some("c25ha2U="));
        assert_eq!(req.decode_audio().unwrap(), b"snake");

        let req = parse(serde_json::json!({
            "audioBase64": "Y2FtZWw=",
            "audioBase64Format": "Zm9ybWF0",
        }));
        assert_eq!(req.audio_field(), Some("Zm9ybWF0"));
    }

    #[test]
    fn empty_fields_are_skipped() {
        let req = parse(serde_json::json!({ "audioBase64": "  ", "audio": "YXVkaW8=" }));
        assert_eq!(req.audio_field(), Some("YXVkaW8="));
        assert_eq!(req.decode_audio().unwrap(), b"audio");
    }

    #[test]
    fn language_and_format_aliases() {
        let req = parse(serde_json::json!({ "Language": "Tamil", "audioFormat": ".MP3" }));
        assert_eq!(req.language(), "Tamil");
        assert_eq!(req.format_hint().as_deref(), Some("mp3"));
        assert_eq!(parse(serde_json::json!({})).language(), "Unknown");
    }

    #[test]
    fn strips_data_uri_and_whitespace() {
        assert_eq!(clean_base64("data:audio/mp3;base64,YW\r\nJj ZA=="), "YWJjZA");
        assert_eq!(clean_base64("YWJj\n\tZA=="), "YWJjZA");
    }

    #[test]
    fn late_comma_is_not_a_prefix() {
        let raw = format!("{},tail", "A".repeat(120));
        assert_eq!(clean_base64(&raw), format!("{}tail", "A".repeat(120)));
    }

    #[test]
    fn decoding_tolerates_stray_characters_and_trailing_bits() {
        let tabbed = parse(serde_json::json!({ "audio": "YWJj\tZA==" }));
        assert_eq!(tabbed.decode_audio().unwrap(), b"abcd");

        // `B` leaves non-zero bits after the final byte.
        let trailing = parse(serde_json::json!({ "audio": "YWJjZB==" }));
        assert_eq!(trailing.decode_audio().unwrap(), b"abcd");

        let unpadded = parse(serde_json::json!({ "audio": "YWJjZA" }));
        assert_eq!(unpadded.decode_audio().unwrap(), b"abcd");
    }

    #[test]
    fn missing_and_invalid_payloads() {
        let err = parse(serde_json::json!({ "language": "en" })).decode_audio().unwrap_err();
        assert_eq!(err.code(), "missing_audio");

        // A single leftover character cannot encode a byte.
        let err = parse(serde_json::json!({ "audio": "%%%A%%%" }))
            .decode_audio()
            .unwrap_err();
        assert_eq!(err.code(), "invalid_base64");

        let err = parse(serde_json::json!({ "audio": "***" })).decode_audio().unwrap_err();
        assert_eq!(err.code(), "missing_audio");

        let err = parse(serde_json::json!({ "audio": "data:audio/wav;base64," }))
            .decode_audio()
            .unwrap_err();
        assert_eq!(err.code(), "missing_audio");
    }
}
