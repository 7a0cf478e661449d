//! Immutable corpus record types
//!
//! Field names follow the kokkai speech API JSON shape so cached batches
//! deserialize directly.

use serde::{Deserialize, Serialize};

/// A single speech record from the proceedings corpus
///
/// Loaded once at index-build time and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique speech identifier
    #[serde(rename = "speechID", default)]
    pub speech_id: String,

    /// Speaker name
    #[serde(default)]
    pub speaker: String,

    /// Date of the speech (YYYY-MM-DD)
    #[serde(default)]
    pub date: String,

    /// Full speech text
    #[serde(rename = "speech", default)]
    pub text: String,

    /// Chamber the speech was given in (衆議院/参議院)
    #[serde(rename = "nameOfHouse", default)]
    pub house: String,

    /// Meeting name
    #[serde(rename = "nameOfMeeting", default)]
    pub meeting: String,
}

impl Document {
    /// Text fed to the lexical index: speech body plus speaker name
    pub fn index_text(&self) -> String {
        format!("{} {}", self.text, self.speaker)
    }

    /// Text scanned by the dense-overlap heuristic
    pub fn overlap_text(&self) -> String {
        format!("{}{}", self.text, self.speaker)
    }
}

/// Envelope of one cached API batch: `{"speechRecord": [...]}`
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechEnvelope {
    #[serde(rename = "speechRecord", default)]
    pub speech_record: Vec<Document>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_deserializes_api_shape() {
        let json = r#"{
            "speechID": "100-1-0",
            "speaker": "山田太郎",
            "date": "2024-02-01",
            "speech": "教育政策について質問いたします。",
            "nameOfHouse": "衆議院",
            "nameOfMeeting": "予算委員会"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.speech_id, "100-1-0");
        assert_eq!(doc.house, "衆議院");
        assert!(doc.text.contains("教育政策"));
    }

    #[test]
    fn test_document_missing_fields_default_empty() {
        let doc: Document = serde_json::from_str(r#"{"speechID": "x"}"#).unwrap();
        assert_eq!(doc.speaker, "");
        assert_eq!(doc.text, "");
    }

    #[test]
    fn test_envelope_without_records() {
        let envelope: SpeechEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.speech_record.is_empty());
    }

    #[test]
    fn test_index_text_concatenates_speaker() {
        let doc = Document {
            speech_id: "1".to_string(),
            speaker: "議員A".to_string(),
            date: String::new(),
            text: "発言内容".to_string(),
            house: String::new(),
            meeting: String::new(),
        };
        assert_eq!(doc.index_text(), "発言内容 議員A");
        assert_eq!(doc.overlap_text(), "発言内容議員A");
    }
}
