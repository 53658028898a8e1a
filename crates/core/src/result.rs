use serde::{Deserialize, Deserializer, Serialize};

/// Request body sent to the polishing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolishRequest {
    pub text: String,
}

/// Response body returned by the polishing service.
///
/// `tone_score` is transported as free-form text. Services that send a bare
/// number are accepted too; the number is kept verbatim as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolishResponse {
    pub original: String,
    pub idiom: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, deserialize_with = "tone_score_as_text")]
    pub tone_score: String,
}

fn tone_score_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ToneScore {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match ToneScore::deserialize(deserializer)? {
        ToneScore::Text(text) => text,
        ToneScore::Number(number) => number.to_string(),
    })
}

/// Outcome of one polish request.
///
/// Built either from a service response (alternatives included) or from a
/// history record (alternatives are not persisted, so they come back empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolishResult {
    pub original: String,
    pub idiom: String,
    pub alternatives: Vec<String>,
    pub explanation: String,
    pub tone_score: String,
}

impl PolishResult {
    /// Every phrase the user can pick, primary idiom first.
    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.idiom.as_str()).chain(self.alternatives.iter().map(String::as_str))
    }
}

impl From<PolishResponse> for PolishResult {
    fn from(response: PolishResponse) -> Self {
        Self {
            original: response.original,
            idiom: response.idiom,
            alternatives: response.alternatives,
            explanation: response.explanation,
            tone_score: response.tone_score,
        }
    }
}

impl From<&PolishRecord> for PolishResult {
    fn from(record: &PolishRecord) -> Self {
        Self {
            original: record.original_text.clone(),
            idiom: record.idiom.clone(),
            alternatives: Vec::new(),
            explanation: record.explanation.clone(),
            tone_score: record.tone_score.clone(),
        }
    }
}

/// A persisted history entry.
///
/// `original_text` is the dedup key: a store never holds two records with
/// the same value. `timestamp` (milliseconds) only drives recency ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolishRecord {
    /// Store-assigned surrogate id.
    pub id: i64,
    pub original_text: String,
    pub idiom: String,
    pub explanation: String,
    pub tone_score: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserialize() {
        let json = r#"{
            "original": "他很高兴",
            "idiom": "欣喜若狂",
            "alternatives": ["眉开眼笑", "喜上眉梢"],
            "explanation": "形容高兴到了极点。",
            "tone_score": "8"
        }"#;
        let response: PolishResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.original, "他很高兴");
        assert_eq!(response.idiom, "欣喜若狂");
        assert_eq!(response.alternatives, vec!["眉开眼笑", "喜上眉梢"]);
        assert_eq!(response.tone_score, "8");
    }

    #[test]
    fn test_response_numeric_tone_score_kept_verbatim() {
        let json = r#"{"original": "a", "idiom": "b", "tone_score": 7.5}"#;
        let response: PolishResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.tone_score, "7.5");
        assert!(response.alternatives.is_empty());
        assert!(response.explanation.is_empty());
    }

    #[test]
    fn test_response_opaque_tone_score() {
        let json = r#"{"original": "a", "idiom": "b", "tone_score": "high-ish"}"#;
        let response: PolishResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.tone_score, "high-ish");
    }

    #[test]
    fn test_response_missing_idiom_is_rejected() {
        let json = r#"{"original": "a", "tone_score": "3"}"#;
        assert!(serde_json::from_str::<PolishResponse>(json).is_err());
    }

    #[test]
    fn test_request_serialize() {
        let body = serde_json::to_value(PolishRequest {
            text: "他很高兴".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"text": "他很高兴"}));
    }

    #[test]
    fn test_result_from_record_has_no_alternatives() {
        let record = PolishRecord {
            id: 3,
            original_text: "他很高兴".to_string(),
            idiom: "欣喜若狂".to_string(),
            explanation: "...".to_string(),
            tone_score: "8".to_string(),
            timestamp: 1_700_000_000_000,
        };
        let result = PolishResult::from(&record);
        assert_eq!(result.original, "他很高兴");
        assert_eq!(result.idiom, "欣喜若狂");
        assert!(result.alternatives.is_empty());
        assert_eq!(result.tone_score, "8");
    }

    #[test]
    fn test_phrases_lists_idiom_first() {
        let result = PolishResult {
            original: "x".to_string(),
            idiom: "欣喜若狂".to_string(),
            alternatives: vec!["眉开眼笑".to_string()],
            explanation: String::new(),
            tone_score: String::new(),
        };
        let phrases: Vec<_> = result.phrases().collect();
        assert_eq!(phrases, vec!["欣喜若狂", "眉开眼笑"]);
    }
}
