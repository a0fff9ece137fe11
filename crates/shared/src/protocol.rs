//! Wire format of the label server endpoints.
//!
//! Every endpoint answers with a JSON object. A response carrying an `error`
//! key is a failure regardless of the HTTP status; anything else is decoded
//! into the endpoint's success payload.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{domain::LabelDraft, error::RemoteError};

pub const PARSE_PATH: &str = "/parse";
pub const GENERATE_PATH: &str = "/generate";
pub const UPLOAD_PATH: &str = "/upload";
pub const FILE_PART_NAME: &str = "file";

/// Fields extracted server-side from a report file. Missing or null fields
/// decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReport {
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub capacity: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub color: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub battery_life: String,
}

impl ParsedReport {
    pub fn into_draft(self, imei: impl Into<String>) -> LabelDraft {
        LabelDraft {
            model: self.model,
            capacity: self.capacity,
            color: self.color,
            battery_life: self.battery_life,
            imei: imei.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub capacity: String,
    pub color: String,
    pub battery_life: String,
    pub imei: String,
}

impl From<&LabelDraft> for GenerateRequest {
    fn from(draft: &LabelDraft) -> Self {
        Self {
            model: draft.model.clone(),
            capacity: draft.capacity.clone(),
            color: draft.color.clone(),
            battery_life: draft.battery_life.clone(),
            imei: draft.imei.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedLabel {
    pub image_url: String,
}

/// Response of the fused `/upload` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyUploadResponse {
    pub preview_url: String,
    pub pdf_url: String,
}

pub fn decode_response<T: DeserializeOwned>(body: &[u8]) -> Result<T, RemoteError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| RemoteError::Malformed(format!("response is not JSON: {err}")))?;
    let Value::Object(map) = value else {
        return Err(RemoteError::Malformed(
            "response is not a JSON object".to_string(),
        ));
    };

    match map.get("error") {
        Some(error) if is_set(error) => {
            let message = match error {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            };
            return Err(RemoteError::Server(message));
        }
        _ => {}
    }

    serde_json::from_value(Value::Object(map))
        .map_err(|err| RemoteError::Malformed(err.to_string()))
}

/// `null`, `false`, `0` and `""` leave the `error` key unset.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
