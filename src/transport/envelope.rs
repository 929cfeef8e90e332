use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::TransportError;

/// Common wrapper around every Notify Africa JSON reply:
/// `{"status": 200 | "success", "success": true, "message": "...", "data": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    status: Option<EnvelopeStatus>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EnvelopeStatus {
    Code(i64),
    Text(String),
}

/// The provider answered, but refused the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub code: Option<u16>,
    pub message: String,
}

/// Decoded reply: either the payload or the provider's refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Accepted(T),
    Rejected(ApiFailure),
}

impl<T> Envelope<T> {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn failure(&self) -> Option<ApiFailure> {
        let code = match &self.status {
            Some(EnvelopeStatus::Code(code)) => u16::try_from(*code).ok(),
            _ => None,
        };
        let text_failed = matches!(
            &self.status,
            Some(EnvelopeStatus::Text(text))
                if matches!(text.trim().to_ascii_lowercase().as_str(), "error" | "failed" | "fail")
        );
        let code_failed = code.is_some_and(|code| code >= 400);

        if self.success == Some(false) || text_failed || code_failed {
            return Some(ApiFailure {
                code,
                message: self
                    .message
                    .clone()
                    .unwrap_or_else(|| "request rejected by provider".to_owned()),
            });
        }
        None
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

pub fn decode_envelope<T: DeserializeOwned>(json: &str) -> Result<Envelope<T>, TransportError> {
    Ok(serde_json::from_str(json)?)
}

/// Error payload of a non-2xx reply: `{"message": "...", "errors": {"field": ["..."]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub details: Vec<String>,
}

impl ErrorBody {
    /// Single human-readable line combining message and field details.
    pub fn summary(&self) -> Option<String> {
        match (&self.message, self.details.is_empty()) {
            (Some(message), true) => Some(message.clone()),
            (Some(message), false) => Some(format!("{message}: {}", self.details.join("; "))),
            (None, false) => Some(self.details.join("; ")),
            (None, true) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBodyJson {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

/// Best-effort decoding; returns `None` when the body is not a JSON object.
pub fn decode_error_body(body: &str) -> Option<ErrorBody> {
    let parsed: ErrorBodyJson = serde_json::from_str(body).ok()?;

    let mut message = parsed.message.filter(|it| !it.trim().is_empty());
    let mut details = Vec::new();
    if let Some(error) = parsed.error {
        match error {
            serde_json::Value::String(text) if message.is_none() => message = Some(text),
            other => collect_strings(&other, &mut details),
        }
    }
    if let Some(errors) = parsed.errors {
        collect_strings(&errors, &mut details);
    }

    let body = ErrorBody { message, details };
    body.summary().map(|_| body)
}

fn collect_strings(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(text) => out.push(text.clone()),
        serde_json::Value::Array(items) => items.iter().for_each(|it| collect_strings(it, out)),
        serde_json::Value::Object(map) => map.values().for_each(|it| collect_strings(it, out)),
        _ => {}
    }
}
