//! Transport layer: HTTP and wire-format details (serialization/deserialization).

mod account;
mod envelope;
mod history;
mod numbers;
mod send_sms;
mod status;

pub use account::{decode_profile_json_response, decode_sender_ids_json_response};
pub use envelope::{ApiFailure, Reply, decode_error_body};
pub use history::{decode_history_json_response, encode_history_query};
pub use send_sms::{decode_send_sms_json_response, encode_send_sms_body};
pub use status::decode_message_status_json_response;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response has no {what} payload")]
    MissingData { what: &'static str },

    #[error("response contains invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}
