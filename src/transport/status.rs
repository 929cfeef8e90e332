use serde::Deserialize;

use super::TransportError;
use super::envelope::{Reply, decode_envelope};
use super::numbers::{TransportId, TransportTimestamp};
use crate::domain::{DeliveryStatus, MessageId, MessageStatus};

#[derive(Debug, Clone, Deserialize)]
struct MessageStatusData {
    #[serde(default, alias = "message_id")]
    id: Option<TransportId>,
    #[serde(default, alias = "number", alias = "phone")]
    recipient: Option<String>,
    #[serde(alias = "delivery_status")]
    status: String,
    #[serde(default)]
    sent_at: Option<TransportTimestamp>,
    #[serde(default)]
    delivered_at: Option<TransportTimestamp>,
}

pub fn decode_message_status_json_response(
    requested: &MessageId,
    json: &str,
) -> Result<Reply<MessageStatus>, TransportError> {
    let envelope = decode_envelope::<MessageStatusData>(json)?;
    if let Some(failure) = envelope.failure() {
        return Ok(Reply::Rejected(failure));
    }
    let data = envelope
        .into_data()
        .ok_or(TransportError::MissingData { what: "message status" })?;

    let id = match data.id {
        Some(raw) => {
            let raw = raw.into_string();
            MessageId::new(raw.clone()).map_err(|_| TransportError::InvalidField {
                field: MessageId::FIELD,
                value: raw,
            })?
        }
        None => requested.clone(),
    };

    Ok(Reply::Accepted(MessageStatus {
        id,
        recipient: data.recipient,
        status: DeliveryStatus::from_provider(&data.status),
        sent_at: data.sent_at.map(TransportTimestamp::into_inner),
        delivered_at: data.delivered_at.map(TransportTimestamp::into_inner),
    }))
}
