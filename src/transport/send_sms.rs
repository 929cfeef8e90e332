use chrono::FixedOffset;
use serde::Deserialize;

use super::TransportError;
use super::envelope::{Reply, decode_envelope};
use super::numbers::{TransportCount, TransportId, TransportMoney};
use crate::domain::{
    AcceptedMessage, DeliveryStatus, MessageId, PhoneNumber, SendSms, SendSmsResponse, SenderId,
};

const SCHEDULE_NONE: &str = "none";
const SCHEDULE_LATER: &str = "scheduled";

#[derive(Debug, Clone, Deserialize)]
struct SendSmsData {
    #[serde(default)]
    messages: Vec<AcceptedJson>,
    #[serde(default, alias = "id")]
    message_id: Option<TransportId>,
    #[serde(default, alias = "sms_count", alias = "credits")]
    credits_used: Option<TransportCount>,
    #[serde(default, alias = "remaining_balance", alias = "sms_balance")]
    balance: Option<TransportMoney>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AcceptedJson {
    #[serde(default, alias = "message_id")]
    id: Option<TransportId>,
    #[serde(default, alias = "number", alias = "phone")]
    recipient: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Build the JSON body for `POST api/sms/send`.
///
/// Scheduled sends carry the delivery time as local date and time in `local_offset`.
pub fn encode_send_sms_body(
    request: &SendSms,
    sender_id: &SenderId,
    local_offset: FixedOffset,
) -> serde_json::Value {
    let recipients = request
        .recipients()
        .iter()
        .map(|phone| serde_json::json!({ "number": phone.as_str() }))
        .collect::<Vec<_>>();

    let mut body = serde_json::json!({
        "sender_id": sender_id.as_str(),
        "sms": request.text().as_str(),
        "schedule": SCHEDULE_NONE,
        "recipients": recipients,
    });

    if let Some(at) = request.options().schedule {
        let local = at.at().with_timezone(&local_offset);
        body["schedule"] = SCHEDULE_LATER.into();
        body["scheduled_date"] = local.format("%Y-%m-%d").to_string().into();
        body["scheduled_time"] = local.format("%H:%M").to_string().into();
    }

    body
}

pub fn decode_send_sms_json_response(
    request: &SendSms,
    json: &str,
) -> Result<Reply<SendSmsResponse>, TransportError> {
    let envelope = decode_envelope::<SendSmsData>(json)?;
    if let Some(failure) = envelope.failure() {
        return Ok(Reply::Rejected(failure));
    }
    let message = envelope.message().map(str::to_owned);

    let Some(data) = envelope.into_data() else {
        return Ok(Reply::Accepted(SendSmsResponse {
            message,
            messages: Vec::new(),
            credits_used: None,
            balance: None,
        }));
    };

    let mut messages = data
        .messages
        .into_iter()
        .map(|item| AcceptedMessage {
            id: item.id.and_then(message_id),
            recipient: item.recipient,
            status: item
                .status
                .as_deref()
                .map(DeliveryStatus::from_provider)
                .unwrap_or_else(|| default_status(request)),
        })
        .collect::<Vec<_>>();

    // Single-recipient replies carry the id at the top level of `data`.
    if messages.is_empty() {
        if let Some(id) = data.message_id.and_then(message_id) {
            messages.push(AcceptedMessage {
                id: Some(id),
                recipient: request
                    .recipients()
                    .first()
                    .map(PhoneNumber::as_str)
                    .map(str::to_owned),
                status: data
                    .status
                    .as_deref()
                    .map(DeliveryStatus::from_provider)
                    .unwrap_or_else(|| default_status(request)),
            });
        }
    }

    Ok(Reply::Accepted(SendSmsResponse {
        message,
        messages,
        credits_used: data.credits_used.and_then(TransportCount::into_u64),
        balance: data.balance.map(TransportMoney::into_string),
    }))
}

fn message_id(raw: TransportId) -> Option<MessageId> {
    MessageId::new(raw.into_string()).ok()
}

fn default_status(request: &SendSms) -> DeliveryStatus {
    if request.options().schedule.is_some() {
        DeliveryStatus::Scheduled
    } else {
        DeliveryStatus::Queued
    }
}
