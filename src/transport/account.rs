use serde::Deserialize;

use super::TransportError;
use super::envelope::{Reply, decode_envelope};
use super::numbers::{TransportId, TransportMoney};
use crate::domain::{Profile, SenderIdInfo};

#[derive(Debug, Clone, Deserialize)]
struct ProfileJson {
    #[serde(default, alias = "full_name", alias = "username")]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, alias = "phone_number")]
    phone: Option<String>,
    #[serde(default, alias = "sms_balance", alias = "credits")]
    balance: Option<TransportMoney>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SenderIdsData {
    Wrapped {
        #[serde(alias = "senders", alias = "sender_ids")]
        items: Vec<SenderIdJson>,
    },
    List(Vec<SenderIdJson>),
}

#[derive(Debug, Clone, Deserialize)]
struct SenderIdJson {
    #[serde(default)]
    id: Option<TransportId>,
    #[serde(alias = "sender_id", alias = "senderid")]
    name: String,
    #[serde(default)]
    status: Option<String>,
}

pub fn decode_profile_json_response(json: &str) -> Result<Reply<Profile>, TransportError> {
    let envelope = decode_envelope::<ProfileJson>(json)?;
    if let Some(failure) = envelope.failure() {
        return Ok(Reply::Rejected(failure));
    }
    let data = envelope
        .into_data()
        .ok_or(TransportError::MissingData { what: "profile" })?;

    Ok(Reply::Accepted(Profile {
        name: data.name,
        email: data.email,
        phone: data.phone,
        balance: data.balance.map(TransportMoney::into_string),
    }))
}

pub fn decode_sender_ids_json_response(
    json: &str,
) -> Result<Reply<Vec<SenderIdInfo>>, TransportError> {
    let envelope = decode_envelope::<SenderIdsData>(json)?;
    if let Some(failure) = envelope.failure() {
        return Ok(Reply::Rejected(failure));
    }

    let items = match envelope.into_data() {
        Some(SenderIdsData::Wrapped { items }) | Some(SenderIdsData::List(items)) => items,
        None => Vec::new(),
    };

    Ok(Reply::Accepted(
        items
            .into_iter()
            .map(|item| SenderIdInfo {
                id: item.id.map(TransportId::into_string),
                name: item.name.trim().to_owned(),
                status: item.status,
            })
            .collect(),
    ))
}
