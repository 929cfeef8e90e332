use serde::Deserialize;

use super::TransportError;
use super::envelope::{Reply, decode_envelope};
use super::numbers::{TransportCount, TransportId, TransportTimestamp};
use crate::domain::{DeliveryStatus, HistoryPage, HistoryQuery, HistoryRecord, MessageId};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum HistoryData {
    Paged(PagedHistoryJson),
    List(Vec<HistoryRecordJson>),
}

#[derive(Debug, Clone, Deserialize)]
struct PagedHistoryJson {
    #[serde(alias = "messages", alias = "records", alias = "data")]
    items: Vec<HistoryRecordJson>,
    #[serde(default)]
    total: Option<TransportCount>,
    #[serde(default, alias = "current_page")]
    page: Option<TransportCount>,
    #[serde(default)]
    per_page: Option<TransportCount>,
}

#[derive(Debug, Clone, Deserialize)]
struct HistoryRecordJson {
    #[serde(alias = "message_id")]
    id: TransportId,
    #[serde(alias = "number", alias = "phone")]
    recipient: String,
    #[serde(default, alias = "sms", alias = "body")]
    message: Option<String>,
    #[serde(default, alias = "sender")]
    sender_id: Option<String>,
    status: String,
    created_at: TransportTimestamp,
    #[serde(default)]
    scheduled_at: Option<TransportTimestamp>,
    #[serde(default)]
    delivered_at: Option<TransportTimestamp>,
    #[serde(default, alias = "sms_count")]
    credits: Option<TransportCount>,
}

/// Query string for `GET api/sms/history`.
pub fn encode_history_query(query: &HistoryQuery) -> Vec<(String, String)> {
    let mut params = vec![
        ("page".to_owned(), query.page_number().to_string()),
        ("per_page".to_owned(), query.page_size().to_string()),
    ];
    if let Some(status) = query.status_filter() {
        params.push(("status".to_owned(), status.as_str().to_owned()));
    }
    if let Some(from) = query.from_date() {
        params.push(("from".to_owned(), from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = query.to_date() {
        params.push(("to".to_owned(), to.format("%Y-%m-%d").to_string()));
    }
    params
}

/// Decode one history page and drop records outside the query's filters.
pub fn decode_history_json_response(
    query: &HistoryQuery,
    json: &str,
) -> Result<Reply<HistoryPage>, TransportError> {
    let envelope = decode_envelope::<HistoryData>(json)?;
    if let Some(failure) = envelope.failure() {
        return Ok(Reply::Rejected(failure));
    }

    let (items, total, page, per_page) = match envelope.into_data() {
        Some(HistoryData::Paged(paged)) => (
            paged.items,
            paged.total.and_then(TransportCount::into_u64),
            paged.page.and_then(TransportCount::into_u64),
            paged.per_page.and_then(TransportCount::into_u64),
        ),
        Some(HistoryData::List(items)) => (items, None, None, None),
        None => (Vec::new(), None, None, None),
    };

    let page = page
        .and_then(|it| u32::try_from(it).ok())
        .unwrap_or_else(|| query.page_number());
    let per_page = per_page
        .and_then(|it| u32::try_from(it).ok())
        .filter(|it| *it > 0)
        .unwrap_or_else(|| query.page_size());
    let fetched = items.len() as u64;
    let has_more = match total {
        Some(total) => u64::from(page) * u64::from(per_page) < total,
        None => fetched >= u64::from(per_page),
    };

    let records = items
        .into_iter()
        .map(into_record)
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|record| query.matches(record))
        .collect();

    Ok(Reply::Accepted(HistoryPage {
        records,
        page,
        per_page,
        total,
        has_more,
    }))
}

fn into_record(item: HistoryRecordJson) -> Result<HistoryRecord, TransportError> {
    let raw_id = item.id.into_string();
    let id = MessageId::new(raw_id.clone()).map_err(|_| TransportError::InvalidField {
        field: MessageId::FIELD,
        value: raw_id,
    })?;

    Ok(HistoryRecord {
        id,
        recipient: item.recipient.trim().to_owned(),
        message: item.message.unwrap_or_default(),
        sender_id: item.sender_id.filter(|it| !it.trim().is_empty()),
        status: DeliveryStatus::from_provider(&item.status),
        created_at: item.created_at.into_inner(),
        scheduled_at: item.scheduled_at.map(TransportTimestamp::into_inner),
        delivered_at: item.delivered_at.map(TransportTimestamp::into_inner),
        credits: item.credits.and_then(TransportCount::into_u64),
    })
}
