//! Client layer: orchestrates transport calls and maps transport ↔ domain.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use tracing::{debug, info, warn};
use url::Url;

use crate::contacts::{ContactList, ImportError, MessageTemplate};
use crate::domain::{
    ApiKey, CountryCode, HistoryPage, HistoryQuery, HistoryRecord, MessageId, MessageStatus,
    MessageText, PhoneNumber, Profile, SEND_SMS_MAX_RECIPIENTS, ScheduleTime, SendSms,
    SendSmsResponse, SenderId, SenderIdInfo, ValidationError,
};
use crate::export::ExportError;
use crate::transport::{self, ApiFailure, Reply, TransportError};

const DEFAULT_BASE_URL: &str = "https://api.notify.africa/v2";

/// East Africa Time, the provider's local clock for scheduled sends.
const DEFAULT_UTC_OFFSET_SECS: i32 = 3 * 3600;

/// Upper bound on pages walked by [`NotifyAfricaClient::history_all`].
const MAX_HISTORY_PAGES: u32 = 10_000;

pub const ENV_API_KEY: &str = "NOTIFY_AFRICA_API_KEY";
pub const ENV_SENDER_ID: &str = "NOTIFY_AFRICA_SENDER_ID";
pub const ENV_BASE_URL: &str = "NOTIFY_AFRICA_BASE_URL";

type BoxError = Box<dyn StdError + Send + Sync>;
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone)]
struct HttpResponse {
    status: u16,
    body: String,
    /// `Retry-After` in seconds, when present.
    retry_after: Option<u64>,
}

trait HttpTransport: Send + Sync {
    fn get<'a>(
        &'a self,
        url: &'a str,
        token: &'a str,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>>;

    fn post_json<'a>(
        &'a self,
        url: &'a str,
        token: &'a str,
        body: serde_json::Value,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>>;
}

#[derive(Debug, Clone)]
struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    async fn read(response: reqwest::Response) -> Result<HttpResponse, BoxError> {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok());
        let body = response.text().await?;
        Ok(HttpResponse {
            status,
            body,
            retry_after,
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        token: &'a str,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .bearer_auth(token)
                .header(ACCEPT, "application/json")
                .send()
                .await?;
            Self::read(response).await
        })
    }

    fn post_json<'a>(
        &'a self,
        url: &'a str,
        token: &'a str,
        body: serde_json::Value,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(url)
                .bearer_auth(token)
                .header(ACCEPT, "application/json")
                .json(&body)
                .send()
                .await?;
            Self::read(response).await
        })
    }
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`NotifyAfricaClient`].
///
/// Input problems (`Validation`, `Import`, `Export`) are detected before any
/// request is made; the remaining variants describe what the provider or the
/// network did.
pub enum NotifyAfricaError {
    /// One of the domain constructors rejected an invalid value.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("contact import failed: {0}")]
    Import(#[from] ImportError),

    #[error("history export failed: {0}")]
    Export(#[from] ExportError),

    /// Missing, invalid or revoked API key (HTTP 401/403).
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The account has no SMS credits left for this send.
    #[error("insufficient credits: {message}")]
    InsufficientCredits { message: String },

    /// HTTP 429; `retry_after` comes from the `Retry-After` header.
    #[error("rate limited by provider (retry after {retry_after:?})")]
    RateLimited {
        retry_after: Option<Duration>,
        message: Option<String>,
    },

    /// The provider refused the request with a readable message.
    #[error("API error ({status:?}): {message}")]
    Api { status: Option<u16>, message: String },

    /// Non-successful HTTP status without a recognisable error payload.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// HTTP client / transport failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Response body could not be parsed as the expected format.
    #[error("parse error: {0}")]
    Parse(#[source] BoxError),

    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("environment variable {name} is not set")]
    MissingEnv { name: &'static str },
}

impl NotifyAfricaError {
    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Transport(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            Self::Api {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

/// Outcome of one request issued by a bulk helper.
#[derive(Debug)]
pub struct SentBatch {
    pub recipients: Vec<PhoneNumber>,
    pub response: SendSmsResponse,
}

#[derive(Debug)]
pub struct FailedBatch {
    pub recipients: Vec<PhoneNumber>,
    pub error: NotifyAfricaError,
}

/// Per-request results of [`NotifyAfricaClient::send_personalized`] and
/// [`NotifyAfricaClient::send_contacts`].
#[derive(Debug, Default)]
pub struct BulkSendReport {
    pub sent: Vec<SentBatch>,
    pub failed: Vec<FailedBatch>,
}

impl BulkSendReport {
    /// Recipients whose request was accepted.
    pub fn sent_count(&self) -> usize {
        self.sent.iter().map(|it| it.recipients.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.iter().map(|it| it.recipients.len()).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
/// Builder for [`NotifyAfricaClient`].
///
/// Use this when you need to customize the base URL, timeout, user-agent,
/// default sender id, or the offset used to render scheduled times.
pub struct NotifyAfricaClientBuilder {
    api_key: ApiKey,
    base_url: String,
    sender_id: Option<SenderId>,
    country: CountryCode,
    local_offset: FixedOffset,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl NotifyAfricaClientBuilder {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
            sender_id: None,
            country: CountryCode::default(),
            local_offset: default_offset(),
            timeout: None,
            user_agent: None,
        }
    }

    /// Read `NOTIFY_AFRICA_API_KEY` (required), `NOTIFY_AFRICA_SENDER_ID` and
    /// `NOTIFY_AFRICA_BASE_URL` from the process environment.
    pub fn from_env() -> Result<Self, NotifyAfricaError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NotifyAfricaError> {
        let present = |name: &str| lookup(name).filter(|it| !it.trim().is_empty());

        let api_key =
            present(ENV_API_KEY).ok_or(NotifyAfricaError::MissingEnv { name: ENV_API_KEY })?;
        let mut builder = Self::new(ApiKey::new(api_key)?);
        if let Some(sender_id) = present(ENV_SENDER_ID) {
            builder = builder.sender_id(SenderId::new(sender_id)?);
        }
        if let Some(base_url) = present(ENV_BASE_URL) {
            builder = builder.base_url(base_url.trim());
        }
        Ok(builder)
    }

    /// Override the API root (default `https://api.notify.africa/v2`).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sender id used when a request does not carry its own.
    pub fn sender_id(mut self, sender_id: SenderId) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    /// Country code for numbers parsed through [`NotifyAfricaClient::parse_phone`].
    pub fn country_code(mut self, country: CountryCode) -> Self {
        self.country = country;
        self
    }

    /// Offset in which scheduled date/time fields are sent (default UTC+03:00).
    pub fn local_offset(mut self, offset: FixedOffset) -> Self {
        self.local_offset = offset;
        self
    }

    /// Set an HTTP client timeout applied to the entire request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<NotifyAfricaClient, NotifyAfricaError> {
        validate_base_url(&self.base_url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|err| NotifyAfricaError::Transport(Box::new(err)))?;

        Ok(NotifyAfricaClient {
            api_key: self.api_key,
            base_url: self.base_url,
            sender_id: self.sender_id,
            country: self.country,
            local_offset: self.local_offset,
            http: Arc::new(ReqwestTransport { client }),
        })
    }
}

#[derive(Clone)]
/// High-level Notify Africa client.
///
/// Requests are validated before anything is sent. Every call uses
/// `Authorization: Bearer <api key>` against `https://api.notify.africa/v2`
/// unless configured otherwise.
pub struct NotifyAfricaClient {
    api_key: ApiKey,
    base_url: String,
    sender_id: Option<SenderId>,
    country: CountryCode,
    local_offset: FixedOffset,
    http: Arc<dyn HttpTransport>,
}

impl NotifyAfricaClient {
    /// Create a client with the default base URL and no default sender id.
    ///
    /// For more customization, use [`NotifyAfricaClient::builder`].
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
            sender_id: None,
            country: CountryCode::default(),
            local_offset: default_offset(),
            http: Arc::new(ReqwestTransport {
                client: reqwest::Client::new(),
            }),
        }
    }

    pub fn builder(api_key: ApiKey) -> NotifyAfricaClientBuilder {
        NotifyAfricaClientBuilder::new(api_key)
    }

    /// Shorthand for `NotifyAfricaClientBuilder::from_env()?.build()`.
    pub fn from_env() -> Result<Self, NotifyAfricaError> {
        NotifyAfricaClientBuilder::from_env()?.build()
    }

    /// Normalise a raw number with the client's default country code.
    pub fn parse_phone(&self, raw: impl AsRef<str>) -> Result<PhoneNumber, ValidationError> {
        PhoneNumber::parse(self.country, raw)
    }

    /// Send one message to the request's recipients.
    ///
    /// Errors:
    /// - [`NotifyAfricaError::Validation`] when neither the request nor the
    ///   client has a sender id, or the schedule time has already passed,
    /// - [`NotifyAfricaError::Authentication`] / [`NotifyAfricaError::InsufficientCredits`]
    ///   / [`NotifyAfricaError::Api`] when the provider refuses the message.
    pub async fn send_sms(&self, request: SendSms) -> Result<SendSmsResponse, NotifyAfricaError> {
        let sender_id = request
            .options()
            .sender_id
            .as_ref()
            .or(self.sender_id.as_ref())
            .ok_or(ValidationError::Empty {
                field: SenderId::FIELD,
            })?;
        if let Some(at) = request.options().schedule {
            at.ensure_future(Utc::now())?;
        }

        let body = transport::encode_send_sms_body(&request, sender_id, self.local_offset);
        let response = self.post(&["api", "sms", "send"], body).await?;
        let accepted = finish(response, |json| {
            transport::decode_send_sms_json_response(&request, json)
        })?;

        debug!(
            recipients = request.recipients().len(),
            accepted = accepted.messages.len(),
            scheduled = request.options().schedule.is_some(),
            "sms accepted"
        );
        Ok(accepted)
    }

    pub async fn send_single(
        &self,
        recipient: PhoneNumber,
        text: MessageText,
    ) -> Result<SendSmsResponse, NotifyAfricaError> {
        self.send_sms(SendSms::single(recipient, text)).await
    }

    pub async fn send_bulk(
        &self,
        recipients: Vec<PhoneNumber>,
        text: MessageText,
    ) -> Result<SendSmsResponse, NotifyAfricaError> {
        self.send_sms(SendSms::bulk(recipients, text)?).await
    }

    /// Ask the provider to deliver `text` at `at`.
    pub async fn send_scheduled(
        &self,
        recipients: Vec<PhoneNumber>,
        text: MessageText,
        at: ScheduleTime,
    ) -> Result<SendSmsResponse, NotifyAfricaError> {
        self.send_sms(SendSms::scheduled(recipients, text, at)?).await
    }

    /// Send `template` rendered for each contact, one request per contact.
    ///
    /// Individual failures (rendering or provider) are collected in the
    /// report; an authentication failure stops the run and is returned.
    pub async fn send_personalized(
        &self,
        contacts: &ContactList,
        template: &MessageTemplate,
    ) -> Result<BulkSendReport, NotifyAfricaError> {
        ensure_recipients(contacts)?;

        let mut report = BulkSendReport::default();
        for contact in contacts {
            let recipients = vec![contact.phone.clone()];
            let outcome = match template.render(contact) {
                Ok(text) => self.send_single(contact.phone.clone(), text).await,
                Err(err) => Err(err.into()),
            };
            match outcome {
                Ok(response) => report.sent.push(SentBatch {
                    recipients,
                    response,
                }),
                Err(err) if err.is_auth_error() => return Err(err),
                Err(error) => {
                    warn!(row = contact.row, phone = %contact.phone, %error, "personalized send failed");
                    report.failed.push(FailedBatch { recipients, error });
                }
            }
        }

        info!(
            sent = report.sent_count(),
            failed = report.failed_count(),
            "personalized send finished"
        );
        Ok(report)
    }

    /// Send the same text to every contact, split into requests of at most
    /// [`SEND_SMS_MAX_RECIPIENTS`] numbers.
    pub async fn send_contacts(
        &self,
        contacts: &ContactList,
        text: MessageText,
    ) -> Result<BulkSendReport, NotifyAfricaError> {
        ensure_recipients(contacts)?;

        let phones = contacts.phones();
        let mut report = BulkSendReport::default();
        for chunk in phones.chunks(SEND_SMS_MAX_RECIPIENTS) {
            let recipients = chunk.to_vec();
            let request = SendSms::bulk(recipients.clone(), text.clone())?;
            match self.send_sms(request).await {
                Ok(response) => report.sent.push(SentBatch {
                    recipients,
                    response,
                }),
                Err(err) if err.is_auth_error() => return Err(err),
                Err(error) => {
                    warn!(batch = recipients.len(), %error, "bulk batch failed");
                    report.failed.push(FailedBatch { recipients, error });
                }
            }
        }

        info!(
            batches = report.sent.len() + report.failed.len(),
            sent = report.sent_count(),
            failed = report.failed_count(),
            "bulk send finished"
        );
        Ok(report)
    }

    pub async fn message_status(
        &self,
        id: &MessageId,
    ) -> Result<MessageStatus, NotifyAfricaError> {
        let response = self.get(&["api", "sms", "status", id.as_str()], &[]).await?;
        finish(response, |json| {
            transport::decode_message_status_json_response(id, json)
        })
    }

    /// Fetch one page of history. Returned records always satisfy `query`,
    /// even if the provider ignores some filters.
    pub async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage, NotifyAfricaError> {
        let params = transport::encode_history_query(query);
        let response = self.get(&["api", "sms", "history"], &params).await?;
        finish(response, |json| {
            transport::decode_history_json_response(query, json)
        })
    }

    /// Walk pages starting at `query`'s page until the provider reports no more.
    pub async fn history_all(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryRecord>, NotifyAfricaError> {
        let mut records = Vec::new();
        let mut page = query.page_number();
        loop {
            let batch = self.history(&query.with_page(page)).await?;
            records.extend(batch.records);
            if !batch.has_more {
                break;
            }
            if page - query.page_number() + 1 >= MAX_HISTORY_PAGES {
                warn!(page, "history pagination stopped at page limit");
                break;
            }
            let Some(next) = page.checked_add(1) else {
                warn!(page, "history pagination stopped at the last page number");
                break;
            };
            page = next;
        }
        Ok(records)
    }

    pub async fn profile(&self) -> Result<Profile, NotifyAfricaError> {
        let response = self.get(&["api", "profile"], &[]).await?;
        finish(response, transport::decode_profile_json_response)
    }

    pub async fn sender_ids(&self) -> Result<Vec<SenderIdInfo>, NotifyAfricaError> {
        let response = self.get(&["api", "sender-ids"], &[]).await?;
        finish(response, transport::decode_sender_ids_json_response)
    }

    async fn get(
        &self,
        path: &[&str],
        query: &[(String, String)],
    ) -> Result<HttpResponse, NotifyAfricaError> {
        let url = self.endpoint(path, query)?;
        debug!(method = "GET", %url, "notify africa request");
        self.http
            .get(&url, self.api_key.as_str())
            .await
            .map_err(NotifyAfricaError::Transport)
    }

    async fn post(
        &self,
        path: &[&str],
        body: serde_json::Value,
    ) -> Result<HttpResponse, NotifyAfricaError> {
        let url = self.endpoint(path, &[])?;
        debug!(method = "POST", %url, "notify africa request");
        self.http
            .post_json(&url, self.api_key.as_str(), body)
            .await
            .map_err(NotifyAfricaError::Transport)
    }

    fn endpoint(
        &self,
        path: &[&str],
        query: &[(String, String)],
    ) -> Result<String, NotifyAfricaError> {
        let mut url = validate_base_url(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|()| invalid_base_url(&self.base_url, "URL cannot be a base"))?
            .pop_if_empty()
            .extend(path);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }
}

fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

fn validate_base_url(raw: &str) -> Result<Url, NotifyAfricaError> {
    let url = Url::parse(raw).map_err(|err| invalid_base_url(raw, err))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid_base_url(raw, "scheme must be http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(invalid_base_url(raw, "URL cannot be a base"));
    }
    Ok(url)
}

fn invalid_base_url(url: &str, reason: impl ToString) -> NotifyAfricaError {
    NotifyAfricaError::InvalidBaseUrl {
        url: url.to_owned(),
        reason: reason.to_string(),
    }
}

fn ensure_recipients(contacts: &ContactList) -> Result<(), ValidationError> {
    if contacts.is_empty() {
        return Err(ValidationError::Empty {
            field: SendSms::RECIPIENTS_FIELD,
        });
    }
    Ok(())
}

/// Map the HTTP status and decoded body of a reply to the caller's result.
fn finish<T>(
    response: HttpResponse,
    decode: impl FnOnce(&str) -> Result<Reply<T>, TransportError>,
) -> Result<T, NotifyAfricaError> {
    if !(200..=299).contains(&response.status) {
        return Err(status_error(response));
    }

    match decode(&response.body).map_err(|err| NotifyAfricaError::Parse(Box::new(err)))? {
        Reply::Accepted(value) => Ok(value),
        Reply::Rejected(failure) => Err(rejection(failure)),
    }
}

fn rejection(failure: ApiFailure) -> NotifyAfricaError {
    warn!(code = ?failure.code, message = %failure.message, "provider rejected request");
    classify(failure.code, failure.message)
}

fn status_error(response: HttpResponse) -> NotifyAfricaError {
    let HttpResponse {
        status,
        body,
        retry_after,
    } = response;
    let message = transport::decode_error_body(&body).and_then(|it| it.summary());
    warn!(status, message = ?message, "provider returned error status");

    let raw = || Some(body.trim().to_owned()).filter(|it| !it.is_empty());
    match (status, message) {
        (429, message) => NotifyAfricaError::RateLimited {
            retry_after: retry_after.map(Duration::from_secs),
            message: message.or_else(raw),
        },
        (401 | 402 | 403, message) => classify(
            Some(status),
            message
                .or_else(raw)
                .unwrap_or_else(|| format!("HTTP {status}")),
        ),
        (status, Some(message)) => classify(Some(status), message),
        (status, None) => NotifyAfricaError::HttpStatus { status, body: raw() },
    }
}

fn classify(status: Option<u16>, message: String) -> NotifyAfricaError {
    match status {
        Some(401 | 403) => return NotifyAfricaError::Authentication { message },
        Some(402) => return NotifyAfricaError::InsufficientCredits { message },
        Some(429) => {
            return NotifyAfricaError::RateLimited {
                retry_after: None,
                message: Some(message),
            };
        }
        _ => {}
    }

    let lower = message.to_ascii_lowercase();
    if lower.contains("insufficient") || lower.contains("not enough credit") {
        NotifyAfricaError::InsufficientCredits { message }
    } else if ["unauthenticated", "unauthorized", "invalid api key", "invalid token"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        NotifyAfricaError::Authentication { message }
    } else {
        NotifyAfricaError::Api { status, message }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use chrono::{NaiveDate, TimeZone};

    use crate::contacts::ContactImporter;
    use crate::domain::{DeliveryStatus, HISTORY_MAX_PER_PAGE};

    use super::*;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: &'static str,
        url: String,
        token: String,
        body: Option<serde_json::Value>,
    }

    #[derive(Debug, Clone, Default)]
    struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
    }

    #[derive(Debug, Default)]
    struct FakeTransportState {
        requests: Vec<Recorded>,
        responses: VecDeque<HttpResponse>,
    }

    impl FakeTransport {
        fn new() -> Self {
            Self::default()
        }

        fn respond(self, status: u16, body: impl Into<String>) -> Self {
            self.respond_with(HttpResponse {
                status,
                body: body.into(),
                retry_after: None,
            })
        }

        fn respond_with(self, response: HttpResponse) -> Self {
            self.state.lock().unwrap().responses.push_back(response);
            self
        }

        fn requests(&self) -> Vec<Recorded> {
            self.state.lock().unwrap().requests.clone()
        }

        fn last_request(&self) -> Recorded {
            self.requests().pop().expect("no request was made")
        }

        fn record(
            &self,
            method: &'static str,
            url: &str,
            token: &str,
            body: Option<serde_json::Value>,
        ) -> Result<HttpResponse, BoxError> {
            let mut state = self.state.lock().unwrap();
            state.requests.push(Recorded {
                method,
                url: url.to_owned(),
                token: token.to_owned(),
                body,
            });
            state
                .responses
                .pop_front()
                .ok_or_else(|| "no response queued".into())
        }
    }

    impl HttpTransport for FakeTransport {
        fn get<'a>(
            &'a self,
            url: &'a str,
            token: &'a str,
        ) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
            Box::pin(async move { self.record("GET", url, token, None) })
        }

        fn post_json<'a>(
            &'a self,
            url: &'a str,
            token: &'a str,
            body: serde_json::Value,
        ) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
            Box::pin(async move { self.record("POST", url, token, Some(body)) })
        }
    }

    fn make_client(transport: FakeTransport) -> NotifyAfricaClient {
        NotifyAfricaClient {
            api_key: ApiKey::new("test_key").unwrap(),
            base_url: "https://example.invalid/v2/".to_owned(),
            sender_id: Some(SenderId::new("NOTIFY").unwrap()),
            country: CountryCode::TANZANIA,
            local_offset: default_offset(),
            http: Arc::new(transport),
        }
    }

    fn phone(raw: &str) -> PhoneNumber {
        PhoneNumber::parse(CountryCode::TANZANIA, raw).unwrap()
    }

    fn text(value: &str) -> MessageText {
        MessageText::new(value).unwrap()
    }

    const SEND_OK: &str = r#"{
        "status": 200,
        "message": "SMS sent successfully",
        "data": {"message_id": 1001, "sms_count": 1, "remaining_balance": "99"}
    }"#;

    #[tokio::test]
    async fn send_single_posts_json_with_bearer_token() {
        let transport = FakeTransport::new().respond(200, SEND_OK);
        let client = make_client(transport.clone());

        let response = client
            .send_single(phone("0712 345 678"), text("Habari"))
            .await
            .unwrap();
        assert_eq!(response.message.as_deref(), Some("SMS sent successfully"));
        assert_eq!(response.messages.len(), 1);
        assert_eq!(response.messages[0].id.as_ref().unwrap().as_str(), "1001");
        assert_eq!(response.credits_used, Some(1));
        assert_eq!(response.balance.as_deref(), Some("99"));

        let request = transport.last_request();
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "https://example.invalid/v2/api/sms/send");
        assert_eq!(request.token, "test_key");
        let body = request.body.unwrap();
        assert_eq!(body["sender_id"], "NOTIFY");
        assert_eq!(body["sms"], "Habari");
        assert_eq!(body["schedule"], "none");
        assert_eq!(body["recipients"][0]["number"], "255712345678");
    }

    #[tokio::test]
    async fn send_sms_prefers_request_sender_id() {
        let transport = FakeTransport::new().respond(200, SEND_OK);
        let client = make_client(transport.clone());

        let request = SendSms::single(phone("0712345678"), text("hi"))
            .sender_id(SenderId::new("SHOP").unwrap());
        client.send_sms(request).await.unwrap();
        assert_eq!(transport.last_request().body.unwrap()["sender_id"], "SHOP");
    }

    #[tokio::test]
    async fn send_sms_requires_some_sender_id() {
        let transport = FakeTransport::new();
        let mut client = make_client(transport.clone());
        client.sender_id = None;

        let err = client
            .send_single(phone("0712345678"), text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotifyAfricaError::Validation(ValidationError::Empty { field: "sender_id" })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn send_bulk_rejects_empty_recipients_without_request() {
        let transport = FakeTransport::new();
        let client = make_client(transport.clone());

        let err = client.send_bulk(Vec::new(), text("hi")).await.unwrap_err();
        assert!(matches!(
            err,
            NotifyAfricaError::Validation(ValidationError::Empty { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn send_scheduled_renders_local_date_and_time() {
        let transport = FakeTransport::new().respond(200, r#"{"status": 200, "data": {}}"#);
        let client = make_client(transport.clone());

        let at = ScheduleTime::in_future(Utc.with_ymd_and_hms(2099, 12, 24, 22, 15, 0).unwrap())
            .unwrap();
        client
            .send_scheduled(vec![phone("0712345678"), phone("0622345678")], text("Heri"), at)
            .await
            .unwrap();

        let body = transport.last_request().body.unwrap();
        assert_eq!(body["schedule"], "scheduled");
        assert_eq!(body["scheduled_date"], "2099-12-25");
        assert_eq!(body["scheduled_time"], "01:15");
        assert_eq!(body["recipients"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stale_schedule_is_rejected_before_sending() {
        let transport = FakeTransport::new();
        let client = make_client(transport.clone());

        let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let created_then = past - chrono::Duration::hours(1);
        let at = ScheduleTime::new(past, created_then).unwrap();
        let request = SendSms::single(phone("0712345678"), text("late")).schedule(at);

        let err = client.send_sms(request).await.unwrap_err();
        assert!(matches!(
            err,
            NotifyAfricaError::Validation(ValidationError::ScheduleInPast { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn http_401_maps_to_authentication() {
        let transport = FakeTransport::new().respond(401, r#"{"message": "Unauthenticated."}"#);
        let client = make_client(transport);

        let err = client.profile().await.unwrap_err();
        assert!(err.is_auth_error());
        assert!(!err.is_retryable());
        assert!(
            matches!(err, NotifyAfricaError::Authentication { message } if message == "Unauthenticated.")
        );
    }

    #[tokio::test]
    async fn success_false_envelope_maps_to_api_error() {
        let transport = FakeTransport::new()
            .respond(200, r#"{"success": false, "message": "Sender ID not approved"}"#);
        let client = make_client(transport);

        let err = client
            .send_single(phone("0712345678"), text("hi"))
            .await
            .unwrap_err();
        match err {
            NotifyAfricaError::Api { status, message } => {
                assert_eq!(status, None);
                assert_eq!(message, "Sender ID not approved");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn credit_messages_map_to_insufficient_credits() {
        let transport = FakeTransport::new()
            .respond(402, "")
            .respond(
                422,
                r#"{"message": "Insufficient SMS balance", "errors": {"sms": ["top up"]}}"#,
            )
            .respond(200, r#"{"status": "error", "message": "insufficient credits"}"#);
        let client = make_client(transport);

        for _ in 0..3 {
            let err = client
                .send_single(phone("0712345678"), text("hi"))
                .await
                .unwrap_err();
            assert!(
                matches!(err, NotifyAfricaError::InsufficientCredits { .. }),
                "unexpected error: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn http_429_maps_to_rate_limited() {
        let transport = FakeTransport::new().respond_with(HttpResponse {
            status: 429,
            body: "Too Many Attempts.".to_owned(),
            retry_after: Some(30),
        });
        let client = make_client(transport);

        let err = client.sender_ids().await.unwrap_err();
        assert!(err.is_retryable());
        match err {
            NotifyAfricaError::RateLimited {
                retry_after,
                message,
            } => {
                assert_eq!(retry_after, Some(Duration::from_secs(30)));
                assert_eq!(message.as_deref(), Some("Too Many Attempts."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_maps_to_http_status() {
        let transport = FakeTransport::new()
            .respond(502, "<html>Bad Gateway</html>")
            .respond(503, "   ");
        let client = make_client(transport);

        let err = client.profile().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            err,
            NotifyAfricaError::HttpStatus {
                status: 502,
                body: Some(_)
            }
        ));

        let err = client.profile().await.unwrap_err();
        assert!(matches!(
            err,
            NotifyAfricaError::HttpStatus {
                status: 503,
                body: None
            }
        ));
    }

    #[tokio::test]
    async fn invalid_json_maps_to_parse_error() {
        let transport = FakeTransport::new().respond(200, "{ not json }");
        let client = make_client(transport);

        let err = client.profile().await.unwrap_err();
        assert!(matches!(err, NotifyAfricaError::Parse(_)));
    }

    #[tokio::test]
    async fn transport_failure_is_retryable() {
        let client = make_client(FakeTransport::new());
        let err = client.profile().await.unwrap_err();
        assert!(matches!(err, NotifyAfricaError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn message_status_uses_id_in_path() {
        let transport = FakeTransport::new().respond(
            200,
            r#"{"data": {"status": "DELIVERED", "recipient": "255712345678"}}"#,
        );
        let client = make_client(transport.clone());

        let id = MessageId::new("abc 1").unwrap();
        let status = client.message_status(&id).await.unwrap();
        assert_eq!(status.id, id);
        assert_eq!(status.status, DeliveryStatus::Delivered);

        let request = transport.last_request();
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "https://example.invalid/v2/api/sms/status/abc%201");
        assert!(request.body.is_none());
    }

    fn history_json(page: u32, total: u32, rows: &[(&str, &str, &str)]) -> String {
        let items = rows
            .iter()
            .map(|(id, status, created)| {
                serde_json::json!({
                    "id": id,
                    "recipient": "255712345678",
                    "message": "hi",
                    "status": status,
                    "created_at": created,
                })
            })
            .collect::<Vec<_>>();
        serde_json::json!({
            "status": 200,
            "data": {"data": items, "total": total, "current_page": page, "per_page": 2}
        })
        .to_string()
    }

    #[tokio::test]
    async fn history_sends_filters_and_refilters_records() {
        let body = history_json(
            1,
            2,
            &[
                ("1", "delivered", "2026-05-01 08:00:00"),
                ("2", "failed", "2026-05-01 09:00:00"),
            ],
        );
        let transport = FakeTransport::new().respond(200, body);
        let client = make_client(transport.clone());

        let day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let query = HistoryQuery::new()
            .date_range(Some(day), Some(day))
            .unwrap()
            .status(DeliveryStatus::Delivered)
            .per_page(2)
            .unwrap();
        let page = client.history(&query).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id.as_str(), "1");
        assert!(!page.has_more);

        let url = Url::parse(&transport.last_request().url).unwrap();
        assert_eq!(url.path(), "/v2/api/sms/history");
        let params = url.query_pairs().into_owned().collect::<HashMap<_, _>>();
        assert_eq!(params["page"], "1");
        assert_eq!(params["per_page"], "2");
        assert_eq!(params["status"], "delivered");
        assert_eq!(params["from"], "2026-05-01");
        assert_eq!(params["to"], "2026-05-01");
    }

    #[tokio::test]
    async fn history_all_walks_every_page() {
        let transport = FakeTransport::new()
            .respond(
                200,
                history_json(
                    1,
                    3,
                    &[
                        ("1", "sent", "2026-05-01 08:00:00"),
                        ("2", "sent", "2026-05-01 08:01:00"),
                    ],
                ),
            )
            .respond(200, history_json(2, 3, &[("3", "sent", "2026-05-01 08:02:00")]));
        let client = make_client(transport.clone());

        let query = HistoryQuery::new().per_page(2).unwrap();
        let records = client.history_all(&query).await.unwrap();
        assert_eq!(
            records.iter().map(|it| it.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );

        let pages = transport
            .requests()
            .iter()
            .map(|it| {
                Url::parse(&it.url)
                    .unwrap()
                    .query_pairs()
                    .find(|(key, _)| key == "page")
                    .map(|(_, value)| value.into_owned())
                    .unwrap()
            })
            .collect::<Vec<_>>();
        assert_eq!(pages, vec!["1", "2"]);
        assert!(HistoryQuery::new().per_page(HISTORY_MAX_PER_PAGE + 1).is_err());
    }

    #[tokio::test]
    async fn profile_and_sender_ids() {
        let transport = FakeTransport::new()
            .respond(200, r#"{"data": {"name": "Acme", "sms_balance": 42}}"#)
            .respond(200, r#"{"data": [{"sender_id": "NOTIFY", "status": "approved"}]}"#);
        let client = make_client(transport.clone());

        let profile = client.profile().await.unwrap();
        assert_eq!(profile.balance.as_deref(), Some("42"));
        let ids = client.sender_ids().await.unwrap();
        assert!(ids[0].is_approved());

        let urls = transport
            .requests()
            .into_iter()
            .map(|it| it.url)
            .collect::<Vec<_>>();
        assert_eq!(
            urls,
            vec![
                "https://example.invalid/v2/api/profile",
                "https://example.invalid/v2/api/sender-ids",
            ]
        );
    }

    #[tokio::test]
    async fn send_personalized_collects_failures() {
        let contacts = ContactImporter::new()
            .import_csv("phone,name,city\n0712345678,Amina,Arusha\n0622345678,Baraka,\n0755345678,Neema,Moshi\n".as_bytes())
            .unwrap();
        let template = MessageTemplate::parse("Hi {name} from {city}").unwrap();
        let transport = FakeTransport::new()
            .respond(200, SEND_OK)
            .respond(500, r#"{"message": "Server Error"}"#)
            .respond(200, SEND_OK);
        let client = make_client(transport.clone());

        let report = client
            .send_personalized(&contacts, &template)
            .await
            .unwrap();
        assert_eq!(report.sent_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_complete());
        assert_eq!(report.failed[0].recipients[0].as_str(), "255622345678");
        assert!(report.failed[0].error.is_retryable());

        let bodies = transport
            .requests()
            .into_iter()
            .map(|it| it.body.unwrap()["sms"].as_str().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            bodies,
            vec!["Hi Amina from Arusha", "Hi Baraka from ", "Hi Neema from Moshi"]
        );
    }

    #[tokio::test]
    async fn send_personalized_stops_on_auth_error() {
        let contacts = ContactImporter::new()
            .import_csv("phone\n0712345678\n0622345678\n".as_bytes())
            .unwrap();
        let template = MessageTemplate::parse("Hi {phone}").unwrap();
        let transport = FakeTransport::new().respond(403, r#"{"message": "Forbidden"}"#);
        let client = make_client(transport.clone());

        let err = client
            .send_personalized(&contacts, &template)
            .await
            .unwrap_err();
        assert!(err.is_auth_error());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn send_contacts_splits_into_batches() {
        let mut csv = String::from("phone\n");
        for idx in 0..(SEND_SMS_MAX_RECIPIENTS + 20) {
            csv.push_str(&format!("0712{idx:06}\n"));
        }
        let contacts = ContactImporter::new().import_csv(csv.as_bytes()).unwrap();
        let transport = FakeTransport::new()
            .respond(200, SEND_OK)
            .respond(200, SEND_OK);
        let client = make_client(transport.clone());

        let report = client.send_contacts(&contacts, text("hi")).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.sent.len(), 2);
        assert_eq!(report.sent_count(), SEND_SMS_MAX_RECIPIENTS + 20);

        let sizes = transport
            .requests()
            .into_iter()
            .map(|it| it.body.unwrap()["recipients"].as_array().unwrap().len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![SEND_SMS_MAX_RECIPIENTS, 20]);
    }

    #[tokio::test]
    async fn bulk_helpers_reject_empty_contact_lists() {
        let client = make_client(FakeTransport::new());
        let empty = ContactList::default();
        assert!(matches!(
            client.send_contacts(&empty, text("hi")).await,
            Err(NotifyAfricaError::Validation(ValidationError::Empty { .. }))
        ));

        let template = MessageTemplate::parse("Hi {name}").unwrap();
        assert!(matches!(
            client.send_personalized(&empty, &template).await,
            Err(NotifyAfricaError::Validation(ValidationError::Empty { .. }))
        ));
    }

    #[tokio::test]
    async fn history_all_stops_at_last_page_number() {
        let body = serde_json::json!({
            "data": [{
                "id": "9",
                "recipient": "255712345678",
                "message": "hi",
                "status": "sent",
                "created_at": "2026-05-01 08:00:00",
            }]
        })
        .to_string();
        let transport = FakeTransport::new().respond(200, body);
        let client = make_client(transport.clone());

        let query = HistoryQuery::new()
            .page(u32::MAX)
            .unwrap()
            .per_page(1)
            .unwrap();
        let records = client.history_all(&query).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn builder_validates_base_url() {
        let key = || ApiKey::new("key").unwrap();
        assert!(NotifyAfricaClient::builder(key()).build().is_ok());
        assert!(matches!(
            NotifyAfricaClient::builder(key()).base_url("ftp://example.invalid").build(),
            Err(NotifyAfricaError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            NotifyAfricaClient::builder(key()).base_url("not a url").build(),
            Err(NotifyAfricaError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn endpoint_joins_segments_onto_base_path() {
        let mut client = make_client(FakeTransport::new());
        client.base_url = "https://example.invalid/v2".to_owned();
        assert_eq!(
            client.endpoint(&["api", "profile"], &[]).unwrap(),
            "https://example.invalid/v2/api/profile"
        );
    }

    #[test]
    fn env_lookup_configures_builder() {
        let env = HashMap::from([
            (ENV_API_KEY, "secret"),
            (ENV_SENDER_ID, "NOTIFY"),
            (ENV_BASE_URL, "https://sandbox.example.invalid/v2"),
        ]);
        let builder =
            NotifyAfricaClientBuilder::from_lookup(|name| env.get(name).map(|it| it.to_string()))
                .unwrap();
        assert_eq!(builder.api_key.as_str(), "secret");
        assert_eq!(builder.sender_id.as_ref().map(SenderId::as_str), Some("NOTIFY"));
        assert_eq!(builder.base_url, "https://sandbox.example.invalid/v2");

        let err = NotifyAfricaClientBuilder::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, NotifyAfricaError::MissingEnv { name } if name == ENV_API_KEY));

        let err = NotifyAfricaClientBuilder::from_lookup(|name| {
            (name == ENV_API_KEY).then(|| "   ".to_owned())
        })
        .unwrap_err();
        assert!(matches!(err, NotifyAfricaError::MissingEnv { .. }));
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let builder = NotifyAfricaClient::builder(ApiKey::new("super-secret").unwrap());
        assert!(!format!("{builder:?}").contains("super-secret"));
    }
}
