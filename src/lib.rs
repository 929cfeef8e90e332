//! Typed Rust client for the Notify Africa SMS HTTP API.
//!
//! The crate is split into a domain layer of strong types (phone numbers,
//! message text, schedule times, history queries), a transport layer for the
//! provider's JSON quirks, and a small client layer orchestrating requests.
//! [`contacts`] imports recipients from spreadsheets or CSV files and
//! [`export`] writes message history to CSV, XLSX or JSON.
//!
//! ```rust,no_run
//! use notify_africa::{ApiKey, CountryCode, MessageText, NotifyAfricaClient, PhoneNumber, SenderId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), notify_africa::NotifyAfricaError> {
//!     let client = NotifyAfricaClient::builder(ApiKey::new("...")?)
//!         .sender_id(SenderId::new("NOTIFY")?)
//!         .build()?;
//!     let phone = PhoneNumber::parse(CountryCode::TANZANIA, "0712 345 678")?;
//!     let msg = MessageText::new("Habari!")?;
//!     let _resp = client.send_single(phone, msg).await?;
//!     Ok(())
//! }
//! ```
//!
//! The crate emits [`tracing`] events and installs no subscriber.
#![forbid(unsafe_code)]

pub mod client;
pub mod contacts;
pub mod domain;
pub mod export;
mod sheet;
mod transport;

pub use client::{
    BulkSendReport, FailedBatch, NotifyAfricaClient, NotifyAfricaClientBuilder,
    NotifyAfricaError, SentBatch,
};
pub use contacts::{Contact, ContactImporter, ContactList, ImportError, MessageTemplate};
pub use domain::{
    AcceptedMessage, ApiKey, CountryCode, DeliveryStatus, HistoryPage, HistoryQuery,
    HistoryRecord, MessageId, MessageStatus, MessageText, PhoneNumber, Profile, ScheduleTime,
    SendOptions, SendSms, SendSmsResponse, SenderId, SenderIdInfo, ValidationError,
    validate_phone_numbers,
};
pub use export::{ExportError, ExportFormat, export_records, read_records};
