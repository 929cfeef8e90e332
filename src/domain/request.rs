use std::collections::HashSet;

use chrono::NaiveDate;

use crate::domain::response::HistoryRecord;
use crate::domain::validation::ValidationError;
use crate::domain::value::{DeliveryStatus, MessageText, PhoneNumber, ScheduleTime, SenderId};

pub const SEND_SMS_MAX_RECIPIENTS: usize = 500;
pub const HISTORY_MAX_PER_PAGE: u32 = 100;
pub const HISTORY_DEFAULT_PER_PAGE: u32 = 50;

#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Overrides the client's default sender id.
    pub sender_id: Option<SenderId>,
    pub schedule: Option<ScheduleTime>,
}

/// One message body delivered to one or more recipients.
#[derive(Debug, Clone)]
pub struct SendSms {
    recipients: Vec<PhoneNumber>,
    text: MessageText,
    options: SendOptions,
}

impl SendSms {
    pub const RECIPIENTS_FIELD: &'static str = "recipients";

    pub fn single(recipient: PhoneNumber, text: MessageText) -> Self {
        Self {
            recipients: vec![recipient],
            text,
            options: SendOptions::default(),
        }
    }

    /// Duplicate recipients are dropped, keeping the first occurrence.
    pub fn bulk(recipients: Vec<PhoneNumber>, text: MessageText) -> Result<Self, ValidationError> {
        Self::with_options(recipients, text, SendOptions::default())
    }

    pub fn scheduled(
        recipients: Vec<PhoneNumber>,
        text: MessageText,
        at: ScheduleTime,
    ) -> Result<Self, ValidationError> {
        Self::with_options(
            recipients,
            text,
            SendOptions {
                schedule: Some(at),
                ..Default::default()
            },
        )
    }

    pub fn with_options(
        recipients: Vec<PhoneNumber>,
        text: MessageText,
        options: SendOptions,
    ) -> Result<Self, ValidationError> {
        let mut seen = HashSet::with_capacity(recipients.len());
        let recipients = recipients
            .into_iter()
            .filter(|phone| seen.insert(phone.clone()))
            .collect::<Vec<_>>();

        if recipients.is_empty() {
            return Err(ValidationError::Empty {
                field: Self::RECIPIENTS_FIELD,
            });
        }
        if recipients.len() > SEND_SMS_MAX_RECIPIENTS {
            return Err(ValidationError::TooManyRecipients {
                max: SEND_SMS_MAX_RECIPIENTS,
                actual: recipients.len(),
            });
        }
        Ok(Self {
            recipients,
            text,
            options,
        })
    }

    pub fn sender_id(mut self, sender_id: SenderId) -> Self {
        self.options.sender_id = Some(sender_id);
        self
    }

    pub fn schedule(mut self, at: ScheduleTime) -> Self {
        self.options.schedule = Some(at);
        self
    }

    pub fn recipients(&self) -> &[PhoneNumber] {
        &self.recipients
    }

    pub fn text(&self) -> &MessageText {
        &self.text
    }

    pub fn options(&self) -> &SendOptions {
        &self.options
    }
}

/// Filter criteria for message history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    status: Option<DeliveryStatus>,
    page: u32,
    per_page: u32,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            status: None,
            page: 1,
            per_page: HISTORY_DEFAULT_PER_PAGE,
        }
    }
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inclusive date range; either end may be open.
    pub fn date_range(
        mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ValidationError::InvalidDateRange { from, to });
            }
        }
        self.from = from;
        self.to = to;
        Ok(self)
    }

    pub fn status(mut self, status: DeliveryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn page(mut self, page: u32) -> Result<Self, ValidationError> {
        if page == 0 {
            return Err(ValidationError::OutOfRange {
                field: "page",
                min: 1,
                max: u32::MAX,
                actual: page,
            });
        }
        self.page = page;
        Ok(self)
    }

    pub fn per_page(mut self, per_page: u32) -> Result<Self, ValidationError> {
        if !(1..=HISTORY_MAX_PER_PAGE).contains(&per_page) {
            return Err(ValidationError::OutOfRange {
                field: "per_page",
                min: 1,
                max: HISTORY_MAX_PER_PAGE,
                actual: per_page,
            });
        }
        self.per_page = per_page;
        Ok(self)
    }

    pub fn from_date(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn to_date(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn status_filter(&self) -> Option<&DeliveryStatus> {
        self.status.as_ref()
    }

    pub fn page_number(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.per_page
    }

    /// Whether `record` satisfies the date range and status filter.
    pub fn matches(&self, record: &HistoryRecord) -> bool {
        let day = record.created_at.date_naive();
        if self.from.is_some_and(|from| day < from) {
            return false;
        }
        if self.to.is_some_and(|to| day > to) {
            return false;
        }
        match &self.status {
            Some(status) => &record.status == status,
            None => true,
        }
    }

    pub(crate) fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}
