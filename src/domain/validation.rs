use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty {
        field: &'static str,
    },
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    TooManyRecipients {
        max: usize,
        actual: usize,
    },
    InvalidPhoneNumber {
        input: String,
    },
    InvalidSenderId {
        input: String,
    },
    InvalidCountryCode {
        value: u16,
    },
    InvalidScheduleTime {
        input: String,
    },
    ScheduleInPast {
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    InvalidDateRange {
        from: NaiveDate,
        to: NaiveDate,
    },
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
        actual: u32,
    },
    UnknownPlaceholder {
        name: String,
    },
    UnclosedPlaceholder {
        offset: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::TooLong { field, max, actual } => {
                write!(f, "{field} is too long: {actual} characters (max {max})")
            }
            Self::TooManyRecipients { max, actual } => {
                write!(f, "too many recipients: {actual} (max {max})")
            }
            Self::InvalidPhoneNumber { input } => write!(f, "invalid phone number: {input}"),
            Self::InvalidSenderId { input } => write!(f, "invalid sender id: {input}"),
            Self::InvalidCountryCode { value } => write!(f, "invalid country code: {value}"),
            Self::InvalidScheduleTime { input } => write!(f, "invalid schedule time: {input}"),
            Self::ScheduleInPast { at, now } => {
                write!(
                    f,
                    "schedule time {} is not in the future (now {})",
                    at.to_rfc3339(),
                    now.to_rfc3339()
                )
            }
            Self::InvalidDateRange { from, to } => {
                write!(f, "invalid date range: {from} is after {to}")
            }
            Self::OutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(
                f,
                "{field} out of range: {actual} (expected {min}..={max})"
            ),
            Self::UnknownPlaceholder { name } => {
                write!(f, "unknown template placeholder: {{{name}}}")
            }
            Self::UnclosedPlaceholder { offset } => {
                write!(f, "unclosed template placeholder at byte {offset}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
