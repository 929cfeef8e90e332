use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::validation::ValidationError;

#[derive(Clone, PartialEq, Eq, Hash)]
/// Notify Africa API key, sent as a bearer token.
///
/// Invariant: non-empty after trimming. `Debug` never prints the key.
pub struct ApiKey(String);

impl ApiKey {
    /// Field name used in error messages.
    pub const FIELD: &'static str = "api_key";

    /// Create a validated [`ApiKey`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Sender id shown to the recipient as the message originator (`sender_id`).
///
/// Invariant: either an alphanumeric originator of at most 11 characters
/// (letters, digits, spaces) or a numeric originator of at most 15 digits.
/// The value must be approved on the Notify Africa account.
pub struct SenderId(String);

impl SenderId {
    /// JSON field name used by Notify Africa (`sender_id`).
    pub const FIELD: &'static str = "sender_id";

    /// Maximum length of an alphanumeric originator.
    pub const MAX_ALPHANUMERIC: usize = 11;
    /// Maximum length of a numeric originator.
    pub const MAX_NUMERIC: usize = 15;

    /// Create a validated [`SenderId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }

        let numeric = trimmed.chars().all(|ch| ch.is_ascii_digit());
        let max = if numeric {
            Self::MAX_NUMERIC
        } else {
            Self::MAX_ALPHANUMERIC
        };
        let allowed = trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == ' ');
        if !allowed || trimmed.chars().count() > max {
            return Err(ValidationError::InvalidSenderId {
                input: trimmed.to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated sender id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// SMS message text (`sms`).
///
/// Invariant: non-empty after trimming and at most [`MessageText::MAX_CHARS`]
/// characters. The original value (including whitespace) is preserved.
pub struct MessageText(String);

impl MessageText {
    /// JSON field name used by Notify Africa (`sms`).
    pub const FIELD: &'static str = "sms";

    /// Longest concatenated message accepted by the provider.
    pub const MAX_CHARS: usize = 1600;

    /// Create validated message text.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let len = value.chars().count();
        if len > Self::MAX_CHARS {
            return Err(ValidationError::TooLong {
                field: Self::FIELD,
                max: Self::MAX_CHARS,
                actual: len,
            });
        }
        Ok(Self(value))
    }

    /// Borrow the message text as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
/// Provider message id returned by `sms/send`.
///
/// Invariant: non-empty after trimming.
pub struct MessageId(String);

impl MessageId {
    /// Field name used by Notify Africa (`message_id`).
    pub const FIELD: &'static str = "message_id";

    /// Create a validated [`MessageId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated message id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageId> for String {
    fn from(value: MessageId) -> Self {
        value.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// International calling code used to complete national phone numbers.
///
/// Invariant: `1..=999`.
pub struct CountryCode(u16);

impl CountryCode {
    /// Tanzania (`255`), the provider's home network.
    pub const TANZANIA: Self = Self(255);

    /// Create a validated calling code.
    pub fn new(value: u16) -> Result<Self, ValidationError> {
        if !(1..=999).contains(&value) {
            return Err(ValidationError::InvalidCountryCode { value });
        }
        Ok(Self(value))
    }

    /// Get the numeric calling code.
    pub fn value(self) -> u16 {
        self.0
    }
}

impl Default for CountryCode {
    fn default() -> Self {
        Self::TANZANIA
    }
}

#[derive(Debug, Clone)]
/// Normalised phone number (MSISDN: E.164 digits without the leading `+`).
///
/// Accepted inputs, after stripping spaces, `-`, `.`, `(` and `)`:
/// - `+<cc><number>` and `00<cc><number>` (international),
/// - `0<number>` (national; the trunk `0` is replaced by the default country code),
/// - `<cc><number>` (already normalised),
/// - a bare national significant number of at most 10 digits, unless the
///   digits already form a valid international number.
///
/// Parsing a normalised number yields the same number. Equality, ordering,
/// and hashing are based on the MSISDN.
pub struct PhoneNumber {
    msisdn: String,
    parsed: phonenumber::PhoneNumber,
}

impl PhoneNumber {
    /// Field name used in error messages.
    pub const FIELD: &'static str = "phone_number";

    const MIN_DIGITS: usize = 8;
    const MAX_DIGITS: usize = 15;
    const NATIONAL_MAX_DIGITS: usize = 10;

    /// Parse and normalise a phone number.
    ///
    /// `default_country` completes numbers written without an international prefix.
    pub fn parse(
        default_country: CountryCode,
        input: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let invalid = || ValidationError::InvalidPhoneNumber {
            input: trimmed.to_owned(),
        };

        let mut digits = String::with_capacity(trimmed.len());
        let mut explicit_plus = false;
        for (idx, ch) in trimmed.char_indices() {
            match ch {
                '0'..='9' => digits.push(ch),
                '+' if idx == 0 => explicit_plus = true,
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(invalid()),
            }
        }

        let country = default_country.value().to_string();
        let international = if explicit_plus {
            digits
        } else if let Some(rest) = digits.strip_prefix("00") {
            rest.to_owned()
        } else if let Some(rest) = digits.strip_prefix('0') {
            format!("{country}{rest}")
        } else if digits.starts_with(&country)
            || digits.len() > Self::NATIONAL_MAX_DIGITS
            || is_valid_international(&digits)
        {
            digits
        } else {
            format!("{country}{digits}")
        };

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&international.len()) {
            return Err(invalid());
        }

        let parsed =
            phonenumber::parse(None, format!("+{international}")).map_err(|_| invalid())?;
        let e164 = phonenumber::format(&parsed)
            .mode(phonenumber::Mode::E164)
            .to_string();
        let msisdn = e164.trim_start_matches('+').to_owned();

        // Short numbers outside the default country must stand on their own,
        // otherwise parsing the normalised digits again would prefix `country`.
        if msisdn.len() <= Self::NATIONAL_MAX_DIGITS
            && !msisdn.starts_with(&country)
            && !phonenumber::is_valid(&parsed)
        {
            return Err(invalid());
        }

        Ok(Self { msisdn, parsed })
    }

    /// Normalised digits as sent to the provider (`255712345678`).
    pub fn as_str(&self) -> &str {
        &self.msisdn
    }

    /// E.164 representation with the leading `+`.
    pub fn e164(&self) -> String {
        format!("+{}", self.msisdn)
    }

    /// The parsed phone number from the `phonenumber` crate.
    pub fn parsed(&self) -> &phonenumber::PhoneNumber {
        &self.parsed
    }
}

fn is_valid_international(digits: &str) -> bool {
    phonenumber::parse(None, format!("+{digits}")).is_ok_and(|it| phonenumber::is_valid(&it))
}

impl PartialEq for PhoneNumber {
    fn eq(&self, other: &Self) -> bool {
        self.msisdn == other.msisdn
    }
}

impl Eq for PhoneNumber {}

impl std::hash::Hash for PhoneNumber {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.msisdn.hash(state);
    }
}

impl std::cmp::PartialOrd for PhoneNumber {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::cmp::Ord for PhoneNumber {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.msisdn.cmp(&other.msisdn)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msisdn)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Result of [`validate_phone_numbers`]: normalised numbers and the inputs that failed.
pub struct PhoneValidation {
    pub valid: Vec<PhoneNumber>,
    pub invalid: Vec<String>,
}

/// Normalise many raw inputs at once, keeping the rejected ones instead of failing.
pub fn validate_phone_numbers<I, S>(default_country: CountryCode, inputs: I) -> PhoneValidation
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = PhoneValidation::default();
    for input in inputs {
        match PhoneNumber::parse(default_country, input.as_ref()) {
            Ok(phone) => report.valid.push(phone),
            Err(_) => report.invalid.push(input.as_ref().to_owned()),
        }
    }
    report
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Delivery time of a scheduled message.
///
/// Invariant: strictly after the `now` it was validated against.
pub struct ScheduleTime(DateTime<Utc>);

impl ScheduleTime {
    /// Field name used in error messages.
    pub const FIELD: &'static str = "schedule";

    /// Validate `at` against an explicit clock reading.
    pub fn new(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        if at <= now {
            return Err(ValidationError::ScheduleInPast { at, now });
        }
        Ok(Self(at))
    }

    /// Validate `at` against the system clock.
    pub fn in_future(at: DateTime<Utc>) -> Result<Self, ValidationError> {
        Self::new(at, Utc::now())
    }

    /// Parse RFC 3339 text, or `YYYY-MM-DD HH:MM[:SS]` interpreted in `local_offset`.
    pub fn parse(
        input: &str,
        local_offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let invalid = || ValidationError::InvalidScheduleTime {
            input: trimmed.to_owned(),
        };

        let at = match DateTime::parse_from_rfc3339(trimmed) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(_) => {
                let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
                    .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M"))
                    .map_err(|_| invalid())?;
                local_offset
                    .from_local_datetime(&naive)
                    .single()
                    .ok_or_else(invalid)?
                    .with_timezone(&Utc)
            }
        };
        Self::new(at, now)
    }

    /// Re-check that this instant is still ahead of `now`.
    pub fn ensure_future(self, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Self::new(self.0, now)
    }

    /// The scheduled instant in UTC.
    pub fn at(self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
/// Delivery state of a message as reported by the provider.
///
/// Parsing is case-insensitive and never fails: unrecognised values are kept
/// in [`DeliveryStatus::Unknown`].
pub enum DeliveryStatus {
    Queued,
    Scheduled,
    Sent,
    Delivered,
    Failed,
    Rejected,
    Expired,
    Unknown(String),
}

impl DeliveryStatus {
    /// Map a provider status string to a known variant.
    pub fn from_provider(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "queued" | "pending" | "accepted" | "submitted" | "processing" => Self::Queued,
            "scheduled" => Self::Scheduled,
            "sent" => Self::Sent,
            "delivered" | "success" | "successful" => Self::Delivered,
            "failed" | "undelivered" | "undeliverable" => Self::Failed,
            "rejected" | "blocked" => Self::Rejected,
            "expired" => Self::Expired,
            _ => Self::Unknown(trimmed.to_owned()),
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Unknown(raw) => raw,
        }
    }

    /// No further transitions are expected.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Failed | Self::Rejected | Self::Expired
        )
    }

    /// The message did not and will not reach the handset.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Rejected | Self::Expired)
    }
}

impl From<String> for DeliveryStatus {
    fn from(value: String) -> Self {
        Self::from_provider(&value)
    }
}

impl From<&str> for DeliveryStatus {
    fn from(value: &str) -> Self {
        Self::from_provider(value)
    }
}

impl From<DeliveryStatus> for String {
    fn from(value: DeliveryStatus) -> Self {
        match value {
            DeliveryStatus::Unknown(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
