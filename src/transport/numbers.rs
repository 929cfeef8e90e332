use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::Error as DeError;

/// Money-like value returned as either JSON string or JSON number.
///
/// For numbers, the raw JSON token is preserved to avoid formatting drift
/// (`10.00` remains `"10.00"` instead of becoming `"10.0"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMoney(String);

impl TransportMoney {
    pub fn into_string(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for TransportMoney {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw: Box<serde_json::value::RawValue> = Deserialize::deserialize(deserializer)?;
        let token = raw.get();

        match token.as_bytes().first().copied() {
            Some(b'"') => {
                let parsed = serde_json::from_str::<String>(token).map_err(D::Error::custom)?;
                Ok(Self(parsed))
            }
            Some(b'-' | b'0'..=b'9') => Ok(Self(token.to_owned())),
            _ => Err(D::Error::custom(
                "expected money field to be JSON string or number",
            )),
        }
    }
}

/// Count returned as either JSON number or numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransportCount {
    Int(u64),
    String(String),
}

impl TransportCount {
    pub fn into_u64(self) -> Option<u64> {
        match self {
            Self::Int(value) => Some(value),
            Self::String(value) => value.trim().parse::<u64>().ok(),
        }
    }
}

/// Identifier returned as either JSON number or string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransportId {
    Int(i64),
    String(String),
}

impl TransportId {
    pub fn into_string(self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::String(value) => value,
        }
    }
}

/// Timestamp given as RFC 3339 or as naive `YYYY-MM-DD HH:MM:SS` (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimestamp(DateTime<Utc>);

impl TransportTimestamp {
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    pub fn parse(input: &str) -> Option<DateTime<Utc>> {
        let trimmed = input.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(parsed.with_timezone(&Utc));
        }
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .map(|naive| naive.and_utc())
    }
}

impl<'de> Deserialize<'de> for TransportTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .map(Self)
            .ok_or_else(|| D::Error::custom(format!("unrecognised timestamp: {raw}")))
    }
}
