//! Domain layer: strong types with validation and invariants (no I/O).

mod request;
mod response;
mod validation;
mod value;

pub use request::{
    HISTORY_DEFAULT_PER_PAGE, HISTORY_MAX_PER_PAGE, HistoryQuery, SEND_SMS_MAX_RECIPIENTS,
    SendOptions, SendSms,
};
pub use response::{
    AcceptedMessage, HistoryPage, HistoryRecord, MessageStatus, Profile,
    SendSmsResponse, SenderIdInfo,
};
pub use validation::ValidationError;
pub use value::{
    ApiKey, CountryCode, DeliveryStatus, MessageId, MessageText, PhoneNumber, PhoneValidation,
    ScheduleTime, SenderId, validate_phone_numbers,
};

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;

    fn phone(raw: &str) -> PhoneNumber {
        PhoneNumber::parse(CountryCode::TANZANIA, raw).unwrap()
    }

    fn record(day: u32, status: DeliveryStatus) -> HistoryRecord {
        HistoryRecord {
            id: MessageId::new(format!("msg-{day}")).unwrap(),
            recipient: "255712345678".to_owned(),
            message: "hello".to_owned(),
            sender_id: Some("NOTIFY".to_owned()),
            status,
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            scheduled_at: None,
            delivered_at: None,
            credits: Some(1),
        }
    }

    #[test]
    fn send_sms_rejects_empty_recipients() {
        let err = SendSms::bulk(Vec::new(), MessageText::new("hi").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Empty {
                field: SendSms::RECIPIENTS_FIELD
            }
        ));
    }

    #[test]
    fn send_sms_recipient_limit_is_enforced() {
        let recipients = (0..=SEND_SMS_MAX_RECIPIENTS)
            .map(|idx| phone(&format!("0712{idx:06}")))
            .collect::<Vec<_>>();
        let err = SendSms::bulk(recipients, MessageText::new("hi").unwrap()).unwrap_err();
        assert!(matches!(err, ValidationError::TooManyRecipients { .. }));
    }

    #[test]
    fn send_sms_deduplicates_normalised_recipients() {
        let request = SendSms::bulk(
            vec![phone("0712345678"), phone("+255712345678"), phone("0622345678")],
            MessageText::new("hi").unwrap(),
        )
        .unwrap();
        let recipients = request
            .recipients()
            .iter()
            .map(PhoneNumber::as_str)
            .collect::<Vec<_>>();
        assert_eq!(recipients, vec!["255712345678", "255622345678"]);
    }

    #[test]
    fn history_query_validates_range_and_paging() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(matches!(
            HistoryQuery::new().date_range(Some(from), Some(to)),
            Err(ValidationError::InvalidDateRange { .. })
        ));
        assert!(HistoryQuery::new().page(0).is_err());
        assert!(HistoryQuery::new().per_page(0).is_err());
        assert!(HistoryQuery::new().per_page(HISTORY_MAX_PER_PAGE + 1).is_err());
        assert_eq!(HistoryQuery::new().per_page(10).unwrap().page_size(), 10);
    }

    #[test]
    fn history_query_matches_inclusive_range_and_status() {
        let query = HistoryQuery::new()
            .date_range(
                NaiveDate::from_ymd_opt(2024, 3, 5),
                NaiveDate::from_ymd_opt(2024, 3, 7),
            )
            .unwrap()
            .status(DeliveryStatus::Delivered);

        assert!(query.matches(&record(5, DeliveryStatus::Delivered)));
        assert!(query.matches(&record(7, DeliveryStatus::Delivered)));
        assert!(!query.matches(&record(4, DeliveryStatus::Delivered)));
        assert!(!query.matches(&record(8, DeliveryStatus::Delivered)));
        assert!(!query.matches(&record(6, DeliveryStatus::Failed)));
    }

    #[test]
    fn sender_id_info_approval() {
        let info = SenderIdInfo {
            id: None,
            name: "NOTIFY".to_owned(),
            status: Some("Approved".to_owned()),
        };
        assert!(info.is_approved());
        assert!(
            !SenderIdInfo {
                status: Some("pending".to_owned()),
                ..info
            }
            .is_approved()
        );
    }
}
