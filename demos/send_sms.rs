use std::io;

use notify_africa::{MessageText, NotifyAfricaClient, ScheduleTime, SendSms};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let phones_raw = std::env::var("NOTIFY_AFRICA_PHONES").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "NOTIFY_AFRICA_PHONES environment variable is required (comma-separated numbers)",
        )
    })?;
    let message = std::env::var("NOTIFY_AFRICA_MESSAGE")
        .unwrap_or_else(|_| "Hello from the notify-africa demo.".to_owned());

    // NOTIFY_AFRICA_API_KEY and NOTIFY_AFRICA_SENDER_ID
    let client = NotifyAfricaClient::from_env()?;
    let phones = phones_raw
        .split(',')
        .map(|raw| client.parse_phone(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let mut request = SendSms::bulk(phones, MessageText::new(message)?)?;

    // Optional local time, e.g. "2026-12-24 09:00", in East Africa Time.
    if let Ok(at) = std::env::var("NOTIFY_AFRICA_SCHEDULE") {
        let offset = east_africa_time()?;
        request = request.schedule(ScheduleTime::parse(&at, offset, chrono::Utc::now())?);
    }

    let response = client.send_sms(request).await?;
    println!(
        "message: {:?}, credits_used: {:?}, balance: {:?}",
        response.message, response.credits_used, response.balance
    );
    for accepted in &response.messages {
        println!("  {:?} -> {:?} ({})", accepted.id, accepted.recipient, accepted.status);
    }

    Ok(())
}

fn east_africa_time() -> Result<chrono::FixedOffset, io::Error> {
    chrono::FixedOffset::east_opt(3 * 3600)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid offset"))
}
