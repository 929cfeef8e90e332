use std::io;

use chrono::NaiveDate;
use notify_africa::{ExportFormat, HistoryQuery, NotifyAfricaClient, export_records};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let output = std::env::args().nth(1).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "usage: export_history <history.csv|history.xlsx|history.json> [from YYYY-MM-DD] [to YYYY-MM-DD]",
        )
    })?;
    let date = |idx: usize| {
        std::env::args()
            .nth(idx)
            .map(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d"))
            .transpose()
    };

    let query = HistoryQuery::new()
        .date_range(date(2)?, date(3)?)?
        .per_page(100)?;
    let format = ExportFormat::from_path(&output)?;

    let client = NotifyAfricaClient::from_env()?;
    let records = client.history_all(&query).await?;
    export_records(&records, &output, format)?;

    println!("wrote {} records to {output}", records.len());
    Ok(())
}
