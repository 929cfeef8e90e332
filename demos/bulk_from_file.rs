use std::io;

use notify_africa::{ContactImporter, MessageTemplate, NotifyAfricaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args().nth(1).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "usage: bulk_from_file <contacts.xlsx|contacts.csv> [template]",
        )
    })?;
    let template = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "Habari {name}, this is a test message.".to_owned());

    let contacts = ContactImporter::new().skip_invalid(true).import_path(&path)?;
    for rejected in contacts.rejected() {
        eprintln!("skipped row {}: {}", rejected.row, rejected.reason);
    }
    println!(
        "{} contacts ({} duplicates dropped)",
        contacts.len(),
        contacts.duplicates()
    );

    let client = NotifyAfricaClient::from_env()?;
    let template = MessageTemplate::parse(&template)?;
    let report = client.send_personalized(&contacts, &template).await?;

    println!("sent: {}, failed: {}", report.sent_count(), report.failed_count());
    for failed in &report.failed {
        eprintln!("  {:?}: {}", failed.recipients, failed.error);
    }

    Ok(())
}
