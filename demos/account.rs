use notify_africa::NotifyAfricaClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = NotifyAfricaClient::from_env()?;

    let profile = client.profile().await?;
    println!(
        "name: {:?}, email: {:?}, balance: {:?}",
        profile.name, profile.email, profile.balance
    );

    for sender in client.sender_ids().await? {
        let state = if sender.is_approved() { "approved" } else { "not approved" };
        println!("  {} ({state}, status: {:?})", sender.name, sender.status);
    }

    Ok(())
}
