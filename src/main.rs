#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = club_poliglota::run().await {
        eprintln!("club-poliglota fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
