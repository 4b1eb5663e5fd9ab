#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agrichain_ledger::server::run().await
}
