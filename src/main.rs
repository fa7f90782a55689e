#[tokio::main]
async fn main() -> anyhow::Result<()> {
    openbanking_gateway::run().await
}
