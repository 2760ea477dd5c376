#[tokio::main]
async fn main() -> anyhow::Result<()> {
    proof_gateway::server::run().await
}
