#[tokio::main]
async fn main() -> anyhow::Result<()> {
    capsule_client::run().await
}
