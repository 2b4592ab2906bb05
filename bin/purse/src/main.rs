#[tokio::main]
async fn main() -> eyre::Result<()> {
    purse::run().await
}
