#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    ova::app::run().await
}
