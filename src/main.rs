#[tokio::main]
async fn main() -> eyre::Result<()> {
    queuestats::run().start().await
}
