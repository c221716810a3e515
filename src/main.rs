#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tgc_hse_screening_lib::run().await
}
