#[tokio::main]
async fn main() {
    if let Err(e) = drscreen_lib::run().await {
        tracing::error!("{e}");
        eprintln!("drscreen: {e}");
        std::process::exit(1);
    }
}
