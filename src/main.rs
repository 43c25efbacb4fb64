#[tokio::main]
async fn main() {
    if let Err(e) = live_translator_lib::run().await {
        eprintln!("live-translator: {}", e);
        std::process::exit(1);
    }
}
