//! Thin binary entrypoint that delegates to the library runner.

#[tokio::main]
async fn main() {
    let exit_code = portcullis_cli::run().await;
    std::process::exit(exit_code);
}
