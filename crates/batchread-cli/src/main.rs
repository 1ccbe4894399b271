//! Thin entrypoint for the `batchread` binary.

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = batchread_cli::run().await;
    std::process::exit(exit_code);
}
