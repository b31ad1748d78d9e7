use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    specwatch_cli::run().await
}
