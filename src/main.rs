use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    potato_guardian_lib::run().await
}
