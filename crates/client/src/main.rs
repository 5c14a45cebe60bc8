mod cli;
mod render;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scene_client=info,scene_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Already shown to the user by the notification sink
            tracing::debug!(kind = e.kind(), "command failed: {e}");
            ExitCode::FAILURE
        }
    }
}
