pub mod assistant;
pub mod config;
pub mod detection;
pub mod preload;

use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use config::AppConfig;
use detection::{mime_from_file_name, DetectionOutcome, DetectionService, HttpPredictionClient};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Command-line entry point: analyse one leaf image, or check the service.
pub async fn run() -> ExitCode {
    init_tracing();

    let config = AppConfig::from_env();
    tracing::info!(
        "{} starting v{} (service {})",
        config::APP_NAME,
        config::APP_VERSION,
        config.api_url
    );

    let client = match HttpPredictionClient::new(&config.api_url, config.request_timeout_secs) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    let Some(arg) = std::env::args().nth(1) else {
        eprintln!("usage: potato-guardian <leaf-image> | --health");
        return ExitCode::from(2);
    };

    if arg == "--health" {
        return match client.health().await {
            Ok(health) => {
                println!("status: {} (model loaded: {})", health.status, health.model_loaded);
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Health check failed");
                eprintln!("{}", e.user_message());
                ExitCode::FAILURE
            }
        };
    }

    analyse_file(DetectionService::new(client), Path::new(&arg)).await
}

async fn analyse_file(service: DetectionService<HttpPredictionClient>, path: &Path) -> ExitCode {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let mime = mime_from_file_name(&file_name);

    let upload = match service.accept(&file_name, mime, bytes) {
        Ok(upload) => upload,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    if let DetectionOutcome::Current(Some(report)) = service.assess_quality(&upload).await {
        println!("Image quality: {}/100", report.score);
        for message in report.issue_messages() {
            println!("  - {message}");
        }
    }

    match service.detect(&upload).await {
        Ok(DetectionOutcome::Current(view)) => {
            match serde_json::to_string_pretty(&view) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!(error = %e, "Failed to serialize diagnosis"),
            }
            for tip in view.follow_up_tips() {
                println!("  * {tip}");
            }
            ExitCode::SUCCESS
        }
        Ok(DetectionOutcome::Superseded) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Detection failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
