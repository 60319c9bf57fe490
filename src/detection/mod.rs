pub mod types;
pub mod catalog;
pub mod quality;
pub mod interpret;
pub mod upload;
pub mod client;
pub mod orchestrator;

pub use types::*;
pub use catalog::*;
pub use quality::*;
pub use interpret::*;
pub use upload::*;
pub use client::*;
pub use orchestrator::*;

use thiserror::Error;

/// Message shown for every transport failure. The cause stays in logs.
pub const CONNECTIVITY_MESSAGE: &str = "Failed to connect to prediction service";

/// Message shown when the service reports failure without a message.
pub const PREDICTION_FAILED_MESSAGE: &str = "Prediction failed";

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Upload rejected: {0}")]
    InputRejected(#[from] UploadRejection),

    #[error("Failed to connect to prediction service")]
    Connectivity {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{0}")]
    PredictionFailed(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl DetectionError {
    /// Wrap any transport-level failure as a connectivity error.
    pub fn connectivity<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DetectionError::Connectivity {
            source: source.into(),
        }
    }

    /// Text safe to show the end user.
    pub fn user_message(&self) -> String {
        match self {
            DetectionError::InputRejected(rejection) => rejection.to_string(),
            DetectionError::Connectivity { .. } => CONNECTIVITY_MESSAGE.to_string(),
            DetectionError::PredictionFailed(message) => message.clone(),
            DetectionError::ResponseParsing(_) => PREDICTION_FAILED_MESSAGE.to_string(),
        }
    }
}
