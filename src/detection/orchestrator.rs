//! Detection flow: validate → quality pre-check → predict → interpret.
//!
//! Re-invoking analysis supersedes prior in-flight work. Every request takes
//! an `AnalysisTicket`; results carrying a stale ticket are discarded.

use std::sync::atomic::{AtomicU64, Ordering};

use super::client::PredictionClient;
use super::interpret::interpret;
use super::quality::{analyze_encoded_async, HeuristicQualityAssessor, ImageQualityReport};
use super::types::DiagnosisView;
use super::upload::{validate_upload, ValidatedUpload};
use super::DetectionError;

/// Identity of one analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTicket(u64);

/// Hands out tickets and remembers which one is current.
#[derive(Debug, Default)]
pub struct AnalysisTracker {
    latest: AtomicU64,
}

impl AnalysisTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding all earlier ones.
    pub fn begin(&self) -> AnalysisTicket {
        AnalysisTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: AnalysisTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Keep `value` only if `ticket` is still the latest request.
    pub fn settle<T>(&self, ticket: AnalysisTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            tracing::debug!(ticket = ticket.0, "Discarding superseded analysis result");
            None
        }
    }
}

/// Result of a detection that completed without error.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome<T> {
    /// This is the latest request; show the result.
    Current(T),
    /// A newer request began while this one was in flight.
    Superseded,
}

impl<T> DetectionOutcome<T> {
    pub fn current(self) -> Option<T> {
        match self {
            DetectionOutcome::Current(value) => Some(value),
            DetectionOutcome::Superseded => None,
        }
    }
}

/// Owns the detection flow for one view. Quality and diagnosis requests are
/// tracked separately. A new candidate image, entering through `accept` or
/// `assess_quality`, supersedes both.
pub struct DetectionService<C: PredictionClient> {
    client: C,
    assessor: HeuristicQualityAssessor,
    quality_tracker: AnalysisTracker,
    diagnosis_tracker: AnalysisTracker,
}

impl<C: PredictionClient> DetectionService<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            assessor: HeuristicQualityAssessor::default(),
            quality_tracker: AnalysisTracker::new(),
            diagnosis_tracker: AnalysisTracker::new(),
        }
    }

    pub fn with_assessor(mut self, assessor: HeuristicQualityAssessor) -> Self {
        self.assessor = assessor;
        self
    }

    /// Validate raw input before anything else sees it.
    ///
    /// An accepted file replaces the current image, so in-flight work for the
    /// previous one is superseded. A rejected file changes nothing.
    pub fn accept(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<ValidatedUpload, DetectionError> {
        let upload = validate_upload(file_name, mime, bytes)?;
        self.invalidate();
        Ok(upload)
    }

    /// Advisory quality report for the candidate image.
    ///
    /// `Current(None)` means no feedback is available; it never blocks submission.
    /// The assessed image becomes the current candidate, so a diagnosis still
    /// in flight for an earlier image is superseded.
    pub async fn assess_quality(
        &self,
        upload: &ValidatedUpload,
    ) -> DetectionOutcome<Option<ImageQualityReport>> {
        self.diagnosis_tracker.begin();
        let ticket = self.quality_tracker.begin();
        let report = analyze_encoded_async(self.assessor.clone(), upload.bytes.clone()).await;
        match self.quality_tracker.settle(ticket, report) {
            Some(report) => DetectionOutcome::Current(report),
            None => DetectionOutcome::Superseded,
        }
    }

    /// Submit the image and interpret the reply.
    ///
    /// Errors from a superseded request are dropped along with its results.
    pub async fn detect(
        &self,
        upload: &ValidatedUpload,
    ) -> Result<DetectionOutcome<DiagnosisView>, DetectionError> {
        let ticket = self.diagnosis_tracker.begin();
        tracing::info!(file = %upload.file_name, size = upload.bytes.len(), "Submitting image for analysis");

        let result = self.client.predict(upload).await;
        if !self.diagnosis_tracker.is_current(ticket) {
            tracing::debug!("Analysis superseded while in flight");
            return Ok(DetectionOutcome::Superseded);
        }

        let view = interpret(&result?);
        tracing::info!(
            label = %view.label,
            severity = view.severity.label(),
            "Diagnosis ready"
        );
        Ok(DetectionOutcome::Current(view))
    }

    /// Forget any in-flight request, e.g. when the image is removed.
    pub fn invalidate(&self) {
        self.quality_tracker.begin();
        self.diagnosis_tracker.begin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::client::MockPredictionClient;
    use crate::detection::types::{PredictionResponse, Severity};
    use std::sync::Arc;
    use std::time::Duration;

    fn upload() -> ValidatedUpload {
        validate_upload("leaf.png", "image/png", vec![1, 2, 3, 4]).unwrap()
    }

    // ── AnalysisTracker ──

    #[test]
    fn newest_ticket_is_current() {
        let tracker = AnalysisTracker::new();
        let first = tracker.begin();
        assert!(tracker.is_current(first));

        let second = tracker.begin();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn stale_results_discarded() {
        let tracker = AnalysisTracker::new();
        let first = tracker.begin();
        let second = tracker.begin();

        assert_eq!(tracker.settle(first, "old"), None);
        assert_eq!(tracker.settle(second, "new"), Some("new"));
    }

    // ── DetectionService ──

    #[tokio::test]
    async fn detect_interprets_response() {
        let service = DetectionService::new(MockPredictionClient::new(
            PredictionResponse::new("Late_Blight", 0.91).uncertain(false),
        ));

        let view = service.detect(&upload()).await.unwrap().current().unwrap();
        assert_eq!(view.severity, Severity::High);
    }

    #[tokio::test]
    async fn uncertain_diagnosis_is_not_an_error() {
        let service = DetectionService::new(MockPredictionClient::new(
            PredictionResponse::new("Early_Blight", 0.4).uncertain(true),
        ));

        let outcome = service.detect(&upload()).await.unwrap();
        assert_eq!(outcome.current().unwrap().severity, Severity::Uncertain);
    }

    #[tokio::test]
    async fn failure_surfaces_as_error() {
        let service = DetectionService::new(MockPredictionClient::failing("Invalid image file"));
        let err = service.detect(&upload()).await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid image file");
    }

    #[tokio::test]
    async fn newer_request_supersedes_in_flight_one() {
        let client = MockPredictionClient::new(PredictionResponse::new("Late_Blight", 0.9))
            .then(PredictionResponse::new("Healthy", 0.9))
            .with_delay(Duration::from_millis(50));
        let service = Arc::new(DetectionService::new(client));

        let slow = {
            let service = service.clone();
            tokio::spawn(async move { service.detect(&upload()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fresh = service.detect(&upload()).await.unwrap();

        let stale = slow.await.unwrap().unwrap();
        assert_eq!(stale, DetectionOutcome::Superseded);
        assert_eq!(fresh.current().unwrap().label, "Healthy");
    }

    #[tokio::test]
    async fn invalidate_drops_in_flight_result() {
        let client = MockPredictionClient::new(PredictionResponse::new("Late_Blight", 0.9))
            .with_delay(Duration::from_millis(30));
        let service = Arc::new(DetectionService::new(client));

        let pending = {
            let service = service.clone();
            tokio::spawn(async move { service.detect(&upload()).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        service.invalidate();

        assert_eq!(pending.await.unwrap().unwrap(), DetectionOutcome::Superseded);
    }

    #[tokio::test]
    async fn new_candidate_supersedes_in_flight_diagnosis() {
        let client = MockPredictionClient::new(PredictionResponse::new("Late_Blight", 0.9))
            .with_delay(Duration::from_millis(50));
        let service = Arc::new(DetectionService::new(client));

        let old = {
            let service = service.clone();
            tokio::spawn(async move { service.detect(&upload()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let replacement = validate_upload("other.png", "image/png", vec![5, 6, 7]).unwrap();
        service.assess_quality(&replacement).await;

        assert_eq!(old.await.unwrap().unwrap(), DetectionOutcome::Superseded);
    }

    #[tokio::test]
    async fn accepting_new_file_supersedes_in_flight_diagnosis() {
        let client = MockPredictionClient::new(PredictionResponse::new("Late_Blight", 0.9))
            .with_delay(Duration::from_millis(50));
        let service = Arc::new(DetectionService::new(client));

        let old = {
            let service = service.clone();
            tokio::spawn(async move { service.detect(&upload()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        service.accept("other.png", "image/png", vec![5, 6, 7]).unwrap();

        assert_eq!(old.await.unwrap().unwrap(), DetectionOutcome::Superseded);
    }

    #[tokio::test]
    async fn rejected_file_leaves_in_flight_diagnosis_current() {
        let client = MockPredictionClient::new(PredictionResponse::new("Late_Blight", 0.9))
            .with_delay(Duration::from_millis(30));
        let service = Arc::new(DetectionService::new(client));

        let pending = {
            let service = service.clone();
            tokio::spawn(async move { service.detect(&upload()).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(service.accept("notes.txt", "text/plain", vec![1]).is_err());

        let view = pending.await.unwrap().unwrap().current().unwrap();
        assert_eq!(view.label, "Late_Blight");
    }

    #[tokio::test]
    async fn undecodable_image_gives_no_quality_feedback() {
        let service = DetectionService::new(MockPredictionClient::new(PredictionResponse::new(
            "Healthy", 0.9,
        )));
        let outcome = service.assess_quality(&upload()).await;
        assert_eq!(outcome, DetectionOutcome::Current(None));
    }

    #[test]
    fn accept_rejects_non_images() {
        let service = DetectionService::new(MockPredictionClient::new(PredictionResponse::new(
            "Healthy", 0.9,
        )));
        let err = service.accept("doc.txt", "text/plain", vec![1]).unwrap_err();
        assert!(matches!(err, DetectionError::InputRejected(_)));
    }
}
