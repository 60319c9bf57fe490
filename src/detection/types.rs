use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{DetectionError, PREDICTION_FAILED_MESSAGE};

/// Label the prediction service uses for a disease-free leaf.
pub const HEALTHY_LABEL: &str = "Healthy";

/// Raw classification returned by the prediction service.
///
/// Read-only input to interpretation. Per-class confidences keep the order
/// the service sent them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub per_class_confidence: Option<IndexMap<String, f64>>,
    #[serde(default)]
    pub is_uncertain: Option<bool>,
    #[serde(default)]
    pub advisory_text: Option<String>,
    #[serde(default)]
    pub raw_confidence: Option<f64>,
    #[serde(default)]
    pub quality_score: Option<f64>,
}

impl PredictionResponse {
    pub fn new(label: &str, confidence: f64) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            per_class_confidence: None,
            is_uncertain: None,
            advisory_text: None,
            raw_confidence: None,
            quality_score: None,
        }
    }

    pub fn uncertain(mut self, flag: bool) -> Self {
        self.is_uncertain = Some(flag);
        self
    }

    pub fn with_advisory(mut self, text: &str) -> Self {
        self.advisory_text = Some(text.to_string());
        self
    }

    pub fn with_distribution(mut self, entries: &[(&str, f64)]) -> Self {
        self.per_class_confidence = Some(
            entries
                .iter()
                .map(|(label, confidence)| (label.to_string(), *confidence))
                .collect(),
        );
        self
    }
}

/// JSON body of `POST /predict`, exactly as the service sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub prediction: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub raw_confidence: Option<f64>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub is_uncertain: Option<bool>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub all_predictions: Option<IndexMap<String, f64>>,
}

impl PredictEnvelope {
    /// Convert the wire body into a `PredictionResponse`.
    ///
    /// Any `status` other than `"success"` is a semantic failure carrying the
    /// service message, or the generic one when absent.
    pub fn into_response(self) -> Result<PredictionResponse, DetectionError> {
        if self.status.as_deref() != Some("success") {
            let message = self
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| PREDICTION_FAILED_MESSAGE.to_string());
            return Err(DetectionError::PredictionFailed(message));
        }

        let label = self
            .prediction
            .ok_or_else(|| DetectionError::ResponseParsing("missing `prediction`".into()))?;
        let confidence = self
            .confidence
            .ok_or_else(|| DetectionError::ResponseParsing("missing `confidence`".into()))?;

        Ok(PredictionResponse {
            label,
            confidence,
            per_class_confidence: self.all_predictions,
            is_uncertain: self.is_uncertain,
            advisory_text: self.warning,
            raw_confidence: self.raw_confidence,
            quality_score: self.quality_score,
        })
    }
}

/// User-facing urgency bucket for a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Healthy,
    High,
    Medium,
    Low,
    Uncertain,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Healthy => "healthy",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Uncertain => "uncertain",
        }
    }
}

/// One row of the ranked per-class display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfidence {
    pub label: String,
    pub confidence: f64,
}

/// Display model derived from one completed analysis. Never mutated;
/// the next analysis produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisView {
    pub label: String,
    pub confidence: f64,
    pub severity: Severity,
    pub description: String,
    pub treatment: String,
    pub warning: Option<String>,
    /// Sorted by descending confidence, ties in service order.
    pub per_class_confidence: Option<Vec<ClassConfidence>>,
    pub raw_confidence: Option<f64>,
    pub quality_score: Option<f64>,
}

/// Advice shown alongside an uncertain diagnosis.
pub const UNCERTAIN_FOLLOW_UP_TIPS: &[&str] = &[
    "Retake the photo in better lighting",
    "Make sure the leaf is clearly visible and in focus",
    "Consult a plant specialist if symptoms persist",
];

impl DiagnosisView {
    /// Label with underscores replaced, e.g. "Late Blight".
    pub fn display_name(&self) -> String {
        self.label.replace('_', " ")
    }

    pub fn confidence_percent(&self) -> u32 {
        to_percent(self.confidence)
    }

    pub fn quality_percent(&self) -> Option<u32> {
        self.quality_score.map(to_percent)
    }

    pub fn is_uncertain(&self) -> bool {
        self.severity == Severity::Uncertain
    }

    /// Treatment advice is only relevant for diseased leaves.
    pub fn shows_treatment(&self) -> bool {
        self.severity != Severity::Healthy
    }

    /// The ranking is only worth showing when there is something to compare.
    pub fn shows_ranking(&self) -> bool {
        self.per_class_confidence
            .as_ref()
            .is_some_and(|ranked| ranked.len() > 1)
    }

    pub fn follow_up_tips(&self) -> &'static [&'static str] {
        if self.shows_treatment() && self.is_uncertain() {
            UNCERTAIN_FOLLOW_UP_TIPS
        } else {
            &[]
        }
    }
}

fn to_percent(fraction: f64) -> u32 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u32
}
