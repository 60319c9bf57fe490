use super::catalog::disease_info;
use super::types::{ClassConfidence, DiagnosisView, PredictionResponse, Severity, HEALTHY_LABEL};

/// Confidence strictly above this is `High`.
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Confidence strictly above this (and not above `HIGH_CONFIDENCE`) is `Medium`.
pub const MEDIUM_CONFIDENCE: f64 = 0.6;

/// Resolve severity, in priority order:
/// Healthy label, then the uncertainty flag, then confidence buckets.
pub fn resolve_severity(label: &str, confidence: f64, is_uncertain: bool) -> Severity {
    if label == HEALTHY_LABEL {
        Severity::Healthy
    } else if is_uncertain {
        Severity::Uncertain
    } else if confidence > HIGH_CONFIDENCE {
        Severity::High
    } else if confidence > MEDIUM_CONFIDENCE {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Rank per-class confidences, highest first. Ties keep their input order.
pub fn rank_confidences<'a, I>(entries: I) -> Vec<ClassConfidence>
where
    I: IntoIterator<Item = (&'a String, &'a f64)>,
{
    let mut ranked: Vec<ClassConfidence> = entries
        .into_iter()
        .map(|(label, confidence)| ClassConfidence {
            label: label.clone(),
            confidence: *confidence,
        })
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked
}

/// Turn a raw prediction into a display model. Pure and total.
///
/// The warning is passed through verbatim; none is synthesized here.
pub fn interpret(response: &PredictionResponse) -> DiagnosisView {
    let severity = resolve_severity(
        &response.label,
        response.confidence,
        response.is_uncertain.unwrap_or(false),
    );
    let info = disease_info(&response.label);

    DiagnosisView {
        label: response.label.clone(),
        confidence: response.confidence,
        severity,
        description: info.description.to_string(),
        treatment: info.treatment.to_string(),
        warning: response.advisory_text.clone(),
        per_class_confidence: response.per_class_confidence.as_ref().map(rank_confidences),
        raw_confidence: response.raw_confidence,
        quality_score: response.quality_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::catalog::find_disease;

    // ── Severity resolution ──

    #[test]
    fn healthy_ignores_confidence() {
        for confidence in [0.0, 0.3, 0.61, 0.8, 0.99] {
            let view = interpret(&PredictionResponse::new("Healthy", confidence));
            assert_eq!(view.severity, Severity::Healthy, "confidence {confidence}");
        }
    }

    #[test]
    fn healthy_wins_over_uncertain_flag() {
        let view = interpret(&PredictionResponse::new("Healthy", 0.4).uncertain(true));
        assert_eq!(view.severity, Severity::Healthy);
    }

    #[test]
    fn uncertain_overrides_high_confidence() {
        let view = interpret(&PredictionResponse::new("Late_Blight", 0.95).uncertain(true));
        assert_eq!(view.severity, Severity::Uncertain);
    }

    #[test]
    fn boundary_point_eight_is_medium() {
        assert_eq!(resolve_severity("Late_Blight", 0.8, false), Severity::Medium);
        assert_eq!(resolve_severity("Late_Blight", 0.800_001, false), Severity::High);
    }

    #[test]
    fn boundary_point_six_is_low() {
        assert_eq!(resolve_severity("Early_Blight", 0.6, false), Severity::Low);
        assert_eq!(resolve_severity("Early_Blight", 0.600_001, false), Severity::Medium);
    }

    #[test]
    fn missing_uncertain_flag_means_certain() {
        let view = interpret(&PredictionResponse::new("Early_Blight", 0.7));
        assert_eq!(view.severity, Severity::Medium);
    }

    // ── End-to-end scenarios ──

    #[test]
    fn confident_late_blight_is_high() {
        let view = interpret(&PredictionResponse::new("Late_Blight", 0.91).uncertain(false));
        let entry = find_disease("Late_Blight").unwrap();

        assert_eq!(view.severity, Severity::High);
        assert_eq!(view.description, entry.description);
        assert_eq!(view.treatment, entry.treatment);
    }

    #[test]
    fn weak_early_blight_is_low() {
        let view = interpret(&PredictionResponse::new("Early_Blight", 0.55).uncertain(false));
        assert_eq!(view.severity, Severity::Low);
    }

    // ── Catalog fallback ──

    #[test]
    fn unknown_label_reads_healthy_copy_but_keeps_label() {
        let view = interpret(&PredictionResponse::new("Common_Scab", 0.9));
        let healthy = find_disease("Healthy").unwrap();

        assert_eq!(view.label, "Common_Scab");
        assert_eq!(view.severity, Severity::High);
        assert_eq!(view.description, healthy.description);
    }

    // ── Pass-through and ranking ──

    #[test]
    fn warning_passed_through_verbatim() {
        let text = "Prediction is uncertain. Try a photo from a different angle.";
        let view = interpret(&PredictionResponse::new("Early_Blight", 0.5).with_advisory(text));
        assert_eq!(view.warning.as_deref(), Some(text));
    }

    #[test]
    fn no_warning_is_synthesized() {
        let view = interpret(&PredictionResponse::new("Early_Blight", 0.2).uncertain(true));
        assert!(view.warning.is_none());
    }

    #[test]
    fn distribution_ranked_descending() {
        let response = PredictionResponse::new("Late_Blight", 0.7).with_distribution(&[
            ("Healthy", 0.1),
            ("Late_Blight", 0.7),
            ("Early_Blight", 0.2),
        ]);
        let ranked = interpret(&response).per_class_confidence.unwrap();
        let labels: Vec<_> = ranked.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Late_Blight", "Early_Blight", "Healthy"]);
    }

    #[test]
    fn ranking_ties_keep_input_order() {
        let response = PredictionResponse::new("Early_Blight", 0.4).with_distribution(&[
            ("Late_Blight", 0.3),
            ("Early_Blight", 0.4),
            ("Healthy", 0.3),
        ]);
        let ranked = interpret(&response).per_class_confidence.unwrap();
        let labels: Vec<_> = ranked.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Early_Blight", "Late_Blight", "Healthy"]);
    }

    #[test]
    fn absent_distribution_stays_absent() {
        let view = interpret(&PredictionResponse::new("Healthy", 0.9));
        assert!(view.per_class_confidence.is_none());
    }

    #[test]
    fn interpretation_does_not_touch_input() {
        let response = PredictionResponse::new("Late_Blight", 0.85).with_distribution(&[
            ("Healthy", 0.05),
            ("Late_Blight", 0.85),
        ]);
        let before = response.clone();
        let _ = interpret(&response);
        assert_eq!(response, before);
    }
}
