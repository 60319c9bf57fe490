use crate::detection::DiagnosisView;

/// Domain preamble wrapped around every user question.
const DOMAIN_PREAMBLE: &str = "You are an AI assistant that helps with potato leaf disease detection.
You can give information about:
- Diseases that attack potato leaves (Early Blight, Late Blight)
- How to prevent and treat potato diseases
- Potato plant care tips
- Interpreting disease detection results
- Good agricultural practice for potatoes

Answer in plain language that is easy to understand and not too long.";

/// Build the text sent to the model for one user turn.
pub fn build_prompt(question: &str, diagnosis: Option<&str>) -> String {
    let mut prompt = String::from(DOMAIN_PREAMBLE);
    if let Some(context) = diagnosis {
        prompt.push_str("\n\n");
        prompt.push_str(context);
    }
    prompt.push_str("\n\nUser question: ");
    prompt.push_str(question.trim());
    prompt
}

/// Summarize the latest diagnosis so the assistant can refer to it.
pub fn diagnosis_context(view: &DiagnosisView) -> String {
    let mut context = format!(
        "The user's latest detection result: {} ({}% probability, severity {}).",
        view.display_name(),
        view.confidence_percent(),
        view.severity.label()
    );
    if let Some(warning) = &view.warning {
        context.push_str(" Service warning: ");
        context.push_str(warning);
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{interpret, PredictionResponse};

    #[test]
    fn prompt_ends_with_question() {
        let prompt = build_prompt("  How do I treat early blight?  ", None);
        assert!(prompt.starts_with("You are an AI assistant"));
        assert!(prompt.ends_with("User question: How do I treat early blight?"));
    }

    #[test]
    fn prompt_includes_diagnosis_context() {
        let prompt = build_prompt("What now?", Some("Latest result: Late Blight"));
        assert!(prompt.contains("Latest result: Late Blight"));
    }

    #[test]
    fn context_describes_diagnosis() {
        let view = interpret(
            &PredictionResponse::new("Late_Blight", 0.91).with_advisory("Retake in daylight"),
        );
        let context = diagnosis_context(&view);
        assert!(context.contains("Late Blight (91% probability, severity high)"));
        assert!(context.contains("Retake in daylight"));
    }
}
