//! Static disease catalog and reference gallery.
//!
//! Catalog entries are looked up by the exact label the prediction service
//! returns. Unknown labels read the Healthy entry.

use serde::Serialize;

use super::types::HEALTHY_LABEL;

/// Description and treatment copy for one classifier label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiseaseInfo {
    pub label: &'static str,
    pub description: &'static str,
    pub treatment: &'static str,
}

const EARLY_BLIGHT: DiseaseInfo = DiseaseInfo {
    label: "Early_Blight",
    description: "Early blight is a fungal disease caused by Alternaria solani. It appears as \
        brown to black lesions with concentric rings that form a target-like pattern. It usually \
        attacks older leaves first and can spread to stems and tubers.",
    treatment: "Apply a fungicide containing chlorothalonil or copper. Rotate crops, remove \
        infected plants and keep enough spacing for air circulation. Water at the base of the \
        plant and avoid wetting the leaves.",
};

const LATE_BLIGHT: DiseaseInfo = DiseaseInfo {
    label: "Late_Blight",
    description: "Late blight is caused by the oomycete Phytophthora infestans. It appears as \
        water-soaked, grey-green lesions that quickly turn brown to black. White growth may be \
        visible on the underside of leaves in humid conditions.",
    treatment: "Apply fungicide preventively, especially before the rainy season. Remove and \
        destroy infected plants immediately. Avoid overhead irrigation and improve air \
        circulation. Plant resistant varieties where available.",
};

const HEALTHY: DiseaseInfo = DiseaseInfo {
    label: HEALTHY_LABEL,
    description: "The leaf looks healthy with no signs of disease. Healthy potato leaves are \
        usually medium to dark green, slightly hairy, with a compound leaf structure.",
    treatment: "Keep up regular preventive care: proper watering, balanced fertilisation and \
        monitoring for early signs of pests or disease.",
};

/// Every catalog entry, in classifier label order.
pub const DISEASE_CATALOG: &[DiseaseInfo] = &[EARLY_BLIGHT, HEALTHY, LATE_BLIGHT];

/// Exact-match lookup with no fallback.
pub fn find_disease(label: &str) -> Option<&'static DiseaseInfo> {
    DISEASE_CATALOG.iter().find(|info| info.label == label)
}

/// Lookup used by interpretation: unknown labels get the Healthy entry.
pub fn disease_info(label: &str) -> &'static DiseaseInfo {
    match find_disease(label) {
        Some(info) => info,
        None => {
            tracing::warn!(label, "Unrecognized label, using Healthy catalog entry");
            &HEALTHY
        }
    }
}

// ── Reference gallery ─────────────────────────────────────

/// Accent colour for a gallery card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Accent {
    Green,
    Yellow,
    Red,
}

/// One gallery card with its reference photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub title: &'static str,
    pub summary: &'static str,
    pub images: &'static [&'static str],
    pub accent: Accent,
}

pub const REFERENCE_GALLERY: &[ReferenceEntry] = &[
    ReferenceEntry {
        title: "Healthy",
        summary: "A healthy potato leaf with normal green colour and no sign of disease.",
        images: &["Healthy_1.jpg", "Healthy_2.jpg", "Healthy_3.jpg"],
        accent: Accent::Green,
    },
    ReferenceEntry {
        title: "Early Blight",
        summary: "A fungal disease marked by brown spots with concentric rings, usually on \
            older leaves first.",
        images: &["Early_Blight_1.jpg", "Early_Blight_2.jpg", "Early_Blight_3.jpg"],
        accent: Accent::Yellow,
    },
    ReferenceEntry {
        title: "Late Blight",
        summary: "A water mould infection causing dark, damp patches on leaves and stems that \
            spreads quickly in cool, humid weather.",
        images: &["Late_Blight_1.jpg", "Late_Blight_2.jpg", "Late_Blight_3.jpg"],
        accent: Accent::Red,
    },
];

/// All gallery image identifiers, in display order. This is the path set
/// handed to the preload coordinator.
pub fn all_reference_images() -> Vec<String> {
    REFERENCE_GALLERY
        .iter()
        .flat_map(|entry| entry.images.iter().map(|img| img.to_string()))
        .collect()
}
