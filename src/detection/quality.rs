//! Heuristic image quality pre-check, run before submission.
//!
//! Pure read-only analysis: no network, no persistent side effects. The
//! report is advisory and never blocks submission. When pixels cannot be
//! decoded the caller gets a best-effort report without the luminance check,
//! or no report at all.
//!
//! Checks, in report order:
//! 1. Resolution below 224 px on either side (-30)
//! 2. Aspect ratio outside [0.5, 2.0] (-20)
//! 3. File smaller than 50 KiB (-20)
//! 4. Mean luminance of the top-left 100x100 sample below 50 or above 200 (-15)
//!
//! Images whose header declares more than `max_decode_pixels` are never
//! decoded; they get the header-only report.

use std::fmt;
use std::io::Cursor;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ═══════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════

/// Thresholds and deductions for each check.
#[derive(Debug, Clone)]
pub struct QualityThresholds {
    /// Minimum width and height in pixels. Matches the classifier input size.
    pub min_dimension: u32,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    pub min_file_bytes: u64,
    /// Side of the top-left square sampled for luminance.
    pub sample_side: u32,
    pub dark_luminance: f64,
    pub bright_luminance: f64,
    pub resolution_penalty: i32,
    pub aspect_penalty: i32,
    pub file_size_penalty: i32,
    pub exposure_penalty: i32,
    /// Largest `width * height` decoded for the luminance check.
    pub max_decode_pixels: u64,
}

/// 40 megapixels, comfortably above any phone camera.
pub const DEFAULT_MAX_DECODE_PIXELS: u64 = 40_000_000;

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_dimension: 224,
            min_aspect_ratio: 0.5,
            max_aspect_ratio: 2.0,
            min_file_bytes: 50 * 1024,
            sample_side: 100,
            dark_luminance: 50.0,
            bright_luminance: 200.0,
            resolution_penalty: 30,
            aspect_penalty: 20,
            file_size_penalty: 20,
            exposure_penalty: 15,
            max_decode_pixels: DEFAULT_MAX_DECODE_PIXELS,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Report types
// ═══════════════════════════════════════════════════════════

/// One actionable quality problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    LowResolution,
    AspectRatio,
    SmallFile,
    TooDark,
    TooBright,
}

impl QualityIssue {
    pub fn message(&self) -> &'static str {
        match self {
            QualityIssue::LowResolution => "resolution too low",
            QualityIssue::AspectRatio => "aspect ratio not ideal",
            QualityIssue::SmallFile => "file too small / possibly low quality",
            QualityIssue::TooDark => "image too dark",
            QualityIssue::TooBright => "image too bright",
        }
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Quality assessment for one candidate image. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageQualityReport {
    /// 0..=100, higher is better.
    pub score: u8,
    /// Issues in check order.
    pub issues: Vec<QualityIssue>,
    /// `false` when pixels could not be sampled and the luminance check was skipped.
    pub luminance_checked: bool,
}

impl ImageQualityReport {
    pub fn issue_messages(&self) -> Vec<&'static str> {
        self.issues.iter().map(QualityIssue::message).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// Assessor trait
// ═══════════════════════════════════════════════════════════

/// Assesses image quality without modifying it.
pub trait QualityAssessor: Send + Sync {
    /// Full assessment from decoded pixels.
    fn assess(&self, image: &RgbImage, file_size_bytes: u64) -> ImageQualityReport;

    /// Best-effort assessment when only the dimensions are known.
    fn assess_dimensions(&self, width: u32, height: u32, file_size_bytes: u64)
        -> ImageQualityReport;

    /// Pixel count above which the image is not decoded.
    fn max_decode_pixels(&self) -> u64 {
        DEFAULT_MAX_DECODE_PIXELS
    }
}

// ═══════════════════════════════════════════════════════════
// HeuristicQualityAssessor
// ═══════════════════════════════════════════════════════════

/// Production assessor: resolution, aspect ratio, file size, exposure.
///
/// Deductions are independent and additive; the score is clamped to 0..=100.
#[derive(Debug, Clone, Default)]
pub struct HeuristicQualityAssessor {
    thresholds: QualityThresholds,
}

impl HeuristicQualityAssessor {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Structural checks shared by both entry points.
    fn structural_checks(
        &self,
        width: u32,
        height: u32,
        file_size_bytes: u64,
        score: &mut i32,
        issues: &mut Vec<QualityIssue>,
    ) {
        let t = &self.thresholds;

        if width < t.min_dimension || height < t.min_dimension {
            issues.push(QualityIssue::LowResolution);
            *score -= t.resolution_penalty;
        }

        // Zero height has no meaningful ratio
        if height > 0 {
            let ratio = width as f64 / height as f64;
            if ratio < t.min_aspect_ratio || ratio > t.max_aspect_ratio {
                issues.push(QualityIssue::AspectRatio);
                *score -= t.aspect_penalty;
            }
        }

        if file_size_bytes < t.min_file_bytes {
            issues.push(QualityIssue::SmallFile);
            *score -= t.file_size_penalty;
        }
    }
}

impl QualityAssessor for HeuristicQualityAssessor {
    fn assess(&self, image: &RgbImage, file_size_bytes: u64) -> ImageQualityReport {
        let mut score = 100i32;
        let mut issues = Vec::new();
        self.structural_checks(
            image.width(),
            image.height(),
            file_size_bytes,
            &mut score,
            &mut issues,
        );

        let t = &self.thresholds;
        let luminance = sample_mean_luminance(image, t.sample_side);
        if let Some(mean) = luminance {
            if mean < t.dark_luminance {
                issues.push(QualityIssue::TooDark);
                score -= t.exposure_penalty;
            } else if mean > t.bright_luminance {
                issues.push(QualityIssue::TooBright);
                score -= t.exposure_penalty;
            }
        }

        debug!(
            size = %format!("{}x{}", image.width(), image.height()),
            file_size_bytes,
            luminance = luminance.unwrap_or(f64::NAN),
            score,
            issues = issues.len(),
            "Image quality assessed"
        );

        ImageQualityReport {
            score: clamp_score(score),
            issues,
            luminance_checked: luminance.is_some(),
        }
    }

    fn assess_dimensions(
        &self,
        width: u32,
        height: u32,
        file_size_bytes: u64,
    ) -> ImageQualityReport {
        let mut score = 100i32;
        let mut issues = Vec::new();
        self.structural_checks(width, height, file_size_bytes, &mut score, &mut issues);

        ImageQualityReport {
            score: clamp_score(score),
            issues,
            luminance_checked: false,
        }
    }

    fn max_decode_pixels(&self) -> u64 {
        self.thresholds.max_decode_pixels
    }
}

fn clamp_score(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}

// ═══════════════════════════════════════════════════════════
// Public analysis functions
// ═══════════════════════════════════════════════════════════

/// Mean luminance of the top-left `side` x `side` region (clipped to the image).
///
/// Per-pixel luminance is the plain average of the three channels.
/// Returns `None` for an empty image.
pub fn sample_mean_luminance(image: &RgbImage, side: u32) -> Option<f64> {
    let w = image.width().min(side);
    let h = image.height().min(side);
    if w == 0 || h == 0 {
        return None;
    }

    let mut total = 0.0f64;
    for y in 0..h {
        for x in 0..w {
            let p = image.get_pixel(x, y);
            total += (p.0[0] as f64 + p.0[1] as f64 + p.0[2] as f64) / 3.0;
        }
    }
    Some(total / (w as f64 * h as f64))
}

/// Analyze encoded image bytes with the given assessor.
///
/// - Pixels decode: full report.
/// - Only the header decodes, or it declares too many pixels to decode:
///   report without the luminance check.
/// - Nothing decodes: `None`, meaning "no quality feedback".
pub fn analyze_encoded(assessor: &dyn QualityAssessor, bytes: &[u8]) -> Option<ImageQualityReport> {
    let file_size = bytes.len() as u64;
    let dimensions = read_dimensions(bytes);

    if let Some((w, h)) = dimensions {
        let pixels = u64::from(w) * u64::from(h);
        if pixels > assessor.max_decode_pixels() {
            debug!(width = w, height = h, "Image too large to decode, header only");
            return Some(assessor.assess_dimensions(w, h, file_size));
        }
    }

    match image::load_from_memory(bytes) {
        Ok(img) => return Some(assessor.assess(&img.to_rgb8(), file_size)),
        Err(e) => debug!(error = %e, "Pixel decode failed, trying header only"),
    }

    match dimensions {
        Some((w, h)) => Some(assessor.assess_dimensions(w, h, file_size)),
        None => {
            debug!(file_size, "Image unreadable, no quality report");
            None
        }
    }
}

/// Decode on a blocking thread so callers can await the report.
pub async fn analyze_encoded_async<A>(assessor: A, bytes: Vec<u8>) -> Option<ImageQualityReport>
where
    A: QualityAssessor + 'static,
{
    match tokio::task::spawn_blocking(move || analyze_encoded(&assessor, &bytes)).await {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(error = %e, "Quality analysis task failed");
            None
        }
    }
}

/// Read width and height from the image header without decoding pixels.
pub fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
