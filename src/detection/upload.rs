use thiserror::Error;

/// Largest file accepted for analysis.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024; // 5 MB

/// Why a file was refused before any analysis or network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("File is not an image ({mime})")]
    NotAnImage { mime: String },

    #[error("File is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("File is empty")]
    Empty,
}

/// An image file that passed input validation.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ValidatedUpload {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Check MIME type and size. Runs upstream of quality analysis.
pub fn validate_upload(
    file_name: &str,
    mime: &str,
    bytes: Vec<u8>,
) -> Result<ValidatedUpload, UploadRejection> {
    if !mime.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(UploadRejection::NotAnImage {
            mime: mime.to_string(),
        });
    }
    if bytes.is_empty() {
        return Err(UploadRejection::Empty);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadRejection::TooLarge {
            size: bytes.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    Ok(ValidatedUpload {
        file_name: file_name.to_string(),
        mime: mime.trim().to_string(),
        bytes,
    })
}

/// Guess a MIME type from the file extension. Used by the CLI.
pub fn mime_from_file_name(file_name: &str) -> &'static str {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or("application/octet-stream")
}
