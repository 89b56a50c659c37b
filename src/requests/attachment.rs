//! File payloads sent with lab and imaging results.
//!
//! Bytes travel as base64 (standard alphabet, no `data:` prefix). The type is
//! checked twice: by file name with `mime_guess` and by magic bytes.

use std::path::Path;

use base64::Engine;

use crate::error::WorkflowError;
use crate::models::{LabPanel, LabPdf, ValidationError};

/// Upload limit per file.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Lab result document, PDF only.
    LabPdf,
    /// Imaging result, any image format.
    Image,
}

impl AttachmentKind {
    fn field(self) -> &'static str {
        match self {
            AttachmentKind::LabPdf => "testPdfs",
            AttachmentKind::Image => "imageData",
        }
    }

    fn accepts(self, mime: &str) -> bool {
        match self {
            AttachmentKind::LabPdf => mime == "application/pdf",
            AttachmentKind::Image => mime.starts_with("image/"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// MIME type from magic bytes, `application/octet-stream` when unknown.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF-") {
        "application/pdf"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && bytes[..4] == *b"RIFF" && bytes[8..12] == *b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"BM") {
        "image/bmp"
    } else {
        "application/octet-stream"
    }
}

impl Attachment {
    pub fn from_path(path: &Path, kind: AttachmentKind) -> Result<Self, WorkflowError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ValidationError::invalid(kind.field(), "path has no file name"))?;
        let size = std::fs::metadata(path)?.len();
        if size > MAX_ATTACHMENT_BYTES as u64 {
            return Err(too_large(kind, size).into());
        }
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&file_name, &bytes, kind)?)
    }

    pub fn from_bytes(
        file_name: &str,
        bytes: &[u8],
        kind: AttachmentKind,
    ) -> Result<Self, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::invalid(kind.field(), format!("{file_name} is empty")));
        }
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(too_large(kind, bytes.len() as u64));
        }

        let declared = mime_guess::from_path(file_name)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let sniffed = sniff_mime(bytes);
        if !kind.accepts(&declared) || !kind.accepts(sniffed) {
            return Err(ValidationError::invalid(
                kind.field(),
                format!("{file_name} is not an accepted file type ({sniffed})"),
            ));
        }

        Ok(Self {
            file_name: file_name.to_string(),
            mime_type: sniffed.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }

    /// Accepts `data:<mime>;base64,<payload>` or bare base64.
    pub fn from_data_url(
        file_name: &str,
        data_url: &str,
        kind: AttachmentKind,
    ) -> Result<Self, ValidationError> {
        let payload = match data_url.find(',') {
            Some(idx) if data_url.starts_with("data:") => &data_url[idx + 1..],
            _ => data_url,
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| {
                ValidationError::invalid(kind.field(), format!("base64 decode failed: {e}"))
            })?;
        Self::from_bytes(file_name, &bytes, kind)
    }

    pub fn decode(&self) -> Result<Vec<u8>, ValidationError> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| {
                ValidationError::invalid("attachment", format!("base64 decode failed: {e}"))
            })
    }

    pub fn into_lab_pdf(self, test_type: LabPanel) -> LabPdf {
        LabPdf {
            test_type,
            file_name: self.file_name,
            pdf_data: self.data,
        }
    }
}

fn too_large(kind: AttachmentKind, size: u64) -> ValidationError {
    ValidationError::invalid(
        kind.field(),
        format!("file is {size} bytes, limit is {MAX_ATTACHMENT_BYTES}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF";
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[test]
    fn pdf_is_encoded_without_prefix() {
        let a = Attachment::from_bytes("hemogram.pdf", PDF, AttachmentKind::LabPdf).unwrap();
        assert_eq!(a.mime_type, "application/pdf");
        assert!(!a.data.starts_with("data:"));
        assert_eq!(a.decode().unwrap(), PDF);
    }

    #[test]
    fn lab_rejects_image_and_disguised_files() {
        assert!(Attachment::from_bytes("xray.png", PNG, AttachmentKind::LabPdf).is_err());
        // Right extension, wrong content.
        let err = Attachment::from_bytes("fake.pdf", b"hello world", AttachmentKind::LabPdf)
            .unwrap_err();
        assert_eq!(err.field(), Some("testPdfs"));
    }

    #[test]
    fn imaging_accepts_png_only_as_image() {
        assert!(Attachment::from_bytes("chest.png", PNG, AttachmentKind::Image).is_ok());
        assert!(Attachment::from_bytes("report.pdf", PDF, AttachmentKind::Image).is_err());
    }

    #[test]
    fn empty_and_oversized_rejected() {
        assert!(Attachment::from_bytes("a.pdf", b"", AttachmentKind::LabPdf).is_err());
        let mut big = b"%PDF-".to_vec();
        big.resize(MAX_ATTACHMENT_BYTES + 1, 0);
        assert!(Attachment::from_bytes("big.pdf", &big, AttachmentKind::LabPdf).is_err());
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(PNG);
        let url = format!("data:image/png;base64,{encoded}");
        let a = Attachment::from_data_url("scan.png", &url, AttachmentKind::Image).unwrap();
        assert_eq!(a.data, encoded);
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crp.pdf");
        std::fs::write(&path, PDF).unwrap();
        let a = Attachment::from_path(&path, AttachmentKind::LabPdf).unwrap();
        assert_eq!(a.file_name, "crp.pdf");
        let pdf = a.into_lab_pdf(LabPanel::Crp);
        assert_eq!(pdf.test_type, LabPanel::Crp);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Attachment::from_path(Path::new("/nonexistent/x.pdf"), AttachmentKind::LabPdf)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Io(_)));
    }
}
