use bytes::Bytes;
use std::path::PathBuf;

/// What kind of document the caller uploaded. Tagged once at the request
/// boundary; the pipeline never re-infers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
}

/// A document handed to the extraction pipeline: the kind tag, the temp
/// file it was spooled to, and its size in bytes. The temp file itself is
/// owned by the request handler and deleted when its guard drops.
#[derive(Debug, Clone)]
pub struct Document {
    pub kind: DocumentKind,
    pub path: PathBuf,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: usize,
    pub content: Bytes,
    pub mime_type: Option<String>,
}

impl UploadedFile {
    pub fn new(name: String, content: Bytes) -> Self {
        let size = content.len();
        Self {
            name,
            size,
            content,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: String) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    /// Classify the upload from its file extension, cross-checked against
    /// the content. Returns None for unsupported or mislabelled files.
    pub fn document_kind(&self) -> Option<DocumentKind> {
        match self.extension()?.as_str() {
            "pdf" => self.looks_like_pdf().then_some(DocumentKind::Pdf),
            "png" | "jpg" | "jpeg" => self.looks_like_image().then_some(DocumentKind::Image),
            _ => None,
        }
    }

    fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        Some(ext.to_lowercase())
    }

    pub fn looks_like_pdf(&self) -> bool {
        self.mime_type
            .as_ref()
            .map(|mt| mt == "application/pdf")
            .unwrap_or(false)
            || self.content.starts_with(b"%PDF")
    }

    pub fn looks_like_image(&self) -> bool {
        matches!(
            image::guess_format(&self.content),
            Ok(image::ImageFormat::Png) | Ok(image::ImageFormat::Jpeg)
        )
    }
}
