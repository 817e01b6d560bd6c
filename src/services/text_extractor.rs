use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentKind};

/// Rasterization density for PDF pages, in DPI. 200 keeps small print on
/// receipts legible without ballooning the page images.
const RENDER_DPI: u32 = 200;

/// Recognizes the text on a single page image.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &Path) -> AppResult<String>;
}

/// Recognizer backed by the `tesseract` CLI.
pub struct TesseractRecognizer;

impl TesseractRecognizer {
    pub fn new() -> AppResult<Self> {
        if !Self::is_available() {
            return Err(AppError::OcrError {
                message: "Tesseract OCR not available on this system".to_string(),
            });
        }
        Ok(Self)
    }

    pub fn is_available() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &Path) -> AppResult<String> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .output()
            .map_err(|e| AppError::OcrError {
                message: format!("Failed to run tesseract: {}", e),
            })?;

        if !output.status.success() {
            return Err(AppError::OcrError {
                message: format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Check that the poppler rasterizer used for PDF input is on PATH.
pub fn pdftoppm_available() -> bool {
    Command::new("pdftoppm")
        .arg("-v")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Turns a tagged document into a single text blob, one page at a time.
pub struct TextExtractor<R = TesseractRecognizer> {
    recognizer: R,
}

impl TextExtractor<TesseractRecognizer> {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            recognizer: TesseractRecognizer::new()?,
        })
    }
}

impl<R: Recognizer> TextExtractor<R> {
    pub fn with_recognizer(recognizer: R) -> Self {
        Self { recognizer }
    }

    /// Extract text from the document.
    ///
    /// Images are recognized as a single page; PDFs are rasterized and
    /// recognized page by page, each page prefixed with its 1-based
    /// `----- Page N -----` marker. A recognition failure on any page
    /// fails the whole document; there is no partial page collection.
    /// Whitespace-only output fails with [`AppError::NoTextExtracted`].
    pub fn extract(&self, document: &Document) -> AppResult<String> {
        let text = match document.kind {
            DocumentKind::Image => self.recognizer.recognize(&document.path)?,
            DocumentKind::Pdf => self.extract_pdf(&document.path)?,
        };

        if text.trim().is_empty() {
            return Err(AppError::NoTextExtracted);
        }

        Ok(text)
    }

    fn extract_pdf(&self, path: &Path) -> AppResult<String> {
        // Validate PDF structure early
        match lopdf::Document::load(path) {
            Ok(doc) => debug!(pages = doc.get_pages().len(), "PDF structure validated"),
            Err(e) => warn!(
                "PDF structure validation failed: {}, attempting rasterization anyway",
                e
            ),
        }

        let pages_dir = TempDir::new().map_err(|e| AppError::ProcessingError {
            message: format!("Failed to create page image directory: {}", e),
        })?;

        let page_images = rasterize_pdf(path, pages_dir.path())?;
        debug!(pages = page_images.len(), "PDF rasterized");

        let mut pages = Vec::with_capacity(page_images.len());
        for image in &page_images {
            pages.push(self.recognizer.recognize(image)?);
        }

        Ok(assemble_pages(&pages))
    }
}

/// Join page texts in document order, each prefixed with its page marker.
fn assemble_pages(pages: &[String]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("----- Page {} -----\n{}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render every PDF page to a PNG under `out_dir`, returned in page order.
fn rasterize_pdf(pdf: &Path, out_dir: &Path) -> AppResult<Vec<PathBuf>> {
    let output = Command::new("pdftoppm")
        .arg("-r")
        .arg(RENDER_DPI.to_string())
        .arg("-png")
        .arg(pdf)
        .arg(out_dir.join("page"))
        .output()
        .map_err(|e| AppError::ProcessingError {
            message: format!("Failed to run pdftoppm: {}", e),
        })?;

    if !output.status.success() {
        return Err(AppError::ProcessingError {
            message: format!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let mut images: Vec<(u32, PathBuf)> = fs::read_dir(out_dir)
        .map_err(|e| AppError::ProcessingError {
            message: format!("Failed to read page image directory: {}", e),
        })?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let number = page_number(&path)?;
            Some((number, path))
        })
        .collect();

    if images.is_empty() {
        return Err(AppError::ProcessingError {
            message: "pdftoppm produced no page images".to_string(),
        });
    }

    images.sort_by_key(|(number, _)| *number);
    Ok(images.into_iter().map(|(_, path)| path).collect())
}

/// Parse the page index out of a `page-NN.png` file name.
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (_, digits) = stem.rsplit_once('-')?;
    digits.parse().ok()
}
