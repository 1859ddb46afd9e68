use crate::error::IngestError;
use crate::models::DocumentPage;
use lopdf::{Document, Object};

/// Everything the ingestion pipeline consumes from a decoded PDF: the
/// ordered per-page text and the author declared in the file metadata.
#[derive(Debug, Clone)]
pub struct ExtractedPdf {
    pub pages: Vec<DocumentPage>,
    pub author: Option<String>,
}

impl ExtractedPdf {
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub trait PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedPdf, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedPdf, IngestError> {
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::Extraction(error.to_string()))?;

        let mut pages = Vec::new();
        let mut any_text = false;

        for (page_number, _page_id) in document.get_pages() {
            // A page that fails text extraction is kept as an empty entry so
            // page numbering stays physical.
            let text = document.extract_text(&[page_number]).unwrap_or_default();
            if !text.trim().is_empty() {
                any_text = true;
            }
            pages.push(DocumentPage { page_number, text });
        }

        if !any_text {
            return Err(IngestError::Extraction(
                "pdf has no readable page text".to_string(),
            ));
        }

        Ok(ExtractedPdf {
            pages,
            author: read_author(&document),
        })
    }
}

fn read_author(document: &Document) -> Option<String> {
    let info = match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_object(*id).ok()?,
        other => other,
    };
    let author = info.as_dict().ok()?.get(b"Author").ok()?;
    let raw = author.as_str().ok()?;
    let decoded = decode_pdf_string(raw);
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// PDF text strings are either UTF-16BE with a BOM or a latin-ish one-byte
/// encoding; both decode losslessly enough for a metadata field.
fn decode_pdf_string(raw: &[u8]) -> String {
    if raw.len() >= 2 && raw[0] == 0xFE && raw[1] == 0xFF {
        let utf16: Vec<u16> = raw[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        String::from_utf8_lossy(raw).to_string()
    }
}
