use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Document;

/// Turns raw document bytes into page-indexed text and back
pub trait DocumentCodec: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<Document>;
    fn encode(&self, document: &Document) -> Result<Vec<u8>>;
}

pub const PAGE_BREAK: char = '\u{0C}';

/// UTF-8 text with pages separated by form feeds, the layout `pdftotext` writes
#[derive(Debug, Clone, Copy, Default)]
pub struct FormFeedCodec;

impl DocumentCodec for FormFeedCodec {
    fn decode(&self, raw: &[u8]) -> Result<Document> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| Error::new(ErrorKind::Io, format!("Document is not UTF-8: {}", e)))?;

        let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
        // A trailing page break does not open another page
        if pages.len() > 1 && pages.last().is_some_and(|page| page.trim().is_empty()) {
            pages.pop();
        }
        Ok(Document::new(pages))
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        let mut separator = [0u8; 4];
        let separator = PAGE_BREAK.encode_utf8(&mut separator);
        Ok(document.pages.join(separator).into_bytes())
    }
}
