//! Document loading for PDF, DOCX and plain text sources.
//!
//! Loading never mutates the source. PDFs yield one [`Segment`] per page;
//! DOCX and text files yield a single segment for the whole body. Any
//! failure aborts the load, there is no partial output.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info};

use crate::document::{Segment, SourceDocument, SourceFormat, SourceLocator};
use crate::error::{RagError, Result};

const DOCX_BODY: &str = "word/document.xml";

/// Load a file from disk, detecting its format from the extension.
///
/// The extension is checked before the file is opened, so an unsupported
/// file fails with [`RagError::UnsupportedFormat`] without any I/O.
pub fn load_path(path: &Path) -> Result<Vec<Segment>> {
    let format = SourceFormat::from_path(path)?;
    let name = source_name(path);
    let bytes = std::fs::read(path).map_err(|e| load_failure(&name, e))?;
    load(&SourceDocument::from_bytes(name, format, bytes))
}

/// Load a file on the blocking thread pool.
pub async fn load_path_async(path: PathBuf) -> Result<Vec<Segment>> {
    let name = source_name(&path);
    tokio::task::spawn_blocking(move || load_path(&path))
        .await
        .map_err(|e| load_failure(&name, format!("loader task failed: {e}")))?
}

/// Load an in-memory document according to its declared format.
pub fn load(document: &SourceDocument) -> Result<Vec<Segment>> {
    info!(source = document.name(), format = %document.format(), "loading document");
    let segments = match document.format() {
        SourceFormat::Pdf => load_pdf(document.name(), document.bytes())?,
        SourceFormat::Docx => load_docx(document.name(), document.bytes())?,
        SourceFormat::Text => load_text(document.name(), document.bytes())?,
    };
    debug!(source = document.name(), segment_count = segments.len(), "document loaded");
    Ok(segments)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_failure(name: &str, message: impl ToString) -> RagError {
    RagError::LoadFailure { source_name: name.to_string(), message: message.to_string() }
}

fn load_pdf(name: &str, bytes: &[u8]) -> Result<Vec<Segment>> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| load_failure(name, format!("invalid PDF: {e}")))?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(load_failure(name, "PDF has no pages"));
    }

    let mut segments = Vec::with_capacity(pages.len());
    for &page in pages.keys() {
        let text = doc
            .extract_text(&[page])
            .map_err(|e| load_failure(name, format!("page {page}: {e}")))?;
        segments.push(Segment::new(
            text,
            SourceLocator { source: name.to_string(), page: Some(page) },
        ));
    }
    Ok(segments)
}

fn load_docx(name: &str, bytes: &[u8]) -> Result<Vec<Segment>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| load_failure(name, format!("invalid DOCX container: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| load_failure(name, format!("missing {DOCX_BODY}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| load_failure(name, format!("unreadable {DOCX_BODY}: {e}")))?;

    let text = docx_plain_text(&xml).map_err(|e| load_failure(name, e))?;
    Ok(vec![Segment::new(text, SourceLocator { source: name.to_string(), page: None })])
}

/// Extract reading-order text from a WordprocessingML body.
///
/// Paragraphs are joined with `\n`; `<w:tab/>` becomes `\t` and
/// `<w:br/>`/`<w:cr/>` become `\n`.
pub(crate) fn docx_plain_text(xml: &str) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| format!("malformed {DOCX_BODY}: {e}"))? {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| format!("bad text run: {e}"))?;
                current.push_str(&text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs.join("\n"))
}

fn load_text(name: &str, bytes: &[u8]) -> Result<Vec<Segment>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| load_failure(name, format!("not valid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    Ok(vec![Segment::new(text, SourceLocator { source: name.to_string(), page: None })])
}
