//! Page rasterization on top of a [`PdfEngine`] backend.
//!
//! A [`PageRasterizer`] opens each document lazily on its first request and
//! keeps the decoded handle for later pages, so switching pages never
//! re-decodes the file. Every page is scaled to fit the caller's target box
//! while preserving its aspect ratio.

use crate::{DocumentHandle, PageSize, PdfEngine, PdfEngineError, RenderRequest, RgbaImage};
use doc_model::{Document, DocumentId, PageNumberError, PageRequest, TargetBox};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Errors surfaced to viewers when a page cannot be produced
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The document bytes could not be read or decoded
    #[error("document {document} could not be decoded: {reason}")]
    Malformed { document: String, reason: String },

    /// The requested 1-based page does not exist
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// Page numbers start at 1
    #[error("page numbers are 1-based, got {0}")]
    InvalidPage(u32),

    /// The backend decoded the document but failed to draw the page
    #[error("render failed: {0}")]
    Render(String),
}

impl From<PageNumberError> for DecodeError {
    fn from(err: PageNumberError) -> Self {
        DecodeError::InvalidPage(err.0)
    }
}

/// A rasterized page owned by whoever requested it
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSurface {
    pub document_id: DocumentId,
    pub page_number: u32,
    pub scale: f32,
    pub image: RgbaImage,
}

impl RenderedSurface {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Scale factor that fits `native` inside `target` without distortion.
///
/// Degenerate sizes fall back to 1.0 so a broken media box still renders.
pub fn fit_scale(native: PageSize, target: TargetBox) -> f32 {
    if native.width_pt <= 0.0
        || native.height_pt <= 0.0
        || target.width <= 0.0
        || target.height <= 0.0
    {
        return 1.0;
    }

    (target.width / native.width_pt).min(target.height / native.height_pt)
}

#[derive(Debug, Clone, Copy)]
struct OpenDocument {
    handle: DocumentHandle,
    page_count: u32,
}

pub struct PageRasterizer<E> {
    engine: E,
    open: HashMap<DocumentId, OpenDocument>,
}

impl<E: PdfEngine> PageRasterizer<E> {
    pub fn new(engine: E) -> Self {
        Self { engine, open: HashMap::new() }
    }

    #[cfg(test)]
    fn is_open(&self, document_id: &DocumentId) -> bool {
        self.open.contains_key(document_id)
    }

    /// Total pages of the document, decoding it if needed.
    pub fn page_count(&mut self, document: &Document) -> Result<u32, DecodeError> {
        Ok(self.ensure_open(document)?.page_count)
    }

    /// Render `page_number` (1-based) of `document` to fit inside `target`.
    pub fn render(
        &mut self,
        document: &Document,
        page_number: u32,
        target: TargetBox,
    ) -> Result<RenderedSurface, DecodeError> {
        let request = PageRequest::new(document.id.clone(), page_number)?;
        let open = self.ensure_open(document)?;

        if request.page_number() > open.page_count {
            warn!(
                document = %document.id,
                page = page_number,
                page_count = open.page_count,
                "rejected out-of-range page request"
            );
            return Err(DecodeError::PageOutOfRange {
                page: page_number,
                page_count: open.page_count,
            });
        }

        let native = self
            .engine
            .page_size(open.handle, request.page_index())
            .map_err(|err| render_error(err, page_number, open.page_count))?;
        let scale = fit_scale(native, target);

        let image = self
            .engine
            .render_page(open.handle, RenderRequest { page_index: request.page_index(), scale })
            .map_err(|err| render_error(err, page_number, open.page_count))?;

        debug!(
            document = %document.id,
            page = page_number,
            scale,
            width = image.width(),
            height = image.height(),
            "rasterized page"
        );

        Ok(RenderedSurface { document_id: request.document_id, page_number, scale, image })
    }

    /// Release the decoded document. Returns `false` if it was never opened.
    pub fn close(&mut self, document_id: &DocumentId) -> bool {
        let Some(open) = self.open.remove(document_id) else {
            return false;
        };

        if let Err(err) = self.engine.close(open.handle) {
            warn!(document = %document_id, "failed to close document: {err}");
        }
        true
    }

    fn ensure_open(&mut self, document: &Document) -> Result<OpenDocument, DecodeError> {
        if let Some(open) = self.open.get(&document.id) {
            return Ok(*open);
        }

        let malformed = |err: PdfEngineError| DecodeError::Malformed {
            document: document.id.to_string(),
            reason: err.to_string(),
        };

        let handle = self.engine.open(document.source.clone()).map_err(malformed)?;
        let page_count = self.engine.page_count(handle).map_err(malformed)?;
        let open = OpenDocument { handle, page_count };

        debug!(document = %document.id, page_count, "opened document for rasterization");
        self.open.insert(document.id.clone(), open);
        Ok(open)
    }
}

fn render_error(err: PdfEngineError, page: u32, page_count: u32) -> DecodeError {
    match err {
        PdfEngineError::PageOutOfRange { .. } => DecodeError::PageOutOfRange { page, page_count },
        other => DecodeError::Render(other.to_string()),
    }
}
