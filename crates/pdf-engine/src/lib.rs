use doc_model::DocumentSource;
use image::{ImageBuffer, Rgba};
use lopdf::ObjectId;
use std::collections::HashMap;
use tracing::debug;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod paint;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod preview;
pub mod rasterizer;

pub use preview::{encode_jpeg, PreviewError, PreviewGenerator, PreviewImage};
pub use rasterizer::{fit_scale, DecodeError, PageRasterizer, RenderedSurface};

use paint::{paint_content, Matrix};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Opaque id of a document decoded by one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Native page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self { width_pt: 612.0, height_pt: 792.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
}

impl RenderRequest {
    fn pixel_size(&self, page: PageSize) -> (u32, u32) {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        let width = (page.width_pt * scale).round().max(1.0) as u32;
        let height = (page.height_pt * scale).round().max(1.0) as u32;
        (width, height)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Decoding backend. A document is decoded once in `open`; page queries and
/// renders reuse the returned handle until `close`.
pub trait PdfEngine {
    fn open(&mut self, source: DocumentSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MediaBox {
    left: f32,
    bottom: f32,
    right: f32,
    top: f32,
}

impl MediaBox {
    const LETTER: MediaBox = MediaBox { left: 0.0, bottom: 0.0, right: 612.0, top: 792.0 };

    fn size(&self) -> PageSize {
        PageSize { width_pt: self.right - self.left, height_pt: self.top - self.bottom }
    }
}

#[derive(Debug)]
struct LoadedPage {
    id: ObjectId,
    media_box: MediaBox,
}

#[derive(Debug)]
struct LoadedDocument {
    doc: lopdf::Document,
    pages: Vec<LoadedPage>,
}

impl LoadedDocument {
    fn page(&self, page_index: u32) -> Result<&LoadedPage, PdfEngineError> {
        self.pages.get(page_index as usize).ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: self.pages.len() as u32,
        })
    }
}

/// Pure-Rust backend. lopdf parses the page tree once per open and each
/// render paints the page's vector content (paths, fills, strokes) onto
/// white paper. Text and embedded images are not drawn.
#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, LoadedDocument>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn loaded(&self, handle: DocumentHandle) -> Result<&LoadedDocument, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

fn load(bytes: &[u8]) -> Result<LoadedDocument, PdfEngineError> {
    let doc = lopdf::Document::load_mem(bytes)?;
    if doc.is_encrypted() {
        return Err(PdfEngineError::EncryptedUnsupported);
    }

    let pages: Vec<LoadedPage> = doc
        .get_pages()
        .into_values()
        .map(|id| LoadedPage { id, media_box: media_box(&doc, id) })
        .collect();
    if pages.is_empty() {
        return Err(PdfEngineError::NoPages);
    }

    Ok(LoadedDocument { doc, pages })
}

const MAX_TREE_DEPTH: usize = 32;

/// MediaBox is inheritable, so walk up the page tree until one is found.
fn media_box(doc: &lopdf::Document, page_id: ObjectId) -> MediaBox {
    let mut node = doc.get_dictionary(page_id).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(dict) = node else {
            break;
        };
        let found = dict
            .get(b"MediaBox")
            .and_then(|obj| doc.dereference(obj))
            .ok()
            .and_then(|(_, obj)| obj.as_array().ok())
            .and_then(|values| parse_box(values));
        if let Some(media_box) = found {
            return media_box;
        }

        node = dict
            .get(b"Parent")
            .and_then(lopdf::Object::as_reference)
            .and_then(|parent| doc.get_dictionary(parent))
            .ok();
    }

    MediaBox::LETTER
}

fn parse_box(values: &[lopdf::Object]) -> Option<MediaBox> {
    let [x0, y0, x1, y1] = values else {
        return None;
    };
    let [x0, y0, x1, y1] = [x0, y0, x1, y1].map(|value| value.as_float().ok());
    let (x0, y0, x1, y1) = (x0?, y0?, x1?, y1?);

    let media_box =
        MediaBox { left: x0.min(x1), bottom: y0.min(y1), right: x0.max(x1), top: y0.max(y1) };
    let size = media_box.size();
    (size.width_pt > 0.0 && size.height_pt > 0.0).then_some(media_box)
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: DocumentSource) -> Result<DocumentHandle, PdfEngineError> {
        let loaded = load(&source.read_bytes()?)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        debug!(handle = handle.raw(), pages = loaded.pages.len(), "parsed document");
        self.docs.insert(handle, loaded);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.loaded(handle)?.pages.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        Ok(self.loaded(handle)?.page(page_index)?.media_box.size())
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let loaded = self.loaded(handle)?;
        let page = loaded.page(request.page_index)?;
        let (width, height) = request.pixel_size(page.media_box.size());
        let mut image = RgbaImage::from_pixel(width, height, PAPER);

        let content = loaded.doc.get_page_content(page.id)?;
        if !content.is_empty() {
            let scale = width as f32 / page.media_box.size().width_pt;
            let base = Matrix::page_to_device(
                (page.media_box.left, page.media_box.bottom),
                page.media_box.top,
                scale,
            );
            paint_content(&mut image, &content, base)?;
        }

        Ok(image)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(drop).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

/// Backend chosen at runtime by [`default_engine`].
pub enum Engine {
    Lopdf(LopdfEngine),
    #[cfg(feature = "pdfium")]
    Pdfium(pdfium::PdfiumEngine),
}

macro_rules! dispatch {
    ($engine:expr, $inner:ident => $call:expr) => {
        match $engine {
            Engine::Lopdf($inner) => $call,
            #[cfg(feature = "pdfium")]
            Engine::Pdfium($inner) => $call,
        }
    };
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Lopdf(_) => "lopdf",
            #[cfg(feature = "pdfium")]
            Engine::Pdfium(_) => "pdfium",
        }
    }
}

impl PdfEngine for Engine {
    fn open(&mut self, source: DocumentSource) -> Result<DocumentHandle, PdfEngineError> {
        dispatch!(self, engine => engine.open(source))
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        dispatch!(self, engine => engine.page_count(handle))
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        dispatch!(self, engine => engine.page_size(handle, page_index))
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        dispatch!(self, engine => engine.render_page(handle, request))
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        dispatch!(self, engine => engine.close(handle))
    }
}

/// PDFium when the library binds, otherwise the built-in lopdf painter.
#[cfg(feature = "pdfium")]
pub fn default_engine() -> Engine {
    match pdfium::PdfiumEngine::bind() {
        Ok(engine) => Engine::Pdfium(engine),
        Err(err) => {
            tracing::warn!("pdfium unavailable, using the lopdf painter: {err}");
            Engine::Lopdf(LopdfEngine::new())
        }
    }
}

#[cfg(not(feature = "pdfium"))]
pub fn default_engine() -> Engine {
    Engine::Lopdf(LopdfEngine::new())
}
