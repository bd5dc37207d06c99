//! Full rasterizer backed by the PDFium shared library.

use crate::{DocumentHandle, PageSize, PdfEngine, PdfEngineError, RenderRequest, RgbaImage};
use doc_model::DocumentSource;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::collections::HashMap;
use tracing::debug;

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// Bind the library once per process: next to the executable first (app
/// bundles), then the working directory, then the system search path.
fn library() -> Result<&'static Pdfium, PdfEngineError> {
    PDFIUM.get_or_try_init(|| {
        let exe_dir =
            std::env::current_exe().ok().and_then(|path| path.parent().map(|dir| dir.to_owned()));

        let bindings = exe_dir
            .and_then(|dir| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir)).ok()
            })
            .map(Ok)
            .unwrap_or_else(|| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                    .or_else(|_| Pdfium::bind_to_system_library())
            })
            .map_err(|err| PdfEngineError::Backend(format!("failed to bind pdfium: {err}")))?;

        Ok(Pdfium::new(bindings))
    })
}

fn backend_error(err: PdfiumError) -> PdfEngineError {
    PdfEngineError::Backend(err.to_string())
}

/// Decoded documents stay loaded per handle until `close`.
pub struct PdfiumEngine {
    pdfium: &'static Pdfium,
    next_handle: u64,
    docs: HashMap<DocumentHandle, PdfDocument<'static>>,
}

impl PdfiumEngine {
    pub fn bind() -> Result<Self, PdfEngineError> {
        Ok(Self { pdfium: library()?, next_handle: 0, docs: HashMap::new() })
    }

    fn document(&self, handle: DocumentHandle) -> Result<&PdfDocument<'static>, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }

    fn page(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PdfPage<'_>, PdfEngineError> {
        let pages = self.document(handle)?.pages();
        let out_of_range = || PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: u32::from(pages.len()),
        };

        let index = u16::try_from(page_index).map_err(|_| out_of_range())?;
        if index >= pages.len() {
            return Err(out_of_range());
        }
        pages.get(index).map_err(backend_error)
    }
}

impl PdfEngine for PdfiumEngine {
    fn open(&mut self, source: DocumentSource) -> Result<DocumentHandle, PdfEngineError> {
        let document =
            self.pdfium.load_pdf_from_byte_vec(source.read_bytes()?, None).map_err(|err| {
                match err {
                    PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                        PdfEngineError::EncryptedUnsupported
                    }
                    other => backend_error(other),
                }
            })?;
        if document.pages().len() == 0 {
            return Err(PdfEngineError::NoPages);
        }

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        debug!(handle = handle.raw(), pages = document.pages().len(), "loaded document in pdfium");
        self.docs.insert(handle, document);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(u32::from(self.document(handle)?.pages().len()))
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let page = self.page(handle, page_index)?;
        Ok(PageSize { width_pt: page.width().value, height_pt: page.height().value })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page = self.page(handle, request.page_index)?;
        let native = PageSize { width_pt: page.width().value, height_pt: page.height().value };
        let (width, height) = request.pixel_size(native);

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);
        let bitmap = page.render_with_config(&config).map_err(backend_error)?;

        Ok(bitmap.as_image().to_rgba8())
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(drop).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}
