//! First-page preview generation for uploaded documents.

use crate::{default_engine, DecodeError, PageRasterizer, PdfEngine, RgbaImage};
use base64::{engine::general_purpose::STANDARD, Engine};
use doc_model::{Document, DocumentId, PreviewSettings, TargetBox};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

const PREVIEW_PAGE: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("failed to decode document for preview: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to encode preview: {0}")]
    Encode(#[from] image::ImageError),
}

/// Encoded first-page thumbnail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl PreviewImage {
    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.jpeg))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewGenerator {
    settings: PreviewSettings,
}

impl PreviewGenerator {
    pub fn new(settings: PreviewSettings) -> Self {
        Self { settings }
    }

    /// Render page 1 of `bytes` into the preview box with the default backend.
    pub fn preview(&self, bytes: &[u8]) -> Result<PreviewImage, PreviewError> {
        self.preview_with(default_engine(), bytes)
    }

    pub fn preview_with<E: PdfEngine>(
        &self,
        engine: E,
        bytes: &[u8],
    ) -> Result<PreviewImage, PreviewError> {
        let mut rasterizer = PageRasterizer::new(engine);
        let document = Document::new(DocumentId::new("upload-preview"), bytes.to_vec());
        let target = TargetBox::new(self.settings.width as f32, self.settings.height as f32);

        let surface = rasterizer.render(&document, PREVIEW_PAGE, target)?;
        let jpeg = encode_jpeg(&surface.image, self.settings.jpeg_quality)?;
        rasterizer.close(&document.id);

        debug!(
            width = surface.width(),
            height = surface.height(),
            bytes = jpeg.len(),
            "generated preview"
        );

        Ok(PreviewImage { width: surface.width(), height: surface.height(), jpeg })
    }
}

/// JPEG has no alpha channel, so the surface is flattened to RGB first.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode_image(&rgb)?;

    Ok(bytes)
}
