use std::{
    fs,
    path::{Path, PathBuf},
};

use khqr_engine::traits::{QrRenderer, RenderError};
use log::*;
use qrcode::{render::svg, EcLevel, QrCode};

const MIN_DIMENSION: u32 = 240;

/// Renders payloads as SVG files in a local directory. The returned reference is the path of the file.
#[derive(Debug, Clone)]
pub struct SvgFileRenderer {
    output_dir: PathBuf,
}

impl SvgFileRenderer {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<bill reference>-<first 8 characters of the hash>.svg`
    pub fn file_name(bill_reference: &str, correlation_hash: &str) -> String {
        let prefix = correlation_hash.get(..8).unwrap_or(correlation_hash);
        format!("{bill_reference}-{prefix}.svg")
    }
}

impl QrRenderer for SvgFileRenderer {
    fn render(&self, payload: &str, bill_reference: &str, correlation_hash: &str) -> Result<String, RenderError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
            .map_err(|e| RenderError::EncodingFailed(e.to_string()))?;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();
        fs::create_dir_all(&self.output_dir).map_err(|e| RenderError::StorageFailed(e.to_string()))?;
        let path = self.output_dir.join(Self::file_name(bill_reference, correlation_hash));
        fs::write(&path, image).map_err(|e| RenderError::StorageFailed(format!("{}: {e}", path.display())))?;
        trace!("🖼️ QR code for [{bill_reference}] written to {}", path.display());
        Ok(path.to_string_lossy().into_owned())
    }
}
