use thiserror::Error;

/// Turns a payload into a scannable image somewhere the storefront can serve it from.
pub trait QrRenderer {
    /// Renders `payload` and returns a reference (path or URL) to the result.
    fn render(&self, payload: &str, bill_reference: &str, correlation_hash: &str) -> Result<String, RenderError>;
}

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Could not encode the payload as a QR code: {0}")]
    EncodingFailed(String),
    #[error("Could not store the rendered code: {0}")]
    StorageFailed(String),
}
