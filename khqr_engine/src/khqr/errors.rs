use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KhqrError {
    #[error("Tag '{0}' is not a two-digit tag")]
    InvalidTag(String),
    #[error("The value for tag {tag} is {length} bytes long. At most 99 bytes can be encoded.")]
    FieldTooLong { tag: String, length: usize },
    #[error("Invalid payload request. {0}")]
    InvalidPayloadRequest(String),
    #[error("Invalid amount. {0}")]
    InvalidAmount(String),
    #[error("Malformed payload. {0}")]
    MalformedPayload(String),
}
