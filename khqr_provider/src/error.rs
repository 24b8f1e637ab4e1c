use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the verification API: {0}")]
    RequestError(String),
    #[error("The verification API timed out")]
    Timeout,
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl From<reqwest::Error> for ProviderApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderApiError::Timeout
        } else if e.is_decode() {
            ProviderApiError::JsonError(e.to_string())
        } else {
            ProviderApiError::RequestError(e.to_string())
        }
    }
}
