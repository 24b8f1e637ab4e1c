mod api;
mod config;
mod error;

mod data_objects;

pub use api::ProviderApi;
pub use config::ProviderConfig;
pub use data_objects::{CheckTransactionRequest, CheckTransactionResponse, TransactionData, TransactionStatus};
pub use error::ProviderApiError;
