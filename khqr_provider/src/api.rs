use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::ProviderConfig,
    data_objects::{CheckTransactionRequest, CheckTransactionResponse, TransactionStatus},
    ProviderApiError,
};

/// Client for the payment provider's transaction verification API.
#[derive(Clone)]
pub struct ProviderApi {
    config: ProviderConfig,
    client: Arc<Client>,
}

impl ProviderApi {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.token.reveal());
        let mut val = HeaderValue::from_str(&bearer).map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: String, body: &B) -> Result<T, ProviderApiError> {
        trace!("📡️ Sending request: {url}");
        let response = self.client.post(url).json(body).send().await?;
        if response.status().is_success() {
            trace!("📡️ Request successful. {}", response.status());
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(ProviderApiError::QueryError { status, message })
        }
    }

    /// Asks the provider whether a transaction with the given payload hash has settled.
    pub async fn check_transaction(&self, hash: &str) -> Result<TransactionStatus, ProviderApiError> {
        let body = CheckTransactionRequest { hash: hash.to_string() };
        let response = self.post::<CheckTransactionResponse, _>(self.config.check_url(), &body).await?;
        let status = response.status();
        match &status {
            TransactionStatus::Confirmed { txn_id } => {
                debug!("📡️ Provider confirmed transaction {hash}. Transaction id: {txn_id:?}")
            },
            TransactionStatus::NotFound { message } => {
                trace!("📡️ Provider has no transaction for {hash} ({}: {message})", response.response_code)
            },
        }
        Ok(status)
    }
}
