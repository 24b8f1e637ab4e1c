use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTransactionRequest {
    pub hash: String,
}

/// The envelope every verification API response comes in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTransactionResponse {
    pub response_code: i64,
    #[serde(default)]
    pub response_message: String,
    #[serde(default)]
    pub data: Option<TransactionData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub from_account_id: Option<String>,
    #[serde(default)]
    pub to_account_id: Option<String>,
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Confirmed { txn_id: Option<String> },
    NotFound { message: String },
}

impl CheckTransactionResponse {
    /// A zero response code with a data block means the provider has seen the payment.
    pub fn status(&self) -> TransactionStatus {
        match (&self.response_code, &self.data) {
            (0, Some(data)) => {
                let txn_id = data.external_ref.clone().filter(|s| !s.is_empty()).or_else(|| data.hash.clone());
                TransactionStatus::Confirmed { txn_id }
            },
            _ => TransactionStatus::NotFound { message: self.response_message.clone() },
        }
    }
}
