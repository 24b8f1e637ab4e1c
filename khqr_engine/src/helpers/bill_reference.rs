use chrono::Utc;
use rand::Rng;
use thiserror::Error;

pub const MAX_BILL_REFERENCE_LEN: usize = 25;
const BILL_REFERENCE_PREFIX: &str = "TRX";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillReferenceError {
    #[error("The bill reference is empty")]
    Empty,
    #[error("The bill reference is longer than {MAX_BILL_REFERENCE_LEN} characters")]
    TooLong,
    #[error("The bill reference may only contain letters, digits, '-' and '_'")]
    InvalidCharacters,
}

/// Generates a bill reference of the form `TRX<millisecond timestamp><4 random digits>`.
pub fn generate_bill_reference() -> String {
    let suffix = rand::thread_rng().gen_range(0..10_000);
    format!("{BILL_REFERENCE_PREFIX}{}{suffix:04}", Utc::now().timestamp_millis())
}

/// Checks a caller-supplied bill reference before it is embedded in a payload.
pub fn validate_bill_reference(reference: &str) -> Result<(), BillReferenceError> {
    if reference.is_empty() {
        return Err(BillReferenceError::Empty);
    }
    if reference.len() > MAX_BILL_REFERENCE_LEN {
        return Err(BillReferenceError::TooLong);
    }
    if !reference.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(BillReferenceError::InvalidCharacters);
    }
    Ok(())
}
