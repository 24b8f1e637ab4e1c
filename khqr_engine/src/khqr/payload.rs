use kpg_common::{Amount, Currency};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    crc16::crc16_hex,
    tlv::{encode_field, encode_group, CRC_TAG},
    KhqrError,
};

pub const PAYLOAD_FORMAT_INDICATOR: &str = "01";
/// Point-of-initiation "12" marks a dynamic (single-use, amount-bearing) code.
pub const POI_DYNAMIC: &str = "12";
pub const MERCHANT_CATEGORY_CODE: &str = "5999";
pub const COUNTRY_CODE: &str = "KH";
pub const MAX_MERCHANT_NAME_LEN: usize = 25;
pub const MAX_MERCHANT_CITY_LEN: usize = 15;

pub mod tags {
    pub const PAYLOAD_FORMAT: &str = "00";
    pub const POINT_OF_INITIATION: &str = "01";
    pub const MERCHANT_ACCOUNT: &str = "29";
    pub const MERCHANT_CATEGORY: &str = "52";
    pub const CURRENCY: &str = "53";
    pub const AMOUNT: &str = "54";
    pub const COUNTRY: &str = "58";
    pub const MERCHANT_NAME: &str = "59";
    pub const MERCHANT_CITY: &str = "60";
    pub const ADDITIONAL_DATA: &str = "62";

    pub const ACCOUNT_PROVIDER_ID: &str = "00";
    pub const ACCOUNT_PAYEE: &str = "01";

    pub const BILL_REFERENCE: &str = "01";
    pub const STORE_LABEL: &str = "02";
    pub const TERMINAL_LABEL: &str = "03";
}

/// Everything needed to encode one merchant-presented payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRequest {
    pub payee_account: String,
    pub payee_display_name: String,
    pub merchant_city: String,
    /// Must already be formatted with exactly two decimal places, e.g. `"12.50"`.
    pub amount: String,
    pub currency: Currency,
    pub store_label: String,
    pub bill_reference: String,
    pub terminal_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KhqrPayload {
    pub payload: String,
    pub correlation_hash: String,
}

/// Encodes payloads for a single provider.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    provider_id: String,
}

impl PayloadBuilder {
    pub fn new<S: Into<String>>(provider_id: S) -> Self {
        Self { provider_id: provider_id.into() }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Builds the payload string and its correlation hash.
    ///
    /// The field order is part of the wire contract because the trailing CRC covers the literal byte sequence. The
    /// same request always produces the same bytes.
    pub fn build(&self, req: &PayloadRequest) -> Result<KhqrPayload, KhqrError> {
        use tags::*;
        require("provider id", &self.provider_id)?;
        require("payee account", &req.payee_account)?;
        require("payee display name", &req.payee_display_name)?;
        require("merchant city", &req.merchant_city)?;
        require("store label", &req.store_label)?;
        require("bill reference", &req.bill_reference)?;
        require("terminal label", &req.terminal_label)?;
        require("amount", &req.amount)?;
        Amount::parse_formatted(&req.amount).map_err(|e| KhqrError::InvalidAmount(e.to_string()))?;

        let mut payload = String::with_capacity(256);
        payload.push_str(&encode_field(PAYLOAD_FORMAT, PAYLOAD_FORMAT_INDICATOR)?);
        payload.push_str(&encode_field(POINT_OF_INITIATION, POI_DYNAMIC)?);
        payload.push_str(&encode_group(MERCHANT_ACCOUNT, &[
            (ACCOUNT_PROVIDER_ID, &self.provider_id),
            (ACCOUNT_PAYEE, &req.payee_account),
        ])?);
        payload.push_str(&encode_field(MERCHANT_CATEGORY, MERCHANT_CATEGORY_CODE)?);
        payload.push_str(&encode_field(CURRENCY, req.currency.iso_numeric())?);
        payload.push_str(&encode_field(AMOUNT, &req.amount)?);
        payload.push_str(&encode_field(COUNTRY, COUNTRY_CODE)?);
        payload.push_str(&encode_field(MERCHANT_NAME, truncate_bytes(&req.payee_display_name, MAX_MERCHANT_NAME_LEN))?);
        payload.push_str(&encode_field(MERCHANT_CITY, truncate_bytes(&req.merchant_city, MAX_MERCHANT_CITY_LEN))?);
        payload.push_str(&encode_group(ADDITIONAL_DATA, &[
            (BILL_REFERENCE, &req.bill_reference),
            (STORE_LABEL, &req.store_label),
            (TERMINAL_LABEL, &req.terminal_label),
        ])?);
        payload.push_str(CRC_TAG);
        payload.push_str("04");
        let crc = crc16_hex(payload.as_bytes());
        payload.push_str(&crc);

        let correlation_hash = correlation_hash(&payload);
        Ok(KhqrPayload { payload, correlation_hash })
    }
}

fn require(name: &str, value: &str) -> Result<(), KhqrError> {
    if value.trim().is_empty() {
        Err(KhqrError::InvalidPayloadRequest(format!("The {name} is required")))
    } else {
        Ok(())
    }
}

/// Truncates `s` to at most `max` bytes without splitting a character.
pub fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Lower-case hex SHA-256 of the payload. Used as the idempotency key across the poll and webhook paths.
pub fn correlation_hash(payload: &str) -> String {
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}
