//! Merchant-presented QR payloads.
//!
//! The payload is a flat sequence of tag-length-value fields ([`tlv`]), assembled in a fixed order ([`payload`]) and
//! closed by a CRC-16/CCITT-FALSE checksum ([`crc16`]).
pub mod crc16;
mod errors;
pub mod payload;
pub mod tlv;

pub use crc16::{crc16, crc16_hex, verify_crc};
pub use errors::KhqrError;
pub use payload::{correlation_hash, truncate_bytes, KhqrPayload, PayloadBuilder, PayloadRequest};
pub use tlv::{decode_fields, encode_field, encode_group, find_field, TlvField};
