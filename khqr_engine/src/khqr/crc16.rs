//! CRC-16/CCITT-FALSE, the checksum carried in field 63 of every EMV merchant-presented QR payload.
//!
//! Register starts at `0xFFFF`, polynomial `0x1021`, bits are processed MSB first and there is no final XOR.

use super::tlv::CRC_TAG;

const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;

pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(INITIAL, |crc, &byte| {
        let mut crc = crc ^ ((byte as u16) << 8);
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ POLYNOMIAL } else { crc << 1 };
        }
        crc
    })
}

/// The CRC rendered the way it is appended to a payload: four upper-case, zero-padded hex digits.
pub fn crc16_hex(data: &[u8]) -> String {
    format!("{:04X}", crc16(data))
}

/// Checks the CRC trailer of a complete payload.
///
/// The checksum covers every byte up to and including the `6304` tag/length prefix of the trailer.
pub fn verify_crc(payload: &str) -> bool {
    let prefix = format!("{CRC_TAG}04");
    if payload.len() < prefix.len() + 4 || !payload.is_char_boundary(payload.len() - 4) {
        return false;
    }
    let (body, crc) = payload.split_at(payload.len() - 4);
    body.ends_with(&prefix) && crc16_hex(body.as_bytes()).eq_ignore_ascii_case(crc)
}
