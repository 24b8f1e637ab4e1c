use std::{net::IpAddr, str::FromStr, sync::OnceLock};

use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use log::{debug, trace};
use regex::Regex;
use sha2::Sha256;
use thiserror::Error;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // The left-most entry is the original client
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req.headers().get("Forwarded").and_then(|v| v.to_str().ok()).and_then(parse_forwarded_for);
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr().map(|a| a.ip());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr
    })
}

fn parse_forwarded_for(header: &str) -> Option<IpAddr> {
    static FOR_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = FOR_RE.get_or_init(|| Regex::new(r#"for="?(?P<ip>[^;,"]+)"?"#).ok()).as_ref()?;
    let ip = re.captures(header)?.name("ip")?.as_str();
    IpAddr::from_str(ip).ok()
}

/// Base64-encoded HMAC-SHA256 of `data` under `secret`. This is what providers send in the webhook signature header.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length, so this arm is unreachable in practice
        Err(_) => return String::default(),
    };
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No signing key is configured.")]
    NoSigningKey,
    #[error("No HMAC signature found.")]
    MissingSignature,
    #[error("The HMAC signature is not valid base64.")]
    MalformedSignature,
    #[error("Invalid HMAC signature.")]
    InvalidSignature,
}

/// Checks a base64-encoded HMAC-SHA256 `signature` of `data`. The comparison runs in constant time.
pub fn verify_hmac(secret: &str, data: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NoSigningKey);
    }
    let signature = signature.map(str::trim).filter(|s| !s.is_empty()).ok_or(SignatureError::MissingSignature)?;
    let expected = base64::decode(signature).map_err(|_| SignatureError::MalformedSignature)?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::NoSigningKey)?;
    mac.update(data);
    mac.verify_slice(&expected).map_err(|_| SignatureError::InvalidSignature)
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn hmac_is_base64_sha256() {
        // echo -n 'hello' | openssl dgst -sha256 -hmac 'key' -binary | base64
        assert_eq!(calculate_hmac("key", b"hello"), "kwezuRXvtRcf8U2MtV+8x5jGwO8UVtZt7RpqpyOli3s=");
        assert_ne!(calculate_hmac("key", b"hello"), calculate_hmac("other", b"hello"));
    }

    #[test]
    fn hmac_verification() {
        let body = br#"{"bill_reference": "TRX1", "status": "SUCCESS"}"#;
        let signature = calculate_hmac("key", body);
        assert_eq!(verify_hmac("key", body, Some(&signature)), Ok(()));
        assert_eq!(verify_hmac("key", body, Some(&format!(" {signature} "))), Ok(()));
        assert_eq!(verify_hmac("other", body, Some(&signature)), Err(SignatureError::InvalidSignature));
        assert_eq!(verify_hmac("key", b"tampered", Some(&signature)), Err(SignatureError::InvalidSignature));
        assert_eq!(verify_hmac("key", body, None), Err(SignatureError::MissingSignature));
        assert_eq!(verify_hmac("key", body, Some("")), Err(SignatureError::MissingSignature));
        assert_eq!(verify_hmac("key", body, Some("not base64!")), Err(SignatureError::MalformedSignature));
        assert_eq!(verify_hmac("", body, Some(&calculate_hmac("", body))), Err(SignatureError::NoSigningKey));
        // A truncated signature must not verify
        assert_eq!(verify_hmac("key", body, Some(&signature[..12])), Err(SignatureError::InvalidSignature));
    }

    #[test]
    fn remote_ip_sources() {
        let req = TestRequest::default()
            .peer_addr("10.0.0.9:1234".parse().unwrap())
            .insert_header(("X-Forwarded-For", "1.2.3.4, 10.0.0.1"))
            .insert_header(("Forwarded", "for=5.6.7.8;proto=https"))
            .to_http_request();
        assert_eq!(get_remote_ip(&req, false, false), Some("10.0.0.9".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, true, false), Some("1.2.3.4".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, true), Some("5.6.7.8".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, true, true), Some("1.2.3.4".parse().unwrap()));
    }
}
