//! Minimal AWS Signature Version 4 for unsigned-payload GET requests.
//!
//! Only used for bucket discovery (`ListBuckets`), which the object store
//! client does not expose.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::utils::{hex_encode, sha256_hash};

type HmacSha256 = Hmac<Sha256>;

/// sha256("")
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

/// Headers to attach to a signed request
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: &'static str,
}

fn hmac(key: &[u8], data: &str) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Derive the signing key for a date (`YYYYMMDD`), region and service
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date);
    let k_region = hmac(&k_date, region);
    let k_service = hmac(&k_region, service);
    hmac(&k_service, "aws4_request")
}

/// Sign a `GET {path}` without query string against `host`
pub fn sign_get(
    host: &str,
    path: &str,
    region: &str,
    access_key: &str,
    secret_key: &str,
    now: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let scope = format!("{}/{}/s3/aws4_request", date, region);

    let canonical_request = format!(
        "GET\n{}\n\nhost:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n\n{}\n{}",
        path, host, EMPTY_PAYLOAD_SHA256, amz_date, SIGNED_HEADERS, EMPTY_PAYLOAD_SHA256
    );

    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        sha256_hash(canonical_request.as_bytes())
    );

    let key = signing_key(secret_key, &date, region, "s3");
    let signature = hex_encode(hmac(&key, &string_to_sign));

    SignedHeaders {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            access_key, scope, SIGNED_HEADERS, signature
        ),
        amz_date,
        content_sha256: EMPTY_PAYLOAD_SHA256,
    }
}
