// Request signing for authorder
// AWS Signature Version 4 for query-protocol POST requests
//
// Signatures are time-scoped, so the prober signs each request immediately
// before sending it and never caches a signed request.

use crate::error::{ProbeError, Result};
use crate::models::Credentials;
use crate::parameters::FORM_CONTENT_TYPE;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// A request ready to be signed: endpoint plus form-encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedRequest {
    pub url: String,
    pub body: String,
}

/// A signed request; headers must be sent exactly as listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl SignedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Who is signing, for which service and region.
#[derive(Debug, Clone)]
pub struct SigningContext<'a> {
    pub service: &'a str,
    pub region: &'a str,
    pub credentials: &'a Credentials,
}

pub trait Signer: Send + Sync {
    fn sign(&self, request: UnsignedRequest, ctx: &SigningContext<'_>) -> Result<SignedRequest>;
}

/// SigV4 signer using the current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigV4Signer;

impl Signer for SigV4Signer {
    fn sign(&self, request: UnsignedRequest, ctx: &SigningContext<'_>) -> Result<SignedRequest> {
        sign_at(request, ctx, Utc::now())
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| ProbeError::Signing(format!("invalid HMAC key: {}", err)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the per-day, per-region, per-service signing key.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

/// Host header value: port only when it is not the scheme default.
fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| ProbeError::Signing(format!("endpoint `{}` has no host", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in &pairs {
        serializer.append_pair(k, v);
    }
    // SigV4 wants %20, not '+', for spaces
    serializer.finish().replace('+', "%20")
}

/// Sign with an explicit timestamp.
pub fn sign_at(
    request: UnsignedRequest,
    ctx: &SigningContext<'_>,
    now: DateTime<Utc>,
) -> Result<SignedRequest> {
    let url = Url::parse(&request.url)
        .map_err(|err| ProbeError::Signing(format!("invalid endpoint `{}`: {}", request.url, err)))?;

    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let payload_hash = sha256_hex(request.body.as_bytes());

    let mut headers: Vec<(String, String)> = vec![
        ("content-type".to_string(), FORM_CONTENT_TYPE.to_string()),
        ("host".to_string(), host_header(&url)?),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(token) = &ctx.credentials.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort();

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let path = if url.path().is_empty() { "/" } else { url.path() };
    let canonical_request = format!(
        "POST\n{}\n{}\n{}\n{}\n{}",
        path,
        canonical_query(&url),
        canonical_headers,
        signed_headers,
        payload_hash
    );

    let scope = format!("{}/{}/{}/aws4_request", date, ctx.region, ctx.service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(&ctx.credentials.secret_access_key, &date, ctx.region, ctx.service)?;
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    headers.push((
        "authorization".to_string(),
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, ctx.credentials.access_key_id, scope, signed_headers, signature
        ),
    ));

    Ok(SignedRequest {
        url: request.url,
        headers,
        body: request.body,
    })
}
