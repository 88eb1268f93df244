//! Signed, time-bounded session tokens.
//!
//! Layout is `base64url(header).base64url(claims).base64url(signature)` with
//! an HMAC-SHA256 signature over the first two segments, so browser clients
//! can read the clinic name from the middle segment without a secret.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::CryptoError;
use crate::models::ClinicIdentity;

type HmacSha256 = Hmac<Sha256>;

/// Session lifetime from issuance.
pub const TOKEN_TTL_HOURS: i64 = 24;
/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Clinic id.
    pub sub: Uuid,
    /// Clinic display name.
    pub clinic: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn identity(&self) -> ClinicIdentity {
        ClinicIdentity {
            clinic_id: self.sub,
            clinic_name: self.clinic.clone(),
        }
    }
}

/// Issues and verifies session tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Zeroizing<Vec<u8>>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Result<Self, CryptoError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(CryptoError::WeakSecret(MIN_SECRET_LENGTH));
        }
        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            ttl: Duration::hours(TOKEN_TTL_HOURS),
        })
    }

    /// Issue a token for `identity`, valid for the session lifetime from `now`.
    pub fn issue(&self, identity: &ClinicIdentity, now: DateTime<Utc>) -> Result<String, CryptoError> {
        let header = Header {
            alg: ALGORITHM.into(),
            typ: "JWT".into(),
        };
        let claims = SessionClaims {
            sub: identity.clinic_id,
            clinic: identity.clinic_name.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let signature = self.mac(&signing_input)?.finalize().into_bytes();
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify signature and expiry. Any defect fails closed.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, CryptoError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(CryptoError::MalformedToken);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| CryptoError::MalformedToken)?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        self.mac(signing_input)?
            .verify_slice(&signature)
            .map_err(|_| CryptoError::BadSignature)?;

        let header: Header = decode_segment(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(CryptoError::MalformedToken);
        }

        let claims: SessionClaims = decode_segment(claims_b64)?;
        if now.timestamp() >= claims.exp {
            return Err(CryptoError::TokenExpired);
        }
        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> Result<HmacSha256, CryptoError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, CryptoError> {
    let json = serde_json::to_vec(value).map_err(|e| CryptoError::Encoding(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, CryptoError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| CryptoError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| CryptoError::MalformedToken)
}
