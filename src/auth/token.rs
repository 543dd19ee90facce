//! Compact, self-describing, time-bound bearer tokens.
//!
//! A token is three dot-separated base64url segments: an encoded header, an
//! encoded claims payload, and a keyed hash of `header.payload` under the
//! server secret. No external signing library is involved.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{auth::signature, models::UserId, Error};

/// The token type carried in session token claims.
pub const TOKEN_TYPE_ACCESS: &str = "access";

/// The fields carried inside a signed token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The id of the user the token was issued to.
    pub sub: UserId,
    /// The email of the user the token was issued to.
    pub email: String,
    /// What kind of token this is, e.g. [TOKEN_TYPE_ACCESS].
    pub token_type: String,
    /// When the token was issued, as epoch seconds.
    pub iat: i64,
    /// When the token expires, as epoch seconds.
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

impl Header {
    fn new() -> Self {
        Self {
            alg: "HS256".to_owned(),
            typ: "PLT".to_owned(),
        }
    }
}

/// Issues and verifies signed session tokens with a server-held secret.
///
/// The secret never appears in any serialized token segment.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    // Keep the secret out of debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service signing with `secret` and issuing tokens valid
    /// for `lifetime`.
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            lifetime,
        }
    }

    /// Issue a signed token for `user_id`/`email`, valid from now for the
    /// configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Internal] if the claims cannot be serialized,
    /// which indicates a bug rather than bad input.
    pub fn issue(&self, user_id: UserId, email: &str) -> Result<String, Error> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            email: email.to_owned(),
            token_type: TOKEN_TYPE_ACCESS.to_owned(),
            iat: now.unix_timestamp(),
            exp: (now + self.lifetime).unix_timestamp(),
        };

        self.issue_claims(&claims)
    }

    fn issue_claims(&self, claims: &Claims) -> Result<String, Error> {
        let header_json = serde_json::to_vec(&Header::new())
            .map_err(|error| Error::Internal(error.to_string()))?;
        let payload_json =
            serde_json::to_vec(claims).map_err(|error| Error::Internal(error.to_string()))?;

        let header = URL_SAFE_NO_PAD.encode(header_json);
        let payload = URL_SAFE_NO_PAD.encode(payload_json);
        let message = format!("{header}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(signature::hmac_sha256(
            &self.secret,
            message.as_bytes(),
        ));

        Ok(format!("{message}.{signature}"))
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    ///
    /// - [Error::TokenInvalidFormat] if the token does not have exactly
    ///   three segments or a segment cannot be decoded.
    /// - [Error::TokenInvalidSignature] if the signature does not match the
    ///   first two segments under the server secret.
    /// - [Error::TokenExpired] if the expiry time has passed.
    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let (message, payload, signature) = split_token(token)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::TokenInvalidFormat)?;

        if !signature::verify_signature(&self.secret, message.as_bytes(), &signature) {
            return Err(Error::TokenInvalidSignature);
        }

        let claims = decode_claims(payload)?;

        if claims.exp < OffsetDateTime::now_utc().unix_timestamp() {
            return Err(Error::TokenExpired);
        }

        Ok(claims)
    }

    /// Verify `token`, then issue a fresh token carrying the same subject,
    /// email, and type.
    ///
    /// # Errors
    ///
    /// Fails exactly as [TokenService::verify] does; in particular an
    /// already-expired token cannot be refreshed.
    pub fn refresh(&self, token: &str) -> Result<String, Error> {
        let old_claims = self.verify(token)?;
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: old_claims.sub,
            email: old_claims.email,
            token_type: old_claims.token_type,
            iat: now.unix_timestamp(),
            exp: (now + self.lifetime).unix_timestamp(),
        };

        self.issue_claims(&claims)
    }
}

/// Decode a token's claims without checking the signature or expiry.
///
/// For non-trust-boundary inspection only, e.g. logging. Never use this on
/// the authentication path; use [TokenService::verify] there.
///
/// # Errors
///
/// Returns an [Error::TokenInvalidFormat] if the token does not have three
/// decodable segments.
pub fn decode_unverified(token: &str) -> Result<Claims, Error> {
    let (_, payload, _) = split_token(token)?;

    decode_claims(payload)
}

/// Split a token into its signing input (`header.payload`), payload segment,
/// and signature segment.
fn split_token(token: &str) -> Result<(&str, &str, &str), Error> {
    let mut segments = token.split('.');

    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(header), Some(payload), Some(sig), None)
            if !header.is_empty() && !payload.is_empty() && !sig.is_empty() =>
        {
            let message = &token[..header.len() + 1 + payload.len()];
            Ok((message, payload, sig))
        }
        _ => Err(Error::TokenInvalidFormat),
    }
}

fn decode_claims(payload: &str) -> Result<Claims, Error> {
    let payload_json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| Error::TokenInvalidFormat)?;

    serde_json::from_slice(&payload_json).map_err(|_| Error::TokenInvalidFormat)
}
