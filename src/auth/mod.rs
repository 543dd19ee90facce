//! Session authentication: keyed token signatures and the signed-token
//! service.

mod signature;
mod token;

pub use signature::{hmac_sha256, verify_signature};
pub use token::{decode_unverified, Claims, TokenService, TOKEN_TYPE_ACCESS};
