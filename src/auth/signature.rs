//! A keyed hash (HMAC-SHA256, RFC 2104) built directly on the SHA-256
//! digest, with constant-time verification.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// The SHA-256 block size in bytes.
const BLOCK_SIZE: usize = 64;

/// Compute the HMAC-SHA256 of `message` under `key`.
///
/// Keys longer than the block size are hashed first, shorter keys are
/// zero-padded, per RFC 2104.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut key_block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        key_block[..32].copy_from_slice(&Sha256::digest(key));
    } else {
        key_block[..key.len()].copy_from_slice(key);
    }

    let mut inner = Sha256::new();
    inner.update(key_block.map(|byte| byte ^ 0x36));
    inner.update(message);
    let inner_hash = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(key_block.map(|byte| byte ^ 0x5c));
    outer.update(inner_hash);

    outer.finalize().into()
}

/// Check `signature` against the expected HMAC of `message` under `key`.
///
/// The comparison is constant-time over the full digest; there is no
/// early-exit byte compare that could leak timing.
pub fn verify_signature(key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let expected = hmac_sha256(key, message);

    expected.as_slice().ct_eq(signature).into()
}

#[cfg(test)]
mod tests {
    use super::{hmac_sha256, verify_signature};

    fn to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    // Test case 2 from RFC 4231.
    #[test]
    fn matches_rfc_4231_test_vector() {
        let got = hmac_sha256(b"Jefe", b"what do ya want for nothing?");

        assert_eq!(
            to_hex(&got),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    // Test case 6 from RFC 4231 exercises the hashed-key path.
    #[test]
    fn hashes_keys_longer_than_the_block_size() {
        let key = [0xaa_u8; 131];

        let got = hmac_sha256(&key, b"Test Using Larger Than Block-Size Key - Hash Key First");

        assert_eq!(
            to_hex(&got),
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
    }

    #[test]
    fn verify_accepts_correct_signature() {
        let signature = hmac_sha256(b"secret", b"header.payload");

        assert!(verify_signature(b"secret", b"header.payload", &signature));
    }

    #[test]
    fn verify_rejects_wrong_key_message_or_length() {
        let signature = hmac_sha256(b"secret", b"header.payload");

        assert!(!verify_signature(b"other", b"header.payload", &signature));
        assert!(!verify_signature(b"secret", b"header.tampered", &signature));
        assert!(!verify_signature(b"secret", b"header.payload", &signature[..31]));
    }
}
