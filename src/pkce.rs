use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Verifier length in random bytes. 64 bytes encodes to 86 base64url
/// characters, within the 43-128 range RFC 7636 allows.
pub const DEFAULT_VERIFIER_BYTES: usize = 64;

/// PKCE challenge method sent alongside the challenge.
pub const CHALLENGE_METHOD: &str = "S256";

/// Generate a cryptographically random code verifier of `len` bytes,
/// base64url-encoded without padding.
pub fn generate_verifier(len: usize) -> String {
    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&random_bytes)
}

/// Derive the S256 code challenge: SHA-256 of the verifier's UTF-8 bytes,
/// base64url-encoded without padding. Deterministic for a given verifier.
pub fn generate_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Random 128-bit identifier, hex-encoded. Used for session ids and the
/// anti-forgery state value.
pub fn random_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_is_url_safe_and_padded_length() {
        let verifier = generate_verifier(DEFAULT_VERIFIER_BYTES);
        // 64 bytes -> ceil(64 * 4 / 3) = 86 characters without padding
        assert_eq!(verifier.len(), 86);
        assert!(verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn challenge_matches_rfc7636_vector() {
        // Appendix B of RFC 7636
        let challenge = generate_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn challenge_is_deterministic() {
        let verifier = generate_verifier(32);
        assert_eq!(generate_challenge(&verifier), generate_challenge(&verifier));
    }

    #[test]
    fn verifiers_are_unique() {
        assert_ne!(generate_verifier(64), generate_verifier(64));
    }

    #[test]
    fn random_token_is_128_bit_hex() {
        let token = random_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, random_token());
    }
}
