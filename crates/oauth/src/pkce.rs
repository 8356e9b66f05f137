use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    sha2::{Digest, Sha256},
};

use crate::types::PkceChallenge;

/// S256 PKCE pair: a 32-byte random verifier and its SHA-256 challenge,
/// both base64url without padding.
pub fn generate_pkce() -> PkceChallenge {
    let bytes: [u8; 32] = rand::random();
    let verifier = URL_SAFE_NO_PAD.encode(bytes);
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
    PkceChallenge {
        verifier,
        challenge,
    }
}

/// Opaque CSRF `state` value for the authorization request.
pub fn generate_state() -> String {
    let bytes: [u8; 16] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}
