use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One-way PIN verifier: a random salt and the SHA-256 digest of salt ‖ PIN.
///
/// The PIN itself is never stored. Comparison always walks the full digest
/// so a mismatch costs the same regardless of where it diverges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinVerifier {
    salt: String,
    digest: String,
}

impl PinVerifier {
    /// Derives a fresh verifier for a PIN with a random salt.
    pub fn derive(pin: &str) -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = hex::encode(salt);
        let digest = Self::digest_with(&salt, pin);
        Self { salt, digest }
    }

    fn digest_with(salt: &str, pin: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(pin.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Constant-time comparison of the candidate PIN against the stored digest.
    pub fn verify(&self, pin: &str) -> bool {
        let candidate = Self::digest_with(&self.salt, pin);
        if self.digest.len() != candidate.len() {
            return false;
        }
        let mut diff = 0u8;
        for (a, b) in self.digest.bytes().zip(candidate.bytes()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}
