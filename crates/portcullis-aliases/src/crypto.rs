//! Per-cluster sealing with AES-256-GCM under an argon2-derived key.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use base64::{Engine as _, engine::general_purpose};
use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{AliasError, AliasResult};

/// Salt length for key derivation.
pub const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// A value sealed under a cluster key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    /// Base64 nonce, unique per sealed value.
    pub nonce: String,
    /// Base64 ciphertext with the GCM tag appended.
    pub ciphertext: String,
}

/// Symmetric key for one cluster.
pub struct ClusterKey {
    cluster: String,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for ClusterKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ClusterKey")
            .field("cluster", &self.cluster)
            .finish_non_exhaustive()
    }
}

impl ClusterKey {
    /// Derive the key for `cluster` from the master secret and the cluster salt.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::KeyDerivation`] if argon2 rejects its inputs.
    pub fn derive(cluster: &str, master: &[u8], salt: &[u8]) -> AliasResult<Self> {
        let mut key = Zeroizing::new([0_u8; KEY_LEN]);
        Argon2::default()
            .hash_password_into(master, salt, key.as_mut())
            .map_err(|detail| AliasError::KeyDerivation { detail })?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|_| AliasError::crypto("derive", cluster))?;
        Ok(Self {
            cluster: cluster.to_string(),
            cipher,
        })
    }

    /// Seal `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::Crypto`] if encryption fails.
    pub fn seal(&self, plaintext: &[u8]) -> AliasResult<SealedValue> {
        let mut nonce = [0_u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| AliasError::crypto("seal", &self.cluster))?;
        Ok(SealedValue {
            nonce: general_purpose::STANDARD.encode(nonce),
            ciphertext: general_purpose::STANDARD.encode(ciphertext),
        })
    }

    /// Open a sealed value.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::CorruptRecord`] for undecodable fields and
    /// [`AliasError::Crypto`] when authentication fails.
    pub fn open(&self, sealed: &SealedValue) -> AliasResult<Zeroizing<Vec<u8>>> {
        let nonce = general_purpose::STANDARD
            .decode(&sealed.nonce)
            .map_err(|_| AliasError::corrupt(&self.cluster, "nonce"))?;
        if nonce.len() != NONCE_LEN {
            return Err(AliasError::corrupt(&self.cluster, "nonce"));
        }
        let ciphertext = general_purpose::STANDARD
            .decode(&sealed.ciphertext)
            .map_err(|_| AliasError::corrupt(&self.cluster, "ciphertext"))?;
        self.cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| AliasError::crypto("open", &self.cluster))
    }
}

/// Fresh random salt for a new cluster.
#[must_use]
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0_u8; SALT_LEN];
    rand::rng().fill(&mut salt);
    salt
}
