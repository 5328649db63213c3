//! Ed25519 signer for JWT and CWT status list tokens

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::Value;
use coset::{iana, AsCborValue, CoseSign1Builder, HeaderBuilder};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

use crate::config::SignerConfig;
use crate::error::SigningError;
use crate::statuslist::{cbor_bytes, StatusListToken, CWT_TAG, CWT_TYPE, JWT_TYPE};
use crate::traits::TokenSigner;

/// COSE `typ` header label
const COSE_TYP_LABEL: i64 = 16;
/// CBOR tag of COSE_Sign1
const COSE_SIGN1_TAG: u64 = 18;

/// Ed25519 key wrapper producing both signed encodings
#[derive(Clone)]
pub struct Ed25519TokenSigner {
    signing_key: SigningKey,
    key_id: Option<String>,
}

impl Ed25519TokenSigner {
    /// Create a signer from an Ed25519 signing key
    #[must_use]
    pub fn new(signing_key: SigningKey, key_id: Option<String>) -> Self {
        Self {
            signing_key,
            key_id,
        }
    }

    /// Create signer from raw 32-byte seed
    #[must_use]
    pub fn from_seed(seed: &[u8; 32], key_id: Option<String>) -> Self {
        Self::new(SigningKey::from_bytes(seed), key_id)
    }

    /// Create signer from a file containing a 32-byte seed, raw or hex
    ///
    /// # Errors
    /// Returns error if the file cannot be read or the seed is malformed
    pub fn from_file(path: &Path, key_id: Option<String>) -> Result<Self, SigningError> {
        let bytes = std::fs::read(path)
            .map_err(|e| SigningError::Key(format!("cannot read {}: {e}", path.display())))?;

        if bytes.len() == 32 {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes);
            return Ok(Self::from_seed(&seed, key_id));
        }

        let text = String::from_utf8(bytes).map_err(|_| {
            SigningError::Key(format!("{} is neither a raw nor a hex seed", path.display()))
        })?;
        Self::from_hex(text.trim(), key_id)
    }

    /// Create signer from a 64-character hex seed
    pub fn from_hex(seed_hex: &str, key_id: Option<String>) -> Result<Self, SigningError> {
        let bytes = hex::decode(seed_hex).map_err(|e| SigningError::Key(e.to_string()))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            SigningError::Key(format!("signing key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(&seed, key_id))
    }

    /// Build the signer a pool's configuration describes
    ///
    /// Without key material a fresh key is generated; its tokens do not
    /// survive a restart.
    pub fn from_config(pool_id: &str, config: &SignerConfig) -> Result<Self, SigningError> {
        let key_id = config.key_id.clone();
        match (&config.key_file, &config.seed_hex) {
            (Some(path), _) => Self::from_file(path, key_id),
            (None, Some(seed_hex)) => Self::from_hex(seed_hex, key_id),
            (None, None) => {
                tracing::warn!(pool_id, "No signing key configured, using an ephemeral key");
                Ok(Self::new(
                    SigningKey::generate(&mut rand::rngs::OsRng),
                    key_id,
                ))
            }
        }
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    fn jwt_header(&self) -> serde_json::Value {
        let mut header = serde_json::json!({ "alg": "EdDSA", "typ": JWT_TYPE });
        if let Some(kid) = &self.key_id {
            header["kid"] = serde_json::Value::String(kid.clone());
        }
        header
    }
}

impl TokenSigner for Ed25519TokenSigner {
    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn sign_jwt(&self, token: &StatusListToken) -> Result<String, SigningError> {
        let header = serde_json::to_vec(&self.jwt_header())
            .map_err(|e| SigningError::Encoding(e.to_string()))?;
        let claims = serde_json::to_vec(&token.jwt_claims()?)
            .map_err(|e| SigningError::Encoding(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let signature = self.signing_key.sign(signing_input.as_bytes());

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    fn sign_cwt(&self, token: &StatusListToken) -> Result<Vec<u8>, SigningError> {
        let mut protected = HeaderBuilder::new()
            .algorithm(iana::Algorithm::EdDSA)
            .value(COSE_TYP_LABEL, Value::Text(CWT_TYPE.to_string()));
        if let Some(kid) = &self.key_id {
            protected = protected.key_id(kid.as_bytes().to_vec());
        }

        let payload = cbor_bytes(&token.cwt_claims()?)?;
        let sign1 = CoseSign1Builder::new()
            .protected(protected.build())
            .payload(payload)
            .create_signature(&[], |data| self.signing_key.sign(data).to_bytes().to_vec())
            .build();

        let sign1 = sign1
            .to_cbor_value()
            .map_err(|e| SigningError::Encoding(format!("COSE_Sign1: {e:?}")))?;
        cbor_bytes(&Value::Tag(
            CWT_TAG,
            Box::new(Value::Tag(COSE_SIGN1_TAG, Box::new(sign1))),
        ))
    }
}

impl std::fmt::Debug for Ed25519TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519TokenSigner")
            .field("key_id", &self.key_id)
            .field("public_key", &hex::encode(self.verifying_key().to_bytes()))
            .finish_non_exhaustive()
    }
}
