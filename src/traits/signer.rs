//! Token signer collaborator

use crate::error::SigningError;
use crate::statuslist::StatusListToken;

/// Produces the two signed encodings of a status list token
///
/// One signer per pool. Implementations must be cheap to call from the
/// writer job, which signs every regenerated list once per format.
pub trait TokenSigner: Send + Sync {
    /// Key identifier placed in the JWT/COSE headers, if any
    fn key_id(&self) -> Option<&str>;

    /// Compact JWS serialization (`header.claims.signature`)
    fn sign_jwt(&self, token: &StatusListToken) -> Result<String, SigningError>;

    /// Tagged COSE_Sign1 CWT bytes
    fn sign_cwt(&self, token: &StatusListToken) -> Result<Vec<u8>, SigningError>;
}
