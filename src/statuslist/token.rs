//! Status list token body and its unsigned encodings

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ciborium::Value;
use serde::{Deserialize, Serialize};

use super::bits::{StatusBits, StatusList};
use crate::error::SigningError;

/// JWT `typ` header value
pub const JWT_TYPE: &str = "statuslist+jwt";
/// CWT content type header value
pub const CWT_TYPE: &str = "statuslist+cwt";

/// CWT claim keys
pub const CWT_ISS: i64 = 1;
pub const CWT_SUB: i64 = 2;
pub const CWT_EXP: i64 = 4;
pub const CWT_IAT: i64 = 6;
pub const CWT_TTL: i64 = 65534;
pub const CWT_STATUS_LIST: i64 = 65535;

/// CBOR tag of a CWT
pub const CWT_TAG: u64 = 61;

/// `status_list` claim in its JSON shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusListJson {
    pub bits: u8,
    /// base64url (no padding) of the zlib-compressed bytes
    pub lst: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_uri: Option<String>,
}

impl StatusListJson {
    /// Decompress `lst` back into a status list
    pub fn decode(&self) -> Result<StatusList, SigningError> {
        let bits = StatusBits::from_u8(self.bits)
            .ok_or_else(|| SigningError::Encoding(format!("invalid bits {}", self.bits)))?;
        let compressed = URL_SAFE_NO_PAD
            .decode(&self.lst)
            .map_err(|e| SigningError::Encoding(e.to_string()))?;
        StatusList::decompress(bits, &compressed).map_err(|e| SigningError::Encoding(e.to_string()))
    }
}

/// Everything a signer needs to publish one list snapshot
#[derive(Debug, Clone)]
pub struct StatusListToken {
    /// `sub`: the list uri
    pub list_uri: String,
    pub issuer: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Refresh hint for relying parties
    pub ttl: Duration,
    pub aggregation_uri: Option<String>,
    pub list: StatusList,
}

impl StatusListToken {
    fn compressed(&self) -> Result<Vec<u8>, SigningError> {
        self.list
            .compress()
            .map_err(|e| SigningError::Encoding(format!("compression failed: {e}")))
    }

    /// `status_list` claim for JSON and JWT
    pub fn status_list_json(&self) -> Result<StatusListJson, SigningError> {
        Ok(StatusListJson {
            bits: self.list.bits().as_u8(),
            lst: URL_SAFE_NO_PAD.encode(self.compressed()?),
            aggregation_uri: self.aggregation_uri.clone(),
        })
    }

    /// `status_list` claim for CBOR and CWT
    pub fn status_list_cbor(&self) -> Result<Value, SigningError> {
        let mut entries = vec![
            (
                Value::Text("bits".into()),
                Value::Integer(i64::from(self.list.bits().as_u8()).into()),
            ),
            (Value::Text("lst".into()), Value::Bytes(self.compressed()?)),
        ];
        if let Some(uri) = &self.aggregation_uri {
            entries.push((
                Value::Text("aggregation_uri".into()),
                Value::Text(uri.clone()),
            ));
        }
        Ok(Value::Map(entries))
    }

    /// JWT claims set
    pub fn jwt_claims(&self) -> Result<serde_json::Value, SigningError> {
        Ok(serde_json::json!({
            "sub": self.list_uri,
            "iss": self.issuer,
            "iat": self.issued_at.timestamp(),
            "exp": self.expires_at.timestamp(),
            "ttl": self.ttl.as_secs(),
            "status_list": self.status_list_json()?,
        }))
    }

    /// CWT claims map (integer keys)
    pub fn cwt_claims(&self) -> Result<Value, SigningError> {
        let int = |v: i64| Value::Integer(v.into());
        Ok(Value::Map(vec![
            (int(CWT_ISS), Value::Text(self.issuer.clone())),
            (int(CWT_SUB), Value::Text(self.list_uri.clone())),
            (int(CWT_IAT), int(self.issued_at.timestamp())),
            (int(CWT_EXP), int(self.expires_at.timestamp())),
            (int(CWT_TTL), int(self.ttl.as_secs() as i64)),
            (int(CWT_STATUS_LIST), self.status_list_cbor()?),
        ]))
    }

    /// Unsigned `application/statuslist+json` artifact
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, SigningError> {
        serde_json::to_vec(&self.status_list_json()?)
            .map_err(|e| SigningError::Encoding(e.to_string()))
    }

    /// Unsigned `application/statuslist+cbor` artifact
    pub fn to_cbor_bytes(&self) -> Result<Vec<u8>, SigningError> {
        cbor_bytes(&self.status_list_cbor()?)
    }
}

/// Serialize a CBOR value
pub fn cbor_bytes(value: &Value) -> Result<Vec<u8>, SigningError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out)
        .map_err(|e| SigningError::Encoding(e.to_string()))?;
    Ok(out)
}
