//! Published token formats

use std::fmt;

/// One of the four published encodings of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenFormat {
    Jwt,
    Cwt,
    Json,
    Cbor,
}

impl TokenFormat {
    pub const ALL: [TokenFormat; 4] = [
        TokenFormat::Jwt,
        TokenFormat::Cwt,
        TokenFormat::Json,
        TokenFormat::Cbor,
    ];

    pub fn media_type(self) -> &'static str {
        match self {
            TokenFormat::Jwt => "application/statuslist+jwt",
            TokenFormat::Cwt => "application/statuslist+cwt",
            TokenFormat::Json => "application/statuslist+json",
            TokenFormat::Cbor => "application/statuslist+cbor",
        }
    }

    /// Directory name in the token store
    pub fn as_str(self) -> &'static str {
        match self {
            TokenFormat::Jwt => "jwt",
            TokenFormat::Cwt => "cwt",
            TokenFormat::Json => "json",
            TokenFormat::Cbor => "cbor",
        }
    }

    /// Exact (case-insensitive) media type match
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.media_type().eq_ignore_ascii_case(media_type.trim()))
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
