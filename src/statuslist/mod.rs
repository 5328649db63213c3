//! Status list encoding: packed bits, token body and formats

mod bits;
mod format;
mod token;

pub use bits::{StatusBits, StatusList};
pub use format::TokenFormat;
pub use token::{
    cbor_bytes, StatusListJson, StatusListToken, CWT_EXP, CWT_IAT, CWT_ISS, CWT_STATUS_LIST,
    CWT_SUB, CWT_TAG, CWT_TTL, CWT_TYPE, JWT_TYPE,
};
