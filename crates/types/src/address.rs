use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a RankFi account string.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("account must start with 'r' or '@'")]
    InvalidPrefix,
    #[error("account must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("account payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("account payload must be exactly 32 bytes")]
    InvalidPayloadLength,
    #[error("account label must not be empty")]
    EmptyLabel,
}

/// Number of raw bytes contained in an account identifier.
pub const ADDRESS_BYTES: usize = 32;
/// Expected string length of an encoded account (prefix + 64 hex chars).
pub const ADDRESS_STRING_LENGTH: usize = 1 + ADDRESS_BYTES * 2;

/// Domain separator for label-derived accounts.
const LABEL_DOMAIN: &[u8] = b"RANKFI_ACCOUNT";

/// Encode a 32-byte account identifier into the human readable RankFi format.
///
/// The encoded account always begins with the character `r` followed by the
/// hexadecimal representation of the raw bytes.
pub fn encode_address(bytes: &[u8; ADDRESS_BYTES]) -> String {
    let mut encoded = String::with_capacity(ADDRESS_STRING_LENGTH);
    encoded.push('r');
    encoded.push_str(&hex::encode(bytes));
    encoded
}

/// Attempt to decode a human readable RankFi account string into the raw bytes.
pub fn decode_address(address: &str) -> Result<[u8; ADDRESS_BYTES], AddressError> {
    if !address.starts_with('r') {
        return Err(AddressError::InvalidPrefix);
    }

    if address.len() != ADDRESS_STRING_LENGTH {
        return Err(AddressError::InvalidLength {
            expected: ADDRESS_STRING_LENGTH,
            actual: address.len(),
        });
    }

    let payload = &address[1..];
    let decoded = hex::decode(payload)?;

    let bytes: [u8; ADDRESS_BYTES] = decoded
        .try_into()
        .map_err(|_| AddressError::InvalidPayloadLength)?;

    Ok(bytes)
}

/// Ledger account identifier.
///
/// Serialised as its `r`-prefixed hex form. When parsing, `@label` is also
/// accepted and mapped to `BLAKE3("RANKFI_ACCOUNT" || label)`, which lets
/// configuration files and operators name accounts without spelling out hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(pub [u8; ADDRESS_BYTES]);

impl AccountId {
    /// The null / void identifier. Never holds a balance.
    pub const NULL: AccountId = AccountId([0u8; ADDRESS_BYTES]);

    /// Derive an account from a human-chosen label.
    pub fn from_label(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(LABEL_DOMAIN);
        hasher.update(label.as_bytes());
        AccountId(*hasher.finalize().as_bytes())
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; ADDRESS_BYTES]
    }
}

/// Derive the protocol-owned holding account of a component.
/// `id = BLAKE3("RANKFI_MODULE" || name)`
///
/// No key backs these accounts; value only leaves them through the owning
/// component's own operations.
pub fn module_account_id(name: &str) -> AccountId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"RANKFI_MODULE");
    hasher.update(name.as_bytes());
    AccountId(*hasher.finalize().as_bytes())
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_address(&self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        write!(f, "r{}…", hex::encode(&self.0[..4]))
    }
}

impl FromStr for AccountId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(label) = s.strip_prefix('@') {
            if label.is_empty() {
                return Err(AddressError::EmptyLabel);
            }
            return Ok(AccountId::from_label(label));
        }
        decode_address(s).map(AccountId)
    }
}

impl From<[u8; ADDRESS_BYTES]> for AccountId {
    fn from(value: [u8; ADDRESS_BYTES]) -> Self {
        AccountId(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        encode_address(&value.0)
    }
}

impl TryFrom<String> for AccountId {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
