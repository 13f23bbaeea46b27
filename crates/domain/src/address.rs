use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Version byte prefixed to every TRON mainnet account address.
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;
const ADDRESS_BODY_LEN: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressFormatError {
    #[error("address is empty")]
    Empty,
    #[error("address contains non-hex characters")]
    NonHex,
    #[error("address must decode to {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("address must start with 0x41, got {0:#04x}")]
    WrongPrefix(u8),
    #[error("invalid base58check address: {0}")]
    InvalidBase58(String),
}

/// Canonical (base58check, `T...`) TRON address.
///
/// Ledger events carry destinations in raw hex, while the monitored address
/// table stores the canonical form, so every comparison goes through this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TronAddress(String);

impl TronAddress {
    /// Accepts either the canonical base58check form or a raw hex encoding.
    pub fn parse(raw: &str) -> Result<Self, AddressFormatError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AddressFormatError::Empty);
        }
        if raw.starts_with('T') {
            Self::from_base58(raw)
        } else {
            Self::from_hex(raw)
        }
    }

    /// Converts the hex forms emitted by TronGrid: `0x` + 20 bytes (EVM style),
    /// 20 bare bytes, or `41` + 20 bytes.
    pub fn from_hex(raw: &str) -> Result<Self, AddressFormatError> {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if body.is_empty() {
            return Err(AddressFormatError::Empty);
        }
        if !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressFormatError::NonHex);
        }

        let decoded = hex::decode(body).map_err(|_| AddressFormatError::NonHex)?;
        let bytes = match decoded.len() {
            ADDRESS_BODY_LEN => {
                let mut prefixed = Vec::with_capacity(ADDRESS_BODY_LEN + 1);
                prefixed.push(TRON_ADDRESS_PREFIX);
                prefixed.extend_from_slice(&decoded);
                prefixed
            }
            len if len == ADDRESS_BODY_LEN + 1 => decoded,
            actual => {
                return Err(AddressFormatError::WrongLength {
                    expected: ADDRESS_BODY_LEN + 1,
                    actual,
                })
            }
        };
        Self::from_bytes(&bytes)
    }

    pub fn from_base58(raw: &str) -> Result<Self, AddressFormatError> {
        let bytes = bs58::decode(raw.trim())
            .with_check(None)
            .into_vec()
            .map_err(|err| AddressFormatError::InvalidBase58(err.to_string()))?;
        Self::from_bytes(&bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, AddressFormatError> {
        if bytes.len() != ADDRESS_BODY_LEN + 1 {
            return Err(AddressFormatError::WrongLength {
                expected: ADDRESS_BODY_LEN + 1,
                actual: bytes.len(),
            });
        }
        if bytes[0] != TRON_ADDRESS_PREFIX {
            return Err(AddressFormatError::WrongPrefix(bytes[0]));
        }
        Ok(Self(bs58::encode(bytes).with_check().into_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Hex form with the `41` prefix, as used by the node HTTP APIs.
    pub fn to_hex(&self) -> String {
        bs58::decode(&self.0)
            .with_check(None)
            .into_vec()
            .map(hex::encode)
            .unwrap_or_default()
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TronAddress {
    type Err = AddressFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDT_BASE58: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
    const USDT_HEX: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

    #[test]
    fn converts_prefixed_hex_to_base58() {
        let address = TronAddress::from_hex(USDT_HEX).expect("valid hex");
        assert_eq!(address.as_str(), USDT_BASE58);
        assert_eq!(address.to_hex(), USDT_HEX);
    }

    #[test]
    fn evm_style_hex_gets_tron_prefix() {
        let address =
            TronAddress::from_hex("0xa614f803b6fd780986a42c78ec9c7f77e6ded13c").expect("valid hex");
        assert_eq!(address.as_str(), USDT_BASE58);

        let upper = TronAddress::parse("0xA614F803B6FD780986A42C78EC9C7F77E6DED13C")
            .expect("case-insensitive hex");
        assert_eq!(upper, address);
    }

    #[test]
    fn parses_canonical_form_round_trip() {
        let address: TronAddress = USDT_BASE58.parse().expect("valid base58");
        assert_eq!(address.to_string(), USDT_BASE58);
    }

    #[test]
    fn rejects_malformed_inputs() {
        assert_eq!(TronAddress::parse("  "), Err(AddressFormatError::Empty));
        assert_eq!(TronAddress::from_hex("0x"), Err(AddressFormatError::Empty));
        assert_eq!(
            TronAddress::from_hex("0xzz14f803b6fd780986a42c78ec9c7f77e6ded13c"),
            Err(AddressFormatError::NonHex)
        );
        assert!(matches!(
            TronAddress::from_hex("0xa614f803"),
            Err(AddressFormatError::WrongLength { actual: 4, .. })
        ));
        assert_eq!(
            TronAddress::from_hex("42a614f803b6fd780986a42c78ec9c7f77e6ded13c"),
            Err(AddressFormatError::WrongPrefix(0x42))
        );
        assert!(matches!(
            TronAddress::parse("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6u"),
            Err(AddressFormatError::InvalidBase58(_))
        ));
    }
}
