//! Single-line export strings for moving a save between devices.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use geocache_core::{CellCoord, CellKeyError, GameSnapshot, LatLng, TokenValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::override_records;

const TRANSFER_DOMAIN: &str = "geocache";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded payload.
pub const TRANSFER_HEADER: &str = "geocache:v1";
/// Delimiter separating the prefix segments from the payload.
const FIELD_DELIMITER: char = ':';

#[derive(Debug, Serialize, Deserialize)]
struct TransferPayload {
    inventory: Option<u64>,
    position: LatLng,
    overrides: Vec<(String, Option<u64>)>,
}

/// Errors raised while producing or reading transfer strings.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("transfer string was empty")]
    EmptyPayload,
    /// The string ended before all segments were present.
    #[error("transfer string is missing the {0}")]
    MissingSegment(&'static str),
    /// The string used an unexpected prefix segment.
    #[error("transfer prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The string used an unsupported version identifier.
    #[error("transfer version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode transfer payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The payload could not be serialised or parsed.
    #[error("could not process transfer payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    /// The payload named a cell that is not of the form `i,j`.
    #[error(transparent)]
    InvalidCell(#[from] CellKeyError),
    /// The payload carried a zero token value.
    #[error("transfer payload contains a token of value zero")]
    ZeroToken,
    /// The payload carried a position that is not a finite coordinate.
    #[error("transfer payload position is not finite")]
    NonFinitePosition,
}

/// Encodes `snapshot` into a single-line string suitable for copying.
pub fn encode_transfer(snapshot: &GameSnapshot) -> Result<String, TransferError> {
    if !snapshot.position.is_finite() {
        return Err(TransferError::NonFinitePosition);
    }
    let payload = TransferPayload {
        inventory: snapshot.inventory.map(TokenValue::get),
        position: snapshot.position,
        overrides: override_records(&snapshot.overrides),
    };
    let json = serde_json::to_vec(&payload)?;
    Ok(format!("{TRANSFER_HEADER}:{}", STANDARD_NO_PAD.encode(json)))
}

/// Decodes a snapshot from a string produced by [`encode_transfer`].
///
/// Unlike loading a save, decoding is strict: any malformed part rejects the
/// whole string so a typo never silently discards progress.
pub fn decode_transfer(value: &str) -> Result<GameSnapshot, TransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TransferError::EmptyPayload);
    }

    let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
    let domain = parts.next().ok_or(TransferError::MissingSegment("prefix"))?;
    let version = parts
        .next()
        .ok_or(TransferError::MissingSegment("version"))?;
    let payload = parts
        .next()
        .ok_or(TransferError::MissingSegment("payload"))?;

    if domain != TRANSFER_DOMAIN {
        return Err(TransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != TRANSFER_VERSION {
        return Err(TransferError::UnsupportedVersion(version.to_owned()));
    }

    let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
    let decoded: TransferPayload = serde_json::from_slice(&bytes)?;

    if !decoded.position.is_finite() {
        return Err(TransferError::NonFinitePosition);
    }
    let inventory = decoded.inventory.map(token).transpose()?;
    let overrides = decoded
        .overrides
        .into_iter()
        .map(|(key, content)| -> Result<_, TransferError> {
            let cell = key.parse::<CellCoord>()?;
            Ok((cell, content.map(token).transpose()?))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GameSnapshot {
        inventory,
        position: decoded.position,
        overrides,
    })
}

fn token(value: u64) -> Result<TokenValue, TransferError> {
    TokenValue::new(value).ok_or(TransferError::ZeroToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> GameSnapshot {
        GameSnapshot {
            inventory: TokenValue::new(2),
            position: LatLng::new(36.99, -122.05),
            overrides: vec![
                (CellCoord::new(-4, 2), None),
                (CellCoord::new(3, 3), TokenValue::new(16)),
            ],
        }
    }

    #[test]
    fn round_trip_populated_snapshot() {
        let snapshot = populated();

        let encoded = encode_transfer(&snapshot).expect("encodes");
        assert!(encoded.starts_with(&format!("{TRANSFER_HEADER}:")));
        assert!(!encoded.contains('\n'));

        let decoded = decode_transfer(&encoded).expect("decodes");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let encoded = encode_transfer(&populated()).expect("encodes");
        let decoded = decode_transfer(&format!("  {encoded}\n")).expect("decodes");
        assert_eq!(decoded, populated());
    }

    #[test]
    fn rejects_foreign_prefix_and_version() {
        assert!(matches!(
            decode_transfer("treasure:v1:abc"),
            Err(TransferError::InvalidPrefix(prefix)) if prefix == "treasure"
        ));
        assert!(matches!(
            decode_transfer("geocache:v9:abc"),
            Err(TransferError::UnsupportedVersion(version)) if version == "v9"
        ));
        assert!(matches!(
            decode_transfer("geocache"),
            Err(TransferError::MissingSegment("version"))
        ));
        assert!(matches!(decode_transfer("   "), Err(TransferError::EmptyPayload)));
    }

    #[test]
    fn rejects_garbled_payload() {
        assert!(matches!(
            decode_transfer("geocache:v1:***"),
            Err(TransferError::InvalidEncoding(_))
        ));
        let not_json = format!("geocache:v1:{}", STANDARD_NO_PAD.encode("hello"));
        assert!(matches!(
            decode_transfer(&not_json),
            Err(TransferError::InvalidPayload(_))
        ));
    }

    #[test]
    fn rejects_bad_cell_keys_and_zero_tokens() {
        let bad_key = format!(
            "geocache:v1:{}",
            STANDARD_NO_PAD
                .encode(r#"{"inventory":null,"position":{"lat":0,"lng":0},"overrides":[["x",1]]}"#)
        );
        assert!(matches!(
            decode_transfer(&bad_key),
            Err(TransferError::InvalidCell(_))
        ));

        let zero = format!(
            "geocache:v1:{}",
            STANDARD_NO_PAD
                .encode(r#"{"inventory":0,"position":{"lat":0,"lng":0},"overrides":[]}"#)
        );
        assert!(matches!(decode_transfer(&zero), Err(TransferError::ZeroToken)));
    }
}
