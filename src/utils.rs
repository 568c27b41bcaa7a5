//! Utility functions shared across scenarios

use std::fmt::Debug;
use std::str::FromStr;

use ethers::types::Address;

use crate::error::HarnessError;

/// Assertion primitive used after every state-mutating step.
///
/// Raises a distinguishable `Assertion` failure carrying both sides
/// instead of panicking, so the runner can report per-scenario outcomes.
pub fn ensure_eq<T>(context: &str, expected: &T, actual: &T) -> Result<(), HarnessError>
where
    T: Debug + PartialEq,
{
    if expected == actual {
        return Ok(());
    }

    Err(HarnessError::Assertion {
        context: context.to_string(),
        expected: format!("{expected:?}"),
        actual: format!("{actual:?}"),
    })
}

/// Parse a 0x-prefixed Ethereum address, surfacing a config error
/// rather than a generic parse failure.
pub fn parse_address(value: &str) -> Result<Address, HarnessError> {
    Address::from_str(value)
        .map_err(|e| HarnessError::Config(format!("invalid address {value}: {e}")))
}

/// Encode an asset symbol as a right-padded bytes32 currency key.
/// Symbols longer than 32 bytes are truncated.
pub fn to_bytes32(symbol: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    let bytes = symbol.as_bytes();
    let len = bytes.len().min(32);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}
