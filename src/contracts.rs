//! Contract handles: method binding, call encoding, read-only queries
//!
//! A handle is an immutable (provider, address, interface) triple. The
//! interface is declared as human-readable ABI fragments; arguments are
//! ABI tokens with no validation beyond encoding, so a semantically
//! invalid argument surfaces only as a remote rejection.

use ethers::abi::{parse_abi, Abi, Token};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use tracing::debug;

use crate::error::{classify_rpc_error, HarnessError};

/// ABI fragments for the protocol settings registry under test.
pub const SETTINGS_REGISTRY_ABI: &[&str] = &[
    "function setStablecoin(address stablecoin)",
    "function stablecoin() view returns (address)",
    "function setMinStakeTime(uint256 interval)",
    "function minStakeTime() view returns (uint256)",
];

/// ABI fragments for the asset path manager under test.
pub const PATH_MANAGER_ABI: &[&str] = &[
    "function addAsset(bytes32 key, uint8 assetType)",
    "function isValidAsset(bytes32 key) view returns (bool)",
    "function assetType(bytes32 key) view returns (uint8)",
];

/// An encoded state-mutating call, ready for submission.
#[derive(Debug, Clone)]
pub struct CallObject {
    pub to: Address,
    pub data: Bytes,
    pub method: String,
}

/// Callable binding to one deployed contract.
pub struct ContractHandle {
    name: &'static str,
    address: Address,
    abi: Abi,
    provider: Provider<Http>,
}

impl ContractHandle {
    pub fn new(
        name: &'static str,
        provider: Provider<Http>,
        address: Address,
        abi_fragments: &[&str],
    ) -> Result<Self, HarnessError> {
        let abi = parse_abi(abi_fragments)
            .map_err(|e| HarnessError::Config(format!("bad ABI for {name}: {e}")))?;

        Ok(Self {
            name,
            address,
            abi,
            provider,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn encode(&self, method: &str, args: &[Token]) -> Result<Bytes, HarnessError> {
        let function = self.abi.function(method).map_err(|e| {
            HarnessError::Config(format!("{} has no method {method}: {e}", self.name))
        })?;

        let data = function.encode_input(args).map_err(|e| {
            HarnessError::Config(format!(
                "argument encoding for {}::{method} failed: {e}",
                self.name
            ))
        })?;

        Ok(Bytes::from(data))
    }

    /// Build a state-mutating call object for this contract.
    pub fn call(&self, method: &str, args: &[Token]) -> Result<CallObject, HarnessError> {
        let data = self.encode(method, args)?;
        debug!("Encoded {}::{} ({} bytes)", self.name, method, data.len());

        Ok(CallObject {
            to: self.address,
            data,
            method: format!("{}::{}", self.name, method),
        })
    }

    /// Issue a read-only query and decode the output tokens.
    pub async fn query(&self, method: &str, args: &[Token]) -> Result<Vec<Token>, HarnessError> {
        let data = self.encode(method, args)?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.address)
            .data(data)
            .into();

        let output = self
            .provider
            .call(&tx, None)
            .await
            .map_err(|e| classify_rpc_error(e.to_string()))?;

        let function = self.abi.function(method).map_err(|e| {
            HarnessError::Config(format!("{} has no method {method}: {e}", self.name))
        })?;

        function.decode_output(&output).map_err(|e| {
            HarnessError::Config(format!(
                "decoding output of {}::{method} failed: {e}",
                self.name
            ))
        })
    }

    /// Query a method returning a single address.
    pub async fn query_address(
        &self,
        method: &str,
        args: &[Token],
    ) -> Result<Address, HarnessError> {
        match self.query(method, args).await?.as_slice() {
            [Token::Address(address)] => Ok(*address),
            other => Err(self.shape_error(method, "address", other)),
        }
    }

    /// Query a method returning a single boolean.
    pub async fn query_bool(&self, method: &str, args: &[Token]) -> Result<bool, HarnessError> {
        match self.query(method, args).await?.as_slice() {
            [Token::Bool(value)] => Ok(*value),
            other => Err(self.shape_error(method, "bool", other)),
        }
    }

    /// Query a method returning a single unsigned integer (any width).
    pub async fn query_uint(&self, method: &str, args: &[Token]) -> Result<U256, HarnessError> {
        match self.query(method, args).await?.as_slice() {
            [Token::Uint(value)] => Ok(*value),
            other => Err(self.shape_error(method, "uint", other)),
        }
    }

    fn shape_error(&self, method: &str, expected: &str, tokens: &[Token]) -> HarnessError {
        HarnessError::Config(format!(
            "{}::{method} returned unexpected shape (wanted {expected}): {tokens:?}",
            self.name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{LOCAL_RPC_URL, LOCAL_SETTINGS_REGISTRY_ADDRESS};
    use crate::utils::{parse_address, to_bytes32};

    fn settings_handle() -> ContractHandle {
        ContractHandle::new(
            "SettingsRegistry",
            Provider::<Http>::try_from(LOCAL_RPC_URL).unwrap(),
            parse_address(LOCAL_SETTINGS_REGISTRY_ADDRESS).unwrap(),
            SETTINGS_REGISTRY_ABI,
        )
        .unwrap()
    }

    #[test]
    fn test_call_encodes_selector_and_argument() {
        let handle = settings_handle();
        let target = parse_address("0xdAC17F958D2ee523a2206206994597C13D831ec7").unwrap();

        let call = handle
            .call("setStablecoin", &[Token::Address(target)])
            .unwrap();

        let selector = handle.abi.function("setStablecoin").unwrap().short_signature();
        assert_eq!(&call.data[..4], &selector[..]);
        // 4-byte selector + one 32-byte word
        assert_eq!(call.data.len(), 36);
        // address occupies the low 20 bytes of the word
        assert_eq!(&call.data[16..36], target.as_bytes());
        assert_eq!(call.to, handle.address());
    }

    #[test]
    fn test_call_with_wrong_argument_type_fails_locally() {
        let handle = settings_handle();

        let err = handle
            .call("setStablecoin", &[Token::Uint(U256::from(1))])
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_unknown_method_is_config_error() {
        let handle = settings_handle();

        let err = handle.call("selfDestruct", &[]).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_bytes32_argument_round_trips_through_encoding() {
        let handle = ContractHandle::new(
            "PathManager",
            Provider::<Http>::try_from(LOCAL_RPC_URL).unwrap(),
            parse_address(LOCAL_SETTINGS_REGISTRY_ADDRESS).unwrap(),
            PATH_MANAGER_ABI,
        )
        .unwrap();

        let key = to_bytes32("BTC");
        let call = handle
            .call(
                "addAsset",
                &[Token::FixedBytes(key.to_vec()), Token::Uint(U256::from(1u8))],
            )
            .unwrap();

        // selector + bytes32 word + uint8 word
        assert_eq!(call.data.len(), 4 + 32 + 32);
        assert_eq!(&call.data[4..36], &key[..]);
    }

    #[test]
    fn test_decode_output_shapes() {
        let handle = settings_handle();
        let function = handle.abi.function("minStakeTime").unwrap();

        let mut word = [0u8; 32];
        word[31] = 30;
        let tokens = function.decode_output(&word).unwrap();
        assert_eq!(tokens, vec![Token::Uint(U256::from(30))]);
    }
}
