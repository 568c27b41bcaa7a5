//! Integration-test scenario harness for the protocol contracts
//!
//! Drives a remote node through ordered state-mutating calls and
//! verifies resulting on-chain state:
//! - identities resolved per scenario from the configured mnemonic
//! - submissions finalized under a bounded timeout before any assertion
//! - per-scenario rejection policy (expected-success vs. expected-denial)
//! - one pass/fail outcome per scenario, non-zero exit on failure

pub mod connection;
pub mod constants;
pub mod contracts;
pub mod error;
pub mod identity;
pub mod scenario;
pub mod scenarios;
pub mod utils;

pub use constants::*;

use std::time::Duration;

use tracing::info;

use crate::error::HarnessError;

/// Initialize logging for harness tests
pub fn init_logging() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
}

/// Target environment, detected from the RPC URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,   // Local anvil/hardhat node
    Testnet, // Public testnet
    Mainnet, // Mainnet (scenarios mutate state; run deliberately)
}

impl Environment {
    pub fn detect(rpc_url: &str) -> Self {
        if rpc_url.contains("127.0.0.1") || rpc_url.contains("localhost") {
            Environment::Local
        } else if rpc_url.contains("sepolia") || rpc_url.contains("holesky") {
            Environment::Testnet
        } else {
            Environment::Mainnet
        }
    }
}

/// Harness configuration, read once at startup
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// JSON-RPC endpoint of the remote node
    pub rpc_url: String,
    /// Mnemonic the labeled identities derive from
    pub mnemonic: String,
    /// Deployed settings registry address
    pub settings_registry: ethers::types::Address,
    /// Deployed path manager address
    pub path_manager: ethers::types::Address,
    /// Detected environment
    pub environment: Environment,
}

impl HarnessConfig {
    /// Create configuration from environment variables, with local
    /// defaults for every value.
    pub fn from_env() -> Result<Self, HarnessError> {
        let rpc_url =
            std::env::var(ENV_RPC_URL).unwrap_or_else(|_| LOCAL_RPC_URL.to_string());
        let mnemonic =
            std::env::var(ENV_MNEMONIC).unwrap_or_else(|_| TEST_MNEMONIC.to_string());

        let settings_registry = std::env::var(ENV_SETTINGS_REGISTRY_ADDRESS)
            .unwrap_or_else(|_| LOCAL_SETTINGS_REGISTRY_ADDRESS.to_string());
        let path_manager = std::env::var(ENV_PATH_MANAGER_ADDRESS)
            .unwrap_or_else(|_| LOCAL_PATH_MANAGER_ADDRESS.to_string());

        let environment = Environment::detect(&rpc_url);
        info!(
            "Harness config: environment={:?}, rpc={}, settings_registry={}, path_manager={}",
            environment, rpc_url, settings_registry, path_manager
        );

        Ok(Self {
            rpc_url,
            mnemonic,
            settings_registry: utils::parse_address(&settings_registry)?,
            path_manager: utils::parse_address(&path_manager)?,
            environment,
        })
    }

    /// Create local development configuration
    pub fn local() -> Self {
        Self {
            rpc_url: LOCAL_RPC_URL.to_string(),
            mnemonic: TEST_MNEMONIC.to_string(),
            settings_registry: utils::parse_address(LOCAL_SETTINGS_REGISTRY_ADDRESS)
                .expect("local settings registry address is valid"),
            path_manager: utils::parse_address(LOCAL_PATH_MANAGER_ADDRESS)
                .expect("local path manager address is valid"),
            environment: Environment::Local,
        }
    }
}

/// Preflight probe of the RPC endpoint with a raw eth_blockNumber
/// request, failing fast with a transport error when the node is
/// unreachable.
pub async fn check_rpc_connectivity(config: &HarnessConfig) -> Result<(), HarnessError> {
    let client = reqwest::Client::new();
    let payload = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "eth_blockNumber",
        "params": [],
        "id": 1
    });

    let response = client
        .post(&config.rpc_url)
        .json(&payload)
        .timeout(Duration::from_secs(MAX_RPC_RESPONSE_TIME_SECONDS))
        .send()
        .await
        .map_err(|e| HarnessError::Transport {
            reason: format!("RPC preflight failed: {e}"),
        })?;

    if !response.status().is_success() {
        return Err(HarnessError::Transport {
            reason: format!("RPC preflight returned {}", response.status()),
        });
    }

    let result: serde_json::Value =
        response.json().await.map_err(|e| HarnessError::Transport {
            reason: format!("RPC preflight returned malformed body: {e}"),
        })?;

    let block_hex = result["result"].as_str().ok_or_else(|| HarnessError::Transport {
        reason: format!("RPC preflight missing block number: {result}"),
    })?;

    let block_number = u64::from_str_radix(block_hex.trim_start_matches("0x"), 16)
        .map_err(|_| HarnessError::Transport {
            reason: format!("RPC preflight returned invalid block number: {block_hex}"),
        })?;

    info!("RPC endpoint reachable, latest block: {}", block_number);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        assert_eq!(Environment::detect("http://127.0.0.1:8545"), Environment::Local);
        assert_eq!(Environment::detect("http://localhost:8545"), Environment::Local);
        assert_eq!(
            Environment::detect("https://sepolia.infura.io/v3/key"),
            Environment::Testnet
        );
        assert_eq!(
            Environment::detect("https://rpc.ankr.com/eth"),
            Environment::Mainnet
        );
    }

    #[test]
    fn test_local_config_parses_default_addresses() {
        let config = HarnessConfig::local();
        assert_eq!(config.environment, Environment::Local);
        assert_ne!(config.settings_registry, config.path_manager);
    }
}
