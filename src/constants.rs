//! Shared constants for the on-chain scenario harness
//!
//! All hardcoded values are centralized here for use by the runner,
//! the concrete scenarios, and the unit tests.

/// Default JSON-RPC URL for local development (Anvil / Hardhat node)
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

/// Test mnemonic for local development (DO NOT USE IN PRODUCTION)
pub const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Default settings registry address for the local deployment layout
pub const LOCAL_SETTINGS_REGISTRY_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Default path manager address for the local deployment layout
pub const LOCAL_PATH_MANAGER_ADDRESS: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";

/// Stablecoin address the positive-path scenario writes and re-reads
pub const STABLECOIN_TEST_ADDRESS: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

/// Asset symbol registered by the path-manager scenario
pub const TEST_ASSET_SYMBOL: &str = "BTC";

/// Asset type code expected after registering the test asset
pub const TEST_ASSET_TYPE: u8 = 1;

/// Values written to the numeric settings parameter, in order
pub const MIN_STAKE_TIME_VALUES: &[u64] = &[30, 40];

/// Identity labels resolved by the identity provider.
/// Index in this table doubles as the derivation index.
pub const IDENTITY_LABELS: &[&str] = &[ADMIN, ORACLE, OUTSIDER];

/// Identity authorized to mutate protocol settings
pub const ADMIN: &str = "admin";

/// Identity authorized to push price updates
pub const ORACLE: &str = "oracle";

/// Identity holding no protocol role; used for permission-denial paths
pub const OUTSIDER: &str = "outsider";

/// Maximum time to wait for a submission to finalize (seconds)
pub const FINALIZATION_TIMEOUT_SECONDS: u64 = 60;

/// Interval between receipt polls while waiting for finalization (millis)
pub const RECEIPT_POLL_INTERVAL_MILLIS: u64 = 1000;

/// Maximum acceptable RPC response time for preflight checks (seconds)
pub const MAX_RPC_RESPONSE_TIME_SECONDS: u64 = 5;

/// Submission attempts allowed when the failure is transport-level.
/// Remote rejections are never retried.
pub const MAX_TRANSPORT_ATTEMPTS: u32 = 3;

/// Backoff between transport-level submission retries (millis)
pub const TRANSPORT_RETRY_BACKOFF_MILLIS: u64 = 500;

/// Environment variable names for configuration
pub const ENV_RPC_URL: &str = "RPC_URL";
pub const ENV_MNEMONIC: &str = "MNEMONIC";
pub const ENV_SETTINGS_REGISTRY_ADDRESS: &str = "SETTINGS_REGISTRY_ADDRESS";
pub const ENV_PATH_MANAGER_ADDRESS: &str = "PATH_MANAGER_ADDRESS";
