//! Concrete scenarios against the deployed protocol contracts
//!
//! Each scenario follows the same shape: resolve an identity, register
//! its signer, submit zero or more mutations in written order (waiting
//! for each to finalize), then re-query on-chain state and assert
//! against literal expected values. Ground truth is always the
//! post-finalization query; nothing is cached locally.

use std::sync::Arc;

use ethers::abi::Token;
use ethers::types::U256;
use tracing::info;

use crate::connection::Connection;
use crate::constants::{
    ADMIN, MIN_STAKE_TIME_VALUES, OUTSIDER, STABLECOIN_TEST_ADDRESS, TEST_ASSET_SYMBOL,
    TEST_ASSET_TYPE,
};
use crate::contracts::{ContractHandle, PATH_MANAGER_ABI, SETTINGS_REGISTRY_ABI};
use crate::error::HarnessError;
use crate::identity::IdentityProvider;
use crate::scenario::{tolerate_rejection, Scenario};
use crate::utils::{ensure_eq, parse_address, to_bytes32};
use crate::HarnessConfig;

/// Everything a scenario procedure needs: the connection, the identity
/// provider, and one handle per contract under test.
pub struct ScenarioContext {
    pub config: HarnessConfig,
    pub connection: Connection,
    pub identities: IdentityProvider,
    pub settings: ContractHandle,
    pub paths: ContractHandle,
}

impl ScenarioContext {
    /// Connect to the remote node and bind the contract handles.
    pub async fn initialize(config: HarnessConfig) -> Result<Self, HarnessError> {
        let connection = Connection::connect(&config.rpc_url).await?;
        Self::with_connection(config, connection)
    }

    fn with_connection(
        config: HarnessConfig,
        connection: Connection,
    ) -> Result<Self, HarnessError> {
        info!(
            "Binding contract handles for {:?} environment (chain id {})",
            config.environment,
            connection.chain_id()
        );
        let identities = IdentityProvider::new(config.mnemonic.clone(), connection.chain_id());

        let settings = ContractHandle::new(
            "SettingsRegistry",
            connection.provider(),
            config.settings_registry,
            SETTINGS_REGISTRY_ABI,
        )?;

        let paths = ContractHandle::new(
            "PathManager",
            connection.provider(),
            config.path_manager,
            PATH_MANAGER_ABI,
        )?;

        Ok(Self {
            config,
            connection,
            identities,
            settings,
            paths,
        })
    }
}

/// The full suite, in the order it must run. Later scenarios consume
/// state established by earlier ones; the labels make that explicit.
pub fn suite(ctx: &Arc<ScenarioContext>) -> Vec<Scenario> {
    vec![
        Scenario::expect_success(
            "set_stablecoin",
            &[],
            &["stablecoin_configured"],
            set_stablecoin(ctx.clone()),
        ),
        Scenario::expect_success(
            "update_min_stake_time",
            &[],
            &["min_stake_time_configured"],
            update_min_stake_time(ctx.clone()),
        ),
        Scenario::expect_success(
            "add_asset_path",
            &[],
            &["asset_path_configured"],
            add_asset_path(ctx.clone()),
        ),
        Scenario::expect_rejection(
            "unauthorized_set_rejected",
            &["stablecoin_configured"],
            &[],
            unauthorized_set_rejected(ctx.clone()),
        ),
        Scenario::expect_success(
            "repeated_query_stable",
            &["min_stake_time_configured"],
            &[],
            repeated_query_stable(ctx.clone()),
        ),
    ]
}

/// Admin sets the stablecoin address; the re-queried value must match
/// the submitted one exactly.
async fn set_stablecoin(ctx: Arc<ScenarioContext>) -> Result<(), HarnessError> {
    let admin = ctx.identities.resolve(ADMIN)?;
    ctx.connection.register_signer(&admin);

    let target = parse_address(STABLECOIN_TEST_ADDRESS)?;
    let call = ctx
        .settings
        .call("setStablecoin", &[Token::Address(target)])?;

    let receipt = ctx.connection.submit_and_confirm(&call, admin.address).await?;
    info!(
        "setStablecoin finalized in block {} ({} gas)",
        receipt.block_number, receipt.gas_used
    );

    let current = ctx.settings.query_address("stablecoin", &[]).await?;
    ensure_eq("stablecoin address", &target, &current)
}

/// Admin writes the numeric parameter twice; each write must be
/// observable exactly as submitted.
async fn update_min_stake_time(ctx: Arc<ScenarioContext>) -> Result<(), HarnessError> {
    let admin = ctx.identities.resolve(ADMIN)?;
    ctx.connection.register_signer(&admin);

    for value in MIN_STAKE_TIME_VALUES {
        let target = U256::from(*value);
        let call = ctx
            .settings
            .call("setMinStakeTime", &[Token::Uint(target)])?;

        ctx.connection.submit_and_confirm(&call, admin.address).await?;

        let current = ctx.settings.query_uint("minStakeTime", &[]).await?;
        ensure_eq("min stake time", &target, &current)?;
        info!("minStakeTime updated to {}", value);
    }

    Ok(())
}

/// Admin registers a currency key; the asset must become valid with the
/// submitted type code.
async fn add_asset_path(ctx: Arc<ScenarioContext>) -> Result<(), HarnessError> {
    let admin = ctx.identities.resolve(ADMIN)?;
    ctx.connection.register_signer(&admin);

    let key = to_bytes32(TEST_ASSET_SYMBOL);
    info!("Registering asset {} (key 0x{})", TEST_ASSET_SYMBOL, hex::encode(key));
    let call = ctx.paths.call(
        "addAsset",
        &[
            Token::FixedBytes(key.to_vec()),
            Token::Uint(U256::from(TEST_ASSET_TYPE)),
        ],
    )?;

    ctx.connection.submit_and_confirm(&call, admin.address).await?;

    let key_token = [Token::FixedBytes(key.to_vec())];
    let valid = ctx.paths.query_bool("isValidAsset", &key_token).await?;
    ensure_eq("asset validity", &true, &valid)?;

    let asset_type = ctx.paths.query_uint("assetType", &key_token).await?;
    ensure_eq("asset type", &U256::from(TEST_ASSET_TYPE), &asset_type)?;

    info!("Asset {} registered with type {}", TEST_ASSET_SYMBOL, TEST_ASSET_TYPE);
    Ok(())
}

/// An identity without the settings role attempts a mutation. The
/// rejection is the expected outcome, and the queried state must be
/// byte-identical before and after the attempt.
async fn unauthorized_set_rejected(ctx: Arc<ScenarioContext>) -> Result<(), HarnessError> {
    let outsider = ctx.identities.resolve(OUTSIDER)?;
    ctx.connection.register_signer(&outsider);

    let before = ctx.settings.query_address("stablecoin", &[]).await?;

    let call = ctx
        .settings
        .call("setStablecoin", &[Token::Address(outsider.address)])?;
    let attempt = ctx
        .connection
        .submit_and_confirm(&call, outsider.address)
        .await;
    tolerate_rejection("unauthorized setStablecoin", attempt)?;

    let after = ctx.settings.query_address("stablecoin", &[]).await?;
    ensure_eq("stablecoin address after rejected submission", &before, &after)
}

/// The same read-only query issued twice with no intervening submission
/// must return the same value.
async fn repeated_query_stable(ctx: Arc<ScenarioContext>) -> Result<(), HarnessError> {
    let first = ctx.settings.query_uint("minStakeTime", &[]).await?;
    let second = ctx.settings.query_uint("minStakeTime", &[]).await?;
    ensure_eq("repeated minStakeTime query", &first, &second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{RejectionPolicy, Runner};

    fn offline_context() -> Arc<ScenarioContext> {
        let config = HarnessConfig::local();
        let connection = Connection::with_chain_id(&config.rpc_url, 31337).unwrap();
        Arc::new(ScenarioContext::with_connection(config, connection).unwrap())
    }

    #[test]
    fn test_suite_ordering_is_valid() {
        let suite = suite(&offline_context());
        assert!(Runner::validate_ordering(&suite).is_ok());
    }

    #[test]
    fn test_suite_declares_expected_policies() {
        let suite = suite(&offline_context());

        let policies: Vec<_> = suite.iter().map(|s| (s.name, s.policy)).collect();
        assert_eq!(
            policies,
            vec![
                ("set_stablecoin", RejectionPolicy::FailScenario),
                ("update_min_stake_time", RejectionPolicy::FailScenario),
                ("add_asset_path", RejectionPolicy::FailScenario),
                ("unauthorized_set_rejected", RejectionPolicy::ExpectRejection),
                ("repeated_query_stable", RejectionPolicy::FailScenario),
            ]
        );
    }

    #[test]
    fn test_permission_scenario_depends_on_setup_scenario() {
        let suite = suite(&offline_context());

        let denial = suite
            .iter()
            .find(|s| s.name == "unauthorized_set_rejected")
            .unwrap();
        assert!(denial.preconditions.contains(&"stablecoin_configured"));
    }
}
