//! Scenario runner entry point
//!
//! Runs the full suite against a live node:
//! ```bash
//! cargo run --bin run_scenarios
//! ```
//! Configuration comes entirely from environment variables (RPC_URL,
//! MNEMONIC, contract addresses); there are no CLI arguments. The
//! process exits non-zero when any non-tolerant scenario fails or the
//! run aborts on a transport failure.

use std::sync::Arc;

use anyhow::Result;

use protocol_e2e::scenario::Runner;
use protocol_e2e::scenarios::{self, ScenarioContext};
use protocol_e2e::{check_rpc_connectivity, HarnessConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("Protocol Scenario Harness");
    println!("=========================\n");

    let config = HarnessConfig::from_env()?;

    println!("Configuration:");
    println!("   RPC URL: {}", config.rpc_url);
    println!("   Environment: {:?}", config.environment);
    println!("   Settings Registry: {:?}", config.settings_registry);
    println!("   Path Manager: {:?}", config.path_manager);
    println!();

    // Transport problems surface here, before any state is mutated.
    check_rpc_connectivity(&config).await?;

    let ctx = Arc::new(ScenarioContext::initialize(config).await?);
    let report = Runner::run(scenarios::suite(&ctx)).await?;

    report.print_summary();

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
